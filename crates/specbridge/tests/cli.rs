//! CLI regression tests for the `specbridge` binary.
//!
//! These tests invoke the binary as a subprocess to catch regressions in flag
//! names, exit codes and stream routing that the library tests cannot see.
//!
//! Run with: `cargo test -p specbridge`

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

use specbridge_test::{fixture_path, read_fixture, read_output, scratch_dir};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Returns an assert_cmd Command wrapping the `specbridge` binary.
fn specbridge() -> Command {
    // cargo_bin is deprecated for custom build-dir setups; fine for standard workspace use.
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("specbridge").expect("specbridge binary not found");
    cmd.env_remove("RUST_LOG")
        .env_remove("SPECBRIDGE_LOG_LEVEL")
        .env_remove("SPECBRIDGE_LOG_FORMAT");
    cmd
}

// ---------------------------------------------------------------------------
// specbridge convert
// ---------------------------------------------------------------------------

#[test]
fn convert_minimal_openapi_to_blueprint_on_stdout() {
    specbridge()
        .args(["convert", "--to", "blueprint"])
        .arg(fixture_path("minimal.yaml"))
        .assert()
        .success()
        .stdout(contains("FORMAT: 1A"))
        .stdout(contains("\n# T\n"))
        .stdout(contains("## /x [/x]"));
}

#[test]
fn convert_reads_stdin() {
    specbridge()
        .args(["convert", "--to", "openapi", "--encoding", "json", "-"])
        .write_stdin(read_fixture("notes.apib").expect("fixture"))
        .assert()
        .success()
        .stdout(contains("\"title\": \"Notes API\""));
}

#[test]
fn convert_writes_output_file() {
    let dir = scratch_dir().expect("temp dir");
    let out = dir.path().join("events.apib");
    specbridge()
        .args(["convert", "--to", "blueprint", "--output"])
        .arg(&out)
        .arg(fixture_path("events-asyncapi-2.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(contains("converted asyncapi to blueprint"));

    let text = read_output(&out).expect("output file");
    assert!(text.contains("# Events"));
    assert!(text.contains("[GET]"));
}

#[test]
fn convert_openapi_version_flag() {
    specbridge()
        .args([
            "convert",
            "--to",
            "openapi",
            "--openapi-version",
            "3.1",
            "--encoding",
            "json",
        ])
        .arg(fixture_path("petstore-v3.yaml"))
        .assert()
        .success()
        .stdout(contains("\"openapi\": \"3.1.0\""));
}

#[test]
fn convert_asyncapi_version_flag() {
    specbridge()
        .args(["convert", "--to", "asyncapi", "--asyncapi-version", "2.6"])
        .arg(fixture_path("streetlights-asyncapi-3.yaml"))
        .assert()
        .success()
        .stdout(contains("asyncapi: 2.6.0"));
}

#[test]
fn convert_nullable_keywords_flag() {
    specbridge()
        .args(["convert", "--to", "openapi", "--encoding", "json"])
        .arg(fixture_path("petstore-v3.yaml"))
        .assert()
        .success()
        .stdout(contains("\"nullable\"").not());

    specbridge()
        .args(["convert", "--to", "openapi", "--encoding", "json", "--nullable-keywords"])
        .arg(fixture_path("petstore-v3.yaml"))
        .assert()
        .success()
        .stdout(contains("\"nullable\": true"));
}

#[test]
fn convert_explicit_source_format() {
    specbridge()
        .args(["convert", "--from", "apib", "--to", "openapi"])
        .arg(fixture_path("notes.apib"))
        .assert()
        .success()
        .stdout(contains("openapi: 3.0.3"));
}

#[test]
fn convert_unknown_target_is_usage_error() {
    specbridge()
        .args(["convert", "--to", "raml"])
        .arg(fixture_path("minimal.yaml"))
        .assert()
        .failure()
        .code(2)
        .stderr(contains("unknown format"));
}

#[test]
fn convert_undetectable_input_exits_two() {
    specbridge()
        .args(["convert", "--to", "openapi"])
        .arg(fixture_path("unknown.txt"))
        .assert()
        .failure()
        .code(2)
        .stderr(contains("E4005"));
}

#[test]
fn convert_parse_error_exits_one() {
    specbridge()
        .args(["convert", "--from", "openapi", "--to", "blueprint"])
        .arg(fixture_path("invalid-syntax.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E4002"))
        .stderr(contains("E2002"));
}

#[test]
fn convert_missing_file_exits_one() {
    specbridge()
        .args(["convert", "--to", "openapi", "this-file-does-not-exist.yaml"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("cannot open input"));
}

#[test]
fn convert_validation_failure_exits_three() {
    specbridge()
        .args(["convert", "--to", "blueprint", "--validate"])
        .arg(fixture_path("invalid-path-prefix.yaml"))
        .assert()
        .failure()
        .code(3)
        .stdout(predicate::str::is_empty())
        .stderr(contains("E4003"))
        .stderr(contains("E5001"))
        .stderr(contains("E5002"));
}

#[test]
fn convert_stop_on_first_error_reports_one_rule() {
    specbridge()
        .args([
            "convert",
            "--to",
            "blueprint",
            "--validate",
            "--stop-on-first-error",
        ])
        .arg(fixture_path("invalid-path-prefix.yaml"))
        .assert()
        .failure()
        .code(3)
        .stderr(contains("E5001"))
        .stderr(contains("E5002").not());
}

#[test]
fn convert_stop_on_first_error_requires_validate() {
    specbridge()
        .args(["convert", "--to", "blueprint", "--stop-on-first-error"])
        .arg(fixture_path("minimal.yaml"))
        .assert()
        .failure()
        .code(2);
}

#[test]
fn convert_strict_fails_on_warnings_and_keeps_output_untouched() {
    let dir = scratch_dir().expect("temp dir");
    let out = dir.path().join("events.yaml");
    std::fs::write(&out, "previous").expect("seed output");

    // Channels have no query parameters, so `limit` is dropped with a warning.
    specbridge()
        .args(["convert", "--to", "asyncapi", "--strict", "--output"])
        .arg(&out)
        .arg(fixture_path("petstore-v3.yaml"))
        .assert()
        .failure()
        .code(3)
        .stderr(contains("E4006"));

    assert_eq!(read_output(&out).expect("output file"), "previous");
}

// ---------------------------------------------------------------------------
// specbridge validate
// ---------------------------------------------------------------------------

#[test]
fn validate_valid_document_exits_zero() {
    specbridge()
        .arg("validate")
        .arg(fixture_path("petstore-v3.yaml"))
        .assert()
        .success()
        .stderr(contains("is valid"));
}

#[test]
fn validate_invalid_document_exits_three() {
    specbridge()
        .arg("validate")
        .arg(fixture_path("invalid-path-prefix.yaml"))
        .assert()
        .failure()
        .code(3)
        .stderr(contains("has 2 error(s)"));
}

#[test]
fn validate_json_format_outputs_valid_json() {
    let output = specbridge()
        .arg("validate")
        .arg(fixture_path("minimal.yaml"))
        .arg(fixture_path("invalid-path-prefix.yaml"))
        .args(["--format", "json"])
        .assert()
        .failure()
        .code(3)
        .get_output()
        .stdout
        .clone();

    let s = String::from_utf8(output).expect("stdout should be valid UTF-8");
    let v: serde_json::Value =
        serde_json::from_str(&s).expect("--format json output should be valid JSON");
    assert_eq!(v["summary"]["total"], 2);
    assert_eq!(v["summary"]["valid"], 1);
    assert_eq!(v["results"][0]["valid"], true);
    assert_eq!(v["results"][1]["valid"], false);
    assert_eq!(v["results"][1]["format"], "openapi");
}

#[test]
fn validate_parse_error_is_reported_per_file() {
    let output = specbridge()
        .args(["validate", "--from", "openapi", "--format", "json"])
        .arg(fixture_path("invalid-syntax.yaml"))
        .assert()
        .failure()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let v: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");
    assert_eq!(v["results"][0]["errors"][0]["code"], "E4002");
}

// ---------------------------------------------------------------------------
// specbridge detect
// ---------------------------------------------------------------------------

#[test]
fn detect_prints_format_names() {
    for (name, format) in [
        ("petstore-v2.json", "openapi"),
        ("streetlights-asyncapi-3.yaml", "asyncapi"),
        ("notes.apib", "blueprint"),
    ] {
        specbridge()
            .arg("detect")
            .arg(fixture_path(name))
            .assert()
            .success()
            .stdout(predicate::str::diff(format!("{}\n", format)));
    }
}

#[test]
fn detect_unknown_exits_two() {
    specbridge()
        .arg("detect")
        .arg(fixture_path("unknown.txt"))
        .assert()
        .failure()
        .code(2);
}

// ---------------------------------------------------------------------------
// logging flags
// ---------------------------------------------------------------------------

#[test]
fn json_logs_go_to_stderr_only() {
    let assert = specbridge()
        .args(["--log-level", "info", "--log-format", "json", "convert", "--to", "blueprint"])
        .arg(fixture_path("minimal.yaml"))
        .assert()
        .success()
        .stdout(contains("FORMAT: 1A"))
        .stderr(contains("\"event\":\"conversion_completed\""));
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(!stdout.contains("conversion_completed"));
}

#[test]
fn log_format_env_is_honoured_and_validated() {
    specbridge()
        .env("SPECBRIDGE_LOG_FORMAT", "xml")
        .args(["detect"])
        .arg(fixture_path("notes.apib"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("unknown log format"));
}
