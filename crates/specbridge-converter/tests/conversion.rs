//! End-to-end conversions over the shared fixtures.
//!
//! Run with: `cargo test -p specbridge-converter`

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use specbridge_converter::{
    CancelToken, Context, ConvertError, ConvertOptions, ConvertReport, Converter, Encoding,
    ErrorKind, Format, OpenApiVersion, WriteOptions,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures")
        .join(name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("read {}: {}", path.display(), e))
}

fn convert_with(
    ctx: &Context,
    input: &[u8],
    from: Option<Format>,
    to: Format,
    options: &ConvertOptions,
) -> (Result<ConvertReport, ConvertError>, Vec<u8>) {
    let mut out = Vec::new();
    let result = Converter::default().convert(
        ctx,
        &mut Cursor::new(input),
        &mut out,
        from,
        to,
        options,
    );
    (result, out)
}

fn convert(input: &[u8], to: Format, options: &ConvertOptions) -> Vec<u8> {
    let (result, out) = convert_with(&Context::new(), input, None, to, options);
    result.unwrap();
    out
}

fn json_options() -> ConvertOptions {
    ConvertOptions::new().with_write_options(WriteOptions::default().with_encoding(Encoding::Json))
}

fn as_json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn rewriting_is_idempotent_per_format() {
    let cases = [
        ("petstore-v3.yaml", Format::OpenApi),
        ("petstore-v2.json", Format::OpenApi),
        ("streetlights-asyncapi-3.yaml", Format::AsyncApi),
        ("events-asyncapi-2.yaml", Format::AsyncApi),
        ("notes.apib", Format::Blueprint),
    ];
    for (name, format) in cases {
        let options = ConvertOptions::default();
        let once = convert(&fixture(name), format, &options);
        let twice = convert(&once, format, &options);
        assert_eq!(
            String::from_utf8_lossy(&once),
            String::from_utf8_lossy(&twice),
            "{} is not stable under rewrite",
            name
        );
    }
}

#[test]
fn openapi_through_blueprint_keeps_title_and_paths() {
    let source = fixture("petstore-v3.yaml");
    let original: Value = serde_yaml::from_slice(&source).unwrap();

    let blueprint = convert(&source, Format::Blueprint, &ConvertOptions::default());
    let back = as_json(&convert(&blueprint, Format::OpenApi, &json_options()));

    assert_eq!(back["info"]["title"], original["info"]["title"]);
    let keys = |doc: &Value| -> Vec<String> {
        doc["paths"]
            .as_object()
            .map(|paths| paths.keys().cloned().collect())
            .unwrap_or_default()
    };
    assert_eq!(keys(&back), keys(&original));
}

#[test]
fn swagger_upgrades_to_openapi_3() {
    let doc = as_json(&convert(
        &fixture("petstore-v2.json"),
        Format::OpenApi,
        &json_options(),
    ));
    assert!(doc["openapi"].as_str().unwrap().starts_with("3.0"));
    assert_eq!(doc["servers"][0]["url"], "https://petstore.example.com/v1");
    assert_eq!(
        doc["paths"]["/pets"]["get"]["responses"]["200"]["content"]["application/json"]["schema"]
            ["items"]["$ref"],
        "#/components/schemas/Pet"
    );
}

#[test]
fn nullable_type_array_follows_target_version() {
    let source = fixture("petstore-v3.yaml");
    let tag = |version: OpenApiVersion, keywords: bool| -> Value {
        let options = ConvertOptions::new().with_write_options(
            WriteOptions::default()
                .with_encoding(Encoding::Json)
                .with_openapi_version(version)
                .with_nullable_keywords(keywords),
        );
        let doc = as_json(&convert(&source, Format::OpenApi, &options));
        let schemas = if version == OpenApiVersion::V2_0 {
            &doc["definitions"]
        } else {
            &doc["components"]["schemas"]
        };
        schemas["Pet"]["properties"]["tag"].clone()
    };

    assert_eq!(
        tag(OpenApiVersion::V3_1, false),
        serde_json::json!({"type": ["string", "null"]})
    );
    // Older targets drop the null marker entirely.
    assert_eq!(tag(OpenApiVersion::V3_0, false), serde_json::json!({"type": "string"}));
    assert_eq!(tag(OpenApiVersion::V2_0, false), serde_json::json!({"type": "string"}));

    assert_eq!(
        tag(OpenApiVersion::V3_0, true),
        serde_json::json!({"type": "string", "nullable": true})
    );
    assert_eq!(
        tag(OpenApiVersion::V2_0, true),
        serde_json::json!({"type": "string", "x-nullable": true})
    );
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn minimal_openapi_to_blueprint() {
    let text = String::from_utf8(convert(
        &fixture("minimal.yaml"),
        Format::Blueprint,
        &ConvertOptions::default(),
    ))
    .unwrap();
    assert!(text.starts_with("FORMAT: 1A\n"));
    assert!(text.contains("\n# T\n"));
    assert!(text.contains("\n## /x [/x]\n"));
}

#[test]
fn subscribed_channel_becomes_get_on_openapi_path() {
    let blueprint = convert(
        &fixture("events-asyncapi-2.yaml"),
        Format::Blueprint,
        &ConvertOptions::default(),
    );
    let doc = as_json(&convert(&blueprint, Format::OpenApi, &json_options()));
    assert!(doc["paths"]["/evt"]["get"].is_object());
    assert!(doc["paths"]["/evt"].get("post").is_none());
}

#[test]
fn asyncapi_3_round_trips_through_2_6() {
    let source = fixture("streetlights-asyncapi-3.yaml");
    let options = ConvertOptions::new().with_write_options(
        WriteOptions::default()
            .with_encoding(Encoding::Json)
            .with_asyncapi_version("2.6".parse().unwrap()),
    );
    let v2 = as_json(&convert(&source, Format::AsyncApi, &options));
    assert!(v2["asyncapi"].as_str().unwrap().starts_with("2."));
    let channel = &v2["channels"]["smartylighting/measured/{streetlightId}"];
    assert!(channel["subscribe"].is_object());
    assert!(channel.get("publish").is_none());
}

// ---------------------------------------------------------------------------
// Failure modes
// ---------------------------------------------------------------------------

#[test]
fn validation_failure_carries_every_error() {
    let options = ConvertOptions::new().with_validate(true);
    let (result, out) = convert_with(
        &Context::new(),
        &fixture("invalid-path-prefix.yaml"),
        None,
        Format::Blueprint,
        &options,
    );
    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let ConvertError::Validation(results) = err else {
        panic!("expected a validation failure");
    };
    let codes: Vec<&str> = results.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["E5001", "E5002"]);
    assert!(out.is_empty());
}

#[test]
fn stop_on_first_error_keeps_first_failing_rule() {
    let options = ConvertOptions::new()
        .with_validate(true)
        .with_stop_on_first_error(true);
    let (result, _) = convert_with(
        &Context::new(),
        &fixture("invalid-path-prefix.yaml"),
        None,
        Format::Blueprint,
        &options,
    );
    let Err(ConvertError::Validation(results)) = result else {
        panic!("expected a validation failure");
    };
    assert!(results.iter().all(|r| r.rule == "path-prefix"));
}

#[test]
fn malformed_input_is_a_parse_error_with_position() {
    let (result, _) = convert_with(
        &Context::new(),
        &fixture("invalid-syntax.yaml"),
        Some(Format::OpenApi),
        Format::Blueprint,
        &ConvertOptions::default(),
    );
    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conversion);
    let message = err.to_string();
    assert!(message.starts_with("E4002"), "{}", message);
    assert!(message.contains("line"), "{}", message);
}

#[test]
fn unknown_content_fails_detection() {
    let (result, _) = convert_with(
        &Context::new(),
        &fixture("unknown.txt"),
        None,
        Format::OpenApi,
        &ConvertOptions::default(),
    );
    assert_eq!(result.unwrap_err().kind().exit_code(), 2);
}

#[test]
fn empty_builder_supports_nothing() {
    let converter = Converter::builder().build();
    let mut out = Vec::new();
    let err = converter
        .convert(
            &Context::new(),
            &mut Cursor::new(fixture("minimal.yaml")),
            &mut out,
            None,
            Format::Blueprint,
            &ConvertOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
    assert!(!converter.supports_parse(Format::OpenApi));
    assert!(!converter.supports_write(Format::Blueprint));
}

// ---------------------------------------------------------------------------
// Strict mode, cancellation and progress
// ---------------------------------------------------------------------------

const HEADER_PARAM: &str = r#"{"openapi":"3.0.3","info":{"title":"H","version":"1"},"paths":{"/x":{"get":{"parameters":[{"name":"X-Trace","in":"header","schema":{"type":"string"}}],"responses":{"200":{"description":"OK"}}}}}}"#;

#[test]
fn warnings_are_reported_but_do_not_fail() {
    let (result, out) = convert_with(
        &Context::new(),
        HEADER_PARAM.as_bytes(),
        None,
        Format::Blueprint,
        &ConvertOptions::default(),
    );
    let report = result.unwrap();
    assert_eq!(report.warnings.len(), 1);
    assert!(!out.is_empty());
}

#[test]
fn strict_mode_fails_before_any_output() {
    let (result, out) = convert_with(
        &Context::new(),
        HEADER_PARAM.as_bytes(),
        None,
        Format::Blueprint,
        &ConvertOptions::new().with_strict(true),
    );
    let err = result.unwrap_err();
    assert!(matches!(&err, ConvertError::Strict(w) if w.len() == 1));
    assert_eq!(err.kind().exit_code(), 3);
    assert!(out.is_empty());
}

#[test]
fn cancelled_before_start_writes_nothing() {
    let token = CancelToken::new();
    token.cancel();
    let ctx = Context::new().with_cancel_token(token);
    let (result, out) = convert_with(
        &ctx,
        &fixture("petstore-v3.yaml"),
        None,
        Format::Blueprint,
        &ConvertOptions::default(),
    );
    assert!(matches!(result, Err(ConvertError::Cancelled)));
    assert!(out.is_empty());
}

#[test]
fn cancelled_mid_read_writes_nothing() {
    let token = CancelToken::new();
    let trigger = token.clone();
    let ctx = Context::new()
        .with_cancel_token(token)
        .with_progress(move |_| trigger.cancel());
    let (result, out) = convert_with(
        &ctx,
        &fixture("petstore-v3.yaml"),
        None,
        Format::Blueprint,
        &ConvertOptions::default(),
    );
    assert!(matches!(result, Err(ConvertError::Cancelled)));
    assert!(out.is_empty());
}

#[test]
fn progress_is_monotonic_and_covers_all_bytes() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let ctx = Context::new().with_progress(move |total| sink.lock().push(total));
    let (result, _) = convert_with(
        &ctx,
        &fixture("petstore-v3.yaml"),
        None,
        Format::OpenApi,
        &ConvertOptions::default(),
    );
    let report = result.unwrap();
    let seen = seen.lock();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(
        seen.last().copied(),
        Some(report.bytes_read + report.bytes_written)
    );
}

#[test]
fn one_converter_serves_many_threads() {
    let converter = Converter::default();
    let source = fixture("petstore-v3.yaml");
    let outputs: Vec<Vec<u8>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    let mut out = Vec::new();
                    converter
                        .convert(
                            &Context::new(),
                            &mut Cursor::new(&source),
                            &mut out,
                            None,
                            Format::Blueprint,
                            &ConvertOptions::default(),
                        )
                        .unwrap();
                    out
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
}

// ---------------------------------------------------------------------------
// validate()
// ---------------------------------------------------------------------------

#[test]
fn validate_lists_findings_without_writing() {
    let report = Converter::default()
        .validate(
            &Context::new(),
            &mut Cursor::new(fixture("invalid-path-prefix.yaml")),
            None,
        )
        .unwrap();
    assert_eq!(report.format, Format::OpenApi);
    assert!(!report.is_valid());
    assert_eq!(report.error_count(), 2);

    let report = Converter::default()
        .validate(
            &Context::new(),
            &mut Cursor::new(fixture("notes.apib")),
            Some(Format::Blueprint),
        )
        .unwrap();
    assert!(report.is_valid(), "{:?}", report.results);
}
