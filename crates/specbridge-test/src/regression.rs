//! Cross-format regression suite over the shared fixtures.
//!
//! Run with: `cargo test -p specbridge-test`

use specbridge_converter::{ConvertOptions, Encoding, Format, WriteOptions};

use crate::{TestConverter, TestError};

const VALID: [&str; 6] = [
    "minimal.yaml",
    "petstore-v3.yaml",
    "petstore-v2.json",
    "events-asyncapi-2.yaml",
    "streetlights-asyncapi-3.yaml",
    "notes.apib",
];

fn json() -> ConvertOptions {
    ConvertOptions::new().with_write_options(WriteOptions::default().with_encoding(Encoding::Json))
}

#[test]
fn every_fixture_converts_to_every_format() {
    let harness = TestConverter::new();
    for name in VALID {
        for to in Format::ALL {
            let converted = harness
                .convert_fixture(name, to, &ConvertOptions::default())
                .unwrap_or_else(|e| panic!("{} -> {}: {}", name, to, e));
            assert!(!converted.output.is_empty(), "{} -> {} wrote nothing", name, to);
            assert_eq!(converted.report.to, to);

            // The output is itself a readable document of the target format.
            let back = harness
                .convert_bytes(&converted.output, None, to, &ConvertOptions::default())
                .unwrap_or_else(|e| panic!("re-reading {} -> {}: {}", name, to, e));
            assert_eq!(back.report.from, to);
        }
    }
}

#[test]
fn http_fixtures_pass_validation() {
    let harness = TestConverter::new();
    for name in ["minimal.yaml", "petstore-v3.yaml", "petstore-v2.json", "notes.apib"] {
        let report = harness.validate_fixture(name).unwrap();
        assert!(report.is_valid(), "{}: {:?}", name, report.results);
    }
}

#[test]
fn channel_addresses_without_slash_fail_path_prefix() {
    let report = TestConverter::new()
        .validate_fixture("events-asyncapi-2.yaml")
        .unwrap();
    let codes: Vec<&str> = report.results.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["E5001"]);
}

#[test]
fn publish_and_subscribe_map_to_post_and_get_and_back() -> Result<(), TestError> {
    let source = br#"
asyncapi: 2.6.0
info:
  title: Chat
  version: 1.0.0
channels:
  room:
    publish:
      operationId: sendMessage
      message:
        payload:
          type: string
    subscribe:
      operationId: receiveMessage
      message:
        payload:
          type: string
"#;
    let harness = TestConverter::new();

    let openapi = harness
        .convert_bytes(source, None, Format::OpenApi, &json())?
        .document()?;
    let room = &openapi["paths"]["/room"];
    assert_eq!(room["post"]["operationId"], "sendMessage");
    assert_eq!(room["get"]["operationId"], "receiveMessage");

    let options = ConvertOptions::new().with_write_options(
        WriteOptions::default()
            .with_encoding(Encoding::Json)
            .with_asyncapi_version("2.6".parse().map_err(TestError::Decode)?),
    );
    let asyncapi = harness
        .convert_bytes(source, None, Format::AsyncApi, &options)?
        .document()?;
    let room = &asyncapi["channels"]["room"];
    assert_eq!(room["publish"]["operationId"], "sendMessage");
    assert_eq!(room["subscribe"]["operationId"], "receiveMessage");
    Ok(())
}

#[test]
fn rewrites_are_byte_stable_in_json_too() -> Result<(), TestError> {
    let harness = TestConverter::new();
    for (name, format) in [
        ("petstore-v3.yaml", Format::OpenApi),
        ("streetlights-asyncapi-3.yaml", Format::AsyncApi),
    ] {
        let input = crate::read_fixture(name)?;
        let (once, twice) = harness.rewrite_twice(&input, format, &json())?;
        assert_eq!(once.text()?, twice.text()?, "{}", name);
    }
    Ok(())
}

#[test]
fn blueprint_keeps_groups_through_openapi() -> Result<(), TestError> {
    let harness = TestConverter::new();
    let openapi = harness.convert_fixture("notes.apib", Format::OpenApi, &json())?;
    let doc = openapi.document()?;
    assert_eq!(doc["info"]["title"], "Notes API");
    assert_eq!(doc["paths"]["/notes"]["get"]["tags"][0], "Notes");

    let blueprint = harness.convert_bytes(&openapi.output, None, Format::Blueprint, &ConvertOptions::default())?;
    assert!(blueprint.text()?.contains("# Group Notes"));
    Ok(())
}
