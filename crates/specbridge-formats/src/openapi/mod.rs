//! OpenAPI 2.0 (Swagger) and 3.0/3.1 adapter.

mod read;
mod write;

use serde_json::{Map, Value};
use specbridge_model::Warning;
use tracing::debug;

use crate::document::{self, scalar_string};
use crate::error::{ParseError, WriteError};
use crate::{ParseOutput, WriteOptions};

/// Major shape of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    /// `swagger: "2.0"`
    Swagger,
    /// `openapi: 3.0.x` or `3.1.x`; both read the same way.
    OpenApi3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenApiAdapter;

impl OpenApiAdapter {
    pub fn parse(&self, input: &[u8]) -> Result<ParseOutput, ParseError> {
        let root = document::decode(input)?;
        let obj = root
            .as_object()
            .ok_or_else(|| ParseError::structure("document root must be an object"))?;
        let (dialect, version) = sniff_version(obj)?;
        debug!(version = %version, "parsing OpenAPI document");

        let mut warnings = Vec::new();
        let mut api = read::read_document(&root, dialect, &mut warnings)?;
        api.version = version;
        api.ensure_operation_ids();
        Ok(ParseOutput { api, warnings })
    }

    pub fn write(
        &self,
        api: &specbridge_model::Api,
        options: &WriteOptions,
        out: &mut Vec<u8>,
    ) -> Result<Vec<Warning>, WriteError> {
        let mut warnings = Vec::new();
        let doc = write::write_document(api, options, &mut warnings);
        document::encode(&doc, options.encoding, out)?;
        debug!(
            version = options.openapi_version.as_str(),
            paths = api.paths.len(),
            "wrote OpenAPI document"
        );
        Ok(warnings)
    }
}

/// Read the `swagger`/`openapi` key without decoding the rest.
fn sniff_version(root: &Map<String, Value>) -> Result<(Dialect, String), ParseError> {
    if let Some(version) = root.get("swagger").and_then(scalar_string) {
        if version == "2.0" || version == "2" {
            return Ok((Dialect::Swagger, "2.0".to_string()));
        }
        return Err(ParseError::UnsupportedVersion {
            format: "OpenAPI",
            version,
        });
    }
    if let Some(version) = root.get("openapi").and_then(scalar_string) {
        if version.starts_with("3.0") || version.starts_with("3.1") {
            return Ok((Dialect::OpenApi3, version));
        }
        return Err(ParseError::UnsupportedVersion {
            format: "OpenAPI",
            version,
        });
    }
    Err(ParseError::NotThisFormat("OpenAPI"))
}

/// Standard reason phrase used when a response carries no description.
pub(crate) fn reason_phrase(code: &str) -> &'static str {
    match code {
        "200" => "OK",
        "201" => "Created",
        "202" => "Accepted",
        "204" => "No Content",
        "301" => "Moved Permanently",
        "302" => "Found",
        "304" => "Not Modified",
        "400" => "Bad Request",
        "401" => "Unauthorized",
        "403" => "Forbidden",
        "404" => "Not Found",
        "405" => "Method Not Allowed",
        "409" => "Conflict",
        "422" => "Unprocessable Entity",
        "429" => "Too Many Requests",
        "500" => "Internal Server Error",
        "502" => "Bad Gateway",
        "503" => "Service Unavailable",
        "default" => "Default response",
        _ => "Response",
    }
}
