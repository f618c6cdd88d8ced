//! Format adapters for OpenAPI (2.0/3.0/3.1), AsyncAPI (2.x/3.0) and
//! API Blueprint (1A).
//!
//! Each adapter parses bytes into the [`specbridge_model::Api`] IR and writes
//! the IR back out, dispatching on the document version internally. Adapters
//! never call each other. Non-fatal losses are reported as
//! [`specbridge_model::Warning`]s alongside the result.

pub mod asyncapi;
pub mod blueprint;
pub mod document;
pub mod error;
pub mod openapi;
pub mod refs;
pub mod schema;
pub mod warnings;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use specbridge_model::{Api, Warning};

pub use asyncapi::AsyncApiAdapter;
pub use blueprint::BlueprintAdapter;
pub use document::Encoding;
pub use error::{ParseError, WriteError};
pub use openapi::OpenApiAdapter;

/// The three supported document families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    OpenApi,
    AsyncApi,
    Blueprint,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::OpenApi, Format::AsyncApi, Format::Blueprint];

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::OpenApi => "openapi",
            Format::AsyncApi => "asyncapi",
            Format::Blueprint => "blueprint",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openapi" | "swagger" | "oas" => Ok(Format::OpenApi),
            "asyncapi" | "async" => Ok(Format::AsyncApi),
            "blueprint" | "apib" | "api-blueprint" => Ok(Format::Blueprint),
            other => Err(format!("unknown format '{}'", other)),
        }
    }
}

/// Target OpenAPI version on write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenApiVersion {
    #[serde(rename = "2.0")]
    V2_0,
    #[default]
    #[serde(rename = "3.0")]
    V3_0,
    #[serde(rename = "3.1")]
    V3_1,
}

impl OpenApiVersion {
    /// The version string written into the document.
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenApiVersion::V2_0 => "2.0",
            OpenApiVersion::V3_0 => "3.0.3",
            OpenApiVersion::V3_1 => "3.1.0",
        }
    }
}

impl FromStr for OpenApiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2" | "2.0" => Ok(Self::V2_0),
            "3" | "3.0" | "3.0.0" | "3.0.1" | "3.0.2" | "3.0.3" => Ok(Self::V3_0),
            "3.1" | "3.1.0" | "3.1.1" => Ok(Self::V3_1),
            other => Err(format!("unsupported OpenAPI version '{}'", other)),
        }
    }
}

/// Target AsyncAPI version on write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AsyncApiVersion {
    #[serde(rename = "2.6")]
    V2_6,
    #[default]
    #[serde(rename = "3.0")]
    V3_0,
}

impl AsyncApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            AsyncApiVersion::V2_6 => "2.6.0",
            AsyncApiVersion::V3_0 => "3.0.0",
        }
    }
}

impl FromStr for AsyncApiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "2" || s.starts_with("2.") {
            Ok(Self::V2_6)
        } else if s == "3" || s.starts_with("3.0") {
            Ok(Self::V3_0)
        } else {
            Err(format!("unsupported AsyncAPI version '{}'", s))
        }
    }
}

/// Per-call write configuration. Built once per invocation and passed down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    pub openapi_version: OpenApiVersion,
    pub asyncapi_version: AsyncApiVersion,
    /// Target transport protocol for pub/sub servers; `"auto"` sniffs the URL.
    pub protocol: Option<String>,
    pub encoding: Encoding,
    /// Keep the null marker on OpenAPI 3.0/2.0 targets as `nullable` /
    /// `x-nullable`. Off by default: those targets get plain `type: T`.
    #[serde(default)]
    pub nullable_keywords: bool,
}

impl WriteOptions {
    pub fn with_openapi_version(mut self, version: OpenApiVersion) -> Self {
        self.openapi_version = version;
        self
    }

    pub fn with_asyncapi_version(mut self, version: AsyncApiVersion) -> Self {
        self.asyncapi_version = version;
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_nullable_keywords(mut self, enabled: bool) -> Self {
        self.nullable_keywords = enabled;
        self
    }
}

/// A parsed document plus everything lost on the way in.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub api: Api,
    pub warnings: Vec<Warning>,
}

/// Closed dispatch over the three adapters.
#[derive(Debug, Clone)]
pub enum Adapter {
    OpenApi(OpenApiAdapter),
    AsyncApi(AsyncApiAdapter),
    Blueprint(BlueprintAdapter),
}

impl Adapter {
    /// The stock adapter for `format`.
    pub fn for_format(format: Format) -> Self {
        match format {
            Format::OpenApi => Adapter::OpenApi(OpenApiAdapter),
            Format::AsyncApi => Adapter::AsyncApi(AsyncApiAdapter),
            Format::Blueprint => Adapter::Blueprint(BlueprintAdapter),
        }
    }

    pub fn format(&self) -> Format {
        match self {
            Adapter::OpenApi(_) => Format::OpenApi,
            Adapter::AsyncApi(_) => Format::AsyncApi,
            Adapter::Blueprint(_) => Format::Blueprint,
        }
    }

    pub fn parse(&self, input: &[u8]) -> Result<ParseOutput, ParseError> {
        match self {
            Adapter::OpenApi(a) => a.parse(input),
            Adapter::AsyncApi(a) => a.parse(input),
            Adapter::Blueprint(a) => a.parse(input),
        }
    }

    /// Render `api` into `out`, returning the warnings for anything dropped.
    pub fn write(
        &self,
        api: &Api,
        options: &WriteOptions,
        out: &mut Vec<u8>,
    ) -> Result<Vec<Warning>, WriteError> {
        match self {
            Adapter::OpenApi(a) => a.write(api, options, out),
            Adapter::AsyncApi(a) => a.write(api, options, out),
            Adapter::Blueprint(a) => a.write(api, options, out),
        }
    }
}

/// Sniff the format of a document from its content.
///
/// Blueprint is recognized by a `FORMAT:` metadata line or a leading
/// Markdown heading; JSON/YAML documents by their root version key.
pub fn detect_format(input: &[u8]) -> Option<Format> {
    let text = std::str::from_utf8(input).ok()?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let first = text.lines().map(str::trim).find(|l| !l.is_empty())?;

    if first.to_ascii_uppercase().starts_with("FORMAT:") {
        return Some(Format::Blueprint);
    }

    if let Ok(root) = document::decode(text.as_bytes()) {
        if let Some(obj) = root.as_object() {
            if obj.contains_key("openapi") || obj.contains_key("swagger") {
                return Some(Format::OpenApi);
            }
            if obj.contains_key("asyncapi") {
                return Some(Format::AsyncApi);
            }
        }
    }

    if first.starts_with("# ") {
        return Some(Format::Blueprint);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_aliases() {
        assert_eq!("OpenAPI".parse::<Format>(), Ok(Format::OpenApi));
        assert_eq!("swagger".parse::<Format>(), Ok(Format::OpenApi));
        assert_eq!("apib".parse::<Format>(), Ok(Format::Blueprint));
        assert!("raml".parse::<Format>().is_err());
    }

    #[test]
    fn detects_each_format() {
        assert_eq!(
            detect_format(b"openapi: 3.0.3\ninfo:\n  title: T\n"),
            Some(Format::OpenApi)
        );
        assert_eq!(
            detect_format(br#"{"swagger": "2.0", "info": {"title": "T"}}"#),
            Some(Format::OpenApi)
        );
        assert_eq!(
            detect_format(b"asyncapi: 2.6.0\ninfo:\n  title: T\n"),
            Some(Format::AsyncApi)
        );
        assert_eq!(detect_format(b"FORMAT: 1A\n\n# T\n"), Some(Format::Blueprint));
        assert_eq!(detect_format(b"# Only a heading\n"), Some(Format::Blueprint));
    }

    #[test]
    fn detection_fails_on_unknown_content() {
        assert_eq!(detect_format(b"title: nothing here\n"), None);
        assert_eq!(detect_format(b""), None);
        assert_eq!(detect_format(&[0xff, 0xfe]), None);
    }

    #[test]
    fn version_parsing() {
        assert_eq!("3.1".parse::<OpenApiVersion>(), Ok(OpenApiVersion::V3_1));
        assert_eq!("2.0".parse::<OpenApiVersion>(), Ok(OpenApiVersion::V2_0));
        assert_eq!("2.6.0".parse::<AsyncApiVersion>(), Ok(AsyncApiVersion::V2_6));
        assert!("4.0".parse::<AsyncApiVersion>().is_err());
    }

    #[test]
    fn adapter_reports_its_format() {
        for format in Format::ALL {
            assert_eq!(Adapter::for_format(format).format(), format);
        }
    }
}
