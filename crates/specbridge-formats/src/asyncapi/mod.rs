//! AsyncAPI 2.x and 3.0 adapter.
//!
//! Publish/send operations occupy the POST slot of a channel's path item and
//! subscribe/receive operations the GET slot; the writer maps them back the
//! same way.

pub mod protocol;
mod read;
mod write;

use specbridge_model::{Api, Warning};
use tracing::debug;

use crate::document::{self, scalar_string};
use crate::error::{ParseError, WriteError};
use crate::{ParseOutput, WriteOptions};

pub use protocol::{protocol_from_url, resolve_protocol};

pub(crate) const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Response description used when a subscribed message has none.
pub(crate) const SUBSCRIBED_MESSAGE: &str = "Subscribed message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Major {
    /// Channels holding publish/subscribe.
    V2,
    /// Address-only channels plus a separate operations map.
    V3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AsyncApiAdapter;

impl AsyncApiAdapter {
    pub fn parse(&self, input: &[u8]) -> Result<ParseOutput, ParseError> {
        let root = document::decode(input)?;
        let version = root
            .get("asyncapi")
            .and_then(scalar_string)
            .ok_or(ParseError::NotThisFormat("AsyncAPI"))?;
        let major = if version.starts_with("2.") {
            Major::V2
        } else if version.starts_with("3.") {
            Major::V3
        } else {
            return Err(ParseError::UnsupportedVersion {
                format: "AsyncAPI",
                version,
            });
        };
        debug!(version = %version, "parsing AsyncAPI document");

        let mut warnings = Vec::new();
        let mut api = read::read_document(&root, major, &mut warnings)?;
        api.version = version;
        api.ensure_operation_ids();
        Ok(ParseOutput { api, warnings })
    }

    pub fn write(
        &self,
        api: &Api,
        options: &WriteOptions,
        out: &mut Vec<u8>,
    ) -> Result<Vec<Warning>, WriteError> {
        let mut warnings = Vec::new();
        let doc = write::write_document(api, options, &mut warnings);
        document::encode(&doc, options.encoding, out)?;
        debug!(
            version = options.asyncapi_version.as_str(),
            channels = api.paths.len(),
            "wrote AsyncAPI document"
        );
        Ok(warnings)
    }
}
