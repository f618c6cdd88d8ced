//! API Blueprint (1A) adapter.
//!
//! Blueprint has no machine grammar; the reader understands the subset the
//! writer emits plus common hand-authored variants, and ignores the rest.

mod parse;
mod property;
mod write;

use specbridge_model::{Api, Warning};
use tracing::debug;

use crate::error::{ParseError, WriteError};
use crate::{ParseOutput, WriteOptions};

/// Value of the `FORMAT` metadata line.
pub(crate) const DEFAULT_FORMAT: &str = "1A";

pub(crate) const DEFAULT_MEDIA_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlueprintAdapter;

impl BlueprintAdapter {
    pub fn parse(&self, input: &[u8]) -> Result<ParseOutput, ParseError> {
        let text = std::str::from_utf8(input).map_err(|_| ParseError::Encoding)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let (mut api, warnings) = parse::read_document(text)?;
        api.ensure_operation_ids();
        debug!(
            format = %api.version,
            resources = api.paths.len(),
            schemas = api.components.schemas.len(),
            "parsed Blueprint document"
        );
        Ok(ParseOutput { api, warnings })
    }

    /// Blueprint is plain text; the encoding option does not apply.
    pub fn write(
        &self,
        api: &Api,
        _options: &WriteOptions,
        out: &mut Vec<u8>,
    ) -> Result<Vec<Warning>, WriteError> {
        let mut warnings = Vec::new();
        let text = write::write_document(api, &mut warnings);
        out.extend_from_slice(text.as_bytes());
        debug!(bytes = text.len(), "wrote Blueprint document");
        Ok(warnings)
    }
}
