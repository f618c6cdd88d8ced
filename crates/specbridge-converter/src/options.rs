//! Per-call conversion options.

use serde::{Deserialize, Serialize};
use specbridge_formats::WriteOptions;

/// Options for one `convert` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Validate the IR before writing and fail on error-level results.
    pub validate: bool,
    /// Stop validating after the first rule that reports an error.
    pub stop_on_first_error: bool,
    /// Fail if parsing, validation or writing produced any warning.
    /// Checked after rendering, before any output byte is written.
    pub strict: bool,
    pub write: WriteOptions,
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_stop_on_first_error(mut self, stop: bool) -> Self {
        self.stop_on_first_error = stop;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_write_options(mut self, write: WriteOptions) -> Self {
        self.write = write;
        self
    }
}
