use specbridge_formats::{Format, ParseError, WriteError};
use specbridge_model::Warning;
use specbridge_validator::ValidationError;
use thiserror::Error;

/// Errors produced by a conversion or validation call (E4001–E4008).
#[derive(Debug, Error)]
pub enum ConvertError {
    /// E4001: No adapter registered for the format in that role.
    #[error("E4001: no {role} registered for {format}")]
    UnsupportedFormat { format: Format, role: &'static str },

    /// E4002: The input is malformed for its format.
    #[error("E4002: failed to parse {format} input: {source}")]
    Parse {
        format: Format,
        #[source]
        source: ParseError,
    },

    /// E4003: Pre-write validation found error-level results.
    #[error("E4003: validation failed with {} error(s)", count_errors(.0))]
    Validation(Vec<ValidationError>),

    /// E4004: A pipeline step failed on an otherwise valid document.
    #[error("E4004: {operation} to {format} failed: {source}")]
    ConversionFailed {
        operation: &'static str,
        format: Format,
        #[source]
        source: WriteError,
    },

    /// E4005: Content matched no known format signature.
    #[error("E4005: could not detect the input format")]
    FormatDetection,

    /// E4006: Strict mode and the conversion produced warnings.
    #[error("E4006: strict mode: conversion produced {} warning(s)", .0.len())]
    Strict(Vec<Warning>),

    /// E4007: The caller cancelled the call.
    #[error("E4007: cancelled")]
    Cancelled,

    /// E4008: Reading input or writing output failed.
    #[error("E4008: I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn count_errors(results: &[ValidationError]) -> usize {
    results.iter().filter(|r| r.is_error()).count()
}

/// Coarse classification used for process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FormatDetection,
    Validation,
    Conversion,
}

impl ErrorKind {
    pub fn exit_code(&self) -> u8 {
        match self {
            ErrorKind::Conversion => 1,
            ErrorKind::FormatDetection => 2,
            ErrorKind::Validation => 3,
        }
    }
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::FormatDetection => ErrorKind::FormatDetection,
            ConvertError::Validation(_) | ConvertError::Strict(_) => ErrorKind::Validation,
            _ => ErrorKind::Conversion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_exit_codes() {
        assert_eq!(ConvertError::FormatDetection.kind().exit_code(), 2);
        assert_eq!(ConvertError::Validation(Vec::new()).kind().exit_code(), 3);
        assert_eq!(ConvertError::Strict(Vec::new()).kind().exit_code(), 3);
        assert_eq!(ConvertError::Cancelled.kind().exit_code(), 1);
        assert_eq!(
            ConvertError::UnsupportedFormat {
                format: Format::Blueprint,
                role: "parser"
            }
            .kind(),
            ErrorKind::Conversion
        );
    }

    #[test]
    fn display_carries_codes() {
        let err = ConvertError::Parse {
            format: Format::OpenApi,
            source: ParseError::MissingTitle,
        };
        assert_eq!(
            err.to_string(),
            "E4002: failed to parse openapi input: E2006: missing API title"
        );
        assert_eq!(
            ConvertError::UnsupportedFormat {
                format: Format::AsyncApi,
                role: "writer"
            }
            .to_string(),
            "E4001: no writer registered for asyncapi"
        );
    }
}
