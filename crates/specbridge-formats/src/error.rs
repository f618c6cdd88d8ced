use thiserror::Error;

/// Errors produced while reading a document into the IR (E2001–E2007).
#[derive(Debug, Error)]
pub enum ParseError {
    /// E2001: Input bytes are not UTF-8.
    #[error("E2001: input is not valid UTF-8")]
    Encoding,

    /// E2002: JSON/YAML syntax error, with position when the decoder reports one.
    #[error("E2002: syntax error{}: {message}", position(.line, .column))]
    Syntax {
        message: String,
        line: Option<usize>,
        column: Option<usize>,
    },

    /// E2003: The version key names a version this adapter cannot read.
    #[error("E2003: unsupported {format} version: {version}")]
    UnsupportedVersion {
        format: &'static str,
        version: String,
    },

    /// E2004: The version key for this format is missing.
    #[error("E2004: not a {0} document")]
    NotThisFormat(&'static str),

    /// E2005: Structurally invalid document.
    #[error("E2005: invalid document structure: {0}")]
    Structure(String),

    /// E2006: No usable API title.
    #[error("E2006: missing API title")]
    MissingTitle,

    /// E2007: A `$ref` that must be inlined points nowhere.
    #[error("E2007: unresolved $ref: {0}")]
    UnresolvedRef(String),
}

impl ParseError {
    pub(crate) fn structure(message: impl Into<String>) -> Self {
        ParseError::Structure(message.into())
    }
}

fn position(line: &Option<usize>, column: &Option<usize>) -> String {
    match (*line, *column) {
        (Some(l), Some(c)) => format!(" at line {} column {}", l, c),
        (Some(l), None) => format!(" at line {}", l),
        _ => String::new(),
    }
}

/// Errors produced while rendering the IR (E3001–E3004).
#[derive(Debug, Error)]
pub enum WriteError {
    /// E3001: JSON encoding failed.
    #[error("E3001: JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// E3002: YAML encoding failed.
    #[error("E3002: YAML encoding failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// E3003: The IR holds something the target cannot express at all.
    #[error("E3003: cannot express document: {0}")]
    Unrepresentable(String),

    /// E3004: I/O error while rendering.
    #[error("E3004: I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_reports_position() {
        let err = ParseError::Syntax {
            message: "expected value".into(),
            line: Some(3),
            column: Some(7),
        };
        assert_eq!(
            err.to_string(),
            "E2002: syntax error at line 3 column 7: expected value"
        );

        let err = ParseError::Syntax {
            message: "bad".into(),
            line: None,
            column: None,
        };
        assert_eq!(err.to_string(), "E2002: syntax error: bad");
    }
}
