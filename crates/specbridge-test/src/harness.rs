//! TestConverter: in-memory conversion harness.

use std::io::Cursor;
use std::path::Path;

use serde_json::Value;
use tempfile::TempDir;
use thiserror::Error;

use specbridge_converter::{
    Context, ConvertError, ConvertOptions, ConvertReport, Converter, Format, ValidationReport,
};

use crate::fixtures::read_fixture;

/// Errors from TestConverter operations.
#[derive(Debug, Error)]
pub enum TestError {
    #[error("conversion failed: {0}")]
    Convert(#[from] ConvertError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("output is not UTF-8")]
    NotUtf8,

    #[error("output is not JSON or YAML: {0}")]
    Decode(String),
}

/// A finished conversion: the report plus the bytes written.
#[derive(Debug)]
pub struct Converted {
    pub report: ConvertReport,
    pub output: Vec<u8>,
}

impl Converted {
    pub fn text(&self) -> Result<&str, TestError> {
        std::str::from_utf8(&self.output).map_err(|_| TestError::NotUtf8)
    }

    /// Decode JSON or YAML output into a JSON value tree.
    pub fn document(&self) -> Result<Value, TestError> {
        if let Ok(value) = serde_json::from_slice(&self.output) {
            return Ok(value);
        }
        serde_yaml::from_slice(&self.output).map_err(|e| TestError::Decode(e.to_string()))
    }
}

/// Runs conversions against a default converter, in memory.
#[derive(Debug, Default)]
pub struct TestConverter {
    converter: Converter,
}

impl TestConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_converter(converter: Converter) -> Self {
        Self { converter }
    }

    pub fn convert_bytes(
        &self,
        input: &[u8],
        from: Option<Format>,
        to: Format,
        options: &ConvertOptions,
    ) -> Result<Converted, TestError> {
        let mut output = Vec::new();
        let report = self.converter.convert(
            &Context::new(),
            &mut Cursor::new(input),
            &mut output,
            from,
            to,
            options,
        )?;
        Ok(Converted { report, output })
    }

    /// Convert a shared fixture, detecting its format.
    pub fn convert_fixture(
        &self,
        name: &str,
        to: Format,
        options: &ConvertOptions,
    ) -> Result<Converted, TestError> {
        self.convert_bytes(&read_fixture(name)?, None, to, options)
    }

    pub fn validate_fixture(&self, name: &str) -> Result<ValidationReport, TestError> {
        let input = read_fixture(name)?;
        Ok(self
            .converter
            .validate(&Context::new(), &mut Cursor::new(input), None)?)
    }

    /// Convert `input`, then convert the result again to the same format.
    pub fn rewrite_twice(
        &self,
        input: &[u8],
        format: Format,
        options: &ConvertOptions,
    ) -> Result<(Converted, Converted), TestError> {
        let once = self.convert_bytes(input, None, format, options)?;
        let twice = self.convert_bytes(&once.output, None, format, options)?;
        Ok((once, twice))
    }
}

/// A scratch directory for CLI output files.
pub fn scratch_dir() -> Result<TempDir, TestError> {
    Ok(TempDir::new()?)
}

/// Read a file written by a test run.
pub fn read_output(path: &Path) -> Result<String, TestError> {
    let bytes = std::fs::read(path)?;
    String::from_utf8(bytes).map_err(|_| TestError::NotUtf8)
}
