//! Test harnesses for specbridge.
//!
//! Provides the shared fixture paths and `TestConverter`, which runs
//! in-memory conversions and decodes their output for assertions.

pub mod fixtures;
pub mod harness;
#[cfg(test)]
mod regression;

pub use fixtures::{fixture_path, fixtures_dir, read_fixture};
pub use harness::{read_output, scratch_dir, Converted, TestConverter, TestError};
