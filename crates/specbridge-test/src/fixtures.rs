//! Shared fixture documents under `tests/fixtures/` at the workspace root.

use std::path::PathBuf;

/// Absolute path to the shared fixtures directory.
pub fn fixtures_dir() -> PathBuf {
    // CARGO_MANIFEST_DIR = .../crates/specbridge-test
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("tests")
        .join("fixtures")
}

pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

pub fn read_fixture(name: &str) -> std::io::Result<Vec<u8>> {
    std::fs::read(fixture_path(name))
}
