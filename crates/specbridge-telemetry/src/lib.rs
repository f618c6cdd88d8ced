//! Logging infrastructure for specbridge.
//!
//! This crate provides:
//! - Subscriber setup (JSON or human-readable) writing to stderr
//! - Standard event names and `log_*!` macros for consistent fields
//!
//! # Usage
//!
//! ```ignore
//! use specbridge_telemetry::{init_logging, LogFormat, TelemetryConfig};
//!
//! let config = TelemetryConfig::new()
//!     .with_log_level("info")
//!     .with_log_format(LogFormat::Json);
//! init_logging(&config)?;
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::{events, init_logging};

use thiserror::Error;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A log level or format string that cannot be used.
    #[error("invalid logging configuration: {0}")]
    InvalidConfig(String),
}

/// Build a config from raw level/format strings, as read from flags or the
/// environment.
pub fn config_from_strings(level: &str, format: &str) -> Result<TelemetryConfig, TelemetryError> {
    let format = LogFormat::parse(format)
        .ok_or_else(|| TelemetryError::InvalidConfig(format!("unknown log format '{}'", format)))?;
    if level.trim().is_empty() {
        return Err(TelemetryError::InvalidConfig("empty log level".to_string()));
    }
    Ok(TelemetryConfig::new()
        .with_log_level(level)
        .with_log_format(format))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.with_target);
    }

    #[test]
    fn config_builder() {
        let config = TelemetryConfig::new()
            .with_log_level("debug")
            .with_log_format(LogFormat::Json)
            .with_target(true);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.with_target);
    }

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(TelemetryConfig::new().with_verbosity(0).log_level, "warn");
        assert_eq!(TelemetryConfig::new().with_verbosity(1).log_level, "debug");
        assert_eq!(TelemetryConfig::new().with_verbosity(3).log_level, "trace");
    }

    #[test]
    fn config_from_strings_rejects_unknown_format() {
        assert!(config_from_strings("info", "json").is_ok());
        assert!(matches!(
            config_from_strings("info", "xml"),
            Err(TelemetryError::InvalidConfig(_))
        ));
        assert!(config_from_strings(" ", "json").is_err());
    }
}
