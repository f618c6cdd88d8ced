//! Structured logging to stderr, as JSON lines or human-readable text.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the logging subsystem.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => init_json_logging(filter, config.with_target),
        LogFormat::Pretty => init_pretty_logging(filter, config.with_target),
    }
}

fn init_json_logging(filter: EnvFilter, with_target: bool) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(with_target)
        .with_current_span(true)
        .with_span_list(false)
        .with_file(false)
        .with_line_number(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

fn init_pretty_logging(filter: EnvFilter, with_target: bool) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(with_target)
        .without_time()
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Standard log event names.
pub mod events {
    /// Input format resolved, explicitly or by detection.
    pub const FORMAT_DETECTED: &str = "format_detected";

    /// A conversion finished and its output was written.
    pub const CONVERSION_COMPLETED: &str = "conversion_completed";

    /// A conversion failed.
    pub const CONVERSION_FAILED: &str = "conversion_failed";

    /// An adapter reported a lossy or dropped mapping.
    pub const ADAPTER_WARNING: &str = "adapter_warning";

    /// A validation run produced error-level findings.
    pub const VALIDATION_FAILURE: &str = "validation_failure";

    /// The caller cancelled an in-flight call.
    pub const CANCELLED: &str = "cancelled";
}

/// Helper macros for structured logging with standard fields.
///
/// These wrap the tracing macros to ensure consistent field naming.
#[macro_export]
macro_rules! log_format_detected {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::FORMAT_DETECTED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_conversion_completed {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::CONVERSION_COMPLETED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_conversion_failed {
    ($($field:tt)*) => {
        tracing::error!(
            event = $crate::logging::events::CONVERSION_FAILED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_adapter_warning {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::ADAPTER_WARNING,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_validation_failure {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::VALIDATION_FAILURE,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_cancelled {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::CANCELLED,
            $($field)*
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be installed once per process, so
    // these tests stick to configuration logic.

    #[test]
    fn log_format_parse() {
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("invalid"), None);
    }

    #[test]
    fn second_init_fails_cleanly() {
        let config = TelemetryConfig::new().with_log_level("off");
        let _ = init_logging(&config);
        let second = init_logging(&config);
        assert!(matches!(second, Err(TelemetryError::LoggingInit(_))));
    }
}
