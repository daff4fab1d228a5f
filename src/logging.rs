//! # Structured Logging Module
//!
//! Environment-aware structured logging for the decode, validate, build and
//! upload pipeline. Output goes to stderr so that decoded documents written
//! to stdout stay clean.

use std::io::IsTerminal;
use std::sync::OnceLock;

use chrono::Utc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific defaults.
pub fn init_structured_logging() {
    init_with_config(&LoggingConfig::default());
}

/// Initialize structured logging. `RUST_LOG` wins over the configured level,
/// which wins over the environment default. Later calls are no-ops.
pub fn init_with_config(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .or_else(|| config.level.clone())
            .unwrap_or_else(|| get_log_level(&environment));

        let layer = if config.json {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(false)
                .json()
                .with_filter(EnvFilter::new(log_level.clone()))
                .boxed()
        } else {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(std::io::stderr().is_terminal())
                .with_filter(EnvFilter::new(log_level.clone()))
                .boxed()
        };

        // Another subscriber may already be installed by an embedding application
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::debug!(
            environment = %environment,
            level = %log_level,
            json = config.json,
            "Structured logging initialized"
        );
    });
}

/// Get current environment from environment variables
pub(crate) fn get_environment() -> String {
    std::env::var("BRAINTACLE_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "info".to_string(),
        "production" => "warn".to_string(),
        _ => "info".to_string(),
    }
}

/// Log structured data for document operations (decode, validate, build)
pub fn log_document_operation(
    operation: &str,
    device_id: Option<&str>,
    status: &str,
    bytes: Option<usize>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        device_id = device_id,
        status = %status,
        bytes = bytes,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📄 DOCUMENT_OPERATION"
    );
}

/// Log structured data for uploads to the communication server
pub fn log_import_operation(
    operation: &str,
    uri: &str,
    status: &str,
    duration_ms: Option<u64>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        uri = %uri,
        status = %status,
        duration_ms = duration_ms,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📤 IMPORT_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_detection() {
        std::env::set_var("BRAINTACLE_ENV", "test_override");
        let env = get_environment();
        assert_eq!(env, "test_override");
        std::env::remove_var("BRAINTACLE_ENV");
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "info");
        assert_eq!(get_log_level("production"), "warn");
        assert_eq!(get_log_level("unknown"), "info");
    }

    #[test]
    fn test_repeated_initialization_is_harmless() {
        init_structured_logging();
        init_with_config(&LoggingConfig {
            level: Some("debug".to_string()),
            json: true,
        });
        log_document_operation("decode", Some("Name-1"), "ok", Some(10), None);
    }
}
