//! Error types for the inventory exchange core.
//!

use std::fmt;
use thiserror::Error;

use crate::hydrator::strategy::FieldError;

/// One schema violation, reported with the line of the offending node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based source line, 0 for nodes that were built in memory.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Renders diagnostics as one `line <n>: <message>` line per violation.
pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Error)]
pub enum InventoryError {
    /// Input is not a valid compressed stream.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Validation of XML document failed:\n{}", format_diagnostics(.diagnostics))]
    Validation { diagnostics: Vec<Diagnostic> },

    /// Programmatic misuse, e.g. deriving a filename from an empty document.
    #[error("Logic error: {0}")]
    Logic(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Hydration error for {entity}.{field}: {source}")]
    Hydration {
        entity: String,
        field: String,
        #[source]
        source: FieldError,
    },

    #[error("Import error: {0}")]
    Import(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InventoryError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn logic(message: impl Into<String>) -> Self {
        Self::Logic(message.into())
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat(message.into())
    }

    pub fn import(message: impl Into<String>) -> Self {
        Self::Import(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml(message.into())
    }

    pub fn hydration(entity: impl Into<String>, field: impl Into<String>, source: FieldError) -> Self {
        Self::Hydration {
            entity: entity.into(),
            field: field.into(),
            source,
        }
    }

    /// Check whether the error was caused by client input and only the
    /// current request needs to be rejected.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            InventoryError::Decode(_)
            | InventoryError::Validation { .. }
            | InventoryError::InvalidFormat(_)
            | InventoryError::Hydration { .. }
            | InventoryError::Import(_)
            | InventoryError::Xml(_) => true,
            InventoryError::Io(_) => true,
            // Caller bugs and broken deployments must surface loudly
            InventoryError::Logic(_) | InventoryError::Configuration(_) => false,
        }
    }
}

impl From<config::ConfigError> for InventoryError {
    fn from(error: config::ConfigError) -> Self {
        InventoryError::Configuration(error.to_string())
    }
}

impl From<serde_json::Error> for InventoryError {
    fn from(error: serde_json::Error) -> Self {
        InventoryError::InvalidFormat(format!("JSON serialization error: {error}"))
    }
}

pub type InventoryResult<T> = std::result::Result<T, InventoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_violation() {
        let err = InventoryError::Validation {
            diagnostics: vec![
                Diagnostic {
                    line: 3,
                    message: "Did not expect element FOO there".to_string(),
                },
                Diagnostic {
                    line: 7,
                    message: "Element QUERY failed to validate content".to_string(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Validation of XML document failed:\n\
             line 3: Did not expect element FOO there\n\
             line 7: Element QUERY failed to validate content"
        );
    }

    #[test]
    fn test_recoverability() {
        assert!(InventoryError::decode("bad header").is_recoverable());
        assert!(InventoryError::import("Upload error: 500").is_recoverable());
        assert!(!InventoryError::logic("schema not defined").is_recoverable());
        assert!(!InventoryError::configuration("empty uri").is_recoverable());
    }
}
