//! # Configuration
//!
//! Settings for the inventory exchange core, loaded by [`ConfigManager`]
//! from built-in defaults, an optional TOML file, an optional
//! environment-specific TOML file and `BRAINTACLE_*` environment variables,
//! in that order of precedence (lowest first).
//!
//! ```toml
//! [communication_server]
//! uri = "${BRAINTACLE_SERVER_URI:-http://localhost/ocsinventory}"
//! timeout_ms = 30000
//!
//! [schema]
//! directory = "schemas"
//!
//! [groups]
//! cache_expiration_seconds = 43200
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

mod loader;

pub use loader::ConfigManager;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_GROUP_CACHE_EXPIRATION_SECONDS;
use crate::error::{InventoryError, InventoryResult};
use crate::hydrator::HydratorSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InventoryConfig {
    pub communication_server: CommunicationServerConfig,
    pub schema: SchemaConfig,
    pub groups: GroupConfig,
    pub logging: LoggingConfig,
}

/// Endpoint that ingests uploaded inventory documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicationServerConfig {
    pub uri: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for CommunicationServerConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost/ocsinventory".to_string(),
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Directory holding the `.rng` files of the document types.
    pub directory: PathBuf,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("schemas"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Seconds after cache creation until group membership is revalidated.
    pub cache_expiration_seconds: i64,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            cache_expiration_seconds: DEFAULT_GROUP_CACHE_EXPIRATION_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `braintacle_inventory=debug`.
    pub level: Option<String>,
    pub json: bool,
}

impl InventoryConfig {
    /// Check values that deserialization alone cannot catch.
    pub fn validate(&self) -> InventoryResult<()> {
        let uri = self.communication_server.uri.trim();
        if uri.is_empty() {
            return Err(InventoryError::configuration(
                "communication_server.uri must not be empty",
            ));
        }
        if !(uri.starts_with("http://") || uri.starts_with("https://")) {
            return Err(InventoryError::configuration(format!(
                "communication_server.uri must be an http(s) URI, got {uri}"
            )));
        }
        if self.communication_server.timeout_ms == 0 {
            return Err(InventoryError::configuration(
                "communication_server.timeout_ms must be greater than 0",
            ));
        }
        if self.groups.cache_expiration_seconds < 0 {
            return Err(InventoryError::configuration(
                "groups.cache_expiration_seconds must not be negative",
            ));
        }
        if self.schema.directory.as_os_str().is_empty() {
            return Err(InventoryError::configuration(
                "schema.directory must not be empty",
            ));
        }
        Ok(())
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.communication_server.timeout_ms)
    }

    pub fn hydrator_settings(&self) -> HydratorSettings {
        HydratorSettings {
            group_cache_expiration: self.groups.cache_expiration_seconds,
        }
    }
}
