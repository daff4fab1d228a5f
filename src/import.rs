//! # Inventory Import
//!
//! Forwards inventory documents to the communication server, which performs
//! the actual ingestion. The body is sent as is, compressed or not.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Url};
use tracing::{debug, info};

use crate::config::InventoryConfig;
use crate::constants::{COMPRESSED_CONTENT_TYPE, LOCAL_UPLOAD_USER_AGENT};
use crate::error::{InventoryError, InventoryResult};
use crate::logging::{log_error, log_import_operation};

/// Transport for uploaded documents.
#[async_trait]
pub trait InventoryUploader: Send + Sync {
    async fn upload(&self, body: Vec<u8>) -> InventoryResult<()>;
}

/// Uploads to the communication server over HTTP.
pub struct HttpUploader {
    client: Client,
    uri: Url,
    timeout: Duration,
}

impl std::fmt::Debug for HttpUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpUploader")
            .field("host", &self.uri.host_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpUploader {
    pub fn new(uri: &str, timeout: Duration) -> InventoryResult<Self> {
        let uri = Url::parse(uri).map_err(|e| {
            InventoryError::configuration(format!("Invalid communication server URI '{uri}': {e}"))
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InventoryError::configuration(format!("Failed to create HTTP client: {e}")))?;
        debug!(uri = %uri, timeout_ms = timeout.as_millis() as u64, "Created HTTP uploader");
        Ok(Self { client, uri, timeout })
    }

    pub fn from_config(config: &InventoryConfig) -> InventoryResult<Self> {
        Self::new(&config.communication_server.uri, config.upload_timeout())
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }
}

#[async_trait]
impl InventoryUploader for HttpUploader {
    async fn upload(&self, body: Vec<u8>) -> InventoryResult<()> {
        let response = self
            .client
            .post(self.uri.clone())
            .header(USER_AGENT, LOCAL_UPLOAD_USER_AGENT)
            .header(CONTENT_TYPE, COMPRESSED_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| InventoryError::import(format!("Upload error: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(InventoryError::import(format!(
            "Upload error: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )))
    }
}

/// Imports inventory files and buffers through an [`InventoryUploader`].
#[derive(Debug)]
pub struct InventoryImporter<U> {
    uploader: U,
}

impl<U: InventoryUploader> InventoryImporter<U> {
    pub fn new(uploader: U) -> Self {
        Self { uploader }
    }

    pub async fn import_file(&self, path: impl AsRef<Path>) -> InventoryResult<()> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|e| {
            InventoryError::import(format!("Could not read {}: {e}", path.display()))
        })?;
        self.import_bytes(data).await
    }

    pub async fn import_bytes(&self, data: Vec<u8>) -> InventoryResult<()> {
        let size = data.len();
        let started = Instant::now();
        match self.uploader.upload(data).await {
            Ok(()) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                info!(bytes = size, duration_ms, "Inventory uploaded");
                log_import_operation("upload", "communication_server", "completed", Some(duration_ms), None);
                Ok(())
            }
            Err(e) => {
                log_error("import", "upload", &e.to_string(), None);
                Err(e)
            }
        }
    }
}

impl InventoryImporter<HttpUploader> {
    pub fn from_config(config: &InventoryConfig) -> InventoryResult<Self> {
        Ok(Self::new(HttpUploader::from_config(config)?))
    }
}
