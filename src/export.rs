//! Export of clients as inventory request files.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::document::InventoryDocument;
use crate::error::InventoryResult;
use crate::hydrator::HydratorRegistry;
use crate::logging::log_document_operation;
use crate::models::ClientInventory;
use crate::protocol::InventoryRequestBuilder;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Refuse to write documents that fail schema validation.
    pub validate: bool,
}

/// Build the document for `client` and write it to `<directory>/<DEVICEID>.xml`.
///
/// The directory must exist and be writable. Returns the written path.
pub fn export_client<C: ClientInventory + ?Sized>(
    client: &C,
    registry: &HydratorRegistry,
    schema_directory: &Path,
    directory: &Path,
    options: ExportOptions,
) -> InventoryResult<PathBuf> {
    let request = InventoryRequestBuilder::new(registry, schema_directory).build(client)?;
    if options.validate {
        request.force_valid()?;
    }
    let path = directory.join(request.derive_filename()?);
    let bytes = request.to_bytes()?;
    std::fs::write(&path, &bytes)?;

    info!(path = %path.display(), "Exported client");
    log_document_operation("export", client.id_string(), "completed", Some(bytes.len()), None);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InventoryError;
    use crate::models::Client;
    use tempfile::TempDir;

    #[test]
    fn test_export_writes_device_id_file() {
        let dir = TempDir::new().unwrap();
        let path = export_client(
            &Client::new("Name-2015-06-04-18-22-06"),
            &HydratorRegistry::default(),
            Path::new("schemas"),
            dir.path(),
            ExportOptions::default(),
        )
        .unwrap();
        assert_eq!(path, dir.path().join("Name-2015-06-04-18-22-06.xml"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("<DEVICEID>Name-2015-06-04-18-22-06</DEVICEID>"));
    }

    #[test]
    fn test_unsafe_device_id_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let err = export_client(
            &Client::new("../escape"),
            &HydratorRegistry::default(),
            Path::new("schemas"),
            dir.path(),
            ExportOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, InventoryError::InvalidFormat(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
