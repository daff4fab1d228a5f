//! Schema-aware document types.
//!
//! [`InventoryDocument`] adds schema validation and filename derivation to
//! an [`XmlDocument`]. Document types that describe a protocol message name
//! their RELAX NG schema through [`InventoryDocument::schema_path`]; the
//! plain tree has none.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::constants::elements;
use crate::error::{Diagnostic, InventoryError, InventoryResult};
use crate::xml::{SchemaCache, XmlDocument};

pub trait InventoryDocument {
    fn xml(&self) -> &XmlDocument;

    /// RELAX NG schema describing valid documents of this type.
    fn schema_path(&self) -> InventoryResult<PathBuf>;

    /// Validate against the schema and return all violations.
    fn validation_report(&self) -> InventoryResult<Vec<Diagnostic>> {
        let path = self.schema_path()?;
        let schema = SchemaCache::global().load(&path)?;
        let diagnostics = schema.validate(self.xml());
        debug!(
            schema = %path.display(),
            violations = diagnostics.len(),
            "Validated document"
        );
        Ok(diagnostics)
    }

    fn is_valid(&self) -> InventoryResult<bool> {
        Ok(self.validation_report()?.is_empty())
    }

    /// Fail with every violation if the document is invalid.
    fn force_valid(&self) -> InventoryResult<()> {
        let diagnostics = self.validation_report()?;
        if diagnostics.is_empty() {
            return Ok(());
        }
        warn!(violations = diagnostics.len(), "Document failed schema validation");
        Err(InventoryError::Validation { diagnostics })
    }

    /// `<DEVICEID>.xml`, safe to use as a file name and in HTTP headers.
    fn derive_filename(&self) -> InventoryResult<String> {
        let xml = self.xml();
        let node = xml.find_first(elements::DEVICEID).ok_or_else(|| {
            InventoryError::logic("DEVICEID element has not been set")
        })?;
        let device_id = xml.text_content(node);
        if !is_valid_device_id(&device_id) {
            return Err(InventoryError::invalid_format(format!(
                "{device_id:?} is not a valid filename part"
            )));
        }
        Ok(format!("{device_id}.xml"))
    }
}

/// Matches `^[A-Za-z0-9_-]+$`.
pub fn is_valid_device_id(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

impl InventoryDocument for XmlDocument {
    fn xml(&self) -> &XmlDocument {
        self
    }

    fn schema_path(&self) -> InventoryResult<PathBuf> {
        Err(InventoryError::logic(
            "XmlDocument has no schema, use a concrete document type",
        ))
    }
}
