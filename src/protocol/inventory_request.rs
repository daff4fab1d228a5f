//! Inventory request documents and the builder that composes them from a
//! client.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::{elements, INVENTORY_QUERY, INVENTORY_REQUEST_SCHEMA};
use crate::decompress::decode_if_compressed;
use crate::document::InventoryDocument;
use crate::error::{InventoryError, InventoryResult};
use crate::hydrator::{EntityHydrator, EntityType, HydratorRegistry, ItemType, RawValue, Record};
use crate::logging::log_document_operation;
use crate::models::ClientInventory;
use crate::xml::{NodeId, XmlDocument};

/// `REQUEST` document with `QUERY` set to `INVENTORY`.
#[derive(Debug, Clone)]
pub struct InventoryRequest {
    document: XmlDocument,
    schema_directory: PathBuf,
}

impl InventoryRequest {
    /// Empty document whose schema lives in `schema_directory`.
    pub fn new(schema_directory: impl Into<PathBuf>) -> Self {
        Self::from_document(XmlDocument::new(), schema_directory)
    }

    pub fn from_document(document: XmlDocument, schema_directory: impl Into<PathBuf>) -> Self {
        Self {
            document,
            schema_directory: schema_directory.into(),
        }
    }

    /// Parse an uploaded document, compressed or not.
    pub fn from_bytes(input: &[u8], schema_directory: impl Into<PathBuf>) -> InventoryResult<Self> {
        let xml = decode_if_compressed(input)?;
        let document = XmlDocument::parse(&xml)?;
        Ok(Self::from_document(document, schema_directory))
    }

    pub fn load(path: impl AsRef<Path>, schema_directory: impl Into<PathBuf>) -> InventoryResult<Self> {
        let input = std::fs::read(path)?;
        Self::from_bytes(&input, schema_directory)
    }

    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    pub fn into_document(self) -> XmlDocument {
        self.document
    }

    pub fn schema_directory(&self) -> &Path {
        &self.schema_directory
    }

    /// Text of the first `DEVICEID` element.
    pub fn device_id(&self) -> Option<String> {
        self.document
            .find_first(elements::DEVICEID)
            .map(|node| self.document.text_content(node))
    }

    pub fn to_bytes(&self) -> InventoryResult<Vec<u8>> {
        self.document.to_bytes()
    }
}

impl InventoryDocument for InventoryRequest {
    fn xml(&self) -> &XmlDocument {
        &self.document
    }

    fn schema_path(&self) -> InventoryResult<PathBuf> {
        Ok(self.schema_directory.join(INVENTORY_REQUEST_SCHEMA))
    }
}

/// Composes an [`InventoryRequest`] from a client.
///
/// `HARDWARE` and `BIOS` children are sorted by element name and the
/// sections are omitted when empty. Every item gets its own section
/// element with fields in table order. Empty values are never written.
#[derive(Debug, Clone)]
pub struct InventoryRequestBuilder<'a> {
    registry: &'a HydratorRegistry,
    schema_directory: PathBuf,
}

impl<'a> InventoryRequestBuilder<'a> {
    pub fn new(registry: &'a HydratorRegistry, schema_directory: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            schema_directory: schema_directory.into(),
        }
    }

    /// Build the whole document or fail without a partial result.
    pub fn build<C: ClientInventory + ?Sized>(&self, client: &C) -> InventoryResult<InventoryRequest> {
        let device_id = client
            .id_string()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| InventoryError::logic("client has no IdString"))?;

        let mut doc = XmlDocument::new();
        let root = doc.create_element(elements::REQUEST);
        doc.set_root(root);
        let node = doc.create_element_with_content(elements::DEVICEID, device_id);
        doc.append_child(root, node);
        let node = doc.create_element_with_content(elements::QUERY, INVENTORY_QUERY);
        doc.append_child(root, node);
        let content = doc.create_element(elements::CONTENT);
        doc.append_child(root, content);

        self.append_sorted_section(
            &mut doc,
            content,
            elements::HARDWARE,
            self.registry.get(EntityType::Client),
            &client.system()?,
        )?;
        self.append_sorted_section(
            &mut doc,
            content,
            elements::BIOS,
            self.registry.get(EntityType::Bios),
            &client.bios()?,
        )?;

        for field in client.custom_fields()? {
            let Some(value) = field.value.to_xml_text() else {
                continue;
            };
            let info = doc.create_element(elements::ACCOUNTINFO);
            let node = doc.create_element_with_content(elements::KEYNAME, &field.name);
            doc.append_child(info, node);
            let node = doc.create_element_with_content(elements::KEYVALUE, &value);
            doc.append_child(info, node);
            doc.append_child(content, info);
        }

        let packages = client.downloaded_packages()?;
        if !packages.is_empty() {
            let download = doc.create_element(elements::DOWNLOAD);
            let history = doc.create_element(elements::HISTORY);
            for id in packages {
                let package = doc.create_element(elements::PACKAGE);
                doc.set_attribute(package, elements::ID, &id.to_string());
                doc.append_child(history, package);
            }
            doc.append_child(download, history);
            doc.append_child(content, download);
        }

        let mut item_count = 0;
        for item_type in ItemType::ALL {
            let hydrator = self.registry.item(item_type);
            for item in client.items(item_type)? {
                let section = doc.create_element(item_type.section());
                for (element, value) in hydrator.extract(&item.properties)? {
                    append_value(&mut doc, section, element, &value);
                }
                doc.append_child(content, section);
                item_count += 1;
            }
        }

        log_document_operation(
            "build",
            Some(device_id),
            "completed",
            None,
            Some(&format!("{item_count} items")),
        );
        Ok(InventoryRequest::from_document(doc, self.schema_directory.clone()))
    }

    fn append_sorted_section(
        &self,
        doc: &mut XmlDocument,
        content: NodeId,
        name: &str,
        hydrator: &EntityHydrator,
        record: &Record,
    ) -> InventoryResult<()> {
        let mut values = hydrator.extract(record)?;
        values.sort_by(|a, b| a.0.cmp(b.0));

        let section = doc.create_element(name);
        let mut written = 0;
        for (element, value) in &values {
            if append_value(doc, section, element, value) {
                written += 1;
            }
        }
        if written > 0 {
            doc.append_child(content, section);
        } else {
            debug!(section = name, "Omitting empty section");
        }
        Ok(())
    }
}

/// Append `<element>value</element>` unless the value is empty.
fn append_value(doc: &mut XmlDocument, parent: NodeId, element: &str, value: &RawValue) -> bool {
    if value.is_empty() {
        return false;
    }
    let Some(text) = value.as_text() else {
        return false;
    };
    let node = doc.create_element_with_content(element, &text);
    doc.append_child(parent, node);
    true
}
