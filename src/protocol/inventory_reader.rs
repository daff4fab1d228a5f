//! Inventory document to [`ClientSnapshot`].
//!
//! Values are taken as text and left to the hydrators. Empty elements are
//! skipped, unknown sections are ignored.

use tracing::debug;

use crate::constants::elements;
use crate::error::{InventoryError, InventoryResult};
use crate::hydrator::{ItemType, RawRecord, RawValue};
use crate::models::{ClientSnapshot, CustomFieldType, RawCustomField};
use crate::xml::{NodeId, XmlDocument};

pub fn read_inventory(doc: &XmlDocument) -> InventoryResult<ClientSnapshot> {
    let root = doc
        .root()
        .ok_or_else(|| InventoryError::invalid_format("document has no root element"))?;
    if doc.name(root) != Some(elements::REQUEST) {
        return Err(InventoryError::invalid_format(format!(
            "expected {} root element, found {}",
            elements::REQUEST,
            doc.name(root).unwrap_or_default()
        )));
    }

    let mut snapshot = ClientSnapshot {
        id_string: doc
            .first_child_element(root, elements::DEVICEID)
            .map(|node| doc.text_content(node).trim().to_string())
            .filter(|id| !id.is_empty()),
        ..ClientSnapshot::default()
    };

    let Some(content) = doc.first_child_element(root, elements::CONTENT) else {
        return Ok(snapshot);
    };

    for section in doc.element_children(content) {
        let name = doc.name(section).unwrap_or_default();
        match name {
            elements::HARDWARE => snapshot.system.extend(read_fields(doc, section)),
            elements::BIOS => snapshot.bios.extend(read_fields(doc, section)),
            elements::ACCOUNTINFO => {
                if let Some(field) = read_account_info(doc, section) {
                    snapshot.custom_fields.push(field);
                }
            }
            elements::DOWNLOAD => read_download_history(doc, section, &mut snapshot.downloaded_packages)?,
            other => match ItemType::from_section(other) {
                Some(item_type) => snapshot
                    .items
                    .entry(item_type)
                    .or_default()
                    .push(read_fields(doc, section)),
                None => debug!(section = other, "Ignoring unknown section"),
            },
        }
    }

    debug!(
        device_id = ?snapshot.id_string,
        items = snapshot.item_count(),
        "Read inventory document"
    );
    Ok(snapshot)
}

fn read_fields(doc: &XmlDocument, section: NodeId) -> RawRecord {
    doc.element_children(section)
        .filter_map(|child| {
            let value = doc.text_content(child);
            if value.is_empty() {
                return None;
            }
            let name = doc.name(child)?;
            Some((name.to_string(), RawValue::Text(value)))
        })
        .collect()
}

fn read_account_info(doc: &XmlDocument, info: NodeId) -> Option<RawCustomField> {
    let name = doc
        .first_child_element(info, elements::KEYNAME)
        .map(|node| doc.text_content(node))
        .filter(|name| !name.is_empty())?;
    let value = doc
        .first_child_element(info, elements::KEYVALUE)
        .map(|node| doc.text_content(node))
        .filter(|value| !value.is_empty())?;
    Some(RawCustomField {
        name,
        field_type: CustomFieldType::Text,
        value: RawValue::Text(value),
    })
}

fn read_download_history(doc: &XmlDocument, download: NodeId, packages: &mut Vec<i64>) -> InventoryResult<()> {
    let Some(history) = doc.first_child_element(download, elements::HISTORY) else {
        return Ok(());
    };
    for package in doc.element_children(history) {
        let Some(id) = doc.attribute(package, elements::ID) else {
            continue;
        };
        let id = id.trim().parse::<i64>().map_err(|_| {
            InventoryError::invalid_format(format!(
                "line {}: invalid package ID {id:?}",
                doc.line(package)
            ))
        })?;
        packages.push(id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<REQUEST>
  <DEVICEID>Name-2015-06-04-18-22-06</DEVICEID>
  <QUERY>INVENTORY</QUERY>
  <CONTENT>
    <HARDWARE>
      <NAME>Name</NAME>
      <WORKGROUP></WORKGROUP>
    </HARDWARE>
    <ACCOUNTINFO>
      <KEYNAME>TAG</KEYNAME>
      <KEYVALUE>office</KEYVALUE>
    </ACCOUNTINFO>
    <DOWNLOAD>
      <HISTORY>
        <PACKAGE ID="1433442126"/>
      </HISTORY>
    </DOWNLOAD>
    <CPUS>
      <SPEED>2400</SPEED>
    </CPUS>
    <CPUS>
      <SPEED>1200</SPEED>
    </CPUS>
    <USBDEVICES>
      <NAME>ignored</NAME>
    </USBDEVICES>
  </CONTENT>
</REQUEST>
"#;

    #[test]
    fn test_read_inventory() {
        let doc = XmlDocument::parse_str(DOCUMENT).unwrap();
        let snapshot = read_inventory(&doc).unwrap();
        assert_eq!(snapshot.id_string.as_deref(), Some("Name-2015-06-04-18-22-06"));
        assert_eq!(snapshot.system.len(), 1);
        assert_eq!(snapshot.system["NAME"], RawValue::text("Name"));
        assert!(snapshot.bios.is_empty());
        assert_eq!(snapshot.custom_fields.len(), 1);
        assert_eq!(snapshot.custom_fields[0].name, "TAG");
        assert_eq!(snapshot.downloaded_packages, vec![1_433_442_126]);
        assert_eq!(snapshot.items[&ItemType::Cpu].len(), 2);
        assert_eq!(snapshot.items[&ItemType::Cpu][1]["SPEED"], RawValue::text("1200"));
        assert_eq!(snapshot.item_count(), 2);
    }

    #[test]
    fn test_wrong_root_element() {
        let doc = XmlDocument::parse_str("<INVENTORY/>").unwrap();
        assert!(matches!(read_inventory(&doc), Err(InventoryError::InvalidFormat(_))));
    }

    #[test]
    fn test_invalid_package_id() {
        let doc = XmlDocument::parse_str(
            "<REQUEST><CONTENT><DOWNLOAD><HISTORY><PACKAGE ID=\"x\"/></HISTORY></DOWNLOAD></CONTENT></REQUEST>",
        )
        .unwrap();
        let err = read_inventory(&doc).unwrap_err();
        assert!(err.to_string().contains("invalid package ID"));
    }
}
