use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::custom_field::{CustomField, RawCustomField};
use crate::error::InventoryResult;
use crate::hydrator::{EntityType, HydratorRegistry, ItemType, RawRecord, Record};

/// Read access to a client and its collections.
///
/// The request builder only depends on this trait, so a database backed
/// client can be exported the same way as an in-memory [`Client`].
pub trait ClientInventory {
    /// Agent generated identifier, written to `DEVICEID`.
    fn id_string(&self) -> Option<&str>;

    /// Typed properties of the `HARDWARE` section.
    fn system(&self) -> InventoryResult<Record>;

    /// Typed properties of the `BIOS` section.
    fn bios(&self) -> InventoryResult<Record>;

    /// Custom fields converted according to their declared types.
    fn custom_fields(&self) -> InventoryResult<Vec<CustomField>>;

    /// IDs of packages the client has downloaded.
    fn downloaded_packages(&self) -> InventoryResult<Vec<i64>>;

    /// Items of one type, ordered by id ascending.
    fn items(&self, item_type: ItemType) -> InventoryResult<Vec<Item>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub properties: Record,
}

/// In-memory client with hydrated properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Client {
    pub id_string: Option<String>,
    pub system: Record,
    pub bios: Record,
    pub custom_fields: Vec<RawCustomField>,
    pub downloaded_packages: Vec<i64>,
    pub items: BTreeMap<ItemType, Vec<Item>>,
}

impl Client {
    pub fn new(id_string: impl Into<String>) -> Self {
        Self {
            id_string: Some(id_string.into()),
            ..Self::default()
        }
    }

    /// Hydrate a snapshot. Item ids are assigned in snapshot order.
    pub fn from_snapshot(snapshot: &ClientSnapshot, registry: &HydratorRegistry) -> InventoryResult<Self> {
        let mut items = BTreeMap::new();
        for (item_type, records) in &snapshot.items {
            let hydrator = registry.item(*item_type);
            let hydrated = records
                .iter()
                .zip(1..)
                .map(|(raw, id)| -> InventoryResult<Item> {
                    Ok(Item {
                        id,
                        properties: hydrator.hydrate(raw)?,
                    })
                })
                .collect::<InventoryResult<Vec<_>>>()?;
            items.insert(*item_type, hydrated);
        }

        let client = Self {
            id_string: snapshot.id_string.clone(),
            system: registry.get(EntityType::Client).hydrate(&snapshot.system)?,
            bios: registry.get(EntityType::Bios).hydrate(&snapshot.bios)?,
            custom_fields: snapshot.custom_fields.clone(),
            downloaded_packages: snapshot.downloaded_packages.clone(),
            items,
        };
        debug!(
            id_string = ?client.id_string,
            item_types = client.items.len(),
            "Hydrated client from snapshot"
        );
        Ok(client)
    }

    pub fn add_item(&mut self, item_type: ItemType, item: Item) {
        self.items.entry(item_type).or_default().push(item);
    }
}

impl ClientInventory for Client {
    fn id_string(&self) -> Option<&str> {
        self.id_string.as_deref()
    }

    fn system(&self) -> InventoryResult<Record> {
        Ok(self.system.clone())
    }

    fn bios(&self) -> InventoryResult<Record> {
        Ok(self.bios.clone())
    }

    fn custom_fields(&self) -> InventoryResult<Vec<CustomField>> {
        self.custom_fields.iter().map(CustomField::from_raw).collect()
    }

    fn downloaded_packages(&self) -> InventoryResult<Vec<i64>> {
        Ok(self.downloaded_packages.clone())
    }

    fn items(&self, item_type: ItemType) -> InventoryResult<Vec<Item>> {
        let mut items = self.items.get(&item_type).cloned().unwrap_or_default();
        items.sort_by_key(|item| item.id);
        Ok(items)
    }
}

/// Client in its external form: raw values keyed by element name.
///
/// This is what the inventory reader produces and what the CLI reads from
/// and writes to JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSnapshot {
    pub id_string: Option<String>,
    pub system: RawRecord,
    pub bios: RawRecord,
    pub custom_fields: Vec<RawCustomField>,
    pub downloaded_packages: Vec<i64>,
    pub items: BTreeMap<ItemType, Vec<RawRecord>>,
}

impl ClientSnapshot {
    pub fn item_count(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }
}
