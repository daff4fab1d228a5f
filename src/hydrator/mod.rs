//! # Field Hydrators
//!
//! Per-entity conversion between external records (database rows, snapshot
//! JSON, XML sections) and typed records.
//!
//! ## Overview
//!
//! Every [`EntityType`] owns a field table that assigns a [`Strategy`] to each
//! property. The [`HydratorRegistry`] builds all tables once at startup and
//! hands out an [`EntityHydrator`] per entity type. Dispatch happens on the
//! enum; names are only parsed at the boundary through
//! [`HydratorRegistry::resolve`].
//!
//! ## Tolerance
//!
//! Hydration is strict: the first attribute that fails to convert aborts the
//! whole entity with [`InventoryError::Hydration`].
//!
//! ```rust
//! use braintacle_inventory::hydrator::{HydratorRegistry, HydratorSettings, RawRecord, RawValue};
//!
//! let registry = HydratorRegistry::new(HydratorSettings::default());
//! let cpu = registry.resolve("cpu").unwrap();
//!
//! let mut raw = RawRecord::new();
//! raw.insert("SPEED".to_string(), RawValue::from("2400 MHz"));
//! let record = cpu.hydrate(&raw).unwrap();
//! assert_eq!(record["nominal_clock"].as_integer(), Some(2400));
//! ```

pub mod entity;
pub mod strategy;
pub mod value;

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::constants::DEFAULT_GROUP_CACHE_EXPIRATION_SECONDS;
use crate::error::{InventoryError, InventoryResult};

pub use entity::{EntityType, FieldMapping, ItemType};
pub use strategy::{FieldError, Strategy};
pub use value::{MacAddress, Platform, RawValue, Value};

/// External record keyed by element name.
pub type RawRecord = BTreeMap<String, RawValue>;

/// Typed record keyed by property name.
pub type Record = BTreeMap<&'static str, Value>;

/// Settings that shape the field tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HydratorSettings {
    /// Offset in seconds applied to group cache expiration timestamps.
    pub group_cache_expiration: i64,
}

impl Default for HydratorSettings {
    fn default() -> Self {
        Self {
            group_cache_expiration: DEFAULT_GROUP_CACHE_EXPIRATION_SECONDS,
        }
    }
}

/// Field table of one entity type.
#[derive(Debug, Clone)]
pub struct EntityHydrator {
    entity: EntityType,
    fields: Vec<FieldMapping>,
}

impl EntityHydrator {
    pub fn entity(&self) -> EntityType {
        self.entity
    }

    /// Fields in table order.
    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    pub fn field_by_element(&self, element: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.element == element)
    }

    pub fn field_by_property(&self, property: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.property == property)
    }

    /// Convert an external record into a typed record.
    ///
    /// Keys without a mapping are skipped. Fields missing from the input are
    /// missing from the output.
    pub fn hydrate(&self, raw: &RawRecord) -> InventoryResult<Record> {
        let mut record = Record::new();
        for (key, raw_value) in raw {
            let Some(mapping) = self.field_by_element(key) else {
                debug!(entity = %self.entity, element = %key, "Ignoring unmapped element");
                continue;
            };
            let value = mapping.strategy.hydrate(raw_value).map_err(|source| {
                InventoryError::hydration(self.entity.as_str(), mapping.property, source)
            })?;
            record.insert(mapping.property, value);
        }
        Ok(record)
    }

    /// Convert a typed record into `(element, raw value)` pairs in table order.
    pub fn extract(&self, record: &Record) -> InventoryResult<Vec<(&'static str, RawValue)>> {
        let mut extracted = Vec::with_capacity(record.len());
        for mapping in &self.fields {
            let Some(value) = record.get(mapping.property) else {
                continue;
            };
            let raw = mapping.strategy.extract(value).map_err(|source| {
                InventoryError::hydration(self.entity.as_str(), mapping.property, source)
            })?;
            extracted.push((mapping.element, raw));
        }
        Ok(extracted)
    }
}

/// Startup table of hydrators for every entity type.
#[derive(Debug, Clone)]
pub struct HydratorRegistry {
    settings: HydratorSettings,
    hydrators: HashMap<EntityType, EntityHydrator>,
}

impl HydratorRegistry {
    pub fn new(settings: HydratorSettings) -> Self {
        let hydrators = EntityType::all()
            .map(|entity| {
                let fields = entity::field_table(entity, settings.group_cache_expiration);
                (entity, EntityHydrator { entity, fields })
            })
            .collect::<HashMap<_, _>>();
        debug!(
            entity_types = hydrators.len(),
            group_cache_expiration = settings.group_cache_expiration,
            "Hydrator registry initialized"
        );
        Self {
            settings,
            hydrators,
        }
    }

    pub fn settings(&self) -> HydratorSettings {
        self.settings
    }

    pub fn get(&self, entity: EntityType) -> &EntityHydrator {
        // Every EntityType is inserted in new()
        &self.hydrators[&entity]
    }

    pub fn item(&self, item: ItemType) -> &EntityHydrator {
        self.get(EntityType::Item(item))
    }

    /// Look up a hydrator by entity type name.
    pub fn resolve(&self, name: &str) -> InventoryResult<&EntityHydrator> {
        let entity = name
            .parse::<EntityType>()
            .map_err(InventoryError::configuration)?;
        Ok(self.get(entity))
    }
}

impl Default for HydratorRegistry {
    fn default() -> Self {
        Self::new(HydratorSettings::default())
    }
}
