//! Shared fixtures and builders for integration tests.

#![allow(dead_code)] // Not every test binary uses every helper

pub mod strategies;

use std::path::PathBuf;

use braintacle_inventory::hydrator::{ItemType, Record, Value};
use braintacle_inventory::models::{Client, CustomFieldType, Item, RawCustomField};
use braintacle_inventory::HydratorRegistry;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> Vec<u8> {
    std::fs::read(fixture_path(name)).expect("fixture should exist")
}

pub fn schema_directory() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("schemas")
}

pub fn registry() -> HydratorRegistry {
    HydratorRegistry::default()
}

/// Builder for in-memory clients
pub struct ClientBuilder {
    client: Client,
}

impl ClientBuilder {
    pub fn new(id_string: &str) -> Self {
        Self {
            client: Client::new(id_string),
        }
    }

    pub fn with_system(mut self, property: &'static str, value: Value) -> Self {
        self.client.system.insert(property, value);
        self
    }

    pub fn with_bios(mut self, property: &'static str, value: Value) -> Self {
        self.client.bios.insert(property, value);
        self
    }

    pub fn with_custom_field(mut self, name: &str, field_type: CustomFieldType, value: &str) -> Self {
        self.client.custom_fields.push(RawCustomField {
            name: name.to_string(),
            field_type,
            value: value.into(),
        });
        self
    }

    pub fn with_package(mut self, id: i64) -> Self {
        self.client.downloaded_packages.push(id);
        self
    }

    pub fn with_item(mut self, item_type: ItemType, id: i64, properties: &[(&'static str, Value)]) -> Self {
        let properties: Record = properties.iter().cloned().collect();
        self.client.add_item(item_type, Item { id, properties });
        self
    }

    pub fn build(self) -> Client {
        self.client
    }
}

/// A client that exercises every builder step.
pub fn sample_client() -> Client {
    ClientBuilder::new("Name-2015-06-04-18-22-06")
        .with_system("name", Value::text("Name"))
        .with_system("os_name", Value::text("Debian GNU/Linux"))
        .with_system("cpu_cores", Value::Integer(8))
        .with_system("physical_memory", Value::Integer(16_384))
        .with_bios("manufacturer", Value::text("ACME"))
        .with_bios("serial", Value::text("ABC123"))
        .with_custom_field("TAG", CustomFieldType::Text, "lab")
        .with_custom_field("PURCHASED", CustomFieldType::Date, "2015-06-04")
        .with_package(1_433_442_126)
        .with_item(
            ItemType::Cpu,
            2,
            &[
                ("manufacturer", Value::text("AMD")),
                ("nominal_clock", Value::Integer(3600)),
                ("cores", Value::Integer(8)),
            ],
        )
        .with_item(
            ItemType::Cpu,
            1,
            &[("manufacturer", Value::text("Intel")), ("nominal_clock", Value::Null)],
        )
        .with_item(
            ItemType::NetworkInterface,
            1,
            &[
                ("description", Value::text("eth0")),
                ("mac_address", Value::Mac("00:0C:29:AB:CD:EF".parse().expect("valid MAC"))),
            ],
        )
        .build()
}
