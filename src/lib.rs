#![allow(clippy::doc_markdown)] // Allow technical terms like DEVICEID, RELAX NG in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Braintacle Inventory
//!
//! Inventory exchange core of the Braintacle asset management console.
//!
//! ## Overview
//!
//! Agents on managed machines upload inventory documents, usually zlib
//! compressed, to an OCS Inventory compatible communication server. This
//! crate handles these documents on the console side:
//!
//! - [`decompress`] - zlib stream decoding
//! - [`xml`] - XML tree and RELAX NG validation
//! - [`document`] - schema validation and filename derivation for documents
//! - [`hydrator`] - per-entity conversion between raw and typed field values
//! - [`protocol`] - inventory request documents, builder and reader
//! - [`export`] - writing `<DEVICEID>.xml` files
//! - [`import`] - forwarding documents to the communication server
//! - [`config`] - layered configuration
//! - [`logging`] - structured logging
//!
//! ## Data Flow
//!
//! ```text
//! upload -> decompress -> InventoryRequest -> force_valid
//!        -> read_inventory -> ClientSnapshot -> Client (hydration)
//! Client -> InventoryRequestBuilder (extraction) -> InventoryRequest -> file / upload
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use braintacle_inventory::config::InventoryConfig;
//! use braintacle_inventory::hydrator::HydratorRegistry;
//! use braintacle_inventory::models::Client;
//! use braintacle_inventory::protocol::InventoryRequestBuilder;
//! use braintacle_inventory::InventoryDocument;
//!
//! # fn example() -> braintacle_inventory::InventoryResult<()> {
//! let config = InventoryConfig::default();
//! let registry = HydratorRegistry::new(config.hydrator_settings());
//!
//! let client = Client::new("Name-2015-06-04-18-22-06");
//! let request = InventoryRequestBuilder::new(&registry, &config.schema.directory).build(&client)?;
//! request.force_valid()?;
//! println!("{}", request.derive_filename()?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod decompress;
pub mod document;
pub mod error;
pub mod export;
pub mod hydrator;
pub mod import;
pub mod logging;
pub mod models;
pub mod protocol;
pub mod xml;

pub use decompress::{decode_if_compressed, decompress, is_compressed};
pub use document::InventoryDocument;
pub use error::{Diagnostic, InventoryError, InventoryResult};
pub use export::{export_client, ExportOptions};
pub use hydrator::{EntityType, HydratorRegistry, HydratorSettings, ItemType};
pub use import::{HttpUploader, InventoryImporter, InventoryUploader};
pub use models::{Client, ClientInventory, ClientSnapshot};
pub use protocol::{read_inventory, InventoryRequest, InventoryRequestBuilder};
pub use xml::{Schema, SchemaCache, XmlDocument};
