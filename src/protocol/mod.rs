//! # Inventory Protocol
//!
//! Documents exchanged with agents and the communication server.
//!
//! - [`InventoryRequest`]: the `REQUEST`/`INVENTORY` document, validated
//!   against `InventoryRequest.rng`
//! - [`InventoryRequestBuilder`]: composes a request from a client
//! - [`read_inventory`]: turns a request back into a [`ClientSnapshot`]
//!
//! [`ClientSnapshot`]: crate::models::ClientSnapshot

pub mod inventory_reader;
pub mod inventory_request;

pub use inventory_reader::read_inventory;
pub use inventory_request::{InventoryRequest, InventoryRequestBuilder};
