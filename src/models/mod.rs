pub mod client;
pub mod custom_field;

// Re-export client models for easy access
pub use client::{Client, ClientInventory, ClientSnapshot, Item};
pub use custom_field::{CustomField, CustomFieldType, CustomValue, RawCustomField};
