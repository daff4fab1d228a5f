//! XML tree and RELAX NG validation.

pub mod document;
pub mod relaxng;

pub use document::{Attribute, Element, Node, NodeId, NodeKind, XmlDocument, MAX_DEPTH};
pub use relaxng::{Schema, SchemaCache};
