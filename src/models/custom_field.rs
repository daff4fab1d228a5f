use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, InventoryResult};
use crate::hydrator::RawValue;

/// Declared type of a custom field, as stored in the field configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldType {
    #[default]
    Text,
    Clob,
    Integer,
    Float,
    Date,
}

/// Custom field value as stored, before type conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCustomField {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: CustomFieldType,
    #[serde(default = "null_value")]
    pub value: RawValue,
}

fn null_value() -> RawValue {
    RawValue::Null
}

#[derive(Debug, Clone, PartialEq)]
pub enum CustomValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
}

impl CustomValue {
    /// Text written to `KEYVALUE`, `None` for empty values.
    pub fn to_xml_text(&self) -> Option<String> {
        match self {
            CustomValue::Null => None,
            CustomValue::Text(s) if s.is_empty() => None,
            CustomValue::Text(s) => Some(s.clone()),
            CustomValue::Integer(i) => Some(i.to_string()),
            CustomValue::Float(f) => Some(f.to_string()),
            CustomValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Typed custom field of a client.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomField {
    pub name: String,
    pub value: CustomValue,
}

impl CustomField {
    /// Convert a stored value according to its declared type.
    pub fn from_raw(raw: &RawCustomField) -> InventoryResult<Self> {
        let invalid = |expected: &str| {
            InventoryError::invalid_format(format!(
                "custom field {}: {:?} is not a valid {expected}",
                raw.name,
                raw.value.as_text().unwrap_or_default()
            ))
        };
        let value = match (&raw.value, raw.field_type) {
            (RawValue::Null, _) => CustomValue::Null,
            (RawValue::Text(s), _) if s.is_empty() => CustomValue::Null,
            (value, CustomFieldType::Text | CustomFieldType::Clob) => {
                CustomValue::Text(value.as_text().unwrap_or_default())
            }
            (RawValue::Integer(i), CustomFieldType::Integer) => CustomValue::Integer(*i),
            (RawValue::Text(s), CustomFieldType::Integer) => {
                CustomValue::Integer(s.trim().parse().map_err(|_| invalid("integer"))?)
            }
            (RawValue::Integer(i), CustomFieldType::Float) => CustomValue::Float(*i as f64),
            (RawValue::Text(s), CustomFieldType::Float) => {
                CustomValue::Float(s.trim().parse().map_err(|_| invalid("number"))?)
            }
            (RawValue::Text(s), CustomFieldType::Date) => CustomValue::Date(
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| invalid("date"))?,
            ),
            (RawValue::Integer(_), CustomFieldType::Date) => return Err(invalid("date")),
        };
        Ok(Self {
            name: raw.name.clone(),
            value,
        })
    }
}
