//! Raw and typed field values.
//!
//! [`RawValue`] is the external form of a scalar as it appears in a database
//! row, a JSON snapshot or an XML text node. [`Value`] is the typed form that
//! the entity model works with.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// External scalar representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Integer(i64),
    Text(String),
}

impl RawValue {
    pub fn text(value: impl Into<String>) -> Self {
        RawValue::Text(value.into())
    }

    /// Text content as written into an XML element. `None` for null.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Null => None,
            RawValue::Integer(i) => Some(i.to_string()),
            RawValue::Text(s) => Some(s.clone()),
        }
    }

    /// Null and the empty string are both "no value".
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Integer(_) => false,
            RawValue::Text(s) => s.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Integer(_) => "integer",
            RawValue::Text(_) => "string",
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

/// Typed field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<Utc>),
    Mac(MacAddress),
    Platform(Platform),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Text(_) => "string",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Timestamp(_) => "timestamp",
            Value::Mac(_) => "mac address",
            Value::Platform(_) => "platform",
        }
    }
}

/// Package target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Linux,
    Mac,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Windows, Platform::Linux, Platform::Mac];

    /// Internal tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Mac => "mac",
        }
    }

    /// Tag used by the database and the agent protocol.
    pub fn external_tag(self) -> &'static str {
        match self {
            Platform::Windows => "WINDOWS",
            Platform::Linux => "LINUX",
            Platform::Mac => "MacOSX",
        }
    }

    pub fn from_external_tag(tag: &str) -> Option<Self> {
        match tag {
            "WINDOWS" => Some(Platform::Windows),
            "LINUX" => Some(Platform::Linux),
            "MacOSX" => Some(Platform::Mac),
            _ => None,
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "windows" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            "mac" => Ok(Platform::Mac),
            other => Err(format!("invalid platform: {other}")),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 48 bit hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = String;

    /// Accepts `:` or `-` separated hex octets in either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(format!("invalid MAC address: {s}"));
        }
        let mut octets = [0u8; 6];
        for (octet, part) in octets.iter_mut().zip(&parts) {
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(format!("invalid MAC address: {s}"));
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| format!("invalid MAC address: {s}"))?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_address_parsing_and_display() {
        let mac: MacAddress = "00:0c:29:ab:CD:ef".parse().unwrap();
        assert_eq!(mac.to_string(), "00:0C:29:AB:CD:EF");
        let dashed: MacAddress = "00-0C-29-AB-CD-EF".parse().unwrap();
        assert_eq!(mac, dashed);
        assert!("00:0C:29:AB:CD".parse::<MacAddress>().is_err());
        assert!("00:0C:29:AB:CD:XY".parse::<MacAddress>().is_err());
        assert!("000:C:29:AB:CD:EF".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_raw_value_emptiness() {
        assert!(RawValue::Null.is_empty());
        assert!(RawValue::text("").is_empty());
        assert!(!RawValue::text("0").is_empty());
        assert!(!RawValue::Integer(0).is_empty());
        assert_eq!(RawValue::Integer(42).as_text().as_deref(), Some("42"));
    }

    #[test]
    fn test_raw_value_json_forms() {
        let values: Vec<RawValue> = serde_json::from_str(r#"[null, 12, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![RawValue::Null, RawValue::Integer(12), RawValue::text("x")]
        );
    }
}
