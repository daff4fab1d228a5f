//! Field value strategies.
//!
//! Each strategy converts a [`RawValue`] into a typed [`Value`] (hydration)
//! and back (extraction). Both directions are defined independently. Some
//! strategies are lossy on purpose: `MemorySize`, `ClockSpeed` and `SlotSize`
//! only normalize during hydration and extract values unchanged.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

use super::value::{MacAddress, Platform, RawValue, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Attribute level failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("not an integer: {0:?}")]
    InvalidInteger(String),
    #[error("invalid platform: {0:?}")]
    InvalidPlatform(String),
    #[error("invalid MAC address: {0:?}")]
    InvalidMacAddress(String),
    #[error("invalid date: {0:?}")]
    InvalidDate(String),
    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(i64),
    #[error("unexpected {found} value, expected {expected}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Identity. Integers are turned into their decimal text.
    Text,
    /// Integer or digit string, null stays null.
    Integer,
    /// `0` means "unknown" and becomes null.
    MemorySize,
    /// Leading digits of strings like `800 MHz`, zero becomes null.
    ClockSpeed,
    /// Non-numeric input becomes 0 so that sizes can be summed up.
    SlotSize,
    /// UNIX timestamp with an offset in seconds added on hydration.
    Timestamp { offset: i64 },
    /// `WINDOWS`, `LINUX` and `MacOSX` tags.
    Platform,
    /// `*` stands for "all values" and is represented as null.
    RegistryValue,
    MacAddress,
    Date,
    DateTime,
}

impl Strategy {
    pub fn hydrate(&self, raw: &RawValue) -> Result<Value, FieldError> {
        match self {
            Strategy::Text => Ok(match raw {
                RawValue::Null => Value::Null,
                RawValue::Integer(i) => Value::Text(i.to_string()),
                RawValue::Text(s) => Value::Text(s.clone()),
            }),
            Strategy::Integer => hydrate_integer(raw),
            Strategy::MemorySize => Ok(match raw {
                RawValue::Integer(0) => Value::Null,
                RawValue::Text(s) if s == "0" => Value::Null,
                other => passthrough(other),
            }),
            Strategy::ClockSpeed => Ok(match raw {
                RawValue::Null => Value::Null,
                RawValue::Integer(0) => Value::Null,
                RawValue::Integer(i) => Value::Integer(*i),
                RawValue::Text(s) => match leading_integer(s) {
                    Some(0) | None => Value::Null,
                    Some(i) => Value::Integer(i),
                },
            }),
            Strategy::SlotSize => Ok(match raw {
                RawValue::Integer(i) => Value::Integer(*i),
                RawValue::Text(s) => Value::Integer(s.trim().parse().unwrap_or(0)),
                RawValue::Null => Value::Integer(0),
            }),
            Strategy::Timestamp { offset } => {
                let seconds = match raw {
                    RawValue::Null => return Ok(Value::Null),
                    RawValue::Text(s) if s.is_empty() => return Ok(Value::Null),
                    RawValue::Text(s) => parse_integer(s)?,
                    RawValue::Integer(i) => *i,
                };
                if seconds == 0 {
                    return Ok(Value::Null);
                }
                let shifted = seconds
                    .checked_add(*offset)
                    .ok_or(FieldError::TimestampOutOfRange(seconds))?;
                DateTime::from_timestamp(shifted, 0)
                    .map(Value::Timestamp)
                    .ok_or(FieldError::TimestampOutOfRange(shifted))
            }
            Strategy::Platform => match raw {
                RawValue::Text(s) => Platform::from_external_tag(s)
                    .map(Value::Platform)
                    .ok_or_else(|| FieldError::InvalidPlatform(s.clone())),
                RawValue::Null => Err(FieldError::InvalidPlatform(String::new())),
                RawValue::Integer(i) => Err(FieldError::InvalidPlatform(i.to_string())),
            },
            Strategy::RegistryValue => Ok(match raw {
                RawValue::Text(s) if s == "*" => Value::Null,
                other => passthrough(other),
            }),
            Strategy::MacAddress => match raw {
                RawValue::Null => Ok(Value::Null),
                RawValue::Text(s) if s.is_empty() => Ok(Value::Null),
                RawValue::Text(s) => s
                    .parse::<MacAddress>()
                    .map(Value::Mac)
                    .map_err(|_| FieldError::InvalidMacAddress(s.clone())),
                RawValue::Integer(i) => Err(FieldError::InvalidMacAddress(i.to_string())),
            },
            Strategy::Date => match raw {
                RawValue::Null => Ok(Value::Null),
                RawValue::Text(s) if s.is_empty() => Ok(Value::Null),
                RawValue::Text(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                    .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
                    .map(Value::Date)
                    .map_err(|_| FieldError::InvalidDate(s.clone())),
                RawValue::Integer(i) => Err(FieldError::InvalidDate(i.to_string())),
            },
            Strategy::DateTime => match raw {
                RawValue::Null => Ok(Value::Null),
                RawValue::Text(s) if s.is_empty() => Ok(Value::Null),
                RawValue::Text(s) => NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
                    .map(Value::DateTime)
                    .map_err(|_| FieldError::InvalidDate(s.clone())),
                RawValue::Integer(i) => Err(FieldError::InvalidDate(i.to_string())),
            },
        }
    }

    pub fn extract(&self, value: &Value) -> Result<RawValue, FieldError> {
        match self {
            Strategy::Text => Ok(match value {
                Value::Null => RawValue::Null,
                Value::Integer(i) => RawValue::Text(i.to_string()),
                Value::Text(s) => RawValue::Text(s.clone()),
                other => return Err(unexpected("string", other)),
            }),
            Strategy::Integer => match value {
                Value::Null => Ok(RawValue::Null),
                Value::Integer(i) => Ok(RawValue::Integer(*i)),
                Value::Text(s) => parse_integer(s).map(RawValue::Integer),
                other => Err(unexpected("integer", other)),
            },
            // No reverse transformation for the normalizing strategies.
            Strategy::MemorySize | Strategy::ClockSpeed | Strategy::SlotSize => match value {
                Value::Null => Ok(RawValue::Null),
                Value::Integer(i) => Ok(RawValue::Integer(*i)),
                Value::Text(s) => Ok(RawValue::Text(s.clone())),
                other => Err(unexpected("integer", other)),
            },
            Strategy::Timestamp { offset } => match value {
                Value::Null => Ok(RawValue::Integer(0)),
                Value::Timestamp(ts) => Ok(RawValue::Integer(ts.timestamp() - offset)),
                other => Err(unexpected("timestamp", other)),
            },
            Strategy::Platform => match value {
                Value::Platform(p) => Ok(RawValue::text(p.external_tag())),
                Value::Text(s) => s
                    .parse::<Platform>()
                    .map(|p| RawValue::text(p.external_tag()))
                    .map_err(|_| FieldError::InvalidPlatform(s.clone())),
                Value::Null => Err(FieldError::InvalidPlatform(String::new())),
                other => Err(unexpected("platform", other)),
            },
            Strategy::RegistryValue => match value {
                Value::Null => Ok(RawValue::text("*")),
                Value::Text(s) if s.is_empty() => Ok(RawValue::text("*")),
                Value::Text(s) => Ok(RawValue::Text(s.clone())),
                Value::Integer(i) => Ok(RawValue::Text(i.to_string())),
                other => Err(unexpected("string", other)),
            },
            Strategy::MacAddress => match value {
                Value::Null => Ok(RawValue::Null),
                Value::Mac(mac) => Ok(RawValue::Text(mac.to_string())),
                other => Err(unexpected("mac address", other)),
            },
            Strategy::Date => match value {
                Value::Null => Ok(RawValue::Null),
                Value::Date(date) => Ok(RawValue::Text(date.format(DATE_FORMAT).to_string())),
                other => Err(unexpected("date", other)),
            },
            Strategy::DateTime => match value {
                Value::Null => Ok(RawValue::Null),
                Value::DateTime(dt) => Ok(RawValue::Text(dt.format(DATETIME_FORMAT).to_string())),
                other => Err(unexpected("datetime", other)),
            },
        }
    }
}

fn passthrough(raw: &RawValue) -> Value {
    match raw {
        RawValue::Null => Value::Null,
        RawValue::Integer(i) => Value::Integer(*i),
        RawValue::Text(s) => Value::Text(s.clone()),
    }
}

fn hydrate_integer(raw: &RawValue) -> Result<Value, FieldError> {
    match raw {
        RawValue::Null => Ok(Value::Null),
        RawValue::Integer(i) => Ok(Value::Integer(*i)),
        RawValue::Text(s) => parse_integer(s).map(Value::Integer),
    }
}

/// Strict integer parsing: optional minus sign followed by digits only.
fn parse_integer(s: &str) -> Result<i64, FieldError> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldError::InvalidInteger(s.to_string()));
    }
    s.parse().map_err(|_| FieldError::InvalidInteger(s.to_string()))
}

fn leading_integer(s: &str) -> Option<i64> {
    let trimmed = s.trim_start();
    let end = trimmed
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

fn unexpected(expected: &'static str, found: &Value) -> FieldError {
    FieldError::UnexpectedType {
        expected,
        found: found.type_name(),
    }
}
