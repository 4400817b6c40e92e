//! Schema-less property payloads.
//!
//! Extracted entities carry an open property bag; each value is one of a
//! small set of primitive shapes so it can be sent to the graph store as a
//! query parameter without further conversion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered property bag (key order is stable, which keeps hashing and
/// serialization deterministic).
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A single property value.
///
/// JSON input is decoded without a tag and strings always stay `String`, so
/// text is stored exactly as it arrived. `Timestamp` is only built from typed
/// values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    #[serde(skip_deserializing)]
    Timestamp(DateTime<Utc>),
    String(String),
    Vector(Vec<f32>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::Boolean(b) => serde_json::Value::from(*b),
            PropertyValue::Integer(i) => serde_json::Value::from(*i),
            PropertyValue::Float(f) => serde_json::Value::from(*f),
            PropertyValue::Timestamp(ts) => serde_json::Value::from(ts.to_rfc3339()),
            PropertyValue::String(s) => serde_json::Value::from(s.as_str()),
            PropertyValue::Vector(v) => serde_json::Value::from(v.clone()),
        }
    }
}

/// Plain text rendering, used for identity keys and embedding text.
impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Boolean(b) => write!(f, "{b}"),
            PropertyValue::Integer(i) => write!(f, "{i}"),
            PropertyValue::Float(x) => write!(f, "{x}"),
            PropertyValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Vector(v) => {
                let parts: Vec<String> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(","))
            }
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropertyValue::Timestamp(value)
    }
}

impl From<Vec<f32>> for PropertyValue {
    fn from(value: Vec<f32>) -> Self {
        PropertyValue::Vector(value)
    }
}

/// Property bag as a JSON object, suitable for a query parameter.
pub fn properties_to_json(properties: &PropertyMap) -> serde_json::Map<String, serde_json::Value> {
    properties
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect()
}

/// Keep the values that fit a `PropertyValue`; nulls and nested objects are
/// dropped.
pub fn decode_properties(map: serde_json::Map<String, serde_json::Value>) -> PropertyMap {
    map.into_iter()
        .filter_map(|(key, value)| match serde_json::from_value::<PropertyValue>(value) {
            Ok(v) => Some((key, v)),
            Err(_) => {
                tracing::debug!(property = %key, "Dropping property with unsupported value");
                None
            }
        })
        .collect()
}

/// `deserialize_with` adapter for property bags read from JSON. A missing or
/// `null` bag is empty.
pub fn deserialize_properties<'de, D>(deserializer: D) -> Result<PropertyMap, D::Error>
where
    D: Deserializer<'de>,
{
    let map = Option::<serde_json::Map<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(map.map(decode_properties).unwrap_or_default())
}
