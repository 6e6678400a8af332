use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::ValueError;

/// A value as held by a preference store. The shape is whatever the store
/// hands back; the classifier decides what it means.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    String(String),
    Array(Vec<StoredValue>),
    Dictionary(BTreeMap<String, StoredValue>),
    Data(Vec<u8>),
    Number(Number),
    Url(String),
    Date(DateTime<Utc>),
    Other(OpaqueValue),
}

/// Boxed number as stores bridge them: booleans share the box with integers
/// and floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`, as JSON can carry them.
    UInt(u64),
    Float(f32),
    Double(f64),
}

impl Number {
    pub fn is_bool(&self) -> bool {
        matches!(self, Number::Bool(_))
    }

    // Booleans bridge to 0/1 here, floats never do.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Number::Bool(b) => Some(b as i64),
            Number::Int(n) => Some(n),
            Number::UInt(n) => i64::try_from(n).ok(),
            Number::Float(_) | Number::Double(_) => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Bool(b) => b as i64 as f64,
            Number::Int(n) => n as f64,
            Number::UInt(n) => n as f64,
            Number::Float(f) => f as f64,
            Number::Double(d) => d,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Bool(b) => write!(f, "{}", b),
            Number::Int(n) => write!(f, "{}", n),
            Number::UInt(n) => write!(f, "{}", n),
            Number::Float(x) => write!(f, "{}", x),
            Number::Double(x) => write!(f, "{}", x),
        }
    }
}

/// A value of a type the store does not model, kept as its class name and a
/// debug rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueValue {
    pub type_name: String,
    pub repr: String,
}

impl OpaqueValue {
    pub fn new(type_name: impl Into<String>, repr: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            repr: repr.into(),
        }
    }

    pub fn null() -> Self {
        Self::new("null", "null")
    }

    pub fn is_null(&self) -> bool {
        self.type_name == "null"
    }
}

impl From<&str> for StoredValue {
    fn from(s: &str) -> Self {
        StoredValue::String(s.to_string())
    }
}
impl From<String> for StoredValue {
    fn from(s: String) -> Self {
        StoredValue::String(s)
    }
}
impl From<bool> for StoredValue {
    fn from(b: bool) -> Self {
        StoredValue::Number(Number::Bool(b))
    }
}
impl From<i64> for StoredValue {
    fn from(n: i64) -> Self {
        StoredValue::Number(Number::Int(n))
    }
}
impl From<i32> for StoredValue {
    fn from(n: i32) -> Self {
        StoredValue::Number(Number::Int(n as i64))
    }
}
impl From<f32> for StoredValue {
    fn from(x: f32) -> Self {
        StoredValue::Number(Number::Float(x))
    }
}
impl From<f64> for StoredValue {
    fn from(x: f64) -> Self {
        StoredValue::Number(Number::Double(x))
    }
}
impl From<Vec<u8>> for StoredValue {
    fn from(b: Vec<u8>) -> Self {
        StoredValue::Data(b)
    }
}
impl From<DateTime<Utc>> for StoredValue {
    fn from(d: DateTime<Utc>) -> Self {
        StoredValue::Date(d)
    }
}
impl From<Vec<StoredValue>> for StoredValue {
    fn from(v: Vec<StoredValue>) -> Self {
        StoredValue::Array(v)
    }
}
impl From<Vec<&str>> for StoredValue {
    fn from(v: Vec<&str>) -> Self {
        StoredValue::Array(v.into_iter().map(Into::into).collect())
    }
}
impl From<Vec<String>> for StoredValue {
    fn from(v: Vec<String>) -> Self {
        StoredValue::Array(v.into_iter().map(Into::into).collect())
    }
}
impl From<BTreeMap<String, StoredValue>> for StoredValue {
    fn from(m: BTreeMap<String, StoredValue>) -> Self {
        StoredValue::Dictionary(m)
    }
}

impl StoredValue {
    /// Short type label used in listings and logs.
    pub fn type_name(&self) -> &str {
        match self {
            StoredValue::String(_) => "string",
            StoredValue::Array(_) => "array",
            StoredValue::Dictionary(_) => "dictionary",
            StoredValue::Data(_) => "data",
            StoredValue::Number(Number::Bool(_)) => "bool",
            StoredValue::Number(Number::Int(_) | Number::UInt(_)) => "integer",
            StoredValue::Number(Number::Float(_)) => "float",
            StoredValue::Number(Number::Double(_)) => "double",
            StoredValue::Url(_) => "url",
            StoredValue::Date(_) => "date",
            StoredValue::Other(o) => &o.type_name,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StoredValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Natural mapping from parsed JSON: integers stay integers (`u64` beyond
    /// the `i64` range), every other number is a double, `null` becomes
    /// opaque.
    pub fn from_json(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => StoredValue::Other(OpaqueValue::null()),
            serde_json::Value::Bool(b) => StoredValue::Number(Number::Bool(b)),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => StoredValue::Number(Number::Int(i)),
                (None, Some(u)) => StoredValue::Number(Number::UInt(u)),
                (None, None) => {
                    StoredValue::Number(Number::Double(n.as_f64().unwrap_or(f64::NAN)))
                }
            },
            serde_json::Value::String(s) => StoredValue::String(s),
            serde_json::Value::Array(items) => {
                StoredValue::Array(items.into_iter().map(StoredValue::from_json).collect())
            }
            serde_json::Value::Object(map) => StoredValue::Dictionary(
                map.into_iter()
                    .map(|(k, v)| (k, StoredValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Plain JSON form. Fails for anything JSON cannot carry without a
    /// tagging convention: data, URLs, dates, opaque values and non-finite
    /// floats.
    pub fn to_json(&self) -> Result<serde_json::Value, ValueError> {
        Ok(match self {
            StoredValue::String(s) => serde_json::Value::String(s.clone()),
            StoredValue::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(StoredValue::to_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            StoredValue::Dictionary(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json()?);
                }
                serde_json::Value::Object(out)
            }
            StoredValue::Number(Number::Bool(b)) => serde_json::Value::Bool(*b),
            StoredValue::Number(Number::Int(n)) => serde_json::Value::Number((*n).into()),
            StoredValue::Number(Number::UInt(n)) => serde_json::Value::Number((*n).into()),
            StoredValue::Number(n @ (Number::Float(_) | Number::Double(_))) => {
                serde_json::Number::from_f64(n.as_f64())
                    .map(serde_json::Value::Number)
                    .ok_or(ValueError::NonFinite(n.as_f64()))?
            }
            StoredValue::Other(o) if o.is_null() => serde_json::Value::Null,
            other => return Err(ValueError::NotJson(other.type_name().to_string())),
        })
    }
}
