//! Value classification and preview rendering.
//!
//! `classify` walks an ordered table of type predicates and takes the first
//! match; the last entry accepts everything, so every stored value lands in
//! exactly one [`Variant`]. `describe` renders a variant for display only and
//! is never used to write values back.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::value::{Number, StoredValue};

/// Semantic classification of a stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    String(String),
    StringList(Vec<String>),
    List(Vec<StoredValue>),
    Map(BTreeMap<String, StoredValue>),
    Binary(Vec<u8>),
    Integer(i64),
    Float32(f32),
    Float64(f64),
    Boolean(bool),
    Url(String),
    Timestamp(DateTime<Utc>),
    Opaque(StoredValue),
}

/// Payload-free discriminant of [`Variant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantKind {
    String,
    StringList,
    List,
    Map,
    Binary,
    Integer,
    Float32,
    Float64,
    Boolean,
    Url,
    Timestamp,
    Opaque,
}

impl VariantKind {
    pub const ALL: [VariantKind; 12] = [
        VariantKind::String,
        VariantKind::StringList,
        VariantKind::List,
        VariantKind::Map,
        VariantKind::Binary,
        VariantKind::Integer,
        VariantKind::Float32,
        VariantKind::Float64,
        VariantKind::Boolean,
        VariantKind::Url,
        VariantKind::Timestamp,
        VariantKind::Opaque,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VariantKind::String => "string",
            VariantKind::StringList => "string-list",
            VariantKind::List => "list",
            VariantKind::Map => "map",
            VariantKind::Binary => "binary",
            VariantKind::Integer => "integer",
            VariantKind::Float32 => "float32",
            VariantKind::Float64 => "float64",
            VariantKind::Boolean => "boolean",
            VariantKind::Url => "url",
            VariantKind::Timestamp => "timestamp",
            VariantKind::Opaque => "opaque",
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VariantKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        VariantKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("unknown kind: {}", s))
    }
}

impl Variant {
    pub fn kind(&self) -> VariantKind {
        match self {
            Variant::String(_) => VariantKind::String,
            Variant::StringList(_) => VariantKind::StringList,
            Variant::List(_) => VariantKind::List,
            Variant::Map(_) => VariantKind::Map,
            Variant::Binary(_) => VariantKind::Binary,
            Variant::Integer(_) => VariantKind::Integer,
            Variant::Float32(_) => VariantKind::Float32,
            Variant::Float64(_) => VariantKind::Float64,
            Variant::Boolean(_) => VariantKind::Boolean,
            Variant::Url(_) => VariantKind::Url,
            Variant::Timestamp(_) => VariantKind::Timestamp,
            Variant::Opaque(_) => VariantKind::Opaque,
        }
    }

    /// The stored form this variant was classified from.
    pub fn to_stored(&self) -> StoredValue {
        match self {
            Variant::String(s) => StoredValue::String(s.clone()),
            Variant::StringList(items) => StoredValue::Array(
                items.iter().cloned().map(StoredValue::String).collect(),
            ),
            Variant::List(items) => StoredValue::Array(items.clone()),
            Variant::Map(map) => StoredValue::Dictionary(map.clone()),
            Variant::Binary(bytes) => StoredValue::Data(bytes.clone()),
            Variant::Integer(n) => StoredValue::Number(Number::Int(*n)),
            Variant::Float32(x) => StoredValue::Number(Number::Float(*x)),
            Variant::Float64(x) => StoredValue::Number(Number::Double(*x)),
            Variant::Boolean(b) => StoredValue::Number(Number::Bool(*b)),
            Variant::Url(u) => StoredValue::Url(u.clone()),
            Variant::Timestamp(d) => StoredValue::Date(*d),
            Variant::Opaque(v) => v.clone(),
        }
    }
}

type Predicate = fn(&StoredValue) -> Option<Variant>;

// Order is significant: string lists must be tried before generic lists, and
// the integer test must reject booleans.
const PREDICATES: [(VariantKind, Predicate); 11] = [
    (VariantKind::String, as_string),
    (VariantKind::StringList, as_string_list),
    (VariantKind::List, as_list),
    (VariantKind::Map, as_map),
    (VariantKind::Binary, as_binary),
    (VariantKind::Integer, as_integer),
    (VariantKind::Float32, as_float32),
    (VariantKind::Float64, as_float64),
    (VariantKind::Boolean, as_boolean),
    (VariantKind::Url, as_url),
    (VariantKind::Timestamp, as_timestamp),
];

/// Classify a stored value. Total: unmatched values become `Opaque`.
pub fn classify(value: &StoredValue) -> Variant {
    PREDICATES
        .iter()
        .find_map(|(_, test)| test(value))
        .unwrap_or_else(|| Variant::Opaque(value.clone()))
}

/// Precedence of the type tests, fallback last.
pub fn precedence() -> impl Iterator<Item = VariantKind> {
    PREDICATES
        .iter()
        .map(|(kind, _)| *kind)
        .chain(std::iter::once(VariantKind::Opaque))
}

fn as_string(v: &StoredValue) -> Option<Variant> {
    v.as_str().map(|s| Variant::String(s.to_string()))
}

fn as_string_list(v: &StoredValue) -> Option<Variant> {
    let StoredValue::Array(items) = v else {
        return None;
    };
    items
        .iter()
        .map(|it| it.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .map(Variant::StringList)
}

fn as_list(v: &StoredValue) -> Option<Variant> {
    match v {
        StoredValue::Array(items) => Some(Variant::List(items.clone())),
        _ => None,
    }
}

fn as_map(v: &StoredValue) -> Option<Variant> {
    match v {
        StoredValue::Dictionary(map) => Some(Variant::Map(map.clone())),
        _ => None,
    }
}

fn as_binary(v: &StoredValue) -> Option<Variant> {
    match v {
        StoredValue::Data(bytes) => Some(Variant::Binary(bytes.clone())),
        _ => None,
    }
}

fn as_integer(v: &StoredValue) -> Option<Variant> {
    match v {
        StoredValue::Number(n) if !n.is_bool() => n.as_i64().map(Variant::Integer),
        _ => None,
    }
}

fn as_float32(v: &StoredValue) -> Option<Variant> {
    match v {
        StoredValue::Number(Number::Float(x)) => Some(Variant::Float32(*x)),
        _ => None,
    }
}

fn as_float64(v: &StoredValue) -> Option<Variant> {
    match v {
        StoredValue::Number(Number::Double(x)) => Some(Variant::Float64(*x)),
        _ => None,
    }
}

fn as_boolean(v: &StoredValue) -> Option<Variant> {
    match v {
        StoredValue::Number(Number::Bool(b)) => Some(Variant::Boolean(*b)),
        _ => None,
    }
}

fn as_url(v: &StoredValue) -> Option<Variant> {
    match v {
        StoredValue::Url(u) => Some(Variant::Url(u.clone())),
        _ => None,
    }
}

fn as_timestamp(v: &StoredValue) -> Option<Variant> {
    match v {
        StoredValue::Date(d) => Some(Variant::Timestamp(*d)),
        _ => None,
    }
}

const RAW_PREVIEW_BYTES: usize = 32;

/// Human-readable preview of a variant.
pub fn describe(variant: &Variant) -> String {
    match variant {
        Variant::String(s) => s.clone(),
        Variant::Binary(bytes) => describe_binary(bytes),
        Variant::Opaque(v) => inline(v),
        Variant::Integer(n) => n.to_string(),
        Variant::Float32(x) => x.to_string(),
        Variant::Float64(x) => x.to_string(),
        Variant::Boolean(b) => b.to_string(),
        Variant::Url(u) => u.clone(),
        Variant::Timestamp(d) => format_timestamp(d),
        other => inline(&other.to_stored()),
    }
}

/// Binary preview: canonical JSON, else UTF-8 text, else a byte summary.
pub fn describe_binary(bytes: &[u8]) -> String {
    if let Some(json) = decode_json_container(bytes)
        && let Ok(s) = serde_json::to_string_pretty(&sorted_keys(json))
    {
        return s;
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    let shown = &bytes[..bytes.len().min(RAW_PREVIEW_BYTES)];
    let ellipsis = if bytes.len() > RAW_PREVIEW_BYTES { "…" } else { "" };
    format!("<{} bytes: 0x{}{}>", bytes.len(), hex::encode(shown), ellipsis)
}

/// Decode bytes as a JSON object or array. Bare scalars are rejected, as
/// strict JSON serializers do.
pub fn decode_json_container(bytes: &[u8]) -> Option<serde_json::Value> {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(v @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => Some(v),
        _ => None,
    }
}

/// Rebuild every object with its keys in ascending order.
pub fn sorted_keys(v: serde_json::Value) -> serde_json::Value {
    match v {
        serde_json::Value::Object(map) => {
            let sorted: BTreeMap<String, serde_json::Value> =
                map.into_iter().map(|(k, v)| (k, sorted_keys(v))).collect();
            serde_json::Value::Object(sorted.into_iter().collect())
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sorted_keys).collect())
        }
        other => other,
    }
}

pub fn format_timestamp(d: &DateTime<Utc>) -> String {
    d.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn inline(v: &StoredValue) -> String {
    let mut out = String::new();
    write_inline(v, &mut out).ok();
    out
}

fn write_inline(v: &StoredValue, out: &mut String) -> fmt::Result {
    match v {
        StoredValue::String(s) => write!(out, "{:?}", s)?,
        StoredValue::Array(items) => {
            out.push('[');
            for (i, it) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_inline(it, out)?;
            }
            out.push(']');
        }
        StoredValue::Dictionary(map) => {
            out.push('{');
            for (i, (k, it)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write!(out, "{:?}: ", k)?;
                write_inline(it, out)?;
            }
            out.push('}');
        }
        StoredValue::Data(bytes) => write!(out, "<{} bytes>", bytes.len())?,
        StoredValue::Number(n) => write!(out, "{}", n)?,
        StoredValue::Url(u) => out.push_str(u),
        StoredValue::Date(d) => out.push_str(&format_timestamp(d)),
        StoredValue::Other(o) => write!(out, "<{}: {}>", o.type_name, o.repr)?,
    }
    Ok(())
}
