use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::classify::{Variant, VariantKind, decode_json_container, format_timestamp};
use crate::error::ParseError;
use crate::store::{decode_value, encode_value};
use crate::value::{Number, StoredValue};

/// What the edit delegate is asked to edit.
#[derive(Debug, Clone, PartialEq)]
pub enum EditTarget {
    Value(Variant),
    /// Binary entry whose bytes hold a JSON object, edited as a structure.
    JsonObject(BTreeMap<String, StoredValue>),
}

impl EditTarget {
    /// Pick the target for a classified value. Binary payloads that decode to
    /// a JSON object are offered as the object itself.
    pub fn for_variant(variant: &Variant) -> Self {
        if let Variant::Binary(bytes) = variant
            && let Some(serde_json::Value::Object(map)) = decode_json_container(bytes)
        {
            return EditTarget::JsonObject(
                map.into_iter()
                    .map(|(k, v)| (k, StoredValue::from_json(v)))
                    .collect(),
            );
        }
        EditTarget::Value(variant.clone())
    }

    /// Kind used to parse text typed for this target.
    pub fn kind(&self) -> VariantKind {
        match self {
            EditTarget::Value(v) => v.kind(),
            EditTarget::JsonObject(_) => VariantKind::Map,
        }
    }
}

/// A selected entry, ready to hand to an edit delegate.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub key: String,
    pub target: EditTarget,
}

/// Value handed back by an edit delegate.
#[derive(Debug, Clone, PartialEq)]
pub enum EditedValue {
    Value(StoredValue),
    /// Edited JSON structure for a binary-JSON entry; re-serialized to bytes
    /// on commit.
    Json(BTreeMap<String, StoredValue>),
}

impl From<StoredValue> for EditedValue {
    fn from(v: StoredValue) -> Self {
        EditedValue::Value(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Written,
    /// Binary-JSON edit written back; the snapshot is left as it was.
    WrittenWithoutRefresh,
    /// Edited structure could not be serialized; nothing was written.
    Discarded,
}

/// Type-specific editing surface. Returning `None` means the user cancelled.
pub trait EditDelegate {
    fn edit(&mut self, selection: &Selection) -> Option<EditedValue>;
}

impl<F> EditDelegate for F
where
    F: FnMut(&Selection) -> Option<EditedValue>,
{
    fn edit(&mut self, selection: &Selection) -> Option<EditedValue> {
        self(selection)
    }
}

/// Nudge an edited value toward the kind of the entry it replaces. Only
/// obvious conversions are made; anything else passes through unchanged.
pub fn coerce(kind: VariantKind, value: StoredValue) -> StoredValue {
    match (kind, value) {
        (VariantKind::Integer, StoredValue::Number(n @ (Number::Float(_) | Number::Double(_))))
            if is_integral(n.as_f64()) =>
        {
            StoredValue::Number(Number::Int(n.as_f64() as i64))
        }
        (VariantKind::Float32, StoredValue::Number(Number::Int(n))) => {
            StoredValue::Number(Number::Float(n as f32))
        }
        (VariantKind::Float32, StoredValue::Number(Number::Double(x))) => {
            StoredValue::Number(Number::Float(x as f32))
        }
        (VariantKind::Float64, StoredValue::Number(Number::Int(n))) => {
            StoredValue::Number(Number::Double(n as f64))
        }
        (VariantKind::Float64, StoredValue::Number(Number::Float(x))) => {
            StoredValue::Number(Number::Double(x as f64))
        }
        (VariantKind::Boolean, StoredValue::Number(Number::Int(n @ (0 | 1)))) => {
            StoredValue::Number(Number::Bool(n == 1))
        }
        (VariantKind::Url, StoredValue::String(s)) => StoredValue::Url(s),
        (VariantKind::String, StoredValue::Url(u)) => StoredValue::String(u),
        (VariantKind::Timestamp, StoredValue::String(s)) => match parse_timestamp(&s) {
            Some(d) => StoredValue::Date(d),
            None => StoredValue::String(s),
        },
        (_, other) => other,
    }
}

fn is_integral(x: f64) -> bool {
    x.is_finite() && x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Parse user-typed text into an edited value for `target`.
pub fn parse_for(target: &EditTarget, text: &str) -> Result<EditedValue, ParseError> {
    match target {
        EditTarget::JsonObject(_) => parse_json_object(text),
        EditTarget::Value(v) => parse_kind(v.kind(), text).map(EditedValue::Value),
    }
}

/// Parse text as a value of `kind`.
pub fn parse_kind(kind: VariantKind, text: &str) -> Result<StoredValue, ParseError> {
    let name = kind.name();
    let trimmed = text.trim();
    match kind {
        VariantKind::String => Ok(StoredValue::String(text.to_string())),
        VariantKind::StringList => {
            if trimmed.starts_with('[') {
                let items: Vec<String> = serde_json::from_str(trimmed).map_err(|e| {
                    ParseError::Json {
                        kind: name,
                        message: e.to_string(),
                    }
                })?;
                Ok(StoredValue::from(items))
            } else {
                Ok(StoredValue::from(
                    text.lines().map(str::to_string).collect::<Vec<_>>(),
                ))
            }
        }
        VariantKind::List => match parse_tagged(name, trimmed)? {
            v @ StoredValue::Array(_) => Ok(v),
            _ => Err(ParseError::invalid(name, text)),
        },
        VariantKind::Map => match parse_tagged(name, trimmed)? {
            v @ StoredValue::Dictionary(_) => Ok(v),
            _ => Err(ParseError::invalid(name, text)),
        },
        VariantKind::Opaque => parse_tagged(name, trimmed),
        VariantKind::Binary => {
            let digits: String = trimmed
                .trim_start_matches("0x")
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            hex::decode(&digits)
                .map(StoredValue::Data)
                .map_err(|_| ParseError::invalid(name, text))
        }
        VariantKind::Integer => trimmed
            .parse::<i64>()
            .map(StoredValue::from)
            .map_err(|_| ParseError::invalid(name, text)),
        VariantKind::Float32 => trimmed
            .parse::<f32>()
            .map(StoredValue::from)
            .map_err(|_| ParseError::invalid(name, text)),
        VariantKind::Float64 => trimmed
            .parse::<f64>()
            .map(StoredValue::from)
            .map_err(|_| ParseError::invalid(name, text)),
        VariantKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(StoredValue::from(true)),
            "false" | "no" | "0" => Ok(StoredValue::from(false)),
            _ => Err(ParseError::invalid(name, text)),
        },
        VariantKind::Url => {
            if has_scheme(trimmed) {
                Ok(StoredValue::Url(trimmed.to_string()))
            } else {
                Err(ParseError::invalid(name, text))
            }
        }
        VariantKind::Timestamp => parse_timestamp(trimmed)
            .map(StoredValue::Date)
            .ok_or_else(|| ParseError::invalid(name, text)),
    }
}

fn parse_tagged(kind: &'static str, text: &str) -> Result<StoredValue, ParseError> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(decode_value)
        .map_err(|e| ParseError::Json {
            kind,
            message: e.to_string(),
        })
}

fn parse_json_object(text: &str) -> Result<EditedValue, ParseError> {
    let kind = "JSON object";
    match serde_json::from_str::<serde_json::Value>(text.trim()) {
        Ok(serde_json::Value::Object(map)) => Ok(EditedValue::Json(
            map.into_iter()
                .map(|(k, v)| (k, StoredValue::from_json(v)))
                .collect(),
        )),
        Ok(_) => Err(ParseError::invalid(kind, text)),
        Err(e) => Err(ParseError::Json {
            kind,
            message: e.to_string(),
        }),
    }
}

fn has_scheme(s: &str) -> bool {
    match s.split_once(':') {
        Some((scheme, rest)) => {
            !rest.is_empty()
                && scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

// One item per line only works when no item is empty or spans lines, and the
// text cannot be mistaken for the JSON array form.
fn lines_round_trip(items: &[String]) -> bool {
    items
        .iter()
        .all(|it| !it.is_empty() && !it.contains(['\n', '\r']))
        && !items
            .first()
            .is_some_and(|first| first.trim_start().starts_with('['))
}

/// Text form of a target, suitable as the initial contents of an editor and
/// accepted back by [`parse_for`].
pub fn edit_text(target: &EditTarget) -> String {
    match target {
        EditTarget::JsonObject(map) => {
            let value = StoredValue::Dictionary(map.clone());
            let json = value.to_json().unwrap_or_else(|_| encode_value(&value));
            serde_json::to_string_pretty(&json).unwrap_or_default()
        }
        EditTarget::Value(variant) => match variant {
            Variant::String(s) | Variant::Url(s) => s.clone(),
            Variant::StringList(items) if lines_round_trip(items) => items.join("\n"),
            Variant::StringList(items) => serde_json::to_string(items).unwrap_or_default(),
            Variant::List(_) | Variant::Map(_) | Variant::Opaque(_) => {
                serde_json::to_string_pretty(&encode_value(&variant.to_stored()))
                    .unwrap_or_default()
            }
            Variant::Binary(bytes) => hex::encode(bytes),
            Variant::Integer(n) => n.to_string(),
            Variant::Float32(x) => x.to_string(),
            Variant::Float64(x) => x.to_string(),
            Variant::Boolean(b) => b.to_string(),
            Variant::Timestamp(d) => format_timestamp(d),
        },
    }
}
