// File-backed preference domain.
// - One JSON object per file, one member per preference key.
// - Strings, booleans, integers, doubles, arrays and dictionaries use plain
//   JSON; other types use `{"$type": ...}` tagged objects so the file
//   round-trips without losing the stored type.
// - Writes land in memory; `synchronize` flushes them.
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::backend::Backend;
use crate::classify::format_timestamp;
use crate::config::ensure_parent_dir;
use crate::error::StoreError;
use crate::value::{Number, OpaqueValue, StoredValue};

const TYPE_TAG: &str = "$type";

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, StoredValue>,
    dirty: bool,
}

impl FileStore {
    /// Open a store file. A missing or blank file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = load_values(&path)?;
        debug!(path = %path.display(), entries = values.len(), "opened store");
        Ok(Self {
            path,
            values,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Discard in-memory changes and re-read the file.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        self.values = load_values(&self.path)?;
        self.dirty = false;
        Ok(())
    }

    /// Write the in-memory dictionary to disk.
    pub fn synchronize(&mut self) -> Result<(), StoreError> {
        ensure_parent_dir(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        let mut text = serde_json::to_string_pretty(&self.to_json()).map_err(|source| {
            StoreError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        text.push('\n');
        fs::write(&self.path, text).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.dirty = false;
        info!(path = %self.path.display(), entries = self.values.len(), "store synchronized");
        Ok(())
    }

    /// The whole store in its on-disk JSON form.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect(),
        )
    }
}

impl Backend for FileStore {
    fn read(&self) -> BTreeMap<String, StoredValue> {
        self.values.clone()
    }
    fn write(&mut self, key: &str, value: StoredValue) {
        self.values.insert(key.to_string(), value);
        self.dirty = true;
    }
    fn remove(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.dirty = true;
        }
    }
}

fn load_values(path: &Path) -> Result<BTreeMap<String, StoredValue>, StoreError> {
    let data = match fs::read(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if data.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(BTreeMap::new());
    }
    let root: serde_json::Value =
        serde_json::from_slice(&data).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    let serde_json::Value::Object(map) = root else {
        return Err(StoreError::NotAnObject(path.to_path_buf()));
    };
    Ok(map.into_iter().map(|(k, v)| (k, decode_value(v))).collect())
}

/// On-disk JSON form of a single value.
pub fn encode_value(v: &StoredValue) -> serde_json::Value {
    match v {
        StoredValue::String(s) => json!(s),
        StoredValue::Array(items) => {
            serde_json::Value::Array(items.iter().map(encode_value).collect())
        }
        StoredValue::Dictionary(map) => {
            let obj: serde_json::Map<String, serde_json::Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect();
            if map.contains_key(TYPE_TAG) {
                json!({ TYPE_TAG: "dictionary", "value": obj })
            } else {
                serde_json::Value::Object(obj)
            }
        }
        StoredValue::Data(bytes) => json!({ TYPE_TAG: "data", "hex": hex::encode(bytes) }),
        StoredValue::Number(Number::Bool(b)) => json!(b),
        StoredValue::Number(Number::Int(n)) => json!(n),
        StoredValue::Number(Number::UInt(n)) => json!(n),
        StoredValue::Number(Number::Double(x)) if x.is_finite() => json!(x),
        StoredValue::Number(Number::Double(x)) => {
            json!({ TYPE_TAG: "double", "value": non_finite_name(*x) })
        }
        StoredValue::Number(Number::Float(x)) => {
            let value = if x.is_finite() {
                json!(*x as f64)
            } else {
                json!(non_finite_name(*x as f64))
            };
            json!({ TYPE_TAG: "float", "value": value })
        }
        StoredValue::Url(u) => json!({ TYPE_TAG: "url", "value": u }),
        StoredValue::Date(d) => json!({ TYPE_TAG: "date", "value": format_timestamp(d) }),
        StoredValue::Other(o) if o.is_null() => serde_json::Value::Null,
        StoredValue::Other(o) => {
            json!({ TYPE_TAG: "object", "class": o.type_name, "repr": o.repr })
        }
    }
}

/// Inverse of [`encode_value`]. A tagged object that does not match its tag's
/// shape is kept as an ordinary dictionary.
pub fn decode_value(v: serde_json::Value) -> StoredValue {
    match v {
        serde_json::Value::Object(map) => match decode_tagged(&map) {
            Some(tagged) => tagged,
            None => StoredValue::Dictionary(
                map.into_iter().map(|(k, v)| (k, decode_value(v))).collect(),
            ),
        },
        serde_json::Value::Array(items) => {
            StoredValue::Array(items.into_iter().map(decode_value).collect())
        }
        other => StoredValue::from_json(other),
    }
}

fn decode_tagged(map: &serde_json::Map<String, serde_json::Value>) -> Option<StoredValue> {
    let tag = map.get(TYPE_TAG)?.as_str()?;
    let value = map.get("value");
    let decoded = match tag {
        "data" => StoredValue::Data(hex::decode(map.get("hex")?.as_str()?).ok()?),
        "float" => StoredValue::Number(Number::Float(float_from_json(value?)? as f32)),
        "double" => StoredValue::Number(Number::Double(float_from_json(value?)?)),
        "url" => StoredValue::Url(value?.as_str()?.to_string()),
        "date" => {
            let parsed = DateTime::parse_from_rfc3339(value?.as_str()?).ok()?;
            StoredValue::Date(parsed.with_timezone(&Utc))
        }
        "object" => StoredValue::Other(OpaqueValue::new(
            map.get("class")?.as_str()?,
            map.get("repr").and_then(|r| r.as_str()).unwrap_or_default(),
        )),
        "dictionary" => {
            let serde_json::Value::Object(inner) = value? else {
                return None;
            };
            StoredValue::Dictionary(
                inner
                    .iter()
                    .map(|(k, v)| (k.clone(), decode_value(v.clone())))
                    .collect(),
            )
        }
        other => {
            warn!(tag = other, "unknown value tag, keeping as dictionary");
            return None;
        }
    };
    Some(decoded)
}

fn non_finite_name(x: f64) -> &'static str {
    if x.is_nan() {
        "NaN"
    } else if x > 0.0 {
        "inf"
    } else {
        "-inf"
    }
}

fn float_from_json(v: &serde_json::Value) -> Option<f64> {
    match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "inf" => Some(f64::INFINITY),
            "-inf" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

/// Store files (`*.json`) directly inside `dir`, sorted.
pub fn list_stores(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Ok(rd) = fs::read_dir(dir) {
        for entry in rd.flatten() {
            let p = entry.path();
            if p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("json") {
                out.push(p);
            }
        }
    }
    out.sort();
    out
}

/// Zip a copy of a store file next to it, named `<stem>_<timestamp>.zip`.
pub fn zip_backup(path: &Path) -> Result<PathBuf, StoreError> {
    if !path.is_file() {
        return Err(StoreError::Backup(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("not a file: {}", path.display()),
        )));
    }
    let parent = path.parent().unwrap_or(Path::new("."));
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("store");
    let ts = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let dest = parent.join(format!("{}_{}.zip", stem, ts));

    let file = fs::File::create(&dest)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store.json".to_string());
    zip.start_file(name, options)?;
    zip.write_all(&fs::read(path)?)?;
    zip.finish()?;
    info!(backup = %dest.display(), "store backed up");
    Ok(dest)
}
