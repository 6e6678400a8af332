use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::value::{OpaqueValue, StoredValue};

/// Demo dictionary stamped with the current time.
pub fn demo_store() -> BTreeMap<String, StoredValue> {
    demo_entries(Utc::now())
}

/// One value of every kind the editor distinguishes.
pub fn demo_entries(now: DateTime<Utc>) -> BTreeMap<String, StoredValue> {
    let mut out = BTreeMap::new();
    out.insert("string".to_string(), StoredValue::from("hoge"));
    out.insert(
        "array".to_string(),
        StoredValue::from(vec![
            StoredValue::from(1),
            StoredValue::from("2"),
            StoredValue::from(3),
        ]),
    );
    out.insert(
        "dictionary".to_string(),
        StoredValue::Dictionary(BTreeMap::from([("a".to_string(), StoredValue::from(0))])),
    );
    out.insert(
        "data".to_string(),
        StoredValue::Data(br#"{ "string": "string", "integer": 1 }"#.to_vec()),
    );
    out.insert(
        "blob".to_string(),
        StoredValue::Data(vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0xff]),
    );
    out.insert("stringArray".to_string(), StoredValue::from(vec!["a", "b"]));
    out.insert("integer".to_string(), StoredValue::from(1));
    out.insert("float".to_string(), StoredValue::from(1.0f32));
    out.insert("double".to_string(), StoredValue::from(1.0f64));
    out.insert("bool".to_string(), StoredValue::from(false));
    out.insert(
        "url".to_string(),
        StoredValue::Url("https://google.com".to_string()),
    );
    out.insert("date".to_string(), StoredValue::Date(now));
    out.insert(
        "object".to_string(),
        StoredValue::Other(OpaqueValue::new("ArchivedColor", "rgba(1, 0, 0, 1)")),
    );
    out
}
