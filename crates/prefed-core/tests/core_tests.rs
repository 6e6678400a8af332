use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use prefed_core::edit::{EditTarget, EditedValue};
use prefed_core::{
    Number, OpaqueValue, ParseError, StoredValue, Variant, VariantKind, classify, coerce,
    describe, edit_text, parse_for, parse_kind,
};

#[test]
fn classify_each_supported_type() {
    let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let cases = vec![
        (StoredValue::from("hoge"), VariantKind::String),
        (StoredValue::from(vec!["a", "b"]), VariantKind::StringList),
        (
            StoredValue::from(vec![StoredValue::from(1), StoredValue::from("2")]),
            VariantKind::List,
        ),
        (
            StoredValue::Dictionary(BTreeMap::from([("a".to_string(), StoredValue::from(0))])),
            VariantKind::Map,
        ),
        (StoredValue::Data(vec![1, 2, 3]), VariantKind::Binary),
        (StoredValue::from(7i64), VariantKind::Integer),
        (StoredValue::from(1.5f32), VariantKind::Float32),
        (StoredValue::from(1.5f64), VariantKind::Float64),
        (StoredValue::from(true), VariantKind::Boolean),
        (StoredValue::Url("https://example.com".into()), VariantKind::Url),
        (StoredValue::Date(date), VariantKind::Timestamp),
        (
            StoredValue::Other(OpaqueValue::new("ArchivedColor", "red")),
            VariantKind::Opaque,
        ),
    ];
    for (value, kind) in cases {
        assert_eq!(classify(&value).kind(), kind, "value {:?}", value);
    }
}

#[test]
fn booleans_never_classify_as_integers() {
    // The boxed number bridges booleans to 0/1, which is exactly the trap.
    assert_eq!(Number::Bool(true).as_i64(), Some(1));
    assert_eq!(classify(&StoredValue::from(true)), Variant::Boolean(true));
    assert_eq!(classify(&StoredValue::from(false)), Variant::Boolean(false));
}

#[test]
fn homogeneous_string_list_beats_generic_list() {
    assert_eq!(
        classify(&StoredValue::from(vec!["x", "y"])),
        Variant::StringList(vec!["x".into(), "y".into()])
    );
    assert_eq!(
        classify(&StoredValue::Array(vec![])),
        Variant::StringList(vec![])
    );
    let mixed = StoredValue::from(vec![StoredValue::from("x"), StoredValue::from(true)]);
    assert_eq!(classify(&mixed).kind(), VariantKind::List);
}

#[test]
fn precedence_ends_with_fallback() {
    let order: Vec<_> = prefed_core::classify::precedence().collect();
    assert_eq!(order.len(), VariantKind::ALL.len());
    assert_eq!(order.first(), Some(&VariantKind::String));
    assert_eq!(order.last(), Some(&VariantKind::Opaque));
    let pos = |k| order.iter().position(|x| *x == k).unwrap();
    assert!(pos(VariantKind::StringList) < pos(VariantKind::List));
}

#[test]
fn describe_binary_json_is_sorted_and_indented() {
    let v = classify(&StoredValue::Data(br#"{"a":1}"#.to_vec()));
    assert_eq!(describe(&v), "{\n  \"a\": 1\n}");

    let nested = classify(&StoredValue::Data(
        br#"{"b":1,"a":{"d":2,"c":3}}"#.to_vec(),
    ));
    let s = describe(&nested);
    assert!(s.find("\"a\"").unwrap() < s.find("\"b\"").unwrap());
    assert!(s.find("\"c\"").unwrap() < s.find("\"d\"").unwrap());
    // Same input, same bytes.
    assert_eq!(s, describe(&nested));
}

#[test]
fn describe_binary_falls_back_to_text_then_raw() {
    let text = classify(&StoredValue::Data(b"hello".to_vec()));
    assert_eq!(describe(&text), "hello");

    // Bare JSON scalars are shown as text.
    let scalar = classify(&StoredValue::Data(b"42".to_vec()));
    assert_eq!(describe(&scalar), "42");

    let raw = classify(&StoredValue::Data(vec![0xff, 0xfe, 0x00]));
    let s = describe(&raw);
    assert!(s.starts_with("<3 bytes: 0x"), "{}", s);
    assert!(s.contains("fffe00"));

    let long = classify(&StoredValue::Data(vec![0xff; 40]));
    assert!(describe(&long).ends_with("…>"));
}

#[test]
fn describe_natural_forms() {
    assert_eq!(
        describe(&classify(&StoredValue::from(vec!["a", "b"]))),
        r#"["a", "b"]"#
    );
    let map = StoredValue::Dictionary(BTreeMap::from([
        ("z".to_string(), StoredValue::from(1)),
        ("a".to_string(), StoredValue::from("x")),
    ]));
    assert_eq!(describe(&classify(&map)), r#"{"a": "x", "z": 1}"#);
    let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    assert_eq!(
        describe(&classify(&StoredValue::Date(date))),
        "2024-01-02T03:04:05Z"
    );
    assert_eq!(describe(&classify(&StoredValue::from(false))), "false");
    let opaque = StoredValue::Other(OpaqueValue::new("ArchivedColor", "red"));
    assert_eq!(describe(&classify(&opaque)), "<ArchivedColor: red>");
}

#[test]
fn variant_round_trips_to_stored_form() {
    let values = [
        StoredValue::from(vec!["a"]),
        StoredValue::from(3.25f32),
        StoredValue::Url("file:///tmp".into()),
    ];
    for v in values {
        assert_eq!(classify(&v).to_stored(), v);
    }
}

#[test]
fn coerce_toward_entry_kind() {
    assert_eq!(
        coerce(VariantKind::Integer, StoredValue::from(3.0f64)),
        StoredValue::from(3i64)
    );
    assert_eq!(
        coerce(VariantKind::Integer, StoredValue::from(3.5f64)),
        StoredValue::from(3.5f64)
    );
    assert_eq!(
        coerce(VariantKind::Float64, StoredValue::from(2i64)),
        StoredValue::from(2.0f64)
    );
    assert_eq!(
        coerce(VariantKind::Url, StoredValue::from("https://a.b")),
        StoredValue::Url("https://a.b".into())
    );
    // No conversion exists: the value passes through.
    assert_eq!(
        coerce(VariantKind::Integer, StoredValue::from("nope")),
        StoredValue::from("nope")
    );
}

#[test]
fn parse_text_for_kinds() {
    assert_eq!(
        parse_kind(VariantKind::Boolean, "yes").unwrap(),
        StoredValue::from(true)
    );
    assert_eq!(
        parse_kind(VariantKind::Integer, " 42 ").unwrap(),
        StoredValue::from(42i64)
    );
    assert!(matches!(
        parse_kind(VariantKind::Integer, "abc"),
        Err(ParseError::Invalid { kind: "integer", .. })
    ));
    assert_eq!(
        parse_kind(VariantKind::StringList, "a\nb").unwrap(),
        StoredValue::from(vec!["a", "b"])
    );
    assert_eq!(
        parse_kind(VariantKind::StringList, r#"["a", "b"]"#).unwrap(),
        StoredValue::from(vec!["a", "b"])
    );
    assert_eq!(
        parse_kind(VariantKind::Binary, "de ad").unwrap(),
        StoredValue::Data(vec![0xde, 0xad])
    );
    assert!(parse_kind(VariantKind::Url, "not a url").is_err());

    let map = parse_kind(
        VariantKind::Map,
        r#"{"u": {"$type": "url", "value": "https://x.y"}}"#,
    )
    .unwrap();
    assert_eq!(
        map,
        StoredValue::Dictionary(BTreeMap::from([(
            "u".to_string(),
            StoredValue::Url("https://x.y".into())
        )]))
    );
    assert!(parse_kind(VariantKind::List, r#"{"a": 1}"#).is_err());
}

#[test]
fn edit_text_is_accepted_back() {
    let date = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
    let targets = [
        EditTarget::Value(Variant::Timestamp(date)),
        EditTarget::Value(Variant::Binary(vec![0, 1, 255])),
        EditTarget::Value(Variant::List(vec![
            StoredValue::from(1),
            StoredValue::Data(vec![9]),
        ])),
    ];
    for target in targets {
        let EditTarget::Value(variant) = &target else {
            unreachable!()
        };
        let parsed = parse_for(&target, &edit_text(&target)).unwrap();
        assert_eq!(parsed, EditedValue::Value(variant.to_stored()));
    }
}

#[test]
fn string_list_edit_text_survives_unchanged_save() {
    let lists: [&[&str]; 5] = [
        &["a", ""],
        &[""],
        &["two\nlines", "b"],
        &["[not json", "x"],
        &["plain", "items"],
    ];
    for items in lists {
        let variant = Variant::StringList(items.iter().map(|s| s.to_string()).collect());
        let target = EditTarget::Value(variant.clone());
        let parsed = parse_for(&target, &edit_text(&target)).unwrap();
        assert_eq!(parsed, EditedValue::Value(variant.to_stored()), "items {:?}", items);
    }
    // Simple lists keep the one-item-per-line form.
    let simple = EditTarget::Value(Variant::StringList(vec!["a".into(), "b".into()]));
    assert_eq!(edit_text(&simple), "a\nb");
}

#[test]
fn json_object_target_parses_to_json_edit() {
    let target = EditTarget::for_variant(&Variant::Binary(br#"{"n": 1}"#.to_vec()));
    let EditTarget::JsonObject(map) = &target else {
        panic!("expected JSON object target, got {:?}", target);
    };
    assert_eq!(map.get("n"), Some(&StoredValue::from(1i64)));

    let edited = parse_for(&target, r#"{"n": 2, "s": "x"}"#).unwrap();
    let EditedValue::Json(map) = edited else {
        panic!("expected JSON edit");
    };
    assert_eq!(map.get("s"), Some(&StoredValue::from("x")));
    assert!(parse_for(&target, "[1, 2]").is_err());

    // JSON arrays in data stay plain binary edits.
    let array = EditTarget::for_variant(&Variant::Binary(b"[1, 2]".to_vec()));
    assert_eq!(array.kind(), VariantKind::Binary);
}

#[test]
fn json_integers_beyond_i64_stay_integers() {
    let v = StoredValue::from_json(serde_json::json!(u64::MAX));
    assert_eq!(v, StoredValue::Number(Number::UInt(u64::MAX)));
    assert_eq!(v.to_json().unwrap(), serde_json::json!(u64::MAX));
    assert_eq!(v.type_name(), "integer");
}

#[test]
fn json_bridge_rejects_non_json_values() {
    assert!(StoredValue::Data(vec![1]).to_json().is_err());
    assert!(StoredValue::from(f64::NAN).to_json().is_err());
    assert_eq!(
        StoredValue::Other(OpaqueValue::null()).to_json().unwrap(),
        serde_json::Value::Null
    );
    let v = serde_json::json!({"a": [1, 2.5, "x", true, null]});
    assert_eq!(StoredValue::from_json(v.clone()).to_json().unwrap(), v);
}
