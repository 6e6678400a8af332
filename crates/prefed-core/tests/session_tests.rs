use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use prefed_core::{
    Backend, CommitOutcome, EditTarget, EditedValue, EditorSession, FnBackend, MemoryStore,
    Selection, SessionState, StoredValue, Variant,
};

fn store(pairs: &[(&str, i64)]) -> MemoryStore {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

#[test]
fn refresh_replaces_snapshot_wholesale() {
    let mut session = EditorSession::new(store(&[("z", 9), ("a", 1)]));
    let keys: Vec<_> = session.entries().keys().collect();
    assert_eq!(keys, ["a", "z"]);

    session
        .backend_mut()
        .replace_all(BTreeMap::from([("b".to_string(), StoredValue::from(2))]));
    session.refresh();
    assert_eq!(session.entries().len(), 1);
    let entry = session.entries().get("b").unwrap();
    assert_eq!(entry.variant, Variant::Integer(2));
}

#[test]
fn snapshot_is_sorted_regardless_of_source_order() {
    let values = vec![
        ("m".to_string(), StoredValue::from(1)),
        ("b".to_string(), StoredValue::from(2)),
        ("x".to_string(), StoredValue::from(3)),
    ];
    let snap = prefed_core::Snapshot::build(values);
    let keys: Vec<_> = snap.keys().collect();
    assert_eq!(keys, ["b", "m", "x"]);
    let rows = snap.rows();
    assert_eq!(rows[0], ("b".to_string(), "2".to_string()));
}

#[test]
fn select_absent_key_is_a_no_op() {
    let mut session = EditorSession::new(store(&[("a", 1)]));
    assert!(session.select("missing").is_none());
    assert_eq!(session.state(), &SessionState::Idle);

    let sel = session.select("a").unwrap();
    assert_eq!(sel.target, EditTarget::Value(Variant::Integer(1)));
    assert!(session.select("gone").is_none());
    assert_eq!(session.selection(), Some(&sel));
}

#[test]
fn commit_primitive_round_trips() {
    let mut session = EditorSession::new(MemoryStore::new());
    let outcome = session.commit("n", StoredValue::from(42i64));
    assert_eq!(outcome, CommitOutcome::Written);
    let sel = session.select("n").unwrap();
    assert_eq!(sel.target, EditTarget::Value(Variant::Integer(42)));
}

#[test]
fn commit_coerces_to_existing_kind_and_returns_to_idle() {
    let mut backend = MemoryStore::new();
    backend.write("ratio", StoredValue::from(0.5f64));
    backend.write("flag", StoredValue::from(false));
    let mut session = EditorSession::new(backend);

    session.select("ratio").unwrap();
    session.commit("ratio", StoredValue::from(2i64));
    assert_eq!(session.state(), &SessionState::Idle);
    assert_eq!(
        session.entries().get("ratio").unwrap().variant,
        Variant::Float64(2.0)
    );

    session.commit("flag", StoredValue::from(true));
    assert_eq!(
        session.entries().get("flag").unwrap().variant,
        Variant::Boolean(true)
    );
}

#[test]
fn delete_removes_batch_then_refreshes() {
    let mut session = EditorSession::new(store(&[("a", 1), ("b", 2), ("c", 3)]));
    let refreshes = Rc::new(Cell::new(0));
    let counter = refreshes.clone();
    session.subscribe(move |_| counter.set(counter.get() + 1));

    session.delete(["a", "b"]);
    let keys: Vec<_> = session.entries().keys().collect();
    assert_eq!(keys, ["c"]);
    assert_eq!(refreshes.get(), 1);
    assert_eq!(session.backend().len(), 1);
}

#[test]
fn observers_see_each_new_snapshot_until_unsubscribed() {
    let mut session = EditorSession::new(store(&[("a", 1)]));
    let seen: Rc<RefCell<Vec<usize>>> = Rc::default();
    let sink = seen.clone();
    let id = session.subscribe(move |snap| sink.borrow_mut().push(snap.len()));

    session.commit("b", StoredValue::from(2));
    session.refresh();
    assert_eq!(*seen.borrow(), vec![2, 2]);

    assert!(session.unsubscribe(id));
    assert!(!session.unsubscribe(id));
    session.delete(["a"]);
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn binary_json_commit_writes_without_refresh() {
    let original = br#"{"count": 1}"#.to_vec();
    let mut backend = MemoryStore::new();
    backend.write("blob", StoredValue::Data(original.clone()));
    let mut session = EditorSession::new(backend);

    let sel = session.select("blob").unwrap();
    let EditTarget::JsonObject(mut map) = sel.target else {
        panic!("expected JSON target");
    };
    map.insert("count".to_string(), StoredValue::from(2));
    let outcome = session.commit("blob", EditedValue::Json(map));
    assert_eq!(outcome, CommitOutcome::WrittenWithoutRefresh);

    let StoredValue::Data(written) = session.backend().get("blob").unwrap() else {
        panic!("expected data");
    };
    let json: serde_json::Value = serde_json::from_slice(written).unwrap();
    assert_eq!(json, serde_json::json!({"count": 2}));
    // Snapshot still shows the pre-edit bytes until the next refresh.
    assert_eq!(
        session.entries().get("blob").unwrap().variant,
        Variant::Binary(original)
    );
    session.refresh();
    assert_ne!(
        session.entries().get("blob").unwrap().variant,
        Variant::Binary(br#"{"count": 1}"#.to_vec())
    );
}

#[test]
fn unchanged_json_commit_keeps_large_integers() {
    let original = br#"{"id":18446744073709551615}"#.to_vec();
    let mut backend = MemoryStore::new();
    backend.write("blob", StoredValue::Data(original.clone()));
    let mut session = EditorSession::new(backend);

    let EditTarget::JsonObject(map) = session.select("blob").unwrap().target else {
        panic!("expected JSON target");
    };
    let outcome = session.commit("blob", EditedValue::Json(map));
    assert_eq!(outcome, CommitOutcome::WrittenWithoutRefresh);
    assert_eq!(
        session.backend().get("blob"),
        Some(&StoredValue::Data(original))
    );
}

#[test]
fn unserializable_json_edit_is_dropped() {
    let original = br#"{"a": 1}"#.to_vec();
    let mut backend = MemoryStore::new();
    backend.write("blob", StoredValue::Data(original.clone()));
    let mut session = EditorSession::new(backend);

    let map = BTreeMap::from([("a".to_string(), StoredValue::Data(vec![1, 2]))]);
    let outcome = session.commit("blob", EditedValue::Json(map));
    assert_eq!(outcome, CommitOutcome::Discarded);
    assert_eq!(
        session.backend().get("blob"),
        Some(&StoredValue::Data(original))
    );
    assert_eq!(session.state(), &SessionState::Idle);
}

#[test]
fn edit_with_delegate_commits_or_cancels() {
    let mut session = EditorSession::new(store(&[("n", 1)]));

    let mut bump = |sel: &Selection| match &sel.target {
        EditTarget::Value(Variant::Integer(n)) => Some(EditedValue::from(StoredValue::from(n + 1))),
        _ => None,
    };
    assert_eq!(session.edit_with("n", &mut bump), Some(CommitOutcome::Written));
    assert_eq!(session.entries().get("n").unwrap().variant, Variant::Integer(2));

    let mut cancel = |_: &Selection| -> Option<EditedValue> { None };
    assert_eq!(session.edit_with("n", &mut cancel), None);
    assert_eq!(session.state(), &SessionState::Idle);
    assert_eq!(session.edit_with("missing", &mut bump), None);
}

#[test]
fn closure_backend_and_borrowed_backend() {
    let shared: Rc<RefCell<BTreeMap<String, StoredValue>>> = Rc::default();
    shared
        .borrow_mut()
        .insert("k".to_string(), StoredValue::from("v"));
    let (r, w, d) = (shared.clone(), shared.clone(), shared.clone());
    let backend = FnBackend::new(
        move || r.borrow().clone(),
        move |key: &str, value: StoredValue| {
            w.borrow_mut().insert(key.to_string(), value);
        },
        move |key: &str| {
            d.borrow_mut().remove(key);
        },
    );
    let mut session = EditorSession::new(backend);
    session.commit("k2", StoredValue::from(true));
    assert_eq!(session.entries().len(), 2);
    session.delete(["k"]);
    assert_eq!(shared.borrow().len(), 1);

    let mut owned = MemoryStore::new();
    {
        let mut borrowed = EditorSession::new(&mut owned);
        borrowed.commit("x", StoredValue::from("y"));
    }
    assert_eq!(owned.get("x"), Some(&StoredValue::from("y")));
}
