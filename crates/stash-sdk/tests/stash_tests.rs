//! End-to-end scenarios for the Stash API.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use stash_sdk::{
    Candidate, FailureKind, InMemoryRecordStore, MapKey, Mapping, Operation, Record,
    RecordStore, Resolved, Serde, Stash, StashConfig, Structured, Value,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: String,
    name: String,
    email: String,
}

fn user(id: &str, name: &str) -> User {
    User {
        id: id.into(),
        name: name.into(),
        email: format!("{}@example.com", name.to_lowercase()),
    }
}

fn ready() -> Stash {
    let stash = Stash::open(&StashConfig::in_memory()).unwrap();
    stash.setup().unwrap();
    stash
}

struct Socket;

impl Structured for Socket {}

// ---- Mutations ----

#[test]
fn remark_merges_shallowly() {
    let stash = ready();
    stash.mark("k", json!({"a": 1, "b": 2}));
    stash.remark("k", json!({"b": 3, "c": 4}));
    assert_eq!(stash.call_raw("k"), Some(json!({"a": 1, "b": 3, "c": 4})));
}

#[test]
fn remark_on_absent_key_creates_it() {
    let stash = ready();
    stash.remark("fresh", json!({"x": true}));
    assert_eq!(stash.call_raw("fresh"), Some(json!({"x": true})));
}

#[test]
fn mark_replaces_existing_value() {
    let stash = ready();
    stash.mark("k", json!({"a": 1}));
    stash.mark("k", json!({"b": 2}));
    assert_eq!(stash.call_raw("k"), Some(json!({"b": 2})));
}

#[test]
fn clear_is_idempotent() {
    let stash = ready();
    stash.mark("a", 1);
    stash.mark("b", 2);
    let mut rx = stash.subscribe();

    stash.clear();
    stash.clear();

    assert!(stash.keys().is_empty());
    assert_eq!(stash.call_raw("a"), None);
    assert!(rx.try_recv().is_err());
}

#[test]
fn erase_absent_key_is_not_a_failure() {
    let stash = ready();
    let mut rx = stash.subscribe();
    stash.erase("missing");
    assert!(rx.try_recv().is_err());
}

#[test]
fn erase_removes_key() {
    let stash = ready();
    stash.mark("k", "v");
    stash.erase("k");
    assert!(!stash.contains("k"));
    assert_eq!(stash.call_raw("k"), None);
}

#[test]
fn serialization_failure_leaves_prior_value() {
    let stash = ready();
    stash.mark("k", json!({"keep": 1}));
    let mut rx = stash.subscribe();

    stash.mark("k", Candidate::object(Socket));

    let failure = rx.try_recv().unwrap();
    assert_eq!(failure.operation, Operation::Mark);
    assert_eq!(failure.kind, FailureKind::Serialization);
    assert_eq!(failure.key.as_deref(), Some("k"));
    assert_eq!(stash.call_raw("k"), Some(json!({"keep": 1})));
}

#[derive(Serialize)]
struct Reading {
    sensor: &'static str,
    value: f64,
}

#[test]
fn non_finite_field_in_serde_object_is_rejected() {
    let stash = ready();
    let mut rx = stash.subscribe();

    stash.mark(
        "r",
        Candidate::object(Serde(Reading {
            sensor: "t1",
            value: f64::NAN,
        })),
    );

    let failure = rx.try_recv().unwrap();
    assert_eq!(failure.operation, Operation::Mark);
    assert_eq!(failure.kind, FailureKind::Purity);
    assert_eq!(stash.call_raw("r"), None);
}

#[test]
fn finite_serde_floats_are_stored() {
    let stash = ready();
    stash.mark(
        "r",
        Candidate::object(Serde(Reading {
            sensor: "t1",
            value: 21.5,
        })),
    );
    assert_eq!(
        stash.call_raw("r"),
        Some(json!({"sensor": "t1", "value": 21.5}))
    );
}

#[test]
fn serde_object_with_compound_keys_is_a_serialization_failure() {
    let stash = ready();
    let mut rx = stash.subscribe();
    let by_pair: BTreeMap<(u8, u8), &str> = [((0, 1), "edge")].into_iter().collect();

    stash.mark("g", Candidate::object(Serde(by_pair)));

    let failure = rx.try_recv().unwrap();
    assert_eq!(failure.kind, FailureKind::Serialization);
    assert!(failure.message.contains("unsupported mapping key"));
    assert!(!stash.contains("g"));
}

#[test]
fn failed_remark_leaves_prior_value() {
    let stash = ready();
    stash.mark("k", json!({"a": 1}));
    let mut rx = stash.subscribe();

    let mut partial = Mapping::new();
    partial.insert("a".into(), json!(2));
    let bad: Candidate = vec![Candidate::from(partial), Candidate::Float(f64::INFINITY)]
        .into_iter()
        .collect();
    stash.remark("k", bad);

    assert_eq!(rx.try_recv().unwrap().kind, FailureKind::Purity);
    assert_eq!(stash.call_raw("k"), Some(json!({"a": 1})));
}

#[test]
fn structured_objects_are_stored_by_their_representation() {
    let stash = ready();
    stash.mark("u", Candidate::object(Serde(user("1", "Ada"))));
    assert_eq!(
        stash.call_raw("u"),
        Some(json!({"id": "1", "name": "Ada", "email": "ada@example.com"}))
    );
}

#[test]
fn sequences_of_objects_are_normalized_elementwise() {
    let stash = ready();
    let users: Candidate = vec![user("1", "Ada"), user("2", "Bob")]
        .into_iter()
        .map(|u| Candidate::object(Serde(u)))
        .collect();
    stash.mark("users", users);

    let stored = stash.call_raw("users").unwrap();
    assert_eq!(stored.as_array().map(Vec::len), Some(2));
    assert_eq!(stored[1]["name"], json!("Bob"));
}

// ---- Typed retrieval ----

#[test]
fn registered_type_is_reconstructed() {
    let stash = ready();
    stash.register_serde::<User>();
    stash.mark("u", Candidate::object(Serde(user("1", "Ada"))));

    assert_eq!(stash.call::<User>("u"), Some(Resolved::Typed(user("1", "Ada"))));
}

#[test]
fn registered_type_reconstructs_sequences() {
    let stash = ready();
    stash.register_serde::<User>();
    stash.mark(
        "users",
        json!([
            {"id": "1", "name": "Ada", "email": "ada@example.com"},
            {"id": "2", "name": "Bob", "email": "bob@example.com"}
        ]),
    );

    let users = stash.call::<User>("users").and_then(Resolved::sequence);
    assert_eq!(users, Some(vec![user("1", "Ada"), user("2", "Bob")]));
}

#[test]
fn unregistered_type_falls_back_to_raw() {
    let stash = ready();
    stash.mark("u", json!({"id": "1", "name": "A", "email": "a@a"}));

    assert_eq!(
        stash.call::<User>("u"),
        Some(Resolved::Raw(json!({"id": "1", "name": "A", "email": "a@a"})))
    );
}

#[test]
fn absent_key_is_none() {
    let stash = ready();
    stash.register_serde::<User>();
    assert_eq!(stash.call::<User>("nope"), None);
    assert!(matches!(stash.try_call::<User>("nope"), Ok(None)));
}

#[test]
fn failing_constructor_falls_back_and_reports() {
    let stash = ready();
    stash.register(|map: Mapping| -> Result<User, String> {
        match map.get("id").and_then(|v| v.as_str()) {
            Some(id) if !id.is_empty() => Ok(user(id, "X")),
            _ => Err("missing id".to_string()),
        }
    });
    stash.mark("u", json!({"name": "no id"}));
    let mut rx = stash.subscribe();

    assert_eq!(
        stash.call::<User>("u"),
        Some(Resolved::Raw(json!({"name": "no id"})))
    );
    let failure = rx.try_recv().unwrap();
    assert_eq!(failure.operation, Operation::Call);
    assert_eq!(failure.kind, FailureKind::Reconstruction);
    assert!(failure.message.contains("missing id"));

    let err = stash.try_call::<User>("u").unwrap_err();
    assert_eq!(err.kind(), FailureKind::Reconstruction);
}

// ---- Durability ----

#[test]
fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = StashConfig::at_path(dir.path().join("stash.log"));

    {
        let stash = Stash::open(&config).unwrap();
        assert_eq!(stash.setup().unwrap(), 0);
        stash.mark("a", json!({"x": 1}));
        stash.remark("a", json!({"y": 2}));
        stash.mark("b", "gone soon");
        stash.erase("b");
    }

    let stash = Stash::open(&config).unwrap();
    assert_eq!(stash.setup().unwrap(), 1);
    assert_eq!(stash.call_raw("a"), Some(json!({"x": 1, "y": 2})));
    assert_eq!(stash.call_raw("b"), None);
}

#[test]
fn clear_is_durable() {
    let dir = tempfile::tempdir().unwrap();
    let config = StashConfig::at_path(dir.path().join("stash.log"));

    {
        let stash = Stash::open(&config).unwrap();
        stash.setup().unwrap();
        stash.mark("a", 1);
        stash.clear();
    }

    let stash = Stash::open(&config).unwrap();
    assert_eq!(stash.setup().unwrap(), 0);
}

#[test]
fn setup_loads_existing_records() {
    let store = Arc::new(InMemoryRecordStore::with_records([
        Record::new("a", json!(1)),
        Record::new("b", json!({"k": "v"})),
    ]));
    let stash = Stash::with_store(store);

    assert_eq!(stash.setup().unwrap(), 2);
    assert_eq!(stash.keys(), vec!["a", "b"]);
}

#[test]
fn store_failure_leaves_cache_unchanged() {
    let store = Arc::new(InMemoryRecordStore::new());
    let stash = Stash::with_store(store.clone() as Arc<dyn RecordStore>);
    stash.setup().unwrap();
    stash.mark("k", json!({"a": 1}));
    let mut rx = stash.subscribe();

    store.set_read_only(true);
    stash.mark("k", json!({"a": 2}));
    stash.remark("k", json!({"b": 3}));
    stash.erase("k");
    stash.clear();

    for expected in [
        Operation::Mark,
        Operation::Remark,
        Operation::Erase,
        Operation::Clear,
    ] {
        let failure = rx.try_recv().unwrap();
        assert_eq!(failure.operation, expected);
        assert_eq!(failure.kind, FailureKind::StoreIo);
    }
    assert_eq!(stash.call_raw("k"), Some(json!({"a": 1})));
    assert_eq!(store.get("k"), Some(json!({"a": 1})));
}

#[test]
fn config_from_toml_opens_durable_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("stash.log");
    let config = StashConfig::from_toml_str(&format!(
        "path = {:?}\nsync_mode = \"every_write\"\n",
        path.display().to_string()
    ))
    .unwrap();

    let stash = Stash::open(&config).unwrap();
    stash.setup().unwrap();
    stash.mark("k", vec![1, 2, 3]);
    assert!(path.exists());
    assert_eq!(stash.call_raw("k"), Some(json!([1, 2, 3])));
}

// ---- Write-then-read property ----

/// Floats with a short exact decimal form, so the JSON round trip is exact.
fn arb_float() -> impl Strategy<Value = f64> {
    (any::<i16>(), 0u32..8)
        .prop_map(|(mantissa, shift)| f64::from(mantissa) / f64::from(1u32 << shift))
}

/// An input value paired with the value it must be stored as.
fn arb_input() -> impl Strategy<Value = (Candidate, Value)> {
    let leaf = prop_oneof![
        Just((Candidate::Null, Value::Null)),
        any::<bool>().prop_map(|b| (Candidate::from(b), json!(b))),
        any::<i64>().prop_map(|n| (Candidate::from(n), json!(n))),
        arb_float().prop_map(|x| (Candidate::Float(x), json!(x))),
        "[a-z0-9 ]{0,8}".prop_map(|s| (Candidate::from(s.as_str()), json!(s))),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(|items| {
                let (candidates, values): (Vec<_>, Vec<_>) = items.into_iter().unzip();
                (Candidate::Sequence(candidates), Value::Array(values))
            }),
            prop::collection::btree_map(any::<i32>(), inner.clone(), 0..4).prop_map(|map| {
                let mut expected = Mapping::new();
                let mut entries = Vec::new();
                for (key, (candidate, value)) in map {
                    expected.insert(key.to_string(), value);
                    entries.push((MapKey::Int(i64::from(key)), candidate));
                }
                (Candidate::Mapping(entries), Value::Object(expected))
            }),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4).prop_map(|map| {
                let mut expected = Mapping::new();
                let mut entries = Vec::new();
                for (key, (candidate, value)) in map {
                    expected.insert(key.clone(), value);
                    entries.push((MapKey::String(key), candidate));
                }
                (Candidate::Mapping(entries), Value::Object(expected))
            }),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn mark_then_call_raw_returns_normalized_value(
        key in "[a-z]{1,8}",
        (input, expected) in arb_input(),
    ) {
        let stash = ready();
        let mut rx = stash.subscribe();

        stash.mark(&key, input);

        prop_assert!(rx.try_recv().is_err());
        prop_assert_eq!(stash.call_raw(&key), Some(expected));
    }
}
