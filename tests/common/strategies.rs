//! proptest strategies for envelope payloads and progress values.

use proptest::prelude::*;
use serde_json::{Map, Value};

/// Object keys that never collide with the reserved tenant field
pub fn payload_key_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9_]{0,15}"
}

pub fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 .,!?-]{0,32}".prop_map(Value::String),
    ]
}

/// Nested JSON values, at most three levels deep
pub fn json_value_strategy() -> impl Strategy<Value = Value> {
    leaf_strategy().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map(payload_key_strategy(), inner, 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

/// Envelope payloads: flat-ish JSON objects
pub fn payload_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(payload_key_strategy(), json_value_strategy(), 0..8).prop_map(
        |entries| {
            let mut map = Map::new();
            for (key, value) in entries {
                map.insert(key, value);
            }
            Value::Object(map)
        },
    )
}

pub fn tenant_strategy() -> impl Strategy<Value = String> {
    "tenant-[a-z0-9]{1,12}"
}

pub fn message_type_strategy() -> impl Strategy<Value = String> {
    "com\\.[a-z]{2,8}\\.[a-z]{2,8}\\.[a-z]{2,8}"
}
