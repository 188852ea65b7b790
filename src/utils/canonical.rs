//! Stable JSON serialization and content hashing.
//!
//! Object keys are emitted in sorted order at every nesting level, so two
//! values that differ only in key insertion order serialize identically. The
//! output is compact JSON and is what idempotency keys and schedule dedup ids
//! are computed over.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Serialize a JSON value with recursively sorted object keys
pub fn to_canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (index, key) in keys.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::String(s) => write_string(s, out),
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Null => out.push_str("null"),
    }
}

fn write_string(s: &str, out: &mut String) {
    let _ = write!(out, "{}", Value::from(s));
}

/// SHA-256 hex digest of the canonical serialization of `value`
pub fn content_hash<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_value(value)?;
    Ok(hash_canonical(&json))
}

/// SHA-256 hex digest of an already-materialized JSON value
pub fn hash_canonical(value: &Value) -> String {
    let digest = Sha256::digest(to_canonical_string(value).as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_does_not_change_output() {
        let a: Value = serde_json::from_str(r#"{"b":1,"a":{"y":[1,2],"x":"s"}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a":{"x":"s","y":[1,2]},"b":1}"#).unwrap();

        assert_eq!(to_canonical_string(&a), to_canonical_string(&b));
        assert_eq!(to_canonical_string(&a), r#"{"a":{"x":"s","y":[1,2]},"b":1}"#);
        assert_eq!(hash_canonical(&a), hash_canonical(&b));
    }

    #[test]
    fn test_array_order_is_significant() {
        assert_ne!(
            hash_canonical(&json!({"items": [1, 2]})),
            hash_canonical(&json!({"items": [2, 1]}))
        );
    }

    #[test]
    fn test_strings_are_escaped() {
        let value = json!({"quote": "a\"b\nc"});
        assert_eq!(to_canonical_string(&value), r#"{"quote":"a\"b\nc"}"#);
    }

    #[test]
    fn test_content_hash_is_hex_sha256() {
        let hash = content_hash(&json!({"task": "rebuild-index"})).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
