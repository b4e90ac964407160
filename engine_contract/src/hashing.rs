//! Canonical hashing of JSON values.
//!
//! Deterministic canonical serialization + SHA-256 hashing, independent of
//! map insertion order.
//!
//! Rules:
//!   - Object keys sorted (UTF-8 byte order), recursively
//!   - Array order preserved
//!   - Compact JSON, no whitespace

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Canonical serialization of a JSON value to UTF-8 bytes.
pub fn canonical_serialize(value: &Value) -> Vec<u8> {
    // Display on Value is compact JSON and cannot fail.
    canonical_value(value).to_string().into_bytes()
}

/// SHA-256 of the canonical serialization. Lowercase hex string.
pub fn canonical_hash(value: &Value) -> String {
    let digest = Sha256::digest(canonical_serialize(value));
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Rebuild `value` with every object's keys in sorted order.
fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonical_value(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        other => other.clone(),
    }
}
