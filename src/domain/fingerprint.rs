//! Input fingerprint computation for deduplication.
//!
//! A fingerprint is a fast, stable hash of the (bounded) input payload used
//! as the deduplication key. Two payloads with the same structure and values
//! produce the same fingerprint; object key order does not matter.

use ahash::AHasher;
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A stable 64-bit fingerprint of an inspection input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputFingerprint(u64);

impl InputFingerprint {
    /// Compute the fingerprint of a payload.
    ///
    /// Object members are hashed in sorted key order so that serialization
    /// order never affects the result. Designed for the hot path: a single
    /// pass over the value tree with an `ahash` hasher.
    pub fn of(value: &Value) -> Self {
        let mut hasher = AHasher::default();
        hash_value(value, &mut hasher);
        InputFingerprint(hasher.finish())
    }

    /// Construct from a raw hash value.
    pub fn from_hash(hash: u64) -> Self {
        InputFingerprint(hash)
    }

    /// The raw hash value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InputFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

// Each variant hashes a discriminant byte first so that e.g. the string "1"
// and the number 1 never collide structurally.
fn hash_value(value: &Value, hasher: &mut AHasher) {
    match value {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Number(n) => {
            2u8.hash(hasher);
            n.to_string().hash(hasher);
        }
        Value::String(s) => {
            3u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Array(items) => {
            4u8.hash(hasher);
            items.len().hash(hasher);
            for item in items {
                hash_value(item, hasher);
            }
        }
        Value::Object(map) => {
            5u8.hash(hasher);
            map.len().hash(hasher);
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            for key in keys {
                key.hash(hasher);
                hash_value(&map[key], hasher);
            }
        }
    }
}
