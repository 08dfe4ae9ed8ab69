//! The canonical JSON form used for all hashing and persistence.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from canonical serialization.
#[derive(Debug, Error)]
pub enum CanonError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Recursively sort object keys. Arrays keep their order with elements
/// canonicalized; scalars pass through unchanged.
///
/// Idempotent: canonicalizing a canonical value is a no-op.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(fields) => {
            let mut sorted: Vec<(&String, &Value)> = fields.iter().collect();
            sorted.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut out = Map::new();
            for (key, val) in sorted {
                out.insert(key.clone(), canonicalize(val));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        scalar => scalar.clone(),
    }
}

/// Deterministic JSON text of the canonicalized value, plus a trailing
/// newline. Structurally equal inputs serialize byte-identically regardless
/// of their key order.
pub fn canonical_stringify(value: &Value) -> Result<String, CanonError> {
    let mut text = serde_json::to_string(&canonicalize(value))?;
    text.push('\n');
    Ok(text)
}

/// Canonical bytes of any serializable value. This is the sole encoding
/// used before hashing and for persisted JSON.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonError> {
    let raw = serde_json::to_value(value)?;
    Ok(canonical_stringify(&raw)?.into_bytes())
}
