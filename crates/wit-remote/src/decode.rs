//! Decoding heterogeneously encoded ledger values.
//!
//! Ledger records reach us through a generic "get object" call, and a field
//! may arrive as a plain string, a byte array, or a nested wrapper object,
//! depending on which writer minted the record. [`decode_text`] is the one
//! place that ordering lives: **string → byte array → nested `.value` →
//! nested `.fields`**, checked in exactly that priority. Nothing else in
//! the codebase may reinterpret a remote value.

use serde_json::Value;

use crate::error::{RemoteError, RemoteResult};
use crate::types::RepositoryState;
use wit_types::RemoteId;

/// Decode a remote-encoded value to text, trying each representation in
/// fixed priority order. Returns `None` for null or undecodable shapes.
pub fn decode_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect();
            String::from_utf8(bytes?).ok()
        }
        Value::Object(fields) => {
            if let Some(inner) = fields.get("value") {
                return decode_text(inner);
            }
            fields.get("fields").and_then(decode_text)
        }
        _ => None,
    }
}

/// Decode a version counter: a JSON integer, or any text representation of
/// one (some writers encode counters as wrapped strings).
pub fn decode_version(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    decode_text(value)?.parse().ok()
}

impl RepositoryState {
    /// Decode a ledger record into the repository state.
    ///
    /// Head fields may be absent or null (no head yet); `version` is
    /// required.
    pub fn decode(record: &Value) -> RemoteResult<Self> {
        let fields = record
            .as_object()
            .ok_or_else(|| RemoteError::Decode("ledger record is not an object".into()))?;

        let head = |name: &str| -> RemoteResult<Option<RemoteId>> {
            match fields.get(name) {
                None | Some(Value::Null) => Ok(None),
                Some(value) => decode_text(value)
                    .map(|s| Some(RemoteId::new(s)))
                    .ok_or_else(|| RemoteError::Decode(format!("undecodable field {name}"))),
            }
        };

        let version = fields
            .get("version")
            .and_then(decode_version)
            .ok_or_else(|| RemoteError::Decode("missing or undecodable version".into()))?;

        Ok(Self {
            head_commit: head("head_commit")?,
            head_manifest: head("head_manifest")?,
            head_batch: head("head_batch")?,
            version,
        })
    }
}
