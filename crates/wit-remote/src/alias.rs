//! Storage-id alias resolution.
//!
//! Manifest entries written by different generations of the tool point at
//! file bytes in three different ways. [`storage_id`] is the single lookup,
//! with a fixed priority:
//!
//! 1. `remote_file_id`: the id minted by the batch upload (current form)
//! 2. `legacy_blob_ref`: the direct blob pointer older writers recorded
//! 3. the content hash's text form used as the storage key (oldest form)
//!
//! Call sites must not fall back ad hoc; this function is the contract.

use wit_types::RemoteId;

use crate::types::ManifestEntry;

/// Resolve where a manifest entry's bytes live in remote storage.
pub fn storage_id(entry: &ManifestEntry) -> RemoteId {
    if let Some(id) = &entry.remote_file_id {
        return id.clone();
    }
    if let Some(id) = &entry.legacy_blob_ref {
        return id.clone();
    }
    RemoteId::new(entry.meta.content_hash.to_text())
}
