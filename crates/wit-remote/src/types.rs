//! Wire types exchanged with the remote collaborators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wit_hash::canonical_bytes;
use wit_index::root_hash_of;
use wit_types::{FileMetadata, RemoteId, RootHash};

use crate::error::{RemoteError, RemoteResult};

/// The remote pointer: the ledger's authoritative record of a repository.
///
/// `version` increments by exactly 1 per successful head update; it is the
/// optimistic-concurrency token every push must present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepositoryState {
    pub head_commit: Option<RemoteId>,
    pub head_manifest: Option<RemoteId>,
    pub head_batch: Option<RemoteId>,
    pub version: u64,
}

impl RepositoryState {
    /// A repository that has never had a head update.
    pub fn empty() -> Self {
        Self {
            head_commit: None,
            head_manifest: None,
            head_batch: None,
            version: 0,
        }
    }
}

/// One file in a batch upload.
#[derive(Clone, Debug)]
pub struct BatchFile {
    pub path: String,
    pub bytes: Vec<u8>,
}

/// Result of a batch upload: the batch id plus one storage id per file, in
/// the order the files were submitted.
#[derive(Clone, Debug)]
pub struct BatchReceipt {
    pub batch_id: RemoteId,
    pub file_ids: Vec<RemoteId>,
}

/// Evidence that the caller satisfies an access policy.
///
/// Opaque to wit; the policy service interprets it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyProof {
    pub policy_id: String,
    pub subject: String,
}

/// One file entry in a manifest: the metadata snapshot plus where the bytes
/// live in remote storage.
///
/// `legacy_blob_ref` is the historical storage pointer older writers
/// recorded; [`crate::alias::storage_id`] resolves the aliasing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(flatten)]
    pub meta: FileMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_file_id: Option<RemoteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_blob_ref: Option<RemoteId>,
}

/// The authoritative, externally stored file listing a remote commit
/// references instead of embedding files inline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub root_hash: RootHash,
    pub batch_id: RemoteId,
    pub files: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Recompute the root hash from the entries.
    ///
    /// Any holder of the manifest can derive this independently; a mismatch
    /// with the declared `root_hash` means the manifest is corrupt.
    pub fn compute_root_hash(&self) -> RemoteResult<RootHash> {
        root_hash_of(self.files.iter().map(|(path, entry)| (path, &entry.meta)))
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    pub fn canonical_bytes(&self) -> RemoteResult<Vec<u8>> {
        canonical_bytes(self).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> RemoteResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

/// The commit record uploaded to content storage.
///
/// Identical to a local commit except that the inline `files` map is
/// replaced by `{manifest_id, batch_id}` and the parent link uses the
/// parent's remote id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommitRecord {
    pub tree_root_hash: RootHash,
    pub manifest_id: RemoteId,
    pub batch_id: RemoteId,
    pub parent: Option<RemoteId>,
    pub author: String,
    pub message: String,
    pub timestamp_secs: u64,
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl RemoteCommitRecord {
    pub fn canonical_bytes(&self) -> RemoteResult<Vec<u8>> {
        canonical_bytes(self).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> RemoteResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}
