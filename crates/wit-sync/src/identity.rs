//! The identity map: local commit ids ↔ remote commit ids.
//!
//! Append/overwrite-only: an entry transitions from absent to a concrete
//! remote id exactly once and never reverts: remote ids are immutable once
//! minted. Entries are persisted the moment they are recorded, which is
//! what makes a crashed push resumable without re-uploading.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;
use wit_hash::canonical_bytes;
use wit_types::{CommitId, RemoteId};

use crate::error::{SyncError, SyncResult};

pub struct IdentityMap {
    path: PathBuf,
    entries: BTreeMap<CommitId, RemoteId>,
}

impl IdentityMap {
    /// Load from disk; a missing file is an empty map.
    pub fn load(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let path = path.into();
        let entries = if path.is_file() {
            let bytes = std::fs::read(&path).map_err(|e| SyncError::Storage(e.to_string()))?;
            serde_json::from_slice(&bytes).map_err(|e| SyncError::Storage(e.to_string()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &CommitId) -> Option<&RemoteId> {
        self.entries.get(id)
    }

    /// Reverse lookup: the local commit a remote id was minted for.
    pub fn local_for(&self, remote: &RemoteId) -> Option<CommitId> {
        self.entries
            .iter()
            .find(|(_, r)| *r == remote)
            .map(|(local, _)| *local)
    }

    /// Record a mapping and persist immediately.
    ///
    /// Re-recording the same pair is a no-op (push resumption does this);
    /// a conflicting remote id for an already-mapped commit can only mean
    /// tampering or a bug, and is surfaced as corruption.
    pub fn record(&mut self, local: CommitId, remote: RemoteId) -> SyncResult<()> {
        if let Some(existing) = self.entries.get(&local) {
            if *existing != remote {
                return Err(SyncError::CorruptHistory(format!(
                    "commit {local} already mapped to {existing}, refusing remap to {remote}"
                )));
            }
            return Ok(());
        }
        debug!(local = %local.short(), remote = %remote.short(), "identity recorded");
        self.entries.insert(local, remote);
        self.save()
    }

    fn save(&self) -> SyncResult<()> {
        let bytes =
            canonical_bytes(&self.entries).map_err(|e| SyncError::Storage(e.to_string()))?;
        std::fs::write(&self.path, bytes).map_err(|e| SyncError::Storage(e.to_string()))
    }
}
