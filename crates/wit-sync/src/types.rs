//! Operation reports.

use wit_index::DiffEntry;
use wit_types::{CommitId, RemoteId};

use crate::state::SyncState;

/// Outcome of a push.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushReport {
    /// The remote head already matches the local head. Idempotent no-op;
    /// the pointer-update endpoint was not called.
    UpToDate,
    Pushed {
        commits: usize,
        head: RemoteId,
        new_version: u64,
    },
}

/// Outcome of a fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchReport {
    /// The remote repository has no head yet.
    NoRemoteHead,
    Fetched {
        head: RemoteId,
        /// Remote commits downloaded and validated this fetch (0 when the
        /// head was already cached).
        new_commits: usize,
    },
}

/// Outcome of a pull.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PullReport {
    UpToDate,
    FastForward {
        from: Option<CommitId>,
        to: CommitId,
    },
}

/// Outcome of a checkout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckoutReport {
    pub written: usize,
    pub deleted: usize,
}

/// Working-tree and index status.
#[derive(Clone, Debug, Default)]
pub struct StatusReport {
    /// On disk, unignored, not in the index.
    pub untracked: Vec<String>,
    /// In the index, content differs on disk.
    pub modified: Vec<String>,
    /// In the index, missing on disk.
    pub deleted: Vec<String>,
    /// Index vs the HEAD commit's file set.
    pub staged: Vec<DiffEntry>,
    pub state: SyncState,
}

impl StatusReport {
    /// Clean in the pull sense: nothing untracked, modified, or deleted.
    pub fn worktree_clean(&self) -> bool {
        self.untracked.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Paths blocking a pull, for the `NotClean` message.
    pub fn dirty_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        paths.extend(self.untracked.iter().cloned());
        paths.extend(self.modified.iter().cloned());
        paths.extend(self.deleted.iter().cloned());
        paths
    }
}

/// One line of `wit log`.
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub id: CommitId,
    /// The remote identity, when this commit has been pushed.
    pub remote_id: Option<RemoteId>,
    pub author: String,
    pub message: String,
    pub timestamp_secs: u64,
}
