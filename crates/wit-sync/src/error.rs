//! The engine's error taxonomy.
//!
//! Every failure carries a category and a human next step. Integrity
//! failures are fatal and never auto-repaired; divergence is distinct from
//! corruption and tells the user to reconcile; preconditions are
//! user-actionable; transport failures are the only retryable class.

use std::path::PathBuf;

use thiserror::Error;
use wit_types::{CommitId, RemoteId, RootHash};

/// Failure categories, in decreasing severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Corrupted or mismatched history. Fatal; abort before any further
    /// mutation.
    Integrity,
    /// The remote advanced past what this client can extend.
    Divergence,
    /// A user-actionable precondition is unmet.
    Precondition,
    /// Network or service failure.
    Transport,
    /// Local storage or internal failure.
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integrity => write!(f, "integrity"),
            Self::Divergence => write!(f, "divergence"),
            Self::Precondition => write!(f, "precondition"),
            Self::Transport => write!(f, "transport"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    // ---- Integrity ----
    #[error("root hash mismatch for commit {commit}: recomputed {actual}, recorded {expected}")]
    RootHashMismatch {
        commit: CommitId,
        expected: RootHash,
        actual: RootHash,
    },

    #[error("manifest {0} does not match its declared root hash")]
    ManifestMismatch(RemoteId),

    #[error("remote commit {0} disagrees with its manifest's root hash")]
    CommitManifestMismatch(RemoteId),

    #[error("blob verification failed for {path}: {reason}")]
    BlobVerificationFailed { path: String, reason: String },

    #[error("corrupt history: {0}")]
    CorruptHistory(String),

    // ---- Divergence ----
    #[error("remote has diverged: {0}")]
    Diverged(String),

    #[error("remote head is not a fast-forward of the local head")]
    NotFastForward,

    // ---- Preconditions ----
    #[error("nothing to push: no local commits")]
    NothingToPush,

    #[error("nothing staged: the index is empty")]
    EmptyIndex,

    #[error("working tree is not clean: {}", .0.join(", "))]
    NotClean(Vec<String>),

    #[error("not a wit repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("no remote repository configured")]
    NoRemote,

    #[error("policy requirement not satisfied: {0}")]
    PolicyDenied(String),

    // ---- Transport ----
    #[error("transport error: {0}")]
    Transport(String),

    // ---- Internal ----
    #[error("storage error: {0}")]
    Storage(String),
}

impl SyncError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RootHashMismatch { .. }
            | Self::ManifestMismatch(_)
            | Self::CommitManifestMismatch(_)
            | Self::BlobVerificationFailed { .. }
            | Self::CorruptHistory(_) => ErrorCategory::Integrity,
            Self::Diverged(_) | Self::NotFastForward => ErrorCategory::Divergence,
            Self::NothingToPush
            | Self::EmptyIndex
            | Self::NotClean(_)
            | Self::NotARepository(_)
            | Self::NoRemote
            | Self::PolicyDenied(_) => ErrorCategory::Precondition,
            Self::Transport(_) => ErrorCategory::Transport,
            Self::Storage(_) => ErrorCategory::Internal,
        }
    }

    /// The human next step shown alongside the failure.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::RootHashMismatch { .. }
            | Self::ManifestMismatch(_)
            | Self::CommitManifestMismatch(_)
            | Self::BlobVerificationFailed { .. }
            | Self::CorruptHistory(_) => {
                "history integrity is violated; do not retry, re-clone from the remote"
            }
            Self::Diverged(_) => "run `wit pull` to reconcile, then push again",
            Self::NotFastForward => {
                "local history and the remote cannot fast-forward; reset or re-clone"
            }
            Self::NothingToPush => "create a commit first with `wit commit`",
            Self::EmptyIndex => "stage files first with `wit add`",
            Self::NotClean(_) => "commit or restore local changes, then retry",
            Self::NotARepository(_) => "run `wit init` or move into a repository",
            Self::NoRemote => "push once to create the remote repository, or clone",
            Self::PolicyDenied(_) => "obtain access to the repository's policy and retry",
            Self::Transport(_) => "check connectivity and retry",
            Self::Storage(_) => "inspect local repository state; it may need repair",
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

impl From<wit_chain::ChainError> for SyncError {
    fn from(e: wit_chain::ChainError) -> Self {
        use wit_chain::ChainError;
        match e {
            ChainError::EmptyIndex => Self::EmptyIndex,
            ChainError::NotFound(id) => Self::CorruptHistory(format!("missing commit {id}")),
            ChainError::Corrupt { id, reason } => {
                Self::CorruptHistory(format!("commit {id}: {reason}"))
            }
            ChainError::CorruptHistory(id) => {
                Self::CorruptHistory(format!("cycle at commit {id}"))
            }
            ChainError::Serialization(msg) => Self::Storage(msg),
            ChainError::Store(e) => e.into(),
        }
    }
}

impl From<wit_store::StoreError> for SyncError {
    fn from(e: wit_store::StoreError) -> Self {
        use wit_store::StoreError;
        match e {
            // A stored object that no longer hashes to its id is corruption,
            // not an I/O hiccup.
            StoreError::HashMismatch { expected, actual } => Self::CorruptHistory(format!(
                "stored object hashes to {actual}, expected {expected}"
            )),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<wit_refs::RefError> for SyncError {
    fn from(e: wit_refs::RefError) -> Self {
        use wit_refs::RefError;
        match e {
            RefError::NotInitialized(path) => Self::NotARepository(PathBuf::from(path)),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<wit_index::IndexError> for SyncError {
    fn from(e: wit_index::IndexError) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<wit_remote::RemoteError> for SyncError {
    fn from(e: wit_remote::RemoteError) -> Self {
        use wit_remote::RemoteError;
        match e {
            RemoteError::Transport(msg) => Self::Transport(msg),
            RemoteError::NotFound(id) => Self::Transport(format!("remote object missing: {id}")),
            RemoteError::VersionConflict { expected, actual } => Self::Diverged(format!(
                "another writer advanced the remote pointer (expected version {expected}, found {actual})"
            )),
            RemoteError::PolicyDenied(msg) => Self::PolicyDenied(msg),
            RemoteError::Decode(msg) => Self::CorruptHistory(format!("undecodable remote record: {msg}")),
        }
    }
}

impl From<wit_seal::SealError> for SyncError {
    fn from(e: wit_seal::SealError) -> Self {
        use wit_seal::SealError;
        match e {
            SealError::AuthenticationFailed => Self::BlobVerificationFailed {
                path: String::new(),
                reason: "ciphertext authentication failed".into(),
            },
            SealError::BadEnvelope(msg) => Self::CorruptHistory(format!("bad envelope: {msg}")),
            SealError::Policy(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wit_types::ContentHash;

    #[test]
    fn categories_are_assigned() {
        let id = CommitId::new(ContentHash::from_bytes(b"c"));
        let root = RootHash::new(ContentHash::from_bytes(b"r"));
        assert_eq!(
            SyncError::RootHashMismatch {
                commit: id,
                expected: root,
                actual: root
            }
            .category(),
            ErrorCategory::Integrity
        );
        assert_eq!(
            SyncError::Diverged("x".into()).category(),
            ErrorCategory::Divergence
        );
        assert_eq!(SyncError::NothingToPush.category(), ErrorCategory::Precondition);
        assert_eq!(
            SyncError::Transport("down".into()).category(),
            ErrorCategory::Transport
        );
    }

    #[test]
    fn every_error_has_advice() {
        assert!(!SyncError::NotFastForward.advice().is_empty());
        assert!(!SyncError::EmptyIndex.advice().is_empty());
        assert!(!SyncError::Storage("x".into()).advice().is_empty());
    }

    #[test]
    fn version_conflict_maps_to_diverged() {
        let e: SyncError = wit_remote::RemoteError::VersionConflict {
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(matches!(e, SyncError::Diverged(_)));
        assert_eq!(e.category(), ErrorCategory::Divergence);
    }

    #[test]
    fn empty_index_maps_through_chain() {
        let e: SyncError = wit_chain::ChainError::EmptyIndex.into();
        assert!(matches!(e, SyncError::EmptyIndex));
    }
}
