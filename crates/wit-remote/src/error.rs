use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    /// Network or service failure. The only retryable category.
    #[error("transport error: {0}")]
    Transport(String),

    /// The conditional head update lost the race: another writer advanced
    /// the pointer. Never retried blindly.
    #[error("version conflict: expected {expected}, ledger is at {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("remote object not found: {0}")]
    NotFound(String),

    #[error("policy denied: {0}")]
    PolicyDenied(String),

    #[error("undecodable remote value: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether a bounded retry is appropriate.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;
