use thiserror::Error;
use wit_types::CommitId;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("nothing staged: the index is empty")]
    EmptyIndex,

    #[error("commit not found: {0}")]
    NotFound(CommitId),

    #[error("corrupt commit object {id}: {reason}")]
    Corrupt { id: CommitId, reason: String },

    #[error("corrupt history: commit {0} appears twice in the parent chain")]
    CorruptHistory(CommitId),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(#[from] wit_store::StoreError),
}

pub type ChainResult<T> = Result<T, ChainError>;
