use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored bytes hash to {actual}, expected {expected}")]
    HashMismatch { expected: String, actual: String },
}

pub type StoreResult<T> = Result<T, StoreError>;
