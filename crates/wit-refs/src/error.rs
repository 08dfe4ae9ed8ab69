use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not a wit repository (missing {0})")]
    NotInitialized(String),
}

pub type RefResult<T> = Result<T, RefError>;
