use thiserror::Error;

/// Errors from parsing or validating foundation types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hash text: {0}")]
    InvalidHash(String),

    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown hash algorithm tag: {0}")]
    UnknownAlgorithm(String),
}
