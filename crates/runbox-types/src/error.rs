use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("no files found")]
    EmptyFileSet,

    #[error("duplicate file name: {0}")]
    DuplicateFileName(String),

    #[error("unknown file: {0}")]
    UnknownFile(String),

    #[error("cannot remove the last file: {0}")]
    LastFile(String),

    #[error("activeIndex exhausted, cannot focus {0}")]
    ActiveIndexOverflow(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
