use std::io;
use thiserror::Error;

use crate::compression::CompressionError;

/// Unified error for every store operation.
/// - One variant per failure class so callers can match on where things went wrong.
/// - `From<T>` impls let `?` work across stage, codec and serializer boundaries.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Open/read/write/flush failure on the storage handle.
    #[error("storage error: {0}")]
    Storage(#[from] io::Error),

    /// Engine-level encode/decode failure.
    #[error("transform error: {0}")]
    Transform(#[from] CompressionError),

    /// Serializer rejected the value, or could not parse the decoded bytes.
    #[error("format error: {0}")]
    Format(#[from] serde_json::Error),

    /// Caller's cancel token fired before the pipeline settled.
    #[error("operation cancelled")]
    Cancelled,

    /// Caller-supplied configuration is out of range.
    #[error("validation error: {0}")]
    Validation(String),

    /// A stage exited abnormally (panic, broken link).
    #[error("pipeline error: {0}")]
    Pipeline(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Storage,
    Transform,
    Format,
    Cancelled,
    Validation,
    Pipeline,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Storage(_) => ErrorKind::Storage,
            StoreError::Transform(_) => ErrorKind::Transform,
            StoreError::Format(_) => ErrorKind::Format,
            StoreError::Cancelled => ErrorKind::Cancelled,
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::Pipeline(_) => ErrorKind::Pipeline,
        }
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
