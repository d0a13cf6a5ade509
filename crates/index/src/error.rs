//! LSH index error types.

use quiver_core::{CoreError, VectorKey};
use thiserror::Error;

/// LSH-related errors.
#[derive(Error, Debug)]
pub enum LshError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Key not found: {0}")]
    NotFound(VectorKey),

    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CoreError> for LshError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DimensionMismatch { expected, got } => {
                LshError::DimensionMismatch { expected, got }
            }
            CoreError::InvalidVector(msg) => LshError::InvalidVector(msg),
        }
    }
}

pub type LshResult<T> = Result<T, LshError>;
