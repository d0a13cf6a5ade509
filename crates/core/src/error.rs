//! Core error types.

use thiserror::Error;

/// Errors raised while building or comparing vectors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Invalid vector: {0}")]
    InvalidVector(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
