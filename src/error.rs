//! Error types for the parallel Jacobi eigensolver

use thiserror::Error;

/// Main error type for solver and driver operations
#[derive(Error, Debug)]
pub enum JacobiError {
    #[error("usage error: {0}")]
    UsageError(String),

    #[error("input error: {0}")]
    InputError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("malformed timer serialization: {0}")]
    TimerParseError(String),
}

/// Result type for solver and driver operations
pub type Result<T> = std::result::Result<T, JacobiError>;
