//! Error types for meshkit

use thiserror::Error;

/// Main error type for meshkit operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type alias for meshkit operations
pub type Result<T> = std::result::Result<T, Error>;
