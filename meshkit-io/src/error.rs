//! Error types for I/O operations

use thiserror::Error;

/// Errors that can occur while reading or writing mesh files
#[derive(Error, Debug)]
pub enum IoError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IoError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        IoError::ParseError {
            line,
            message: message.into(),
        }
    }
}

impl From<IoError> for meshkit_core::Error {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Io(e) => meshkit_core::Error::Io(e),
            IoError::FileNotFound { path } => meshkit_core::Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            )),
            IoError::ParseError { line, message } => {
                meshkit_core::Error::InvalidData(format!("line {}: {}", line, message))
            }
        }
    }
}
