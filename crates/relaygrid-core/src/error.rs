//! Error type shared by the network model and its importers.
//!
//! Protection-specific failures live in `relaygrid-protection`; they wrap
//! [`GridError`] when a network lookup or case import is the root cause.

use thiserror::Error;

/// Unified error type for network construction and case loading.
#[derive(Error, Debug)]
pub enum GridError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Network structure errors (unknown bus, dangling branch, ...)
    #[error("Network error: {0}")]
    Network(String),
}

pub type GridResult<T> = Result<T, GridError>;

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GridError::Network("bus 99 does not exist".into());
        assert!(err.to_string().contains("Network error"));
        assert!(err.to_string().contains("bus 99"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GridError = io_err.into();
        assert!(matches!(err, GridError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: GridError = json_err.into();
        assert!(matches!(err, GridError::Parse(_)));
    }
}
