//! Error types for scanning and generating number files.
//!
//! Every failure is fatal to the operation that raised it. Nothing is retried: a malformed or
//! unreadable file means a broken precondition, so the error travels back to the caller with
//! enough context (path and byte offsets) to find the offending data.
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for scan and generation operations
pub type Result<T, E = ScanError> = std::result::Result<T, E>;

/// Errors that can occur while scanning or generating a number file
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] config::ConfigError),
    #[error(
        "Parse error in {path} (chunk at offset {chunk_offset}, record at offset {record_offset}): {line:?} is not an integer"
    )]
    ParseError {
        path: PathBuf,
        chunk_offset: u64,
        record_offset: u64,
        line: String,
    },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ScanError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn parse_error(
        path: impl Into<PathBuf>,
        chunk_offset: u64,
        record_offset: u64,
        line: impl Into<String>,
    ) -> Self {
        Self::ParseError {
            path: path.into(),
            chunk_offset,
            record_offset,
            line: line.into(),
        }
    }

    /// Maps an I/O failure on `path` to the most specific variant
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }

    /// Byte offset of the chunk that failed to parse, if this is a parse error
    pub fn chunk_offset(&self) -> Option<u64> {
        match self {
            Self::ParseError { chunk_offset, .. } => Some(*chunk_offset),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_creation() {
        let path = Path::new("numbers.txt");
        let err = ScanError::file_not_found(path);
        assert!(matches!(err, ScanError::FileNotFound(_)));

        let err = ScanError::permission_denied(path);
        assert!(matches!(err, ScanError::PermissionDenied(_)));

        let err = ScanError::config_error("chunk size must be positive");
        assert!(matches!(err, ScanError::ConfigError(_)));

        let err = ScanError::parse_error(path, 0, 6, "abc");
        assert!(matches!(err, ScanError::ParseError { .. }));
        assert_eq!(err.chunk_offset(), Some(0));
    }

    #[test]
    fn test_io_error_mapping() {
        let path = Path::new("missing.txt");
        let err = ScanError::from_io(path, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, ScanError::FileNotFound(p) if p == path));

        let err = ScanError::from_io(path, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, ScanError::PermissionDenied(_)));

        let err = ScanError::from_io(path, io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(err, ScanError::IoError(_)));
        assert_eq!(err.chunk_offset(), None);
    }

    #[test]
    fn test_error_messages() {
        let err = ScanError::config_error("Missing required field".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required field"
        );

        let err = ScanError::file_not_found("numbers.txt");
        assert_eq!(err.to_string(), "File not found: numbers.txt");

        let err = ScanError::parse_error("numbers.txt", 4096, 4100, "abc");
        assert_eq!(
            err.to_string(),
            "Parse error in numbers.txt (chunk at offset 4096, record at offset 4100): \"abc\" is not an integer"
        );
    }
}
