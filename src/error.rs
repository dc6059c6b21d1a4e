//! Error types for the treestat library
//!
//! Every failure in treestat is fatal to the run that hit it: nothing is
//! retried and nothing is skipped. The variants below exist so that callers
//! can tell the failure modes apart, not so they can recover from them.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the treestat library
pub type Result<T> = std::result::Result<T, StatError>;

/// Main error type for all treestat operations
#[derive(Debug, Error)]
pub enum StatError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The path handed to the walker does not exist
    #[error("File not found: {path:?}")]
    FileNotFound {
        /// Path that could not be found
        path: PathBuf,
    },

    /// The path exists but is neither a file, a directory nor a symbolic link
    #[error("Unsupported file type: {path:?}")]
    UnsupportedFileType {
        /// Path to the unsupported entry (fifo, socket, device...)
        path: PathBuf,
    },

    /// An entry name or link target is not valid UTF-8 and has no exact
    /// snapshot representation
    #[error("Path is not valid UTF-8: {path:?}")]
    InvalidPathEncoding {
        /// Offending path
        path: PathBuf,
    },

    /// A snapshot line is not made of exactly 8 well-formed fields
    #[error("Invalid snapshot line ({reason}): {line}")]
    InvalidFormat {
        /// The offending line, verbatim
        line: String,
        /// What is wrong with it
        reason: String,
    },

    /// The kind field of a snapshot line is not `f`, `d` or `l`
    #[error("Invalid kind code: {0}")]
    InvalidKindCode(String),

    /// A snapshot file could not be parsed; wraps the line-level failure
    #[error("Failed to parse {file:?} at line {line_number}: {source}")]
    SnapshotParse {
        /// Snapshot file being loaded
        file: PathBuf,
        /// 1-based line number
        line_number: usize,
        /// Underlying line error
        #[source]
        source: Box<StatError>,
    },

    /// Invalid combination of run options
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StatError {
    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        StatError::Internal(msg.into())
    }

    /// Create a format error for a snapshot line
    pub fn invalid_format(line: &str, reason: impl Into<String>) -> Self {
        StatError::InvalidFormat {
            line: line.to_string(),
            reason: reason.into(),
        }
    }

    /// Check if this error comes from a malformed snapshot file
    pub fn is_format_error(&self) -> bool {
        match self {
            StatError::InvalidFormat { .. } | StatError::InvalidKindCode(_) => true,
            StatError::SnapshotParse { source, .. } => source.is_format_error(),
            _ => false,
        }
    }

    /// Check if this error comes from classifying a filesystem entry
    pub fn is_classification_error(&self) -> bool {
        matches!(
            self,
            StatError::FileNotFound { .. }
                | StatError::UnsupportedFileType { .. }
                | StatError::InvalidPathEncoding { .. }
        )
    }
}
