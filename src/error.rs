//! Error types shared by the tag store, scanner and encoding repair.

use std::path::PathBuf;
use thiserror::Error;

/// Per-file tag store failures. Both mark the file failed; the batch continues.
#[derive(Debug, Error)]
pub enum TagError {
    /// Tag store could not open or parse the file
    #[error("failed to read tags from {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    /// Destination unwritable, copy failed, or the tag could not be saved
    #[error("failed to write tags to {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

impl TagError {
    pub fn read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        TagError::Read {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        TagError::Write {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Directory scan failures. Fatal to the whole invocation.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("cannot resolve {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("directory walk failed under {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Charset decode failure. Non-fatal: the field is left as-is.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("malformed {label} byte sequence")]
    Malformed { label: &'static str },
}
