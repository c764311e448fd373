//! Storage error types for robotflow-storage.
//!
//! [`StorageError`] covers all anticipated failure modes in the storage layer:
//! serialization, file I/O, unknown programs, and documents that do not
//! rebuild into a well-formed graph.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing a document file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A program with the given ID was not found.
    #[error("program not found: {0}")]
    ProgramNotFound(i64),

    /// The document was written by a newer format version.
    #[error("unsupported document version {found} (supported up to {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Failed to reconstruct a ProgramGraph from a document.
    #[error("reconstruction error: {reason}")]
    ReconstructionError { reason: String },
}

impl StorageError {
    pub(crate) fn reconstruction(reason: impl Into<String>) -> Self {
        StorageError::ReconstructionError {
            reason: reason.into(),
        }
    }
}
