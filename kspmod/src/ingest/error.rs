//! Error types for metadata ingestion.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::store::StoreError;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that abort an ingestion run.
///
/// Individual malformed descriptors never surface here; they are counted in
/// the [`IngestReport`](super::IngestReport).
#[derive(Debug, Error)]
pub enum IngestError {
    /// A git operation against the metadata repository failed.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// The tracked branch does not exist on the remote.
    #[error("branch {branch:?} not found on {url}")]
    BranchNotFound { url: String, branch: String },

    /// A git network call exceeded its deadline.
    #[error("{operation} timed out after {timeout_secs}s")]
    Timeout {
        operation: &'static str,
        timeout_secs: u64,
    },

    /// Persisting or loading the registry failed.
    #[error("registry store error: {0}")]
    Store(#[from] StoreError),

    /// Local filesystem access failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    /// The parse worker pool could not be built or a blocking task died.
    #[error("worker pool error: {0}")]
    WorkerPool(String),
}
