//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The remote document could not be interpreted as a manifest.
    #[error("manifest error: {0}")]
    Manifest(#[from] folio_types::Error),

    /// Local store error.
    #[error("storage error: {0}")]
    Storage(#[from] folio_storage::StorageError),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The remote revision moved on since it was read.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Remote resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Timeout.
    #[error("operation timed out")]
    Timeout,

    /// A background task died.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Returns true for a stale concurrency token on a conditional write.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::PreconditionFailed(_))
    }
}
