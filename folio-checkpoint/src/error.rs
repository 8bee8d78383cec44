//! Error types for checkpoint operations.

use thiserror::Error;

/// Result type for checkpoint operations.
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Errors that can occur while creating or restoring checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Local store error.
    #[error("storage error: {0}")]
    Storage(#[from] folio_storage::StorageError),

    /// The snapshot could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No checkpoint with this timestamp.
    #[error("checkpoint not found: {0}")]
    NotFound(i64),
}
