//! Core type definitions for Folio.
//!
//! This crate defines the data model shared by the local store, the sync
//! engine and the checkpoint service:
//! - Device identifiers (UUID v7)
//! - Millisecond timestamps and a monotonic clock for identity keys
//! - Library entities (books, reading history, annotations, lexicon rules,
//!   reading-list entries, TTS positions)
//! - The [`SyncManifest`] exchanged with the remote store
//! - Sync-log and checkpoint records
//!
//! Every wire struct serializes as camelCase JSON.

mod ids;
mod library;
mod log;
mod manifest;
mod timestamp;

pub use ids::DeviceId;
pub use library::{
    Annotation, AnnotationKind, Book, BookMetadata, LexiconRule, ReadingHistoryEntry,
    ReadingListEntry, ReadingSession, ReadingStatus, SessionKind, TtsPosition,
};
pub use log::{Checkpoint, CheckpointInfo, SyncLogEntry, SyncLogType, SyncStatus};
pub use manifest::{BookSyncRecord, DeviceInfo, MANIFEST_VERSION, SyncManifest, TransientState};
pub use timestamp::{MonotonicClock, now_millis};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("unsupported manifest version {found} (newest known is {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}
