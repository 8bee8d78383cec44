use crate::error::{CheckpointError, CheckpointResult};
use folio_storage::LocalStore;
use folio_types::{
    Annotation, Book, Checkpoint, CheckpointInfo, LexiconRule, MonotonicClock,
    ReadingHistoryEntry, now_millis,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Checkpoints kept by [`CheckpointService::new`].
pub const DEFAULT_RETENTION: usize = 10;

/// The serialized content of a checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointPayload {
    /// Books without cover blobs.
    #[serde(default)]
    pub books: Vec<Book>,
    #[serde(default)]
    pub history: Vec<ReadingHistoryEntry>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub lexicon: Vec<LexiconRule>,
}

/// Creates, lists and restores snapshots of the local store.
pub struct CheckpointService {
    store: Arc<LocalStore>,
    retention: usize,
    clock: MonotonicClock,
}

impl CheckpointService {
    /// Creates a service keeping the newest [`DEFAULT_RETENTION`] checkpoints.
    pub fn new(store: Arc<LocalStore>) -> CheckpointResult<Self> {
        Self::with_retention(store, DEFAULT_RETENTION)
    }

    /// Creates a service keeping the newest `retention` checkpoints.
    pub fn with_retention(store: Arc<LocalStore>, retention: usize) -> CheckpointResult<Self> {
        // Never hand out a timestamp at or below one already stored
        let latest = store.latest_checkpoint_timestamp()?.unwrap_or(0);
        Ok(Self {
            store,
            retention: retention.max(1),
            clock: MonotonicClock::starting_after(latest),
        })
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Snapshots the current local state and prunes old checkpoints.
    ///
    /// Returns the new checkpoint's timestamp, which is also its key.
    pub fn create_checkpoint(&self, reason: &str) -> CheckpointResult<i64> {
        let state = self.store.load_state()?;
        let payload = CheckpointPayload {
            books: state.books.iter().map(Book::without_binary).collect(),
            history: state.history,
            annotations: state.annotations,
            lexicon: state.lexicon,
        };
        let data = serde_json::to_string(&payload)?;

        let checkpoint = Checkpoint {
            timestamp: self.clock.tick_at(now_millis()),
            size_bytes: data.len() as u64,
            data,
            reason: reason.to_string(),
        };

        let pruned = self.store.transaction(|tx| {
            tx.put_checkpoint(&checkpoint)?;

            let existing = tx.list_checkpoints()?;
            let excess = existing.len().saturating_sub(self.retention);
            for old in &existing[..excess] {
                tx.delete_checkpoint(old.timestamp)?;
            }
            Ok(excess)
        })?;

        info!(
            "Created checkpoint {} ({}, {} bytes)",
            checkpoint.timestamp, checkpoint.reason, checkpoint.size_bytes
        );
        if pruned > 0 {
            debug!("Pruned {} old checkpoints", pruned);
        }

        Ok(checkpoint.timestamp)
    }

    /// Replaces books, history, annotations and lexicon with a snapshot.
    ///
    /// Covers still present in the live store are kept for books that
    /// exist in the snapshot. The reading list, TTS positions, book files
    /// and the sync log are left alone.
    pub fn restore_checkpoint(&self, timestamp: i64) -> CheckpointResult<()> {
        let checkpoint = self
            .store
            .get_checkpoint(timestamp)?
            .ok_or(CheckpointError::NotFound(timestamp))?;
        let payload: CheckpointPayload = serde_json::from_str(&checkpoint.data)?;

        self.store.transaction(|tx| {
            let mut covers: HashMap<String, Vec<u8>> = tx
                .get_all::<Book>()?
                .into_iter()
                .filter_map(|b| b.cover_blob.map(|cover| (b.id, cover)))
                .collect();

            tx.clear::<Book>()?;
            tx.clear::<ReadingHistoryEntry>()?;
            tx.clear::<Annotation>()?;
            tx.clear::<LexiconRule>()?;

            for book in &payload.books {
                let mut book = book.clone();
                book.cover_blob = covers.remove(&book.id);
                tx.put(&book)?;
            }
            for history in &payload.history {
                tx.put(history)?;
            }
            for annotation in &payload.annotations {
                tx.put(annotation)?;
            }
            for rule in &payload.lexicon {
                tx.put(rule)?;
            }
            Ok(())
        })?;

        info!(
            "Restored checkpoint {} ({} books)",
            timestamp,
            payload.books.len()
        );
        Ok(())
    }

    /// All checkpoints, oldest first, without their data.
    pub fn list_checkpoints(&self) -> CheckpointResult<Vec<CheckpointInfo>> {
        Ok(self.store.list_checkpoints()?)
    }

    pub fn get_checkpoint(&self, timestamp: i64) -> CheckpointResult<Option<Checkpoint>> {
        Ok(self.store.get_checkpoint(timestamp)?)
    }

    /// Decodes a checkpoint's payload without restoring it.
    pub fn payload(&self, timestamp: i64) -> CheckpointResult<CheckpointPayload> {
        let checkpoint = self
            .get_checkpoint(timestamp)?
            .ok_or(CheckpointError::NotFound(timestamp))?;
        Ok(serde_json::from_str(&checkpoint.data)?)
    }

    /// Deletes one checkpoint. Returns false if it did not exist.
    pub fn delete_checkpoint(&self, timestamp: i64) -> CheckpointResult<bool> {
        Ok(self.store.delete_checkpoint(timestamp)?)
    }
}
