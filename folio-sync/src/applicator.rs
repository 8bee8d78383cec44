//! Writes a merged manifest back into the local store.

use folio_storage::{LocalStore, StorageResult};
use folio_types::{Book, LexiconRule, SyncManifest};
use tracing::debug;

/// What [`apply_state_to_local`] changed in the book collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Existing books whose metadata was replaced by a newer remote copy.
    pub books_updated: usize,
    /// Books known only remotely, written as offloaded placeholders.
    pub placeholders_created: usize,
}

/// Applies `merged` to the local store in a single transaction.
///
/// Book metadata only moves forward: an existing book is updated when the
/// merged `last_read` is strictly newer, and keeps its offload flag and
/// cover. Every other collection is overwritten from the manifest, and the
/// lexicon is replaced wholesale so its order matches `merged.lexicon`.
pub fn apply_state_to_local(
    store: &LocalStore,
    merged: &SyncManifest,
) -> StorageResult<ApplySummary> {
    store.transaction(|tx| {
        let mut summary = ApplySummary::default();

        for (id, record) in &merged.books {
            match tx.get::<Book>(id)? {
                Some(mut book) => {
                    if record.metadata.last_read_or_zero() > book.last_read_or_zero() {
                        book.apply_metadata(&record.metadata);
                        tx.put(&book)?;
                        summary.books_updated += 1;
                    }
                }
                None => {
                    debug!("Materializing remote book {} as placeholder", id);
                    tx.put(&Book::placeholder(&record.metadata))?;
                    summary.placeholders_created += 1;
                }
            }

            tx.put(&record.history)?;
            for annotation in &record.annotations {
                tx.put(annotation)?;
            }
        }

        // Rule order is significant; upserts would keep the local rowid order
        tx.clear::<LexiconRule>()?;
        for rule in &merged.lexicon {
            tx.put(rule)?;
        }
        for entry in merged.reading_list.values() {
            tx.put(entry)?;
        }
        for pos in merged.tts_positions().values() {
            tx.put(pos)?;
        }

        Ok(summary)
    })
}
