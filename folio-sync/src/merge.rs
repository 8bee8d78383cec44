//! Pure reconciliation of local state with a remote manifest.
//!
//! Nothing here touches storage or the network: both functions take
//! borrowed inputs and build a new manifest.

use folio_storage::LocalState;
use folio_types::{
    Annotation, Book, BookSyncRecord, DeviceId, ReadingHistoryEntry, SyncManifest,
};
use std::collections::HashSet;

/// Builds a manifest from local state alone, for the very first push.
pub fn create_manifest(
    local: &LocalState,
    device_id: DeviceId,
    device_name: &str,
    now: i64,
) -> SyncManifest {
    let mut manifest = SyncManifest::new(device_id, now);
    manifest.touch(device_id, device_name, now);

    for book in &local.books {
        manifest
            .books
            .insert(book.id.clone(), book_record(local, book));
    }

    manifest.lexicon = local.lexicon.clone();

    for entry in &local.reading_list {
        manifest
            .reading_list
            .insert(entry.filename.clone(), entry.clone());
    }

    for pos in &local.tts_positions {
        manifest
            .transient_state
            .tts_positions
            .insert(pos.book_id.clone(), pos.clone());
    }

    manifest
}

/// Merges local state into a copy of `remote`.
///
/// Books and history merge per field (LWW on `last_read`, set unions for
/// ranges and annotations). The lexicon is an id union where the remote copy
/// wins. Reading list and TTS positions are LWW per key; local only wins
/// when strictly newer.
pub fn merge(
    local: &LocalState,
    remote: &SyncManifest,
    device_id: DeviceId,
    device_name: &str,
    now: i64,
) -> SyncManifest {
    let mut merged = remote.clone();
    merged.touch(device_id, device_name, now);

    for book in &local.books {
        match merged.books.get_mut(&book.id) {
            None => {
                merged
                    .books
                    .insert(book.id.clone(), book_record(local, book));
            }
            Some(record) => merge_book(record, local, book),
        }
    }

    for rule in &local.lexicon {
        if !merged.has_rule(&rule.id) {
            merged.lexicon.push(rule.clone());
        }
    }

    for entry in &local.reading_list {
        let newer = merged
            .reading_list
            .get(&entry.filename)
            .is_none_or(|existing| entry.last_updated > existing.last_updated);
        if newer {
            merged
                .reading_list
                .insert(entry.filename.clone(), entry.clone());
        }
    }

    for pos in &local.tts_positions {
        let positions = &mut merged.transient_state.tts_positions;
        let newer = positions
            .get(&pos.book_id)
            .is_none_or(|existing| pos.updated_at > existing.updated_at);
        if newer {
            positions.insert(pos.book_id.clone(), pos.clone());
        }
    }

    merged
}

fn book_record(local: &LocalState, book: &Book) -> BookSyncRecord {
    BookSyncRecord {
        metadata: book.metadata(),
        history: local
            .history_for(&book.id)
            .cloned()
            .unwrap_or_else(|| ReadingHistoryEntry::new(book.id.clone())),
        annotations: local.annotations_for(&book.id).cloned().collect(),
    }
}

fn merge_book(record: &mut BookSyncRecord, local: &LocalState, book: &Book) {
    if book.last_read_or_zero() > record.metadata.last_read_or_zero() {
        record.metadata = book.metadata();
    }

    merge_annotations(&mut record.annotations, local.annotations_for(&book.id));

    if let Some(history) = local.history_for(&book.id) {
        merge_history(&mut record.history, history);
    }
}

fn merge_annotations<'a>(
    into: &mut Vec<Annotation>,
    local: impl Iterator<Item = &'a Annotation>,
) {
    let mut seen: HashSet<String> = into.iter().map(|a| a.id.clone()).collect();
    for annotation in local {
        if seen.insert(annotation.id.clone()) {
            into.push(annotation.clone());
        }
    }
}

fn merge_history(into: &mut ReadingHistoryEntry, local: &ReadingHistoryEntry) {
    let mut seen: HashSet<String> = into.read_ranges.iter().cloned().collect();
    for range in &local.read_ranges {
        if seen.insert(range.clone()) {
            into.read_ranges.push(range.clone());
        }
    }

    into.sessions.extend(local.sessions.iter().cloned());
    // Stable sort keeps the remote copy first among equal timestamps
    into.sessions.sort_by_key(|s| s.timestamp);
    into.sessions.dedup_by_key(|s| s.timestamp);

    into.last_updated = into.last_updated.max(local.last_updated);
}
