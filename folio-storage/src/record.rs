//! Mapping between library entities and store collections.

use folio_types::{
    Annotation, Book, LexiconRule, ReadingHistoryEntry, ReadingListEntry, TtsPosition,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A named collection in the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Books,
    ReadingHistory,
    Annotations,
    Lexicon,
    ReadingList,
    TtsPositions,
}

impl Collection {
    /// Every record collection, in schema creation order.
    pub const ALL: [Collection; 6] = [
        Collection::Books,
        Collection::ReadingHistory,
        Collection::Annotations,
        Collection::Lexicon,
        Collection::ReadingList,
        Collection::TtsPositions,
    ];

    /// Table backing this collection.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Books => "books",
            Self::ReadingHistory => "reading_history",
            Self::Annotations => "annotations",
            Self::Lexicon => "lexicon",
            Self::ReadingList => "reading_list",
            Self::TtsPositions => "tts_positions",
        }
    }
}

/// An entity stored in one [`Collection`] under a string key.
///
/// Records with a binary field override [`take_blob`](Record::take_blob) and
/// [`set_blob`](Record::set_blob) so the bytes land in the row's `blob`
/// column instead of the JSON document.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;

    /// Identity key within the collection.
    fn key(&self) -> &str;

    fn take_blob(&mut self) -> Option<Vec<u8>> {
        None
    }

    fn set_blob(&mut self, _blob: Option<Vec<u8>>) {}
}

impl Record for Book {
    const COLLECTION: Collection = Collection::Books;

    fn key(&self) -> &str {
        &self.id
    }

    fn take_blob(&mut self) -> Option<Vec<u8>> {
        self.cover_blob.take()
    }

    fn set_blob(&mut self, blob: Option<Vec<u8>>) {
        self.cover_blob = blob;
    }
}

impl Record for ReadingHistoryEntry {
    const COLLECTION: Collection = Collection::ReadingHistory;

    fn key(&self) -> &str {
        &self.book_id
    }
}

impl Record for Annotation {
    const COLLECTION: Collection = Collection::Annotations;

    fn key(&self) -> &str {
        &self.id
    }
}

impl Record for LexiconRule {
    const COLLECTION: Collection = Collection::Lexicon;

    fn key(&self) -> &str {
        &self.id
    }
}

impl Record for ReadingListEntry {
    const COLLECTION: Collection = Collection::ReadingList;

    fn key(&self) -> &str {
        &self.filename
    }
}

impl Record for TtsPosition {
    const COLLECTION: Collection = Collection::TtsPositions;

    fn key(&self) -> &str {
        &self.book_id
    }
}
