//! A consistent read of every syncable collection.

use folio_types::{
    Annotation, Book, LexiconRule, ReadingHistoryEntry, ReadingListEntry, TtsPosition,
};

/// Everything the sync engine reads from the local store in one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalState {
    pub books: Vec<Book>,
    pub history: Vec<ReadingHistoryEntry>,
    pub annotations: Vec<Annotation>,
    pub lexicon: Vec<LexiconRule>,
    pub reading_list: Vec<ReadingListEntry>,
    pub tts_positions: Vec<TtsPosition>,
}

impl LocalState {
    pub fn history_for(&self, book_id: &str) -> Option<&ReadingHistoryEntry> {
        self.history.iter().find(|h| h.book_id == book_id)
    }

    /// Annotations belonging to `book_id`, in store order.
    pub fn annotations_for<'a>(&'a self, book_id: &'a str) -> impl Iterator<Item = &'a Annotation> {
        self.annotations.iter().filter(move |a| a.book_id == book_id)
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
            && self.history.is_empty()
            && self.annotations.is_empty()
            && self.lexicon.is_empty()
            && self.reading_list.is_empty()
            && self.tts_positions.is_empty()
    }
}
