//! Library entities persisted per device and exchanged through the manifest.

use serde::{Deserialize, Serialize};

/// The syncable subset of a book's fields.
///
/// This is what travels inside a [`BookSyncRecord`](crate::BookSyncRecord);
/// binary content and device-local flags stay on [`Book`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookMetadata {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub added_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read: Option<i64>,
    /// Reading progress in `0.0..=1.0`.
    #[serde(default)]
    pub progress: f64,
    /// Current position marker (an EPUB CFI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_cfi: Option<String>,
}

impl BookMetadata {
    /// `last_read` with "never read" mapped to `0`, the LWW comparison key.
    #[must_use]
    pub fn last_read_or_zero(&self) -> i64 {
        self.last_read.unwrap_or(0)
    }
}

/// A book as stored on this device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub added_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read: Option<i64>,
    #[serde(default)]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_cfi: Option<String>,
    /// Set when the book's file content is not present on this device.
    #[serde(default)]
    pub is_offloaded: bool,
    /// Cover image bytes. Never synced, stripped from checkpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_blob: Option<Vec<u8>>,
}

impl Book {
    /// Creates a freshly imported book with no reading progress.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        added_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            description: None,
            added_at,
            last_read: None,
            progress: 0.0,
            current_cfi: None,
            is_offloaded: false,
            cover_blob: None,
        }
    }

    /// Materializes a book known only from remote metadata.
    ///
    /// The file content is never part of the manifest, so the result is
    /// always flagged offloaded.
    #[must_use]
    pub fn placeholder(metadata: &BookMetadata) -> Self {
        let mut book = Self::new(
            metadata.id.clone(),
            metadata.title.clone(),
            metadata.author.clone(),
            metadata.added_at,
        );
        book.apply_metadata(metadata);
        book.is_offloaded = true;
        book
    }

    /// Returns the syncable fields of this book.
    #[must_use]
    pub fn metadata(&self) -> BookMetadata {
        BookMetadata {
            id: self.id.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            description: self.description.clone(),
            added_at: self.added_at,
            last_read: self.last_read,
            progress: self.progress,
            current_cfi: self.current_cfi.clone(),
        }
    }

    /// Overwrites the syncable fields, keeping device-local ones.
    pub fn apply_metadata(&mut self, metadata: &BookMetadata) {
        self.title = metadata.title.clone();
        self.author = metadata.author.clone();
        self.description = metadata.description.clone();
        self.added_at = metadata.added_at;
        self.last_read = metadata.last_read;
        self.progress = metadata.progress;
        self.current_cfi = metadata.current_cfi.clone();
    }

    /// Returns a copy with binary fields removed.
    #[must_use]
    pub fn without_binary(&self) -> Self {
        Self {
            cover_blob: None,
            ..self.clone()
        }
    }

    /// `last_read` with "never read" mapped to `0`.
    #[must_use]
    pub fn last_read_or_zero(&self) -> i64 {
        self.last_read.unwrap_or(0)
    }
}

/// How a reading session was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Page,
    Scroll,
    Tts,
}

/// One visit to a range of the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSession {
    pub cfi_range: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: SessionKind,
}

/// Reading history for one book.
///
/// `read_ranges` has set semantics: order is insertion order and duplicates
/// are never stored, but overlapping ranges are not coalesced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingHistoryEntry {
    pub book_id: String,
    #[serde(default)]
    pub read_ranges: Vec<String>,
    #[serde(default)]
    pub sessions: Vec<ReadingSession>,
    pub last_updated: i64,
}

impl ReadingHistoryEntry {
    /// Creates an empty history for a book.
    pub fn new(book_id: impl Into<String>) -> Self {
        Self {
            book_id: book_id.into(),
            read_ranges: Vec::new(),
            sessions: Vec::new(),
            last_updated: 0,
        }
    }

    /// Records a range as read. Returns false if it was already present.
    pub fn add_range(&mut self, range: impl Into<String>) -> bool {
        let range = range.into();
        if self.read_ranges.contains(&range) {
            return false;
        }
        self.read_ranges.push(range);
        true
    }
}

/// Visual style of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Highlight,
    Note,
}

/// A highlight or note. Immutable once created; identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    pub book_id: String,
    pub cfi_range: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created: i64,
}

/// A pronunciation rule applied before speech synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LexiconRule {
    pub id: String,
    pub original: String,
    pub replacement: String,
    #[serde(default)]
    pub is_regex: bool,
    pub created: i64,
    /// Absent for rules that apply to every book.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,
}

impl LexiconRule {
    /// Returns true if the rule has no book scope.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.book_id.is_none()
    }

    /// Returns true if the rule should be applied while reading `book_id`.
    #[must_use]
    pub fn applies_to(&self, book_id: &str) -> bool {
        self.book_id.as_deref().is_none_or(|scope| scope == book_id)
    }
}

/// Where a reading-list entry stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadingStatus {
    Read,
    CurrentlyReading,
    ToRead,
}

/// A portable reading-list entry keyed by file name, so it survives
/// re-importing the same file on another device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingListEntry {
    pub filename: String,
    pub title: String,
    pub author: String,
    /// Progress in `0.0..=1.0`.
    #[serde(default)]
    pub percentage: f64,
    pub last_updated: i64,
    pub status: ReadingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

/// Lightweight playback position of the TTS queue for one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsPosition {
    pub book_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfi: Option<String>,
    #[serde(default)]
    pub section_index: u32,
    #[serde(default)]
    pub queue_index: u32,
    pub updated_at: i64,
}
