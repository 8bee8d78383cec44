use folio_types::{Book, LexiconRule, ReadingHistoryEntry, ReadingListEntry, ReadingStatus};
use pretty_assertions::assert_eq;

fn sample_book() -> Book {
    let mut book = Book::new("b1", "Dune", "Frank Herbert", 100);
    book.last_read = Some(2_000);
    book.progress = 0.4;
    book.current_cfi = Some("epubcfi(/6/4!/4/2)".into());
    book.cover_blob = Some(vec![1, 2, 3]);
    book
}

#[test]
fn placeholder_is_offloaded_and_has_no_cover() {
    let meta = sample_book().metadata();
    let placeholder = Book::placeholder(&meta);
    assert!(placeholder.is_offloaded);
    assert!(placeholder.cover_blob.is_none());
    assert_eq!(placeholder.metadata(), meta);
}

#[test]
fn apply_metadata_keeps_local_only_fields() {
    let mut book = sample_book();
    let mut meta = book.metadata();
    meta.title = "Dune Messiah".into();
    meta.progress = 0.9;
    book.apply_metadata(&meta);
    assert_eq!(book.title, "Dune Messiah");
    assert_eq!(book.progress, 0.9);
    assert_eq!(book.cover_blob, Some(vec![1, 2, 3]));
    assert!(!book.is_offloaded);
}

#[test]
fn without_binary_strips_cover() {
    let stripped = sample_book().without_binary();
    assert!(stripped.cover_blob.is_none());
    assert_eq!(stripped.title, "Dune");
}

#[test]
fn book_json_is_camel_case_and_omits_missing_cover() {
    let json = serde_json::to_value(Book::new("b2", "T", "A", 1)).unwrap();
    assert_eq!(json["addedAt"], 1);
    assert_eq!(json["isOffloaded"], false);
    assert!(json.get("coverBlob").is_none());
    assert!(json.get("lastRead").is_none());
}

#[test]
fn history_add_range_is_a_set() {
    let mut history = ReadingHistoryEntry::new("b1");
    assert!(history.add_range("r1"));
    assert!(history.add_range("r2"));
    assert!(!history.add_range("r1"));
    assert_eq!(history.read_ranges, vec!["r1".to_string(), "r2".to_string()]);
}

#[test]
fn lexicon_scope() {
    let global = LexiconRule {
        id: "l1".into(),
        original: "Hermione".into(),
        replacement: "Her-my-oh-nee".into(),
        is_regex: false,
        created: 1,
        book_id: None,
    };
    let scoped = LexiconRule {
        book_id: Some("b1".into()),
        id: "l2".into(),
        ..global.clone()
    };
    assert!(global.is_global());
    assert!(global.applies_to("anything"));
    assert!(!scoped.is_global());
    assert!(scoped.applies_to("b1"));
    assert!(!scoped.applies_to("b2"));
}

#[test]
fn reading_status_wire_names() {
    let entry = ReadingListEntry {
        filename: "dune.epub".into(),
        title: "Dune".into(),
        author: "Frank Herbert".into(),
        percentage: 0.5,
        last_updated: 10,
        status: ReadingStatus::CurrentlyReading,
        rating: None,
    };
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["status"], "currently-reading");
    assert_eq!(json["lastUpdated"], 10);
}
