use folio_storage::{LocalState, LocalStore};
use folio_sync::{MockProvider, SyncConfig, SyncOutcome, SyncService, create_manifest};
use folio_types::{
    Annotation, AnnotationKind, Book, DeviceId, LexiconRule, ReadingHistoryEntry, SyncLogType,
    SyncManifest, SyncStatus, now_millis,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn book(id: &str, title: &str, last_read: Option<i64>) -> Book {
    let mut b = Book::new(id, title, "Author", 1);
    b.last_read = last_read;
    b
}

fn annotation(id: &str, book_id: &str) -> Annotation {
    Annotation {
        id: id.into(),
        book_id: book_id.into(),
        cfi_range: "epubcfi(/6/2!/4/1:0)".into(),
        text: "quote".into(),
        kind: AnnotationKind::Note,
        color: "green".into(),
        note: Some("remember".into()),
        created: 7,
    }
}

fn rule(id: &str) -> LexiconRule {
    LexiconRule {
        id: id.into(),
        original: "Cthulhu".into(),
        replacement: "kuh-THOO-loo".into(),
        is_regex: false,
        created: 1,
        book_id: None,
    }
}

fn config(name: &str) -> SyncConfig {
    SyncConfig {
        device_name: name.to_string(),
        ..Default::default()
    }
}

fn service(store: &Arc<LocalStore>, mock: &MockProvider, config: SyncConfig) -> SyncService {
    init_tracing();
    SyncService::new(config, Arc::clone(store), Arc::new(mock.clone()))
}

fn new_store() -> Arc<LocalStore> {
    Arc::new(LocalStore::open_in_memory().unwrap())
}

/// A manifest written by some other device.
fn foreign_manifest(state: &LocalState) -> SyncManifest {
    create_manifest(state, DeviceId::new(), "Other Device", 1_000)
}

fn log_kinds(store: &LocalStore) -> Vec<(SyncLogType, SyncStatus)> {
    store
        .sync_log(100)
        .unwrap()
        .into_iter()
        .map(|e| (e.kind, e.status))
        .collect()
}

// ── Config ──────────────────────────────────────────────────────

#[test]
fn default_config() {
    let config = SyncConfig::default();
    assert_eq!(config.device_name, "Folio Device");
    assert_eq!(config.remote_timeout, Duration::from_secs(30));
    assert_eq!(config.conflict_retries, 0);
}

// ── Push ────────────────────────────────────────────────────────

#[tokio::test]
async fn first_sync_pushes_local_state() {
    let store = new_store();
    store.put(&book("b1", "Dune", Some(5))).unwrap();
    store.put(&annotation("n1", "b1")).unwrap();
    store.put(&rule("l1")).unwrap();

    let mock = MockProvider::new();
    let config = config("Tablet");
    let device = config.device_id;
    let svc = service(&store, &mock, config);

    assert_eq!(svc.sync().await, SyncOutcome::Pushed);

    let remote = mock.manifest().unwrap();
    let expected = create_manifest(&store.load_state().unwrap(), device, "Tablet", remote.last_updated);
    assert_eq!(remote, expected);
    assert_eq!(log_kinds(&store), vec![(SyncLogType::Push, SyncStatus::Success)]);

    let last = svc.last_sync().await.unwrap().unwrap();
    assert_eq!(last.device_id, device.to_string());
}

#[tokio::test]
async fn push_races_with_another_creator() {
    let store = new_store();
    let mock = MockProvider::new();
    mock.conflict_next_request();

    let svc = service(&store, &mock, config("Tablet"));
    assert_eq!(svc.sync().await, SyncOutcome::Conflict);
    assert_eq!(log_kinds(&store), vec![(SyncLogType::Push, SyncStatus::Conflict)]);
}

// ── Merge ───────────────────────────────────────────────────────

#[tokio::test]
async fn newer_local_progress_reaches_remote() {
    let store = new_store();
    store.put(&book("b1", "Local Title", Some(200))).unwrap();

    let mock = MockProvider::new();
    mock.set_manifest(foreign_manifest(&LocalState {
        books: vec![book("b1", "Remote Title", Some(100))],
        ..Default::default()
    }));

    let svc = service(&store, &mock, config("Tablet"));
    assert_eq!(svc.sync().await, SyncOutcome::Merged);

    let remote = mock.manifest().unwrap();
    assert_eq!(remote.books["b1"].metadata.title, "Local Title");
    assert_eq!(store.get::<Book>("b1").unwrap().unwrap().title, "Local Title");
    assert_eq!(log_kinds(&store), vec![(SyncLogType::Merge, SyncStatus::Success)]);
}

#[tokio::test]
async fn newer_remote_progress_reaches_local_and_keeps_cover() {
    let store = new_store();
    let mut local = book("b1", "Local Title", Some(100));
    local.cover_blob = Some(vec![9, 9, 9]);
    store.put(&local).unwrap();

    let mut remote_book = book("b1", "Remote Title", Some(200));
    remote_book.progress = 0.75;
    let mock = MockProvider::new();
    mock.set_manifest(foreign_manifest(&LocalState {
        books: vec![remote_book],
        ..Default::default()
    }));

    let svc = service(&store, &mock, config("Tablet"));
    assert_eq!(svc.sync().await, SyncOutcome::Merged);

    let updated = store.get::<Book>("b1").unwrap().unwrap();
    assert_eq!(updated.title, "Remote Title");
    assert_eq!(updated.progress, 0.75);
    assert_eq!(updated.cover_blob, Some(vec![9, 9, 9]));
    assert!(!updated.is_offloaded);
}

#[tokio::test]
async fn remote_only_book_becomes_placeholder() {
    let store = new_store();
    let mut history = ReadingHistoryEntry::new("r1");
    history.add_range("epubcfi(/6/8)");

    let mock = MockProvider::new();
    mock.set_manifest(foreign_manifest(&LocalState {
        books: vec![book("r1", "Remote Only", Some(3))],
        history: vec![history.clone()],
        annotations: vec![annotation("n1", "r1")],
        lexicon: vec![rule("l1")],
        ..Default::default()
    }));

    let svc = service(&store, &mock, config("Tablet"));
    assert_eq!(svc.sync().await, SyncOutcome::Merged);

    let placeholder = store.get::<Book>("r1").unwrap().unwrap();
    assert!(placeholder.is_offloaded);
    assert!(placeholder.cover_blob.is_none());
    assert_eq!(placeholder.title, "Remote Only");
    assert!(!store.has_file("r1").unwrap());

    assert_eq!(store.get::<ReadingHistoryEntry>("r1").unwrap(), Some(history));
    assert_eq!(store.get::<Annotation>("n1").unwrap(), Some(annotation("n1", "r1")));
    assert_eq!(store.get_all::<LexiconRule>().unwrap(), vec![rule("l1")]);
}

#[tokio::test]
async fn conflict_is_logged_once_and_local_stays_merged() {
    let store = new_store();
    let mock = MockProvider::new();
    mock.set_manifest(foreign_manifest(&LocalState {
        books: vec![book("r1", "Remote Only", None)],
        ..Default::default()
    }));
    mock.conflict_next_request();

    let svc = service(&store, &mock, config("Tablet"));
    assert_eq!(svc.sync().await, SyncOutcome::Conflict);

    assert_eq!(log_kinds(&store), vec![(SyncLogType::Merge, SyncStatus::Conflict)]);
    assert!(store.get::<Book>("r1").unwrap().is_some());
    assert!(!svc.is_syncing());

    // The next pass goes through
    assert_eq!(svc.sync().await, SyncOutcome::Merged);
}

#[tokio::test]
async fn conflict_retry_when_enabled() {
    let store = new_store();
    let mock = MockProvider::new();
    mock.set_manifest(foreign_manifest(&LocalState::default()));
    mock.conflict_next_request();

    let svc = service(
        &store,
        &mock,
        SyncConfig {
            conflict_retries: 1,
            ..config("Tablet")
        },
    );
    assert_eq!(svc.sync().await, SyncOutcome::Merged);
    assert_eq!(log_kinds(&store), vec![(SyncLogType::Merge, SyncStatus::Success)]);
    // get, conflicting update, get, update
    assert_eq!(mock.request_count(), 4);
}

// ── Skips & failures ────────────────────────────────────────────

#[tokio::test]
async fn not_authorized_does_nothing() {
    let store = new_store();
    store.put(&book("b1", "Dune", None)).unwrap();
    let mock = MockProvider::new();
    mock.set_authorized(false);

    let svc = service(&store, &mock, config("Tablet"));
    assert_eq!(svc.sync().await, SyncOutcome::NotAuthorized);

    assert_eq!(store.sync_log_count().unwrap(), 0);
    assert_eq!(mock.request_count(), 0);
    assert!(mock.manifest().is_none());
    assert!(svc.last_sync().await.unwrap().is_none());
}

#[tokio::test]
async fn transport_failure_is_logged() {
    let store = new_store();
    let mock = MockProvider::new();
    mock.fail_next_request();

    let svc = service(&store, &mock, config("Tablet"));
    assert_eq!(svc.sync().await, SyncOutcome::Failed);

    let log = store.sync_log(10).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].kind, SyncLogType::Error);
    assert_eq!(log[0].status, SyncStatus::Failure);
    assert!(log[0].details.as_deref().unwrap().contains("injected failure"));
}

#[tokio::test]
async fn failed_write_after_merge_is_logged() {
    let store = new_store();
    let mock = MockProvider::new();
    mock.set_manifest(foreign_manifest(&LocalState {
        books: vec![book("r1", "Remote Only", Some(3))],
        ..Default::default()
    }));
    mock.fail_next_write();

    let svc = service(&store, &mock, config("Tablet"));
    assert_eq!(svc.sync().await, SyncOutcome::Failed);

    assert_eq!(log_kinds(&store), vec![(SyncLogType::Merge, SyncStatus::Failure)]);
    let log = store.sync_log(10).unwrap();
    assert!(log[0].details.as_deref().unwrap().contains("injected write failure"));

    // The merge was applied locally before the write failed
    assert!(store.get::<Book>("r1").unwrap().unwrap().is_offloaded);
    assert_eq!(mock.manifest().unwrap().device_registry.len(), 1);
}

#[tokio::test]
async fn slow_remote_times_out() {
    let store = new_store();
    let mock = MockProvider::new();
    mock.set_latency(Duration::from_millis(500));

    let svc = service(
        &store,
        &mock,
        SyncConfig {
            remote_timeout: Duration::from_millis(50),
            ..config("Tablet")
        },
    );
    assert_eq!(svc.sync().await, SyncOutcome::Failed);

    let last = svc.last_sync().await.unwrap().unwrap();
    assert_eq!(last.kind, SyncLogType::Error);
    assert!(last.details.unwrap().contains("timed out"));
    assert!(mock.manifest().is_none());
}

#[tokio::test]
async fn overlapping_sync_is_coalesced() {
    let store = new_store();
    let mock = MockProvider::new();
    mock.set_latency(Duration::from_millis(100));

    let svc = service(&store, &mock, config("Tablet"));
    let (a, b) = tokio::join!(svc.sync(), svc.sync());

    let mut outcomes = [a, b];
    outcomes.sort_by_key(|o| *o == SyncOutcome::AlreadySyncing);
    assert_eq!(outcomes, [SyncOutcome::Pushed, SyncOutcome::AlreadySyncing]);
    assert_eq!(store.sync_log_count().unwrap(), 1);
    assert!(!svc.is_syncing());
}

// ── Multi-device ────────────────────────────────────────────────

#[tokio::test]
async fn two_devices_converge() {
    let mock = MockProvider::new();

    let store_a = new_store();
    store_a.put(&book("a1", "From A", Some(10))).unwrap();
    store_a.put(&annotation("na", "a1")).unwrap();
    store_a.put(&book("shared", "Old", Some(10))).unwrap();

    let store_b = new_store();
    store_b.put(&book("b1", "From B", Some(20))).unwrap();
    store_b.put(&rule("lb")).unwrap();
    store_b.put(&book("shared", "New", Some(50))).unwrap();

    let a = service(&store_a, &mock, config("A"));
    let b = service(&store_b, &mock, config("B"));

    assert_eq!(a.sync().await, SyncOutcome::Pushed);
    assert_eq!(b.sync().await, SyncOutcome::Merged);
    assert_eq!(a.sync().await, SyncOutcome::Merged);

    for store in [&store_a, &store_b] {
        let mut ids: Vec<String> = store
            .get_all::<Book>()
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a1", "b1", "shared"]);
        assert_eq!(store.get::<Book>("shared").unwrap().unwrap().title, "New");
        assert!(store.get::<Annotation>("na").unwrap().is_some());
        assert!(store.get::<LexiconRule>("lb").unwrap().is_some());
    }

    // Books each device imported itself are not offloaded
    assert!(!store_a.get::<Book>("a1").unwrap().unwrap().is_offloaded);
    assert!(store_a.get::<Book>("b1").unwrap().unwrap().is_offloaded);

    let remote = mock.manifest().unwrap();
    assert_eq!(remote.device_registry.len(), 2);
    assert_eq!(remote.books.len(), 3);
}

#[tokio::test]
async fn lexicon_order_follows_manifest_across_devices() {
    init_tracing();
    let mock = MockProvider::new();
    mock.set_manifest(foreign_manifest(&LocalState {
        lexicon: vec![rule("remote")],
        ..Default::default()
    }));

    let store_a = new_store();
    store_a.put(&rule("local")).unwrap();
    let store_b = new_store();

    let a = service(&store_a, &mock, config("A"));
    let b = service(&store_b, &mock, config("B"));

    assert_eq!(a.sync().await, SyncOutcome::Merged);
    assert_eq!(b.sync().await, SyncOutcome::Merged);
    assert_eq!(a.sync().await, SyncOutcome::Merged);

    let ids = |rules: Vec<LexiconRule>| -> Vec<String> { rules.into_iter().map(|r| r.id).collect() };
    let remote = ids(mock.manifest().unwrap().lexicon);
    assert_eq!(remote, vec!["remote", "local"]);
    assert_eq!(ids(store_a.get_all::<LexiconRule>().unwrap()), remote);
    assert_eq!(ids(store_b.get_all::<LexiconRule>().unwrap()), remote);
}

#[tokio::test]
async fn merged_manifest_is_stamped_after_remote() {
    let store = new_store();
    let mock = MockProvider::new();
    let ahead = now_millis() + 3_600_000;
    let mut remote = foreign_manifest(&LocalState::default());
    remote.last_updated = ahead;
    mock.set_manifest(remote);

    let svc = service(&store, &mock, config("Tablet"));
    assert_eq!(svc.sync().await, SyncOutcome::Merged);
    assert!(mock.manifest().unwrap().last_updated > ahead);
}
