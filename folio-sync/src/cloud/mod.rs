//! Remote manifest providers.
//!
//! Every backend stores the single shared [`SyncManifest`](folio_types::SyncManifest)
//! and exposes a compare-and-swap style conditional write on an opaque
//! concurrency token.

pub mod folder;
pub mod google_drive;
pub mod mock;
pub mod storage;

pub use folder::{FolderConfig, FolderProvider};
pub use google_drive::{GoogleDriveConfig, GoogleDriveProvider};
pub use mock::MockProvider;
pub use storage::{MANIFEST_FILE_NAME, RemoteManifest, RemoteStorageProvider};
