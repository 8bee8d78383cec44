//! Manifest-based sync for Folio.
//!
//! Every device keeps its library in a local store. Devices never talk to
//! each other: they share one JSON document, the [`SyncManifest`], kept by
//! a remote provider that supports conditional writes.
//!
//! # Architecture
//!
//! - **Providers** ([`cloud`]): Google Drive `appDataFolder`, a replicated
//!   folder, or an in-memory mock, all behind [`RemoteStorageProvider`].
//! - **Merge** ([`merge()`], [`create_manifest()`]): pure functions that fold local
//!   state into the remote manifest.
//! - **Applicator**: writes the merged result back to the local store in one
//!   transaction.
//! - **Service** ([`SyncService`]): runs a pass and records it in the sync log.
//!
//! ## Sync Process
//!
//! 1. Skip if the provider is not authorized or a pass is already running
//! 2. Read local state and fetch the remote manifest with its ETag
//! 3. No remote: upload local state as the first manifest
//! 4. Otherwise merge, apply locally, and write back with the ETag read
//! 5. A stale ETag is a conflict, left for the next pass
//!
//! # Example
//!
//! ```
//! use folio_storage::LocalStore;
//! use folio_sync::{MockProvider, SyncConfig, SyncOutcome, SyncService};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(LocalStore::open_in_memory()?);
//! let config = SyncConfig {
//!     device_name: "My Tablet".to_string(),
//!     ..Default::default()
//! };
//!
//! let service = SyncService::new(config, store, Arc::new(MockProvider::new()));
//! assert_eq!(service.sync().await, SyncOutcome::Pushed);
//! # Ok(())
//! # }
//! ```

pub mod applicator;
pub mod cloud;
mod engine;
mod error;
mod merge;

pub use applicator::{ApplySummary, apply_state_to_local};
pub use cloud::{
    FolderConfig, FolderProvider, GoogleDriveConfig, GoogleDriveProvider, MANIFEST_FILE_NAME,
    MockProvider, RemoteManifest, RemoteStorageProvider,
};
pub use engine::{SyncConfig, SyncOutcome, SyncService};
pub use error::{SyncError, SyncResult};
pub use merge::{create_manifest, merge};

pub use folio_types::SyncManifest;
