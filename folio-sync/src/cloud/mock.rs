//! In-memory manifest provider for tests and offline demos.
//!
//! Clones share the same backing state, so two sync services holding
//! clones of one `MockProvider` behave like two devices on one account.

use super::storage::{RemoteManifest, RemoteStorageProvider};
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use folio_types::SyncManifest;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Default)]
struct MockState {
    manifest: Option<SyncManifest>,
    revision: u64,
    authorized: bool,
    fail_next: bool,
    fail_next_write: bool,
    conflict_next: bool,
    requests: usize,
    latency: Option<Duration>,
}

/// Shared in-memory remote.
#[derive(Debug, Clone)]
pub struct MockProvider {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Creates an empty, authorized remote.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                authorized: true,
                ..MockState::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next request fail with a network error.
    pub fn fail_next_request(&self) {
        self.lock().fail_next = true;
    }

    /// Makes the next `update_manifest` fail with a network error, leaving
    /// reads untouched.
    pub fn fail_next_write(&self) {
        self.lock().fail_next_write = true;
    }

    /// Makes the next `update_manifest` fail as if another device wrote first.
    pub fn conflict_next_request(&self) {
        self.lock().conflict_next = true;
    }

    pub fn set_authorized(&self, authorized: bool) {
        self.lock().authorized = authorized;
    }

    /// Replaces the stored manifest as if another device wrote it.
    pub fn set_manifest(&self, manifest: SyncManifest) {
        let mut state = self.lock();
        state.manifest = Some(manifest);
        state.revision += 1;
    }

    /// Current stored manifest.
    pub fn manifest(&self) -> Option<SyncManifest> {
        self.lock().manifest.clone()
    }

    /// Number of manifest requests served so far.
    pub fn request_count(&self) -> usize {
        self.lock().requests
    }

    /// Delays every request by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    /// Counts the request and applies any injected latency or failure.
    async fn begin_request(&self) -> SyncResult<()> {
        let latency = {
            let mut state = self.lock();
            state.requests += 1;
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        if std::mem::take(&mut state.fail_next) {
            return Err(SyncError::Network("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStorageProvider for MockProvider {
    fn provider_name(&self) -> &'static str {
        "Mock"
    }

    async fn get_manifest(&self) -> SyncResult<Option<RemoteManifest>> {
        self.begin_request().await?;
        let state = self.lock();
        Ok(state.manifest.clone().map(|data| RemoteManifest {
            data,
            etag: state.revision.to_string(),
        }))
    }

    async fn update_manifest(&self, data: &SyncManifest, etag: &str) -> SyncResult<()> {
        self.begin_request().await?;
        let mut state = self.lock();

        if std::mem::take(&mut state.fail_next_write) {
            return Err(SyncError::Network("injected write failure".to_string()));
        }
        if std::mem::take(&mut state.conflict_next) {
            return Err(SyncError::PreconditionFailed("injected conflict".to_string()));
        }

        match (&state.manifest, etag.is_empty()) {
            (None, true) => {}
            (None, false) => {
                return Err(SyncError::PreconditionFailed(
                    "remote manifest no longer exists".to_string(),
                ));
            }
            (Some(_), true) => {
                return Err(SyncError::PreconditionFailed(
                    "remote manifest already exists".to_string(),
                ));
            }
            (Some(_), false) => {
                if state.revision.to_string() != etag {
                    return Err(SyncError::PreconditionFailed(format!(
                        "expected revision {etag}, remote is at {}",
                        state.revision
                    )));
                }
            }
        }

        state.manifest = Some(data.clone());
        state.revision += 1;
        debug!("Mock remote at revision {}", state.revision);
        Ok(())
    }

    async fn delete_manifest(&self) -> SyncResult<()> {
        self.begin_request().await?;
        let mut state = self.lock();
        state.manifest = None;
        state.revision += 1;
        Ok(())
    }

    async fn is_authorized(&self) -> bool {
        self.lock().authorized
    }

    async fn authorize(&self) -> SyncResult<Option<String>> {
        self.lock().authorized = true;
        Ok(None)
    }

    async fn sign_out(&self) -> SyncResult<()> {
        self.lock().authorized = false;
        Ok(())
    }
}
