//! Sync service: one reconciliation pass against the remote manifest.
//!
//! A pass reads local state, fetches the remote manifest, merges, applies
//! the merge locally and writes it back with the ETag it read. Every pass
//! ends in a single sync-log entry, except when it is skipped.

use crate::applicator::apply_state_to_local;
use crate::cloud::RemoteStorageProvider;
use crate::error::{SyncError, SyncResult};
use crate::merge::{create_manifest, merge};
use folio_storage::{LocalState, LocalStore, StorageResult};
use folio_types::{DeviceId, MonotonicClock, SyncLogEntry, SyncLogType, SyncStatus, now_millis};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the sync service.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Identity written into the manifest and sync log.
    pub device_id: DeviceId,
    /// Device name for the manifest's device registry.
    pub device_name: String,
    /// Deadline for each remote call.
    pub remote_timeout: Duration,
    /// Extra fetch-merge-write attempts after a conflicting write.
    pub conflict_retries: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            device_id: DeviceId::new(),
            device_name: "Folio Device".to_string(),
            remote_timeout: Duration::from_secs(30),
            conflict_retries: 0,
        }
    }
}

/// How a call to [`SyncService::sync`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The provider has no credentials; nothing was done.
    NotAuthorized,
    /// Another pass on this service was already running.
    AlreadySyncing,
    /// No remote existed; local state was uploaded as the first manifest.
    Pushed,
    /// Remote and local state were merged and written back.
    Merged,
    /// The remote moved on before our write landed. Retried next pass.
    Conflict,
    /// The pass failed; the reason is in the sync log.
    Failed,
}

/// Clears the syncing flag when a pass ends, however it ends.
struct SyncGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Reconciles one device's local store with a remote manifest.
pub struct SyncService {
    config: SyncConfig,
    store: Arc<LocalStore>,
    provider: Arc<dyn RemoteStorageProvider>,
    syncing: AtomicBool,
    clock: MonotonicClock,
}

impl SyncService {
    pub fn new(
        config: SyncConfig,
        store: Arc<LocalStore>,
        provider: Arc<dyn RemoteStorageProvider>,
    ) -> Self {
        Self {
            config,
            store,
            provider,
            syncing: AtomicBool::new(false),
            clock: MonotonicClock::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn RemoteStorageProvider> {
        &self.provider
    }

    /// Returns true while a pass is running on this service.
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Returns the newest sync-log entry, if any pass has been recorded.
    pub async fn last_sync(&self) -> SyncResult<Option<SyncLogEntry>> {
        let mut entries = self.blocking(|store| store.sync_log(1)).await?;
        Ok(entries.pop())
    }

    /// Runs one sync pass.
    ///
    /// Never fails: provider and storage errors are recorded in the sync log
    /// and reported as [`SyncOutcome::Failed`].
    pub async fn sync(&self) -> SyncOutcome {
        let Some(_guard) = SyncGuard::acquire(&self.syncing) else {
            debug!("Sync already in progress, skipping");
            return SyncOutcome::AlreadySyncing;
        };

        if !self.provider.is_authorized().await {
            debug!("{} not authorized, skipping sync", self.provider.provider_name());
            return SyncOutcome::NotAuthorized;
        }

        match self.run_pass().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Sync with {} failed: {}", self.provider.provider_name(), e);
                self.record(SyncLogType::Error, SyncStatus::Failure, Some(e.to_string()))
                    .await;
                SyncOutcome::Failed
            }
        }
    }

    async fn run_pass(&self) -> SyncResult<SyncOutcome> {
        let mut retries_left = self.config.conflict_retries;

        loop {
            let local = self.blocking(|store| store.load_state()).await?;

            let Some(remote) = self.remote(self.provider.get_manifest()).await? else {
                return self.push_initial(&local).await;
            };

            debug!(
                "Merging {} local books with {} remote books",
                local.books.len(),
                remote.data.books.len()
            );

            // Never stamp the merged manifest older than the one it replaces
            self.clock.observe(remote.data.last_updated);
            let merged = Arc::new(merge(
                &local,
                &remote.data,
                self.config.device_id,
                &self.config.device_name,
                self.clock.tick(),
            ));

            let summary = {
                let merged = Arc::clone(&merged);
                self.blocking(move |store| apply_state_to_local(store, &merged))
                    .await?
            };
            debug!(
                "Applied merge: {} books updated, {} placeholders created",
                summary.books_updated, summary.placeholders_created
            );

            match self
                .remote(self.provider.update_manifest(&merged, &remote.etag))
                .await
            {
                Ok(()) => {
                    info!("Merged with {}", self.provider.provider_name());
                    self.record(SyncLogType::Merge, SyncStatus::Success, None)
                        .await;
                    return Ok(SyncOutcome::Merged);
                }
                Err(e) if e.is_conflict() && retries_left > 0 => {
                    retries_left -= 1;
                    info!("Remote changed during sync, retrying ({retries_left} retries left)");
                }
                Err(e) if e.is_conflict() => {
                    warn!("Remote changed during sync: {}", e);
                    self.record(SyncLogType::Merge, SyncStatus::Conflict, Some(e.to_string()))
                        .await;
                    return Ok(SyncOutcome::Conflict);
                }
                Err(e) => {
                    warn!("Failed to write merged manifest: {}", e);
                    self.record(SyncLogType::Merge, SyncStatus::Failure, Some(e.to_string()))
                        .await;
                    return Ok(SyncOutcome::Failed);
                }
            }
        }
    }

    async fn push_initial(&self, local: &LocalState) -> SyncResult<SyncOutcome> {
        let manifest = create_manifest(
            local,
            self.config.device_id,
            &self.config.device_name,
            self.clock.tick(),
        );

        match self.remote(self.provider.update_manifest(&manifest, "")).await {
            Ok(()) => {
                info!(
                    "Pushed initial manifest ({} books) to {}",
                    manifest.books.len(),
                    self.provider.provider_name()
                );
                self.record(SyncLogType::Push, SyncStatus::Success, None)
                    .await;
                Ok(SyncOutcome::Pushed)
            }
            Err(e) if e.is_conflict() => {
                warn!("Another device created the manifest first: {}", e);
                self.record(SyncLogType::Push, SyncStatus::Conflict, Some(e.to_string()))
                    .await;
                Ok(SyncOutcome::Conflict)
            }
            Err(e) => Err(e),
        }
    }

    /// Runs a remote call under the configured deadline.
    async fn remote<T>(&self, call: impl Future<Output = SyncResult<T>>) -> SyncResult<T> {
        tokio::time::timeout(self.config.remote_timeout, call)
            .await
            .map_err(|_| SyncError::Timeout)?
    }

    /// Runs blocking store work off the async runtime.
    async fn blocking<T, F>(&self, f: F) -> SyncResult<T>
    where
        F: FnOnce(&LocalStore) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| SyncError::Internal(format!("store task failed: {e}")))?;
        Ok(result?)
    }

    /// Appends a sync-log entry. Logging failures never fail the pass.
    async fn record(&self, kind: SyncLogType, status: SyncStatus, details: Option<String>) {
        let mut entry = SyncLogEntry::new(
            kind,
            status,
            self.config.device_id.to_string(),
            now_millis(),
        );
        if let Some(details) = details {
            entry = entry.with_details(details);
        }

        if let Err(e) = self
            .blocking(move |store| store.append_sync_log(&entry))
            .await
        {
            warn!("Failed to record sync log entry: {}", e);
        }
    }
}
