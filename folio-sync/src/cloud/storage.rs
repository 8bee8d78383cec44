//! Remote manifest provider trait.
//!
//! Defines the contract every remote backend implements.

use crate::error::SyncResult;
use async_trait::async_trait;
use folio_types::SyncManifest;

/// Fixed, versioned name of the manifest document on file-based backends.
pub const MANIFEST_FILE_NAME: &str = "folio-sync-manifest-v1.json";

/// A manifest as read from the remote, with the token to write it back.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteManifest {
    pub data: SyncManifest,
    /// Opaque concurrency token for the revision that was read.
    pub etag: String,
}

/// Abstract remote document store holding the shared manifest.
#[async_trait]
pub trait RemoteStorageProvider: Send + Sync {
    /// Returns the name of the provider.
    fn provider_name(&self) -> &'static str;

    /// Fetches the current manifest, or `None` if none has been written yet.
    async fn get_manifest(&self) -> SyncResult<Option<RemoteManifest>>;

    /// Writes `data` only if the remote revision still matches `etag`.
    ///
    /// An empty `etag` means "create": it fails if a document already exists.
    /// A stale token fails with [`SyncError::PreconditionFailed`](crate::SyncError::PreconditionFailed).
    async fn update_manifest(&self, data: &SyncManifest, etag: &str) -> SyncResult<()>;

    /// Removes the remote manifest. Succeeds if it is already gone.
    async fn delete_manifest(&self) -> SyncResult<()>;

    /// Returns whether the provider holds usable credentials.
    async fn is_authorized(&self) -> bool;

    /// Starts authorization.
    /// Returns an authorization URL when user interaction is needed.
    async fn authorize(&self) -> SyncResult<Option<String>>;

    /// Drops any held credentials.
    async fn sign_out(&self) -> SyncResult<()>;
}
