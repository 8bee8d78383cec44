//! Folder-backed manifest provider.
//!
//! Keeps the manifest as a plain file inside a directory that some other
//! mechanism (iCloud Drive, Syncthing, a network share) replicates between
//! devices. The ETag is the SHA-256 of the file contents.

use super::storage::{MANIFEST_FILE_NAME, RemoteManifest, RemoteStorageProvider};
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use folio_types::SyncManifest;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Folder provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderConfig {
    /// Directory holding the manifest. Must already exist.
    pub container_path: PathBuf,
    /// Name of the manifest file inside the container.
    pub manifest_file_name: String,
}

impl FolderConfig {
    pub fn new(container_path: impl Into<PathBuf>) -> Self {
        Self {
            container_path: container_path.into(),
            manifest_file_name: MANIFEST_FILE_NAME.to_string(),
        }
    }
}

/// Manifest provider over a replicated directory.
pub struct FolderProvider {
    config: FolderConfig,
    /// Serializes check-then-write so two writers in this process can't both pass.
    write_lock: Mutex<()>,
}

impl FolderProvider {
    pub fn new(config: FolderConfig) -> Self {
        Self {
            config,
            write_lock: Mutex::new(()),
        }
    }

    fn manifest_path(&self) -> PathBuf {
        self.config.container_path.join(&self.config.manifest_file_name)
    }

    fn content_etag(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    async fn read_current(&self) -> SyncResult<Option<Vec<u8>>> {
        match fs::read(self.manifest_path()).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::Network(format!("failed to read manifest: {e}"))),
        }
    }

    fn ensure_container(&self) -> SyncResult<()> {
        if self.config.container_path.is_dir() {
            Ok(())
        } else {
            Err(SyncError::Auth(format!(
                "sync folder not found at {:?}",
                self.config.container_path
            )))
        }
    }
}

#[async_trait]
impl RemoteStorageProvider for FolderProvider {
    fn provider_name(&self) -> &'static str {
        "Folder"
    }

    async fn get_manifest(&self) -> SyncResult<Option<RemoteManifest>> {
        self.ensure_container()?;
        let Some(bytes) = self.read_current().await? else {
            return Ok(None);
        };

        debug!("Read manifest from {:?} ({} bytes)", self.manifest_path(), bytes.len());

        Ok(Some(RemoteManifest {
            data: SyncManifest::from_slice(&bytes)?,
            etag: Self::content_etag(&bytes),
        }))
    }

    async fn update_manifest(&self, data: &SyncManifest, etag: &str) -> SyncResult<()> {
        self.ensure_container()?;
        let content = data.to_vec()?;

        let _guard = self.write_lock.lock().await;

        match (self.read_current().await?, etag.is_empty()) {
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
            (Some(current), false) => {
                let current_etag = Self::content_etag(&current);
                if current_etag != etag {
                    return Err(SyncError::PreconditionFailed(format!(
                        "expected {etag}, found {current_etag}"
                    )));
                }
            }
        }

        let path = self.manifest_path();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &content)
            .await
            .map_err(|e| SyncError::Network(format!("failed to write manifest: {e}")))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| SyncError::Network(format!("failed to replace manifest: {e}")))?;

        info!("Wrote manifest to {:?} ({} bytes)", path, content.len());
        Ok(())
    }

    async fn delete_manifest(&self) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(self.manifest_path()).await {
            Ok(()) => {
                info!("Deleted manifest at {:?}", self.manifest_path());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::Network(format!("failed to delete manifest: {e}"))),
        }
    }

    async fn is_authorized(&self) -> bool {
        // Authorized as long as the container folder exists
        self.config.container_path.is_dir()
    }

    async fn authorize(&self) -> SyncResult<Option<String>> {
        self.ensure_container()?;
        info!("Folder provider ready at {:?}", self.config.container_path);
        Ok(None)
    }

    async fn sign_out(&self) -> SyncResult<()> {
        Ok(())
    }
}
