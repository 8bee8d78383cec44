//! Google Drive manifest provider.
//!
//! Uses Google Drive API v3. The manifest is a single JSON file in the
//! application-private `appDataFolder` space, and Drive's per-file `version`
//! counter serves as the ETag.
//!
//! A conditional write lists the file, compares its `version` with the
//! expected ETag, then uploads with an `If-Match` header carrying that
//! version. Drive does not promise to enforce `If-Match` on media uploads,
//! so the check and the upload are not atomic: two devices can both pass
//! the check and the later upload wins. The losing device writes its
//! changes back on its next sync, which merges into the newer remote.

use super::storage::{MANIFEST_FILE_NAME, RemoteManifest, RemoteStorageProvider};
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use folio_types::SyncManifest;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::{debug, info};

const APP_DATA_FOLDER: &str = "appDataFolder";

/// Google Drive specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleDriveConfig {
    /// OAuth2 client ID.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Redirect URI for OAuth flow.
    pub redirect_uri: String,
    /// Name of the manifest file inside `appDataFolder`.
    pub manifest_file_name: String,
    /// Base URL for Google Drive API (e.g. `https://www.googleapis.com`).
    pub api_base_url: String,
    /// Base URL for Google OAuth2 (e.g. `https://oauth2.googleapis.com`).
    pub oauth_base_url: String,
    /// Base URL for Google Accounts auth page (e.g. `https://accounts.google.com`).
    pub auth_base_url: String,
}

impl Default for GoogleDriveConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "urn:ietf:wg:oauth:2.0:oob".to_string(),
            manifest_file_name: MANIFEST_FILE_NAME.to_string(),
            api_base_url: "https://www.googleapis.com".to_string(),
            oauth_base_url: "https://oauth2.googleapis.com".to_string(),
            auth_base_url: "https://accounts.google.com".to_string(),
        }
    }
}

/// OAuth2 tokens.
#[derive(Debug, Clone)]
struct OAuthTokens {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<SystemTime>,
}

/// Google Drive API response structures.
#[derive(Debug, Deserialize)]
struct DriveFileList {
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    /// Drive reports the int64 revision counter as a string.
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

/// Google Drive manifest provider.
pub struct GoogleDriveProvider {
    config: GoogleDriveConfig,
    client: Client,
    tokens: Arc<RwLock<Option<OAuthTokens>>>,
}

impl GoogleDriveProvider {
    /// Creates a new Google Drive provider.
    pub fn new(config: GoogleDriveConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();

        Self {
            config,
            client,
            tokens: Arc::new(RwLock::new(None)),
        }
    }

    /// Sets existing tokens (e.g., loaded from the platform keychain).
    pub async fn set_tokens(&self, access_token: String, refresh_token: Option<String>) {
        let tokens = OAuthTokens {
            access_token,
            refresh_token,
            expires_at: None,
        };
        *self.tokens.write().await = Some(tokens);
    }

    /// Gets the OAuth2 authorization URL.
    fn get_auth_url(&self) -> String {
        let scope = "https://www.googleapis.com/auth/drive.appdata";
        format!(
            "{}/o/oauth2/v2/auth?\
            client_id={}&\
            redirect_uri={}&\
            response_type=code&\
            scope={}&\
            access_type=offline&\
            prompt=consent",
            self.config.auth_base_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(scope)
        )
    }

    /// Completes OAuth authentication with an authorization code.
    pub async fn complete_auth(&self, auth_code: &str) -> SyncResult<()> {
        debug!("Exchanging auth code for tokens");

        let response = self
            .client
            .post(format!("{}/token", self.config.oauth_base_url))
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", auth_code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| SyncError::Auth(format!("token exchange failed: {e}")))?;

        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(SyncError::Auth(format!("token exchange failed: {error}")));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Auth(format!("failed to parse token response: {e}")))?;

        let tokens = OAuthTokens {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            expires_at: expiry_from(token_response.expires_in),
        };

        *self.tokens.write().await = Some(tokens);
        info!("Google Drive authorization successful");

        Ok(())
    }

    /// Gets the current access token, refreshing if needed.
    async fn get_access_token(&self) -> SyncResult<String> {
        let (access_token, expired) = {
            let guard = self.tokens.read().await;
            let tokens = guard
                .as_ref()
                .ok_or_else(|| SyncError::Auth("not authenticated".to_string()))?;

            let expired = tokens
                .expires_at
                .is_some_and(|exp| SystemTime::now() >= exp);

            (tokens.access_token.clone(), expired)
        };

        if expired {
            return self.refresh_token().await;
        }

        Ok(access_token)
    }

    /// Refreshes the access token.
    async fn refresh_token(&self) -> SyncResult<String> {
        let refresh_token = self
            .tokens
            .read()
            .await
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
            .ok_or_else(|| SyncError::Auth("no refresh token available".to_string()))?;

        debug!("Refreshing Google Drive access token");

        let response = self
            .client
            .post(format!("{}/token", self.config.oauth_base_url))
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("token refresh failed: {e}")))?;

        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(SyncError::Auth(format!("token refresh failed: {error}")));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Auth(format!("failed to parse token response: {e}")))?;

        let new_tokens = OAuthTokens {
            access_token: token_response.access_token.clone(),
            refresh_token: token_response.refresh_token.or(Some(refresh_token)),
            expires_at: expiry_from(token_response.expires_in),
        };

        *self.tokens.write().await = Some(new_tokens);

        Ok(token_response.access_token)
    }

    /// Looks up the manifest file and its current revision.
    async fn find_manifest_file(&self, access_token: &str) -> SyncResult<Option<DriveFile>> {
        let query = format!(
            "name = '{}' and trashed = false",
            self.config.manifest_file_name
        );

        let response = self
            .client
            .get(format!("{}/drive/v3/files", self.config.api_base_url))
            .bearer_auth(access_token)
            .query(&[
                ("spaces", APP_DATA_FOLDER),
                ("q", query.as_str()),
                ("fields", "files(id,version)"),
            ])
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("manifest lookup failed: {e}")))?;

        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(SyncError::Network(format!("manifest lookup failed: {error}")));
        }

        let file_list: DriveFileList = response
            .json()
            .await
            .map_err(|e| SyncError::Network(format!("failed to parse file list: {e}")))?;

        Ok(file_list.files.into_iter().next())
    }

    async fn create_manifest_file(&self, access_token: &str, content: Vec<u8>) -> SyncResult<()> {
        let metadata = serde_json::json!({
            "name": self.config.manifest_file_name,
            "parents": [APP_DATA_FOLDER],
            "mimeType": "application/json"
        });

        let boundary = "folio_manifest_boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n--{boundary}\r\nContent-Type: application/json\r\n\r\n"
        ).as_bytes());
        body.extend_from_slice(&content);
        body.extend_from_slice(format!("\r\n--{boundary}--").as_bytes());

        let response = self
            .client
            .post(format!(
                "{}/upload/drive/v3/files?uploadType=multipart",
                self.config.api_base_url
            ))
            .bearer_auth(access_token)
            .header("Content-Type", format!("multipart/related; boundary={boundary}"))
            .body(body)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("manifest create failed: {e}")))?;

        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(SyncError::Network(format!("manifest create failed: {error}")));
        }

        info!("Created remote manifest ({} bytes)", content.len());
        Ok(())
    }

    async fn overwrite_manifest_file(
        &self,
        access_token: &str,
        file_id: &str,
        version: &str,
        content: Vec<u8>,
    ) -> SyncResult<()> {
        let size = content.len();
        let response = self
            .client
            .patch(format!(
                "{}/upload/drive/v3/files/{}?uploadType=media",
                self.config.api_base_url, file_id
            ))
            .bearer_auth(access_token)
            .header("Content-Type", "application/json")
            .header("If-Match", version)
            .body(content)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("manifest upload failed: {e}")))?;

        if response.status() == StatusCode::PRECONDITION_FAILED {
            return Err(SyncError::PreconditionFailed(
                "remote manifest changed during upload".to_string(),
            ));
        }
        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(SyncError::Network(format!("manifest upload failed: {error}")));
        }

        info!("Updated remote manifest ({} bytes)", size);
        Ok(())
    }
}

fn expiry_from(expires_in: Option<u64>) -> Option<SystemTime> {
    // 60s buffer so a token is never used right at its deadline
    expires_in.map(|secs| SystemTime::now() + Duration::from_secs(secs.saturating_sub(60)))
}

#[async_trait]
impl RemoteStorageProvider for GoogleDriveProvider {
    fn provider_name(&self) -> &'static str {
        "Google Drive"
    }

    async fn get_manifest(&self) -> SyncResult<Option<RemoteManifest>> {
        let access_token = self.get_access_token().await?;
        let Some(file) = self.find_manifest_file(&access_token).await? else {
            debug!("No remote manifest yet");
            return Ok(None);
        };

        debug!("Downloading manifest {} (version {:?})", file.id, file.version);

        let response = self
            .client
            .get(format!(
                "{}/drive/v3/files/{}?alt=media",
                self.config.api_base_url, file.id
            ))
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("manifest download failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(SyncError::Network(format!("manifest download failed: {error}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SyncError::Network(format!("read manifest body failed: {e}")))?;

        Ok(Some(RemoteManifest {
            data: SyncManifest::from_slice(&bytes)?,
            etag: file.version.unwrap_or_default(),
        }))
    }

    async fn update_manifest(&self, data: &SyncManifest, etag: &str) -> SyncResult<()> {
        let access_token = self.get_access_token().await?;
        let content = data.to_vec()?;
        let existing = self.find_manifest_file(&access_token).await?;

        match existing {
            None if etag.is_empty() => self.create_manifest_file(&access_token, content).await,
            None => Err(SyncError::PreconditionFailed(
                "remote manifest no longer exists".to_string(),
            )),
            Some(_) if etag.is_empty() => Err(SyncError::PreconditionFailed(
                "remote manifest already exists".to_string(),
            )),
            Some(file) => {
                let current = file.version.unwrap_or_default();
                if current != etag {
                    return Err(SyncError::PreconditionFailed(format!(
                        "expected version {etag}, remote is at {current}"
                    )));
                }
                self.overwrite_manifest_file(&access_token, &file.id, etag, content)
                    .await
            }
        }
    }

    async fn delete_manifest(&self) -> SyncResult<()> {
        let access_token = self.get_access_token().await?;
        let Some(file) = self.find_manifest_file(&access_token).await? else {
            return Ok(());
        };

        debug!("Deleting manifest {}", file.id);

        let response = self
            .client
            .delete(format!(
                "{}/drive/v3/files/{}",
                self.config.api_base_url, file.id
            ))
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("delete failed: {e}")))?;

        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            let error = response.text().await.unwrap_or_default();
            return Err(SyncError::Network(format!("delete failed: {error}")));
        }

        info!("Deleted remote manifest {}", file.id);
        Ok(())
    }

    async fn is_authorized(&self) -> bool {
        self.tokens.read().await.is_some()
    }

    async fn authorize(&self) -> SyncResult<Option<String>> {
        if self.is_authorized().await {
            return Ok(None);
        }

        // The caller opens this URL and hands the code to `complete_auth`
        Ok(Some(self.get_auth_url()))
    }

    async fn sign_out(&self) -> SyncResult<()> {
        *self.tokens.write().await = None;
        info!("Signed out of Google Drive");
        Ok(())
    }
}
