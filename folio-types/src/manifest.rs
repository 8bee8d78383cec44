//! The document exchanged with the remote store.

use crate::library::{
    Annotation, BookMetadata, LexiconRule, ReadingHistoryEntry, ReadingListEntry, TtsPosition,
};
use crate::{DeviceId, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current manifest schema version.
pub const MANIFEST_VERSION: u32 = 1;

/// Everything the remote copy knows about one book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSyncRecord {
    pub metadata: BookMetadata,
    pub history: ReadingHistoryEntry,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// Last-seen information for a device that has written the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub name: String,
    pub last_seen: i64,
}

/// State that is synced but not worth checkpointing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransientState {
    #[serde(default)]
    pub tts_positions: BTreeMap<String, TtsPosition>,
}

/// The single versioned document shared by every device.
///
/// A manifest is never stored locally as a whole: it is rebuilt from the
/// local collections or fetched from the remote on every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncManifest {
    pub version: u32,
    pub last_updated: i64,
    pub device_id: String,
    #[serde(default)]
    pub books: BTreeMap<String, BookSyncRecord>,
    #[serde(default)]
    pub lexicon: Vec<LexiconRule>,
    #[serde(default)]
    pub reading_list: BTreeMap<String, ReadingListEntry>,
    #[serde(default)]
    pub transient_state: TransientState,
    #[serde(default)]
    pub device_registry: BTreeMap<String, DeviceInfo>,
}

impl SyncManifest {
    /// Creates an empty manifest written by `device_id` at `now`.
    #[must_use]
    pub fn new(device_id: DeviceId, now: i64) -> Self {
        Self {
            version: MANIFEST_VERSION,
            last_updated: now,
            device_id: device_id.to_string(),
            books: BTreeMap::new(),
            lexicon: Vec::new(),
            reading_list: BTreeMap::new(),
            transient_state: TransientState::default(),
            device_registry: BTreeMap::new(),
        }
    }

    /// Stamps this manifest as the latest revision written by a device and
    /// refreshes that device's registry entry.
    pub fn touch(&mut self, device_id: DeviceId, device_name: &str, now: i64) {
        self.last_updated = now;
        self.device_id = device_id.to_string();
        self.device_registry.insert(
            device_id.to_string(),
            DeviceInfo {
                name: device_name.to_string(),
                last_seen: now,
            },
        );
    }

    /// Parses a manifest, rejecting schema versions newer than this build.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let manifest: Self = serde_json::from_slice(bytes)?;
        if manifest.version > MANIFEST_VERSION {
            return Err(Error::UnsupportedVersion {
                found: manifest.version,
                supported: MANIFEST_VERSION,
            });
        }
        Ok(manifest)
    }

    /// Serializes the manifest to its JSON wire form.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// TTS positions keyed by book id.
    #[must_use]
    pub fn tts_positions(&self) -> &BTreeMap<String, TtsPosition> {
        &self.transient_state.tts_positions
    }

    /// Returns true if a lexicon rule with `id` is present.
    #[must_use]
    pub fn has_rule(&self, id: &str) -> bool {
        self.lexicon.iter().any(|r| r.id == id)
    }
}
