//! Append-only records: the sync log and checkpoints.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What a sync pass was doing when it logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncLogType {
    Push,
    Pull,
    Merge,
    Error,
}

/// How the logged step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Failure,
    Conflict,
}

impl SyncLogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pull => "pull",
            Self::Merge => "merge",
            Self::Error => "error",
        }
    }
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Conflict => "conflict",
        }
    }
}

impl FromStr for SyncLogType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push" => Ok(Self::Push),
            "pull" => Ok(Self::Pull),
            "merge" => Ok(Self::Merge),
            "error" => Ok(Self::Error),
            other => Err(Error::InvalidValue(format!("sync log type {other:?}"))),
        }
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            "conflict" => Ok(Self::Conflict),
            other => Err(Error::InvalidValue(format!("sync status {other:?}"))),
        }
    }
}

/// One entry of the local sync log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLogEntry {
    /// Assigned by the store on append.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: SyncLogType,
    pub status: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub device_id: String,
}

impl SyncLogEntry {
    pub fn new(
        kind: SyncLogType,
        status: SyncStatus,
        device_id: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: None,
            timestamp,
            kind,
            status,
            details: None,
            device_id: device_id.into(),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// A point-in-time snapshot of non-binary local state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Creation time; also the checkpoint's identity.
    pub timestamp: i64,
    /// Serialized JSON payload.
    pub data: String,
    pub reason: String,
    pub size_bytes: u64,
}

/// Checkpoint listing row (no payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointInfo {
    pub timestamp: i64,
    pub reason: String,
    pub size_bytes: u64,
}

impl From<&Checkpoint> for CheckpointInfo {
    fn from(checkpoint: &Checkpoint) -> Self {
        Self {
            timestamp: checkpoint.timestamp,
            reason: checkpoint.reason.clone(),
            size_bytes: checkpoint.size_bytes,
        }
    }
}
