use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageHostStatus {
    Unknown,
    Syncing,
    Synced,
    Missing,
    Failed,
}

impl ImageHostStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Missing => "missing",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unknown" => Some(Self::Unknown),
            "syncing" => Some(Self::Syncing),
            "synced" => Some(Self::Synced),
            "missing" => Some(Self::Missing),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Tracks whether a given image is present on a given host. Unique on
/// `(image_id, host_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageHost {
    pub image_id: String,
    pub host_id: Uuid,
    pub reference: String,
    pub status: ImageHostStatus,
    pub synced_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSyncJobStatus {
    Pending,
    Transferring,
    Loading,
    Completed,
    Failed,
}

impl ImageSyncJobStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Transferring => "transferring",
            Self::Loading => "loading",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "transferring" => Some(Self::Transferring),
            "loading" => Some(Self::Loading),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSyncJob {
    pub id: Uuid,
    pub image_id: String,
    pub host_id: Uuid,
    pub status: ImageSyncJobStatus,
    pub bytes_transferred: u64,
    pub total_bytes: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Per-agent image synchronization strategy, spec.md §4.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSyncStrategy {
    Push,
    Pull,
    OnDemand,
    Disabled,
}

impl ImageSyncStrategy {
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "push" => Some(Self::Push),
            "pull" => Some(Self::Pull),
            "on_demand" => Some(Self::OnDemand),
            "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }
}
