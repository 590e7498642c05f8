use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }
}

/// The job-action language of spec.md §3/§6: `up`, `down`,
/// `node:start:<name>`, `node:stop:<name>`, `sync:node:<id>`, `sync:lab`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobAction {
    Up,
    Down,
    NodeStart(String),
    NodeStop(String),
    SyncNode(Uuid),
    SyncLab,
}

impl JobAction {
    #[must_use]
    pub fn to_action_string(&self) -> String {
        match self {
            Self::Up => "up".to_string(),
            Self::Down => "down".to_string(),
            Self::NodeStart(name) => format!("node:start:{name}"),
            Self::NodeStop(name) => format!("node:stop:{name}"),
            Self::SyncNode(id) => format!("sync:node:{id}"),
            Self::SyncLab => "sync:lab".to_string(),
        }
    }

    /// Parses the small job-action language. Returns `None` for anything
    /// that does not match one of the six recognized shapes.
    #[must_use]
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "sync:lab" => Some(Self::SyncLab),
            other => {
                if let Some(name) = other.strip_prefix("node:start:") {
                    Some(Self::NodeStart(name.to_string()))
                } else if let Some(name) = other.strip_prefix("node:stop:") {
                    Some(Self::NodeStop(name.to_string()))
                } else if let Some(id) = other.strip_prefix("sync:node:") {
                    id.parse::<Uuid>().ok().map(Self::SyncNode)
                } else {
                    None
                }
            }
        }
    }

    /// Which per-action timeout bucket this action falls into, per
    /// spec.md §4.4 ("per-action timeouts are fixed") and §4.9 for `sync`.
    #[must_use]
    pub const fn timeout_kind(&self) -> JobTimeoutKind {
        match self {
            Self::Up => JobTimeoutKind::Deploy,
            Self::Down => JobTimeoutKind::Destroy,
            Self::SyncNode(_) | Self::SyncLab => JobTimeoutKind::Sync,
            Self::NodeStart(_) | Self::NodeStop(_) => JobTimeoutKind::Node,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTimeoutKind {
    Deploy,
    Destroy,
    Sync,
    Node,
}

/// A unit of dispatched work, always tied to a lab and an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub lab_id: Option<Uuid>,
    pub user_id: Option<String>,
    pub action: String,
    pub status: JobStatus,
    pub agent_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub log: String,
    pub created_at: DateTime<Utc>,
}

impl Job {
    #[must_use]
    pub fn parsed_action(&self) -> Option<JobAction> {
        JobAction::parse(&self.action)
    }

    pub fn append_log(&mut self, line: &str) {
        if !self.log.is_empty() {
            self.log.push('\n');
        }
        self.log.push_str(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_round_trips() {
        let actions = [
            JobAction::Up,
            JobAction::Down,
            JobAction::NodeStart("r1".into()),
            JobAction::NodeStop("r1".into()),
            JobAction::SyncLab,
        ];
        for action in actions {
            let s = action.to_action_string();
            assert_eq!(JobAction::parse(&s), Some(action));
        }
    }

    #[test]
    fn unrecognized_action_is_none() {
        assert_eq!(JobAction::parse("reboot"), None);
    }

    #[test]
    fn timeout_kind_mapping() {
        assert_eq!(JobAction::Up.timeout_kind(), JobTimeoutKind::Deploy);
        assert_eq!(JobAction::NodeStart("r1".into()).timeout_kind(), JobTimeoutKind::Node);
        assert_eq!(JobAction::SyncLab.timeout_kind(), JobTimeoutKind::Sync);
    }
}
