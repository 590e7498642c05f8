use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesiredState {
    Stopped,
    Running,
}

impl DesiredState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "stopped" => Some(Self::Stopped),
            "running" => Some(Self::Running),
            _ => None,
        }
    }
}

/// Observed/actual condition of a node's backing container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeActualState {
    Undeployed,
    Pending,
    Running,
    Stopped,
    Error,
}

impl NodeActualState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Undeployed => "undeployed",
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "undeployed" => Some(Self::Undeployed),
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "stopped" => Some(Self::Stopped),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Maps a raw container-runtime status string to an actual state, per
    /// spec.md §4.6 step 4. Unrecognized-but-present statuses are treated as
    /// `error` since the reconciler always calls this with a status string
    /// that was actually observed (absence, not an unknown string, means
    /// `undeployed`).
    #[must_use]
    pub fn from_container_status(status: &str) -> Self {
        match status {
            "running" => Self::Running,
            "stopped" | "exited" => Self::Stopped,
            "dead" | "error" => Self::Error,
            _ => Self::Error,
        }
    }
}

/// Runtime state of a single node within a lab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeState {
    pub lab_id: Uuid,
    pub node_id: Uuid,
    pub node_name: String,
    pub desired_state: DesiredState,
    pub actual_state: NodeActualState,
    pub is_ready: bool,
    pub boot_started_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl NodeState {
    /// Applies a freshly observed actual state, clearing readiness/boot
    /// tracking when leaving `running` and clearing/setting `error_message`
    /// per spec.md §4.6 step 4.
    pub fn apply_observed(&mut self, observed: NodeActualState, error_message: Option<String>) {
        if self.actual_state == NodeActualState::Running && observed != NodeActualState::Running {
            self.is_ready = false;
            self.boot_started_at = None;
        }
        self.actual_state = observed;
        self.error_message = if observed == NodeActualState::Error {
            error_message
        } else {
            None
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_status_mapping() {
        assert_eq!(
            NodeActualState::from_container_status("running"),
            NodeActualState::Running
        );
        assert_eq!(
            NodeActualState::from_container_status("exited"),
            NodeActualState::Stopped
        );
        assert_eq!(
            NodeActualState::from_container_status("dead"),
            NodeActualState::Error
        );
    }

    #[test]
    fn leaving_running_clears_readiness() {
        let mut ns = NodeState {
            lab_id: Uuid::new_v4(),
            node_id: Uuid::new_v4(),
            node_name: "r1".into(),
            desired_state: DesiredState::Running,
            actual_state: NodeActualState::Running,
            is_ready: true,
            boot_started_at: Some(Utc::now()),
            error_message: None,
        };
        ns.apply_observed(NodeActualState::Undeployed, None);
        assert!(!ns.is_ready);
        assert!(ns.boot_started_at.is_none());
    }
}
