use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::node_state::NodeActualState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkDesiredState {
    Up,
    Down,
}

impl LinkDesiredState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkActualState {
    Unknown,
    Up,
    Down,
    Error,
}

impl LinkActualState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Up => "up",
            Self::Down => "down",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unknown" => Some(Self::Unknown),
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Derives actual state from the two endpoint NodeStates' `actual_state`,
    /// per spec.md §4.6 step 7. `desired_state` is deliberately not a
    /// parameter here — see DESIGN.md Open Question 3.
    #[must_use]
    pub fn derive(source: NodeActualState, target: NodeActualState) -> (Self, Option<String>) {
        use NodeActualState::{Error, Running, Stopped, Undeployed};
        match (source, target) {
            (Running, Running) => (Self::Up, None),
            (Error, _) | (_, Error) => (
                Self::Error,
                Some("one or both endpoint nodes are in error".to_string()),
            ),
            (Stopped | Undeployed, _) | (_, Stopped | Undeployed) => (Self::Down, None),
            _ => (Self::Unknown, None),
        }
    }
}

/// Runtime state of a link, derived each reconciliation cycle from its
/// endpoint NodeStates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkState {
    pub lab_id: Uuid,
    pub link_name: String,
    pub source_node: String,
    pub source_interface: String,
    pub target_node: String,
    pub target_interface: String,
    pub desired_state: LinkDesiredState,
    pub actual_state: LinkActualState,
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use NodeActualState::{Error, Running, Stopped, Undeployed};

    #[test]
    fn both_running_is_up() {
        assert_eq!(LinkActualState::derive(Running, Running).0, LinkActualState::Up);
    }

    #[test]
    fn either_error_is_error() {
        assert_eq!(LinkActualState::derive(Error, Running).0, LinkActualState::Error);
        assert_eq!(LinkActualState::derive(Running, Error).0, LinkActualState::Error);
    }

    #[test]
    fn either_stopped_or_undeployed_is_down() {
        assert_eq!(LinkActualState::derive(Stopped, Running).0, LinkActualState::Down);
        assert_eq!(LinkActualState::derive(Running, Undeployed).0, LinkActualState::Down);
    }

    #[test]
    fn pending_pair_is_unknown() {
        assert_eq!(
            LinkActualState::derive(NodeActualState::Pending, NodeActualState::Pending).0,
            LinkActualState::Unknown
        );
    }
}
