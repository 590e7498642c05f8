use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a lab, per spec.md §3/§6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
    Unknown,
}

impl LabState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "stopped" => Some(Self::Stopped),
            "starting" => Some(Self::Starting),
            "running" => Some(Self::Running),
            "stopping" => Some(Self::Stopping),
            "error" => Some(Self::Error),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// `state_error` is cleared on transition to any non-error state except
    /// `unknown`, which preserves whatever error was already recorded.
    #[must_use]
    pub const fn clears_state_error(self) -> bool {
        !matches!(self, Self::Error | Self::Unknown)
    }
}

/// A user-defined network topology instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lab {
    pub id: Uuid,
    pub name: String,
    pub owner: String,
    pub provider: String,
    pub state: LabState,
    pub agent_id: Option<Uuid>,
    pub state_updated_at: DateTime<Utc>,
    pub state_error: Option<String>,
}

impl Lab {
    /// Applies a state transition, honoring the `state_error` clearing rule.
    pub fn transition(&mut self, new_state: LabState, error: Option<String>, now: DateTime<Utc>) {
        self.state = new_state;
        self.state_updated_at = now;
        if new_state.clears_state_error() {
            self.state_error = error;
        } else if error.is_some() {
            self.state_error = error;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_preserves_existing_error_when_none_given() {
        let mut lab = Lab {
            id: Uuid::new_v4(),
            name: "l".into(),
            owner: "u".into(),
            provider: "containerlab".into(),
            state: LabState::Error,
            agent_id: None,
            state_updated_at: Utc::now(),
            state_error: Some("boom".into()),
        };
        lab.transition(LabState::Unknown, None, Utc::now());
        assert_eq!(lab.state_error.as_deref(), Some("boom"));
    }

    #[test]
    fn running_clears_state_error() {
        let mut lab = Lab {
            id: Uuid::new_v4(),
            name: "l".into(),
            owner: "u".into(),
            provider: "containerlab".into(),
            state: LabState::Error,
            agent_id: None,
            state_updated_at: Utc::now(),
            state_error: Some("boom".into()),
        };
        lab.transition(LabState::Running, None, Utc::now());
        assert!(lab.state_error.is_none());
    }
}
