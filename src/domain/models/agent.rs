use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a registered agent as tracked by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Online,
    Offline,
}

impl AgentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "online" => Some(Self::Online),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }
}

/// Capabilities an agent advertises at registration time.
///
/// Malformed capability payloads are normalized to `AgentCapabilities::default()`
/// rather than rejected, per spec.md §4.1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCapabilities {
    pub providers: Vec<String>,
    pub max_concurrent_jobs: Option<u32>,
    pub features: Vec<String>,
}

impl AgentCapabilities {
    /// `max_concurrent_jobs` defaults to 4 when unset or the payload was malformed.
    #[must_use]
    pub fn max_concurrent_jobs(&self) -> u32 {
        self.max_concurrent_jobs.unwrap_or(4)
    }

    #[must_use]
    pub fn supports(&self, provider: &str) -> bool {
        self.providers.iter().any(|p| p == provider)
    }
}

/// A resource usage snapshot reported with a heartbeat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    pub disk_percent: Option<f64>,
}

/// An agent (host) the controller dispatches container work to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub status: AgentStatus,
    pub capabilities: AgentCapabilities,
    pub version: Option<String>,
    pub last_heartbeat: DateTime<Utc>,
    pub resource_usage: Option<ResourceUsage>,
}

impl Agent {
    /// True once `last_heartbeat` is older than `stale_timeout` seconds.
    #[must_use]
    pub fn is_stale(&self, stale_timeout_secs: i64, now: DateTime<Utc>) -> bool {
        (now - self.last_heartbeat).num_seconds() > stale_timeout_secs
    }

    /// The console WebSocket base is the agent's HTTP address with the scheme
    /// swapped to `ws://` (or `wss://` for `https://`).
    #[must_use]
    pub fn console_ws_base(&self) -> String {
        if let Some(rest) = self.address.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.address.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("ws://{}", self.address)
        }
    }
}

/// Payload an agent sends when registering or re-registering.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentRegistration {
    pub id: Option<Uuid>,
    pub name: String,
    pub address: String,
    pub capabilities: AgentCapabilities,
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_default_max_concurrent_jobs_is_four() {
        let caps = AgentCapabilities::default();
        assert_eq!(caps.max_concurrent_jobs(), 4);
    }

    #[test]
    fn console_ws_base_swaps_scheme() {
        let agent = Agent {
            id: Uuid::new_v4(),
            name: "edge1".into(),
            address: "https://10.0.0.1:8080".into(),
            status: AgentStatus::Online,
            capabilities: AgentCapabilities::default(),
            version: None,
            last_heartbeat: Utc::now(),
            resource_usage: None,
        };
        assert_eq!(agent.console_ws_base(), "wss://10.0.0.1:8080");
    }

    #[test]
    fn status_round_trips_through_str() {
        assert_eq!(AgentStatus::from_str("online"), Some(AgentStatus::Online));
        assert_eq!(AgentStatus::Offline.as_str(), "offline");
    }
}
