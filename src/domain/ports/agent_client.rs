use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::ControllerError;
use crate::domain::models::Agent;

pub type AgentClientResult<T> = Result<T, ControllerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeActionKind {
    Start,
    Stop,
}

impl NodeActionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

/// The outcome of a synchronous (non-callback) agent operation.
#[derive(Debug, Clone)]
pub enum AgentJobOutcome {
    /// Completed synchronously.
    Completed,
    /// Agent returned `202 Accepted`; completion will arrive via callback.
    Accepted,
}

/// Status of a single container as reported by an agent, spec.md §4.6 step 3.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContainerStatus {
    pub node_name: String,
    pub status: String,
}

/// Result of `get_lab_status`: per-container statuses plus whatever lab-level
/// summary the agent reports.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LabStatusReport {
    pub containers: Vec<ContainerStatus>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveredLab {
    pub lab_id: String,
    pub containers: Vec<ContainerStatus>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LockStatus {
    pub lab_id: Uuid,
    pub is_locked: bool,
    pub is_stuck: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageInventoryEntry {
    pub reference: String,
    pub present: bool,
}

/// Parameters for establishing one cross-host overlay tunnel, spec.md §4.8
/// step 5.
#[derive(Debug, Clone)]
pub struct CrossHostLinkSetup {
    pub lab_id: Uuid,
    pub link_id: String,
    pub container_a: String,
    pub interface_a: String,
    pub ip_a: Option<String>,
    pub container_b: String,
    pub interface_b: String,
    pub ip_b: Option<String>,
}

/// Typed HTTP client over a single agent's API. Grounded on
/// `infrastructure/claude/client.rs`'s `ClaudeClient` trait shape, retargeted
/// from the Claude API to the agent HTTP contract of spec.md §4.1/§6. Every
/// implementation is expected to route calls through a retry wrapper
/// (`infrastructure::agent_client::retry`) per spec.md §4.1.
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn check_health(&self, agent: &Agent) -> AgentClientResult<()>;

    async fn deploy(
        &self,
        agent: &Agent,
        job_id: Uuid,
        lab_id: Uuid,
        topology_yaml: &str,
        provider: &str,
    ) -> AgentClientResult<AgentJobOutcome>;

    async fn destroy(&self, agent: &Agent, job_id: Uuid, lab_id: Uuid) -> AgentClientResult<AgentJobOutcome>;

    async fn node_action(
        &self,
        agent: &Agent,
        job_id: Uuid,
        lab_id: Uuid,
        node: &str,
        action: NodeActionKind,
    ) -> AgentClientResult<AgentJobOutcome>;

    async fn get_lab_status(&self, agent: &Agent, lab_id: Uuid) -> AgentClientResult<LabStatusReport>;

    async fn discover_labs(&self, agent: &Agent) -> AgentClientResult<Vec<DiscoveredLab>>;

    async fn cleanup_orphans(&self, agent: &Agent, known_lab_ids: &[Uuid]) -> AgentClientResult<()>;

    async fn check_node_readiness(&self, agent: &Agent, lab_id: Uuid, node: &str) -> AgentClientResult<bool>;

    async fn setup_cross_host_link(
        &self,
        agent_a: &Agent,
        agent_b: &Agent,
        setup: &CrossHostLinkSetup,
    ) -> AgentClientResult<()>;

    async fn cleanup_overlay(&self, agent: &Agent, lab_id: Uuid) -> AgentClientResult<()>;

    async fn get_lock_status(&self, agent: &Agent) -> AgentClientResult<Vec<LockStatus>>;

    async fn release_lock(&self, agent: &Agent, lab_id: Uuid) -> AgentClientResult<()>;

    async fn get_image_inventory(&self, agent: &Agent) -> AgentClientResult<Vec<ImageInventoryEntry>>;

    async fn check_image(&self, agent: &Agent, reference: &str) -> AgentClientResult<bool>;
}
