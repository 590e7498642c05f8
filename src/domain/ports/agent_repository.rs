use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Agent, AgentRegistration};

/// Persistence port for [`Agent`] rows. Grounded on the teacher's
/// `domain/ports/task_repository.rs` trait shape.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Agent>>;
    async fn find_by_name_or_address(&self, name: &str, address: &str) -> DomainResult<Option<Agent>>;
    async fn list_online(&self) -> DomainResult<Vec<Agent>>;
    async fn list_all(&self) -> DomainResult<Vec<Agent>>;
    async fn insert(&self, registration: &AgentRegistration) -> DomainResult<Agent>;
    async fn update(&self, agent: &Agent) -> DomainResult<()>;
    /// Counts jobs in `{queued, running}` currently assigned to this agent.
    async fn active_job_count(&self, agent_id: Uuid) -> DomainResult<u32>;
}
