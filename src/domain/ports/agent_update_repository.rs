use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::AgentUpdateJob;

#[async_trait]
pub trait AgentUpdateRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<AgentUpdateJob>>;
    async fn insert(&self, job: &AgentUpdateJob) -> DomainResult<()>;
    async fn update(&self, job: &AgentUpdateJob) -> DomainResult<()>;
}
