use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Job, JobStatus};

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Job>>;
    async fn insert(&self, job: &Job) -> DomainResult<()>;
    async fn update(&self, job: &Job) -> DomainResult<()>;
    /// Count of jobs for `user_id` whose status is in `{queued, running}`
    /// (spec.md §3/§8 per-user concurrency invariant).
    async fn count_active_for_user(&self, user_id: &str) -> DomainResult<u32>;
    async fn list_by_status(&self, status: JobStatus) -> DomainResult<Vec<Job>>;
    async fn list_active(&self) -> DomainResult<Vec<Job>>;
    async fn list_active_for_lab(&self, lab_id: Uuid) -> DomainResult<Vec<Job>>;
    async fn list_active_for_node(&self, lab_id: Uuid, node_name: &str) -> DomainResult<Vec<Job>>;
}
