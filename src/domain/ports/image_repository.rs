use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ImageHost, ImageSyncJob, ImageSyncJobStatus};

#[async_trait]
pub trait ImageHostRepository: Send + Sync {
    async fn find(&self, image_id: &str, host_id: Uuid) -> DomainResult<Option<ImageHost>>;
    async fn list_by_host(&self, host_id: Uuid) -> DomainResult<Vec<ImageHost>>;
    async fn upsert(&self, image_host: &ImageHost) -> DomainResult<()>;
}

#[async_trait]
pub trait ImageSyncJobRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<ImageSyncJob>>;
    async fn insert(&self, job: &ImageSyncJob) -> DomainResult<()>;
    async fn update(&self, job: &ImageSyncJob) -> DomainResult<()>;
    async fn count_active_for_host(&self, host_id: Uuid) -> DomainResult<u32>;
    async fn list_by_status(&self, status: ImageSyncJobStatus) -> DomainResult<Vec<ImageSyncJob>>;
}
