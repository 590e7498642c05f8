use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Webhook, WebhookDelivery};

#[async_trait]
pub trait WebhookRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Webhook>>;
    async fn list_for_owner(&self, owner_id: &str) -> DomainResult<Vec<Webhook>>;
    async fn list_enabled(&self) -> DomainResult<Vec<Webhook>>;
    async fn insert(&self, webhook: &Webhook) -> DomainResult<()>;
    async fn update(&self, webhook: &Webhook) -> DomainResult<()>;
}

#[async_trait]
pub trait WebhookDeliveryRepository: Send + Sync {
    async fn insert(&self, delivery: &WebhookDelivery) -> DomainResult<()>;
    async fn list_for_webhook(&self, webhook_id: Uuid) -> DomainResult<Vec<WebhookDelivery>>;
}
