use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Link, Node};

/// Persistence port for topology definitions (§3 "Lifecycle: definitions
/// ... created by topology import and destroyed on lab deletion").
#[async_trait]
pub trait NodeRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Node>>;
    async fn list_by_lab(&self, lab_id: Uuid) -> DomainResult<Vec<Node>>;
    async fn insert(&self, node: &Node) -> DomainResult<()>;
}

#[async_trait]
pub trait LinkRepository: Send + Sync {
    async fn list_by_lab(&self, lab_id: Uuid) -> DomainResult<Vec<Link>>;
    async fn insert(&self, link: &Link) -> DomainResult<()>;
}
