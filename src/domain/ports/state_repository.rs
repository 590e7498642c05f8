use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{LinkState, NodePlacement, NodeState};

/// One `NodeState` per `(lab_id, node_id)`, per spec.md §3 invariant.
#[async_trait]
pub trait NodeStateRepository: Send + Sync {
    async fn find(&self, lab_id: Uuid, node_id: Uuid) -> DomainResult<Option<NodeState>>;
    async fn list_by_lab(&self, lab_id: Uuid) -> DomainResult<Vec<NodeState>>;
    /// NodeStates in `pending` older than `older_than_secs`, across all labs.
    async fn list_stale_pending(&self, older_than_secs: i64) -> DomainResult<Vec<NodeState>>;
    async fn list_running_not_ready(&self) -> DomainResult<Vec<NodeState>>;
    async fn list_error(&self) -> DomainResult<Vec<NodeState>>;
    async fn upsert(&self, state: &NodeState) -> DomainResult<()>;
}

#[async_trait]
pub trait LinkStateRepository: Send + Sync {
    async fn list_by_lab(&self, lab_id: Uuid) -> DomainResult<Vec<LinkState>>;
    async fn upsert(&self, state: &LinkState) -> DomainResult<()>;
}

#[async_trait]
pub trait NodePlacementRepository: Send + Sync {
    async fn list_by_lab(&self, lab_id: Uuid) -> DomainResult<Vec<NodePlacement>>;
    async fn find(&self, lab_id: Uuid, node_name: &str) -> DomainResult<Option<NodePlacement>>;
    async fn upsert(&self, placement: &NodePlacement) -> DomainResult<()>;
}
