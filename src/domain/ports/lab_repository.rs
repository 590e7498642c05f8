use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Lab, LabState};

#[async_trait]
pub trait LabRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Lab>>;
    async fn update(&self, lab: &Lab) -> DomainResult<()>;
    /// Labs whose `state` is any of the given set — used by the Reconciler's
    /// target-selection union (spec.md §4.6).
    async fn find_by_states(&self, states: &[LabState]) -> DomainResult<Vec<Lab>>;
    async fn list_all(&self) -> DomainResult<Vec<Lab>>;
}
