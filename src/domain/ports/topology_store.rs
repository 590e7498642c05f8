use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;

/// Reconstructs the topology YAML for a lab from its stored Node/Link
/// definitions, needed to retry a deploy (spec.md §4.4: "Retrying a deploy
/// requires the topology YAML to still be reconstructible; otherwise retry
/// fails permanently").
#[async_trait]
pub trait TopologyStore: Send + Sync {
    async fn reconstruct_yaml(&self, lab_id: Uuid) -> DomainResult<Option<String>>;
}

/// Resolves an image reference to transfer metadata needed by Image Sync
/// (spec.md §4.9), and tracks which agents use `push` strategy for "push on
/// upload".
#[async_trait]
pub trait ImageManifest: Send + Sync {
    async fn resolve(&self, reference: &str) -> DomainResult<Option<ImageManifestEntry>>;
}

#[derive(Debug, Clone)]
pub struct ImageManifestEntry {
    pub image_id: String,
    pub reference: String,
    pub total_bytes: Option<u64>,
}
