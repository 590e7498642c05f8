pub mod agent_client;
pub mod agent_repository;
pub mod agent_update_repository;
pub mod cooldown_store;
pub mod image_repository;
pub mod job_repository;
pub mod lab_repository;
pub mod state_repository;
pub mod topology_repository;
pub mod topology_store;
pub mod webhook_repository;

pub use agent_client::{
    AgentClient, AgentClientResult, AgentJobOutcome, ContainerStatus, CrossHostLinkSetup,
    DiscoveredLab, ImageInventoryEntry, LabStatusReport, LockStatus, NodeActionKind,
};
pub use agent_repository::AgentRepository;
pub use agent_update_repository::AgentUpdateRepository;
pub use cooldown_store::CooldownStore;
pub use image_repository::{ImageHostRepository, ImageSyncJobRepository};
pub use job_repository::JobRepository;
pub use lab_repository::LabRepository;
pub use state_repository::{LinkStateRepository, NodePlacementRepository, NodeStateRepository};
pub use topology_repository::{LinkRepository, NodeRepository};
pub use topology_store::{ImageManifest, ImageManifestEntry, TopologyStore};
pub use webhook_repository::{WebhookDeliveryRepository, WebhookRepository};
