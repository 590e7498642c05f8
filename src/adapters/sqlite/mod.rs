pub mod agent_repository;
pub mod agent_update_repository;
pub mod connection;
pub mod image_repository;
pub mod job_repository;
pub mod lab_repository;
pub mod state_repository;
pub mod topology_repository;
pub mod topology_store;
pub mod webhook_repository;

pub use agent_repository::SqliteAgentRepository;
pub use agent_update_repository::SqliteAgentUpdateRepository;
pub use connection::{create_pool, create_test_pool, ConnectionError, PoolConfig};
pub use image_repository::{SqliteImageHostRepository, SqliteImageSyncJobRepository};
pub use job_repository::SqliteJobRepository;
pub use lab_repository::SqliteLabRepository;
pub use state_repository::{SqliteLinkStateRepository, SqliteNodePlacementRepository, SqliteNodeStateRepository};
pub use topology_repository::{SqliteLinkRepository, SqliteNodeRepository};
pub use topology_store::{SqliteImageManifest, SqliteTopologyStore};
pub use webhook_repository::{SqliteWebhookDeliveryRepository, SqliteWebhookRepository};
