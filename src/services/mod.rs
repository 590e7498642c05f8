pub mod agent_registry;
pub mod health_monitor;
pub mod image_sync;
pub mod job_engine;
pub mod multi_host_deployer;
pub mod reconciler;
pub mod selector;
pub mod state_enforcer;
pub mod webhook_dispatcher;

pub use agent_registry::{AgentRegistry, RegisterOutcome};
pub use health_monitor::HealthMonitor;
pub use image_sync::ImageSync;
pub use job_engine::{JobCallback, JobEngine, SyncExecutor};
pub use multi_host_deployer::MultiHostDeployer;
pub use reconciler::{match_lab_by_prefix, Reconciler};
pub use selector::{SelectionCriteria, Selector};
pub use state_enforcer::StateEnforcer;
pub use webhook_dispatcher::WebhookDispatcher;
