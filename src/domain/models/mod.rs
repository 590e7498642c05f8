pub mod agent;
pub mod agent_update;
pub mod config;
pub mod image;
pub mod job;
pub mod lab;
pub mod link;
pub mod link_state;
pub mod node;
pub mod node_state;
pub mod placement;
pub mod webhook;

pub use agent::{Agent, AgentCapabilities, AgentRegistration, AgentStatus, ResourceUsage};
pub use agent_update::{AgentUpdateJob, AgentUpdateStatus};
pub use config::Config;
pub use image::{ImageHost, ImageHostStatus, ImageSyncJob, ImageSyncJobStatus, ImageSyncStrategy};
pub use job::{Job, JobAction, JobStatus, JobTimeoutKind};
pub use lab::{Lab, LabState};
pub use link::Link;
pub use link_state::{LinkActualState, LinkDesiredState, LinkState};
pub use node::Node;
pub use node_state::{DesiredState, NodeActualState, NodeState};
pub use placement::NodePlacement;
pub use webhook::{Webhook, WebhookDelivery, WebhookEvent};
