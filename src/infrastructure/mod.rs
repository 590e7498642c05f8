pub mod agent_client;
pub mod config;
pub mod logging;
