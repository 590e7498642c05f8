use std::sync::Arc;

use anyhow::Context;
use netlab_controller::adapters::sqlite::{create_pool, PoolConfig};
use netlab_controller::infrastructure::agent_client::AgentClientImpl;
use netlab_controller::infrastructure::config::ConfigLoader;
use netlab_controller::infrastructure::logging;
use netlab_controller::Controller;

/// Entry point for the orchestration core daemon. Grounded on the teacher's
/// `cli/commands/swarm.rs::handle_daemon`: load config, connect and migrate
/// the pool, wire every repository and service, start the background
/// loops, then block until asked to stop. This binary has no subcommands
/// of its own, unlike the teacher's clap-based CLI, since this crate's
/// surface is a background controller rather than an interactive tool.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new(std::env::var("NETLAB_CONFIG_FILE").ok().map(Into::into))
        .load()
        .context("failed to load configuration")?;

    let _logging_guard = logging::init(&config.logging);

    tracing::info!("starting netlab orchestration controller");

    let pool_config = PoolConfig {
        max_connections: config.database.max_connections,
        ..PoolConfig::default()
    };
    let pool = create_pool(&config.database.path, pool_config)
        .await
        .context("failed to connect to database")?;

    tracing::info!(path = %config.database.path, "database connection established");

    let client: Arc<dyn netlab_controller::domain::ports::AgentClient> =
        Arc::new(AgentClientImpl::new(&config));

    let controller = Controller::build(pool, client, config);
    let handles = controller.start();

    tracing::info!("all background loops started, awaiting shutdown signal");

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;

    tracing::info!("shutdown signal received, stopping background loops");
    controller.shutdown();

    for handle in handles {
        let _ = handle.await;
    }

    tracing::info!("netlab orchestration controller stopped");
    Ok(())
}
