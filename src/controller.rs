use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::adapters::redis::RedisCooldownStore;
use crate::adapters::sqlite::{
    SqliteAgentRepository, SqliteAgentUpdateRepository, SqliteImageHostRepository,
    SqliteImageManifest, SqliteImageSyncJobRepository, SqliteJobRepository, SqliteLabRepository,
    SqliteLinkRepository, SqliteLinkStateRepository, SqliteNodePlacementRepository,
    SqliteNodeRepository, SqliteNodeStateRepository, SqliteTopologyStore,
    SqliteWebhookDeliveryRepository, SqliteWebhookRepository,
};
use crate::domain::models::Config;
use crate::domain::ports::{AgentClient, CooldownStore};
use crate::services::{
    AgentRegistry, HealthMonitor, ImageSync, JobEngine, MultiHostDeployer, Reconciler, Selector,
    StateEnforcer, SyncExecutor, WebhookDispatcher,
};

/// Wires every port implementation and service together, and owns the
/// handles of the four background loops spec.md §9 assigns to "a
/// startup/shutdown hook": Health Monitor, Reconciler, State Enforcer,
/// Image Reconciliation. Grounded on the teacher's
/// `cli/commands/swarm.rs::handle_daemon` (construct everything, start,
/// block on `ctrl_c`, stop), generalized from one `SwarmOrchestrator` into
/// several independently spawned loops, since nothing in this system plays
/// the orchestrator's role of owning them as a single unit.
pub struct Controller {
    pub agent_registry: Arc<AgentRegistry>,
    pub selector: Arc<Selector>,
    pub job_engine: Arc<JobEngine>,
    pub health_monitor: Arc<HealthMonitor>,
    pub reconciler: Arc<Reconciler>,
    pub state_enforcer: Arc<StateEnforcer>,
    pub image_sync: Arc<ImageSync>,
    pub webhook_dispatcher: Arc<WebhookDispatcher>,
    pub multi_host_deployer: Arc<MultiHostDeployer>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Controller {
    /// Builds every repository and service from a live pool, an
    /// [`AgentClient`], and the loaded configuration. Does not start any
    /// background loop; call [`Controller::start`] for that.
    #[must_use]
    pub fn build(pool: SqlitePool, client: Arc<dyn AgentClient>, config: Config) -> Self {
        let agents = Arc::new(SqliteAgentRepository::new(pool.clone()));
        let labs = Arc::new(SqliteLabRepository::new(pool.clone()));
        let nodes = Arc::new(SqliteNodeRepository::new(pool.clone()));
        let links = Arc::new(SqliteLinkRepository::new(pool.clone()));
        let node_states = Arc::new(SqliteNodeStateRepository::new(pool.clone()));
        let link_states = Arc::new(SqliteLinkStateRepository::new(pool.clone()));
        let placements = Arc::new(SqliteNodePlacementRepository::new(pool.clone()));
        let jobs = Arc::new(SqliteJobRepository::new(pool.clone()));
        let image_hosts = Arc::new(SqliteImageHostRepository::new(pool.clone()));
        let image_sync_jobs = Arc::new(SqliteImageSyncJobRepository::new(pool.clone()));
        let image_manifest = Arc::new(SqliteImageManifest::new(pool.clone()));
        let webhooks = Arc::new(SqliteWebhookRepository::new(pool.clone()));
        let webhook_deliveries = Arc::new(SqliteWebhookDeliveryRepository::new(pool.clone()));
        let _agent_updates = Arc::new(SqliteAgentUpdateRepository::new(pool.clone()));
        let topology = Arc::new(SqliteTopologyStore::new(nodes.clone(), links.clone()));

        let cooldown: Arc<dyn CooldownStore> = match RedisCooldownStore::new(&config.cooldown_store.redis_url) {
            Ok(store) => Arc::new(store),
            Err(err) => {
                tracing::error!(error = %err, "failed to build cooldown store client, enforcement will fail open");
                Arc::new(NullCooldownStore)
            }
        };

        let agent_registry = Arc::new(AgentRegistry::new(agents.clone(), config.registry.stale_timeout_secs));
        let selector = Arc::new(Selector::new(agents.clone(), placements.clone()));

        let multi_host_deployer =
            Arc::new(MultiHostDeployer::new(agents.clone(), nodes.clone(), client.clone()));

        let image_sync = Arc::new(ImageSync::new(
            image_hosts.clone(),
            image_sync_jobs.clone(),
            agents.clone(),
            nodes.clone(),
            placements.clone(),
            client.clone(),
            image_manifest,
            config.image_sync.enabled,
            config.image_sync.pre_deploy_check,
            &config.image_sync.fallback_strategy,
            config.image_sync.timeout_secs,
            config.image_sync.max_concurrent,
            Duration::from_secs(30),
        ));
        let sync_executor: Arc<dyn SyncExecutor> = image_sync.clone();

        let job_engine = JobEngine::new(
            jobs.clone(),
            labs.clone(),
            agents.clone(),
            node_states.clone(),
            topology,
            client.clone(),
            selector.clone(),
            Some(sync_executor),
            Some(multi_host_deployer.clone()),
            Some(image_sync.clone()),
            config.clone(),
        );

        let health_monitor = Arc::new(HealthMonitor::new(
            jobs.clone(),
            agents.clone(),
            agent_registry.clone(),
            image_sync_jobs,
            image_hosts,
            client.clone(),
            job_engine.clone(),
            Duration::from_secs(config.jobs.health_check_interval_secs),
            config.jobs.queued_stuck_after_secs,
            config.image_sync.timeout_secs,
            config.image_sync.job_pending_timeout_secs,
        ));

        let reconciler = Arc::new(Reconciler::new(
            labs.clone(),
            node_states.clone(),
            link_states,
            nodes,
            links,
            placements.clone(),
            agents.clone(),
            client.clone(),
            jobs.clone(),
            job_engine.clone(),
            config.reconciliation.stale_pending_threshold_secs,
        ));

        let state_enforcer = Arc::new(StateEnforcer::new(
            labs,
            node_states,
            Arc::new(SqliteNodeRepository::new(pool.clone())),
            placements,
            agents,
            jobs,
            cooldown,
            job_engine.clone(),
            config.enforcement.cooldown_secs,
        ));

        let webhook_dispatcher = Arc::new(WebhookDispatcher::new(
            webhooks,
            webhook_deliveries,
            concat!("netlab-controller/", env!("CARGO_PKG_VERSION")).to_string(),
        ));

        Self {
            agent_registry,
            selector,
            job_engine,
            health_monitor,
            reconciler,
            state_enforcer,
            image_sync,
            webhook_dispatcher,
            multi_host_deployer,
            shutdown_tx: broadcast::channel(1).0,
        }
    }

    /// Spawns all four background loops. Each uses its own
    /// `shutdown_rx`, subscribed from the same sender, so one
    /// [`Controller::shutdown`] call stops every loop.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        handles.push(self.health_monitor.clone().start(self.shutdown_tx.subscribe()));
        handles.push(self.image_sync.clone().start(self.shutdown_tx.subscribe()));

        handles.push(spawn_periodic(
            "reconciler",
            Duration::from_secs(30),
            self.shutdown_tx.subscribe(),
            self.reconciler.clone(),
            |r| async move { r.run_once().await },
        ));
        handles.push(spawn_periodic(
            "state enforcer",
            Duration::from_secs(30),
            self.shutdown_tx.subscribe(),
            self.state_enforcer.clone(),
            |s| async move { s.run_once().await },
        ));

        handles
    }

    /// Signals every running background loop to stop. Idempotent: a second
    /// call is a no-op once all receivers have already dropped.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Generic periodic sweep, the same `tokio::select!` shape as
/// `HealthMonitor::start`, for services that expose only `run_once` and
/// have no dedicated loop of their own (spec.md §9: background loops are
/// owned by a startup/shutdown hook, not by every service).
fn spawn_periodic<T, F, Fut>(
    name: &'static str,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
    target: Arc<T>,
    run_once: F,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    run_once(target.clone()).await;
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!(loop_name = name, "background loop received shutdown signal");
                    break;
                }
            }
        }
    })
}

/// Fail-safe [`CooldownStore`] used only if the Redis client cannot be
/// constructed at startup (a malformed URL, not a connection failure,
/// which `RedisCooldownStore` itself already fails open on).
struct NullCooldownStore;

#[async_trait::async_trait]
impl CooldownStore for NullCooldownStore {
    async fn is_on_cooldown(&self, _lab_id: uuid::Uuid, _node_name: &str) -> bool {
        false
    }
    async fn set_cooldown(&self, _lab_id: uuid::Uuid, _node_name: &str, _ttl_secs: i64) {}
}
