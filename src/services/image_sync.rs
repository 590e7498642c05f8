use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::errors::ControllerError;
use crate::domain::models::{
    Agent, ImageHost, ImageHostStatus, ImageSyncJob, ImageSyncJobStatus, ImageSyncStrategy,
};
use crate::domain::ports::{
    AgentClient, AgentRepository, ImageHostRepository, ImageManifest, ImageSyncJobRepository,
    NodePlacementRepository, NodeRepository,
};
use crate::services::job_engine::SyncExecutor;
use crate::topology::TopologyGraph;

/// Keeps agent-side image inventories aligned with the manifest, spec.md
/// §4.9. Grounded on the Health Monitor's agent-sweep shape
/// (`infrastructure/mcp/health_monitor.rs`) for the reconciliation poll, and
/// wired as the Job Engine's [`SyncExecutor`] for `sync:node`/`sync:lab`
/// job actions.
///
/// spec.md models strategy per-agent, but nothing in the retrieved
/// `original_source` excerpt or the domain models names where a per-agent
/// strategy value would live. Rather than invent a column, this crate
/// applies a single configured `fallback_strategy` to every agent
/// (`Config.image_sync.fallback_strategy`); see DESIGN.md Open Question 4.
pub struct ImageSync {
    image_hosts: Arc<dyn ImageHostRepository>,
    image_sync_jobs: Arc<dyn ImageSyncJobRepository>,
    agents: Arc<dyn AgentRepository>,
    nodes: Arc<dyn NodeRepository>,
    placements: Arc<dyn NodePlacementRepository>,
    client: Arc<dyn AgentClient>,
    manifest: Arc<dyn ImageManifest>,
    enabled: bool,
    pre_deploy_check_enabled: bool,
    strategy: ImageSyncStrategy,
    timeout_secs: i64,
    max_concurrent: u32,
    poll_interval: Duration,
}

impl ImageSync {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        image_hosts: Arc<dyn ImageHostRepository>,
        image_sync_jobs: Arc<dyn ImageSyncJobRepository>,
        agents: Arc<dyn AgentRepository>,
        nodes: Arc<dyn NodeRepository>,
        placements: Arc<dyn NodePlacementRepository>,
        client: Arc<dyn AgentClient>,
        manifest: Arc<dyn ImageManifest>,
        enabled: bool,
        pre_deploy_check_enabled: bool,
        fallback_strategy: &str,
        timeout_secs: i64,
        max_concurrent: u32,
        poll_interval: Duration,
    ) -> Self {
        Self {
            image_hosts,
            image_sync_jobs,
            agents,
            nodes,
            placements,
            client,
            manifest,
            enabled,
            pre_deploy_check_enabled,
            strategy: ImageSyncStrategy::from_str(fallback_strategy).unwrap_or(ImageSyncStrategy::OnDemand),
            timeout_secs,
            max_concurrent,
            poll_interval,
        }
    }

    /// Resolves the agent currently hosting `node_name` in `lab_id` via its
    /// `NodePlacement` row.
    async fn agent_for_node(&self, lab_id: Uuid, node_name: &str) -> Option<Agent> {
        let placement = self.placements.find(lab_id, node_name).await.ok()??;
        self.agents.find_by_id(placement.host_id).await.ok()?
    }

    /// Called by the Job Engine before dispatching `up` on a single-host
    /// lab, spec.md §4.9 "Pre-deploy check". Multi-host deploys skip this
    /// (see DESIGN.md): each destination host's own strategy governs
    /// availability instead of a single controller-orchestrated check.
    pub async fn pre_deploy_check(&self, agent: &Agent, graph: &TopologyGraph) -> Result<(), ControllerError> {
        if !self.enabled || !self.pre_deploy_check_enabled {
            return Ok(());
        }

        let mut missing = Vec::new();
        for node in &graph.nodes {
            let Some(reference) = &node.image else { continue };
            match self.client.check_image(agent, reference).await {
                Ok(true) => {}
                _ => missing.push(reference.clone()),
            }
        }
        if missing.is_empty() {
            return Ok(());
        }
        if self.strategy == ImageSyncStrategy::Disabled {
            return Err(ControllerError::ImageNotFound(missing.join(", ")));
        }

        let deadline = Duration::from_secs(self.timeout_secs.max(0) as u64);
        let syncs = missing.iter().map(|reference| self.sync_one(agent, reference, deadline));
        let outcomes = match tokio::time::timeout(deadline, join_all(syncs)).await {
            Ok(outcomes) => outcomes,
            Err(_) => vec![false; missing.len()],
        };

        let still_missing: Vec<&String> = missing
            .iter()
            .zip(outcomes)
            .filter_map(|(reference, ok)| (!ok).then_some(reference))
            .collect();
        if still_missing.is_empty() {
            Ok(())
        } else {
            Err(ControllerError::ImageNotFound(
                still_missing.into_iter().cloned().collect::<Vec<_>>().join(", "),
            ))
        }
    }

    /// `true` on success (image present or synced within `deadline`).
    async fn sync_one(&self, agent: &Agent, reference: &str, deadline: Duration) -> bool {
        let Ok(Some(entry)) = self.manifest.resolve(reference).await else {
            return false;
        };
        if self.image_sync_jobs.count_active_for_host(agent.id).await.unwrap_or(0) >= self.max_concurrent {
            return false;
        }

        let now = Utc::now();
        let mut job = ImageSyncJob {
            id: Uuid::new_v4(),
            image_id: entry.image_id,
            host_id: agent.id,
            status: ImageSyncJobStatus::Pending,
            bytes_transferred: 0,
            total_bytes: entry.total_bytes,
            started_at: Some(now),
            completed_at: None,
        };
        if self.image_sync_jobs.insert(&job).await.is_err() {
            return false;
        }

        self.run_transfer(agent, &mut job, reference, deadline).await
    }

    /// Drives a sync job through `pending -> transferring -> loading ->
    /// completed|failed`. There is no dedicated agent-side transfer RPC in
    /// this crate's scope, so availability is polled via `check_image` until
    /// it reports present or `deadline` elapses.
    async fn run_transfer(&self, agent: &Agent, job: &mut ImageSyncJob, reference: &str, deadline: Duration) -> bool {
        job.status = ImageSyncJobStatus::Transferring;
        let _ = self.image_sync_jobs.update(job).await;

        let start = tokio::time::Instant::now();
        loop {
            match self.client.check_image(agent, reference).await {
                Ok(true) => {
                    job.status = ImageSyncJobStatus::Loading;
                    let _ = self.image_sync_jobs.update(job).await;
                    job.status = ImageSyncJobStatus::Completed;
                    job.completed_at = Some(Utc::now());
                    let _ = self.image_sync_jobs.update(job).await;
                    return true;
                }
                _ if start.elapsed() >= deadline => {
                    job.status = ImageSyncJobStatus::Failed;
                    job.completed_at = Some(Utc::now());
                    let _ = self.image_sync_jobs.update(job).await;
                    return false;
                }
                _ => tokio::time::sleep(Duration::from_secs(2).min(deadline)).await,
            }
        }
    }

    /// spec.md §4.9 "Push on upload": a seam for whatever ingests new
    /// manifest entries to call once the entry lands.
    pub async fn on_image_uploaded(&self, reference: &str) {
        if !self.enabled || self.strategy != ImageSyncStrategy::Push {
            return;
        }
        let Ok(online) = self.agents.list_online().await else { return };
        let deadline = Duration::from_secs(self.timeout_secs.max(0) as u64);
        let syncs = online.iter().map(|agent| self.sync_one(agent, reference, deadline));
        join_all(syncs).await;
    }

    /// spec.md §4.9 "Pull on registration": a seam for the agent-registration
    /// path to call once an agent has (re)registered.
    pub async fn on_agent_registered(&self, agent: &Agent) {
        if !self.enabled || self.strategy != ImageSyncStrategy::Pull {
            return;
        }
        self.reconcile_host(agent).await;
    }

    /// spec.md §4.9 "Reconciliation": poll every online agent's inventory
    /// and update `ImageHost` rows to `synced`/`missing`.
    pub async fn run_once(&self) {
        let Ok(online) = self.agents.list_online().await else { return };
        for agent in &online {
            self.reconcile_host(agent).await;
        }
    }

    async fn reconcile_host(&self, agent: &Agent) {
        let inventory = match self.client.get_image_inventory(agent).await {
            Ok(inventory) => inventory,
            Err(err) => {
                tracing::warn!(agent_id = %agent.id, error = %err, "image inventory poll failed");
                return;
            }
        };
        for entry in inventory {
            let image_id = match self.manifest.resolve(&entry.reference).await {
                Ok(Some(resolved)) => resolved.image_id,
                _ => entry.reference.clone(),
            };
            let status = if entry.present { ImageHostStatus::Synced } else { ImageHostStatus::Missing };
            let existing = self.image_hosts.find(&image_id, agent.id).await.ok().flatten();
            let image_host = ImageHost {
                image_id,
                host_id: agent.id,
                reference: entry.reference,
                status,
                synced_at: if status == ImageHostStatus::Synced { Some(Utc::now()) } else { existing.and_then(|h| h.synced_at) },
                error_message: None,
            };
            if let Err(err) = self.image_hosts.upsert(&image_host).await {
                tracing::warn!(agent_id = %agent.id, error = %err, "failed to upsert image host row");
            }
        }
    }

    /// One sweep's pace when run as a background loop.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Spawns the reconciliation sweep as a background loop, the same
    /// `tokio::select!` shape as `HealthMonitor::start`.
    pub fn start(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.poll_interval);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.run_once().await;
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("image sync received shutdown signal");
                        break;
                    }
                }
            }
        })
    }
}

#[async_trait]
impl SyncExecutor for ImageSync {
    /// `sync:node:<node_id>` — syncs one node's image onto its current
    /// placement's agent.
    async fn run_node_sync(&self, lab_id: Uuid, node_id: Uuid) -> Result<(), ControllerError> {
        let node = self
            .nodes
            .find_by_id(node_id)
            .await?
            .ok_or_else(|| ControllerError::ResourceNotFound(format!("node:{node_id}")))?;
        let Some(reference) = &node.image else {
            return Ok(());
        };
        let agent = self
            .agent_for_node(lab_id, &node.container_name)
            .await
            .ok_or_else(|| ControllerError::InvalidState(format!("node {node_id} has no current placement")))?;

        let deadline = Duration::from_secs(self.timeout_secs.max(0) as u64);
        if self.sync_one(&agent, reference, deadline).await {
            Ok(())
        } else {
            Err(ControllerError::ImageNotFound(reference.clone()))
        }
    }

    /// `sync:lab` — syncs every node's image in the lab onto its current
    /// placement's agent, concurrently.
    async fn run_lab_sync(&self, lab_id: Uuid) -> Result<(), ControllerError> {
        let nodes = self.nodes.list_by_lab(lab_id).await?;
        let deadline = Duration::from_secs(self.timeout_secs.max(0) as u64);

        let mut targets = Vec::new();
        for node in &nodes {
            let Some(reference) = &node.image else { continue };
            let Some(agent) = self.agent_for_node(lab_id, &node.container_name).await else { continue };
            targets.push((agent, reference.clone()));
        }

        let syncs = targets.iter().map(|(agent, reference)| self.sync_one(agent, reference, deadline));
        let outcomes = join_all(syncs).await;

        let failed: Vec<&str> = targets
            .iter()
            .zip(outcomes)
            .filter_map(|((_, reference), ok)| (!ok).then_some(reference.as_str()))
            .collect();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(ControllerError::ImageNotFound(failed.join(", ")))
        }
    }
}
