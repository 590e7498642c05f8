use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::errors::ControllerError;
use crate::domain::models::{ImageHost, ImageHostStatus, ImageSyncJobStatus, JobStatus};
use crate::domain::ports::{AgentRepository, ImageHostRepository, ImageSyncJobRepository, JobRepository};
use crate::services::agent_registry::AgentRegistry;
use crate::services::job_engine::JobEngine;

/// The six-check sweep of spec.md §4.5. Grounded on the teacher's
/// `infrastructure/mcp/health_monitor.rs` (`tokio::select!` between an
/// interval tick and a shutdown broadcast), generalized from one
/// single-target check into six independent, separately error-isolated
/// checks over the whole fleet.
pub struct HealthMonitor {
    jobs: Arc<dyn JobRepository>,
    agents: Arc<dyn AgentRepository>,
    registry: Arc<AgentRegistry>,
    image_sync_jobs: Arc<dyn ImageSyncJobRepository>,
    image_hosts: Arc<dyn ImageHostRepository>,
    client: Arc<dyn crate::domain::ports::AgentClient>,
    job_engine: Arc<JobEngine>,
    check_interval: Duration,
    queued_stuck_after_secs: i64,
    image_sync_timeout_secs: i64,
    image_sync_job_pending_timeout_secs: i64,
}

impl HealthMonitor {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        jobs: Arc<dyn JobRepository>,
        agents: Arc<dyn AgentRepository>,
        registry: Arc<AgentRegistry>,
        image_sync_jobs: Arc<dyn ImageSyncJobRepository>,
        image_hosts: Arc<dyn ImageHostRepository>,
        client: Arc<dyn crate::domain::ports::AgentClient>,
        job_engine: Arc<JobEngine>,
        check_interval: Duration,
        queued_stuck_after_secs: i64,
        image_sync_timeout_secs: i64,
        image_sync_job_pending_timeout_secs: i64,
    ) -> Self {
        Self {
            jobs,
            agents,
            registry,
            image_sync_jobs,
            image_hosts,
            client,
            job_engine,
            check_interval,
            queued_stuck_after_secs,
            image_sync_timeout_secs,
            image_sync_job_pending_timeout_secs,
        }
    }

    /// Spawns the background loop. The returned handle completes once
    /// `shutdown_rx` fires.
    pub fn start(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.check_interval);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.run_once().await;
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("health monitor received shutdown signal");
                        break;
                    }
                }
            }
        })
    }

    /// Runs all six checks once. Each is isolated: a panic-free error from
    /// one does not prevent the others from running.
    pub async fn run_once(&self) {
        if let Err(err) = self.check_stuck_jobs().await {
            tracing::warn!(error = %err, "stuck-jobs check failed");
        }
        if let Err(err) = self.check_orphaned_queued_jobs().await {
            tracing::warn!(error = %err, "orphaned-queued-jobs check failed");
        }
        self.check_stale_agents().await;
        if let Err(err) = self.check_jobs_on_offline_agents().await {
            tracing::warn!(error = %err, "jobs-on-offline-agents check failed");
        }
        if let Err(err) = self.check_stuck_image_sync_jobs().await {
            tracing::warn!(error = %err, "stuck-image-sync-jobs check failed");
        }
        if let Err(err) = self.check_stuck_agent_locks().await {
            tracing::warn!(error = %err, "stuck-agent-locks check failed");
        }
    }

    async fn check_stuck_jobs(&self) -> Result<(), ControllerError> {
        let now = Utc::now();
        for job in self.jobs.list_active().await? {
            if !self.job_engine.is_job_stuck(&job, now) {
                continue;
            }
            if let Err(err) = self.job_engine.retry_with_failover(&job).await {
                tracing::warn!(job_id = %job.id, error = %err, "failed to retry stuck job");
            }
        }
        Ok(())
    }

    async fn check_orphaned_queued_jobs(&self) -> Result<(), ControllerError> {
        let now = Utc::now();
        for job in self.jobs.list_by_status(JobStatus::Queued).await? {
            if job.agent_id.is_some() {
                continue;
            }
            if (now - job.created_at).num_seconds() <= self.queued_stuck_after_secs {
                continue;
            }
            if let Err(err) = self.job_engine.retry_with_failover(&job).await {
                tracing::warn!(job_id = %job.id, error = %err, "failed to retry orphaned queued job");
            }
        }
        Ok(())
    }

    /// Transitions agents whose heartbeat has gone stale to `offline`,
    /// spec.md:83: "Staleness sweep runs on the health monitor tick". The
    /// newly-offline agents' active jobs are picked up by
    /// `check_jobs_on_offline_agents` right after.
    async fn check_stale_agents(&self) {
        match self.registry.sweep_stale().await {
            Ok(offline) => {
                for agent in offline {
                    tracing::warn!(agent_id = %agent.id, name = %agent.name, "agent heartbeat went stale, marked offline");
                }
            }
            Err(err) => tracing::warn!(error = %err, "stale-agent sweep failed"),
        }
    }

    async fn check_jobs_on_offline_agents(&self) -> Result<(), ControllerError> {
        for job in self.jobs.list_active().await? {
            let Some(agent_id) = job.agent_id else { continue };
            let Some(agent) = self.agents.find_by_id(agent_id).await? else { continue };
            if agent.status == crate::domain::models::AgentStatus::Online {
                continue;
            }
            if let Err(err) = self.job_engine.retry_with_failover(&job).await {
                tracing::warn!(job_id = %job.id, error = %err, "failed to retry job on offline agent");
            }
        }
        Ok(())
    }

    async fn check_stuck_image_sync_jobs(&self) -> Result<(), ControllerError> {
        let now = Utc::now();
        let mut stuck = self.image_sync_jobs.list_by_status(ImageSyncJobStatus::Pending).await?;
        stuck.extend(self.image_sync_jobs.list_by_status(ImageSyncJobStatus::Transferring).await?);
        stuck.extend(self.image_sync_jobs.list_by_status(ImageSyncJobStatus::Loading).await?);

        for mut job in stuck {
            let host_offline = match self.agents.find_by_id(job.host_id).await? {
                Some(agent) => agent.status != crate::domain::models::AgentStatus::Online,
                None => true,
            };

            let diagnostic = if host_offline {
                Some("image sync host is offline".to_string())
            } else if job.status == ImageSyncJobStatus::Pending {
                let reference = job.started_at.unwrap_or(job.completed_at.unwrap_or(now));
                if (now - reference).num_seconds() > self.image_sync_job_pending_timeout_secs {
                    Some("image sync job stuck pending".to_string())
                } else {
                    None
                }
            } else if let Some(started_at) = job.started_at {
                if (now - started_at).num_seconds() > self.image_sync_timeout_secs {
                    Some("image sync job exceeded sync timeout".to_string())
                } else {
                    None
                }
            } else {
                None
            };

            let Some(diagnostic) = diagnostic else { continue };

            job.status = ImageSyncJobStatus::Failed;
            job.completed_at = Some(now);
            if let Err(err) = self.image_sync_jobs.update(&job).await {
                tracing::warn!(job_id = %job.id, error = %err, "failed to mark stuck image-sync job failed");
                continue;
            }

            if let Some(mut host) = self.image_hosts.find(&job.image_id, job.host_id).await? {
                host.status = ImageHostStatus::Failed;
                host.error_message = Some(diagnostic);
                if let Err(err) = self.image_hosts.upsert(&host).await {
                    tracing::warn!(host_id = %job.host_id, error = %err, "failed to mark image host failed");
                }
            } else {
                let host = ImageHost {
                    image_id: job.image_id.clone(),
                    host_id: job.host_id,
                    reference: job.image_id.clone(),
                    status: ImageHostStatus::Failed,
                    synced_at: None,
                    error_message: Some(diagnostic),
                };
                if let Err(err) = self.image_hosts.upsert(&host).await {
                    tracing::warn!(host_id = %job.host_id, error = %err, "failed to record failed image host");
                }
            }
        }
        Ok(())
    }

    async fn check_stuck_agent_locks(&self) -> Result<(), ControllerError> {
        for agent in self.agents.list_online().await? {
            let locks = match self.client.get_lock_status(&agent).await {
                Ok(locks) => locks,
                Err(err) => {
                    tracing::warn!(agent_id = %agent.id, error = %err, "failed to query lock status");
                    continue;
                }
            };
            for lock in locks.into_iter().filter(|l| l.is_stuck) {
                if let Err(err) = self.client.release_lock(&agent, lock.lab_id).await {
                    tracing::warn!(agent_id = %agent.id, lab_id = %lock.lab_id, error = %err, "failed to release stuck lock");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainResult;
    use crate::domain::models::{Agent, AgentCapabilities, AgentRegistration, AgentStatus, Job};
    use crate::domain::ports::{
        AgentClient, AgentClientResult, AgentJobOutcome, ContainerStatus, CrossHostLinkSetup,
        DiscoveredLab, ImageInventoryEntry, LabStatusReport, LockStatus, NodeActionKind,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeJobs {
        jobs: Mutex<Vec<Job>>,
    }

    #[async_trait]
    impl JobRepository for FakeJobs {
        async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Job>> {
            Ok(self.jobs.lock().unwrap().iter().find(|j| j.id == id).cloned())
        }
        async fn insert(&self, job: &Job) -> DomainResult<()> {
            self.jobs.lock().unwrap().push(job.clone());
            Ok(())
        }
        async fn update(&self, job: &Job) -> DomainResult<()> {
            let mut jobs = self.jobs.lock().unwrap();
            if let Some(existing) = jobs.iter_mut().find(|j| j.id == job.id) {
                *existing = job.clone();
            }
            Ok(())
        }
        async fn count_active_for_user(&self, _user_id: &str) -> DomainResult<u32> {
            Ok(0)
        }
        async fn list_by_status(&self, status: JobStatus) -> DomainResult<Vec<Job>> {
            Ok(self.jobs.lock().unwrap().iter().filter(|j| j.status == status).cloned().collect())
        }
        async fn list_active(&self) -> DomainResult<Vec<Job>> {
            Ok(self.jobs.lock().unwrap().iter().filter(|j| j.status.is_active()).cloned().collect())
        }
        async fn list_active_for_lab(&self, _lab_id: Uuid) -> DomainResult<Vec<Job>> {
            Ok(Vec::new())
        }
        async fn list_active_for_node(&self, _lab_id: Uuid, _node_name: &str) -> DomainResult<Vec<Job>> {
            Ok(Vec::new())
        }
    }

    struct FakeAgents {
        agents: Mutex<Vec<Agent>>,
    }

    #[async_trait]
    impl AgentRepository for FakeAgents {
        async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Agent>> {
            Ok(self.agents.lock().unwrap().iter().find(|a| a.id == id).cloned())
        }
        async fn find_by_name_or_address(&self, _name: &str, _address: &str) -> DomainResult<Option<Agent>> {
            Ok(None)
        }
        async fn list_online(&self) -> DomainResult<Vec<Agent>> {
            Ok(self.agents.lock().unwrap().iter().filter(|a| a.status == AgentStatus::Online).cloned().collect())
        }
        async fn list_all(&self) -> DomainResult<Vec<Agent>> {
            Ok(self.agents.lock().unwrap().clone())
        }
        async fn insert(&self, _registration: &AgentRegistration) -> DomainResult<Agent> {
            unreachable!("not exercised in these tests")
        }
        async fn update(&self, agent: &Agent) -> DomainResult<()> {
            let mut agents = self.agents.lock().unwrap();
            if let Some(existing) = agents.iter_mut().find(|a| a.id == agent.id) {
                *existing = agent.clone();
            }
            Ok(())
        }
        async fn active_job_count(&self, _agent_id: Uuid) -> DomainResult<u32> {
            Ok(0)
        }
    }

    struct FakeImageSyncJobs {
        jobs: Mutex<Vec<crate::domain::models::ImageSyncJob>>,
    }

    #[async_trait]
    impl ImageSyncJobRepository for FakeImageSyncJobs {
        async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<crate::domain::models::ImageSyncJob>> {
            Ok(self.jobs.lock().unwrap().iter().find(|j| j.id == id).cloned())
        }
        async fn insert(&self, job: &crate::domain::models::ImageSyncJob) -> DomainResult<()> {
            self.jobs.lock().unwrap().push(job.clone());
            Ok(())
        }
        async fn update(&self, job: &crate::domain::models::ImageSyncJob) -> DomainResult<()> {
            let mut jobs = self.jobs.lock().unwrap();
            if let Some(existing) = jobs.iter_mut().find(|j| j.id == job.id) {
                *existing = job.clone();
            }
            Ok(())
        }
        async fn count_active_for_host(&self, _host_id: Uuid) -> DomainResult<u32> {
            Ok(0)
        }
        async fn list_by_status(&self, status: ImageSyncJobStatus) -> DomainResult<Vec<crate::domain::models::ImageSyncJob>> {
            Ok(self.jobs.lock().unwrap().iter().filter(|j| j.status == status).cloned().collect())
        }
    }

    struct FakeImageHosts {
        hosts: Mutex<Vec<ImageHost>>,
    }

    #[async_trait]
    impl ImageHostRepository for FakeImageHosts {
        async fn find(&self, image_id: &str, host_id: Uuid) -> DomainResult<Option<ImageHost>> {
            Ok(self
                .hosts
                .lock()
                .unwrap()
                .iter()
                .find(|h| h.image_id == image_id && h.host_id == host_id)
                .cloned())
        }
        async fn list_by_host(&self, host_id: Uuid) -> DomainResult<Vec<ImageHost>> {
            Ok(self.hosts.lock().unwrap().iter().filter(|h| h.host_id == host_id).cloned().collect())
        }
        async fn upsert(&self, image_host: &ImageHost) -> DomainResult<()> {
            let mut hosts = self.hosts.lock().unwrap();
            if let Some(existing) = hosts
                .iter_mut()
                .find(|h| h.image_id == image_host.image_id && h.host_id == image_host.host_id)
            {
                *existing = image_host.clone();
            } else {
                hosts.push(image_host.clone());
            }
            Ok(())
        }
    }

    struct NoopClient;

    #[async_trait]
    impl AgentClient for NoopClient {
        async fn check_health(&self, _agent: &Agent) -> AgentClientResult<()> {
            Ok(())
        }
        async fn deploy(
            &self,
            _agent: &Agent,
            _job_id: Uuid,
            _lab_id: Uuid,
            _topology_yaml: &str,
            _provider: &str,
        ) -> AgentClientResult<AgentJobOutcome> {
            Ok(AgentJobOutcome::Accepted)
        }
        async fn destroy(&self, _agent: &Agent, _job_id: Uuid, _lab_id: Uuid) -> AgentClientResult<AgentJobOutcome> {
            Ok(AgentJobOutcome::Accepted)
        }
        async fn node_action(
            &self,
            _agent: &Agent,
            _job_id: Uuid,
            _lab_id: Uuid,
            _node: &str,
            _action: NodeActionKind,
        ) -> AgentClientResult<AgentJobOutcome> {
            Ok(AgentJobOutcome::Accepted)
        }
        async fn get_lab_status(&self, _agent: &Agent, _lab_id: Uuid) -> AgentClientResult<LabStatusReport> {
            Ok(LabStatusReport::default())
        }
        async fn discover_labs(&self, _agent: &Agent) -> AgentClientResult<Vec<DiscoveredLab>> {
            Ok(Vec::new())
        }
        async fn cleanup_orphans(&self, _agent: &Agent, _known_lab_ids: &[Uuid]) -> AgentClientResult<()> {
            Ok(())
        }
        async fn check_node_readiness(&self, _agent: &Agent, _lab_id: Uuid, _node: &str) -> AgentClientResult<bool> {
            Ok(true)
        }
        async fn setup_cross_host_link(
            &self,
            _agent_a: &Agent,
            _agent_b: &Agent,
            _setup: &CrossHostLinkSetup,
        ) -> AgentClientResult<()> {
            Ok(())
        }
        async fn cleanup_overlay(&self, _agent: &Agent, _lab_id: Uuid) -> AgentClientResult<()> {
            Ok(())
        }
        async fn get_lock_status(&self, _agent: &Agent) -> AgentClientResult<Vec<LockStatus>> {
            Ok(Vec::new())
        }
        async fn release_lock(&self, _agent: &Agent, _lab_id: Uuid) -> AgentClientResult<()> {
            Ok(())
        }
        async fn get_image_inventory(&self, _agent: &Agent) -> AgentClientResult<Vec<ImageInventoryEntry>> {
            Ok(Vec::new())
        }
        async fn check_image(&self, _agent: &Agent, _reference: &str) -> AgentClientResult<bool> {
            Ok(true)
        }
    }

    fn image_sync_job(status: ImageSyncJobStatus, started_at: Option<chrono::DateTime<Utc>>) -> crate::domain::models::ImageSyncJob {
        crate::domain::models::ImageSyncJob {
            id: Uuid::new_v4(),
            image_id: "nokia_srlinux:latest".to_string(),
            host_id: Uuid::new_v4(),
            status,
            bytes_transferred: 0,
            total_bytes: None,
            started_at,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn marks_long_pending_image_sync_job_failed() {
        let host_id = Uuid::new_v4();
        let agent = Agent {
            id: host_id,
            name: "edge1".into(),
            address: "http://agent".into(),
            status: AgentStatus::Online,
            capabilities: AgentCapabilities::default(),
            version: None,
            last_heartbeat: Utc::now(),
            resource_usage: None,
        };
        let mut job = image_sync_job(ImageSyncJobStatus::Pending, None);
        job.host_id = host_id;
        job.completed_at = None;
        job.started_at = Some(Utc::now() - chrono::Duration::seconds(400));

        let jobs = Arc::new(FakeJobs { jobs: Mutex::new(Vec::new()) });
        let agents = Arc::new(FakeAgents { agents: Mutex::new(vec![agent]) });
        let image_sync_jobs = Arc::new(FakeImageSyncJobs { jobs: Mutex::new(vec![job.clone()]) });
        let image_hosts = Arc::new(FakeImageHosts { hosts: Mutex::new(Vec::new()) });
        let client: Arc<dyn AgentClient> = Arc::new(NoopClient);

        let labs = Arc::new(NullLabs);
        let node_states = Arc::new(NullNodeStates);
        let topology = Arc::new(NullTopology);
        let selector = Arc::new(Selector::new(agents.clone(), Arc::new(NullPlacements)));
        let job_engine = JobEngine::new(
            jobs.clone(),
            labs,
            agents.clone(),
            node_states,
            topology,
            client.clone(),
            selector,
            None,
            None,
            None,
            crate::domain::models::Config::default(),
        );

        let registry = Arc::new(AgentRegistry::new(agents.clone(), 90));
        let monitor = HealthMonitor::new(
            jobs,
            agents,
            registry,
            image_sync_jobs.clone(),
            image_hosts.clone(),
            client,
            job_engine,
            Duration::from_secs(30),
            120,
            600,
            300,
        );

        monitor.check_stuck_image_sync_jobs().await.unwrap();

        let updated = image_sync_jobs.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(updated.status, ImageSyncJobStatus::Failed);
        let host = image_hosts.find(&job.image_id, job.host_id).await.unwrap().unwrap();
        assert_eq!(host.status, ImageHostStatus::Failed);
    }

    #[tokio::test]
    async fn stale_agent_sweep_marks_it_offline_and_fails_over_its_job() {
        let agent_id = Uuid::new_v4();
        let mut agent = Agent {
            id: agent_id,
            name: "edge1".into(),
            address: "http://agent".into(),
            status: AgentStatus::Online,
            capabilities: AgentCapabilities::default(),
            version: None,
            last_heartbeat: Utc::now() - chrono::Duration::seconds(400),
            resource_usage: None,
        };
        agent.last_heartbeat = Utc::now() - chrono::Duration::seconds(400);

        let job = Job {
            id: Uuid::new_v4(),
            lab_id: Some(Uuid::new_v4()),
            user_id: None,
            action: "up".to_string(),
            status: JobStatus::Running,
            agent_id: Some(agent_id),
            started_at: Some(Utc::now()),
            completed_at: None,
            last_heartbeat: Some(Utc::now()),
            retry_count: 0,
            log: String::new(),
            created_at: Utc::now() - chrono::Duration::seconds(10),
        };

        let jobs = Arc::new(FakeJobs { jobs: Mutex::new(vec![job.clone()]) });
        let agents = Arc::new(FakeAgents { agents: Mutex::new(vec![agent]) });
        let image_sync_jobs = Arc::new(FakeImageSyncJobs { jobs: Mutex::new(Vec::new()) });
        let image_hosts = Arc::new(FakeImageHosts { hosts: Mutex::new(Vec::new()) });
        let client: Arc<dyn AgentClient> = Arc::new(NoopClient);

        let labs = Arc::new(NullLabs);
        let node_states = Arc::new(NullNodeStates);
        let topology = Arc::new(NullTopology);
        let selector = Arc::new(Selector::new(agents.clone(), Arc::new(NullPlacements)));
        let job_engine = JobEngine::new(
            jobs.clone(),
            labs,
            agents.clone(),
            node_states,
            topology,
            client.clone(),
            selector,
            None,
            None,
            None,
            crate::domain::models::Config::default(),
        );

        let registry = Arc::new(AgentRegistry::new(agents.clone(), 90));
        let monitor = HealthMonitor::new(
            jobs.clone(),
            agents.clone(),
            registry,
            image_sync_jobs,
            image_hosts,
            client,
            job_engine,
            Duration::from_secs(30),
            120,
            600,
            300,
        );

        monitor.check_stale_agents().await;
        assert_eq!(agents.find_by_id(agent_id).await.unwrap().unwrap().status, AgentStatus::Offline);

        monitor.check_jobs_on_offline_agents().await.unwrap();
        let updated = jobs.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(updated.status, JobStatus::Failed);
    }

    use crate::services::selector::Selector;

    struct NullLabs;
    #[async_trait]
    impl crate::domain::ports::LabRepository for NullLabs {
        async fn find_by_id(&self, _id: Uuid) -> DomainResult<Option<crate::domain::models::Lab>> {
            Ok(None)
        }
        async fn update(&self, _lab: &crate::domain::models::Lab) -> DomainResult<()> {
            Ok(())
        }
        async fn find_by_states(&self, _states: &[crate::domain::models::LabState]) -> DomainResult<Vec<crate::domain::models::Lab>> {
            Ok(Vec::new())
        }
        async fn list_all(&self) -> DomainResult<Vec<crate::domain::models::Lab>> {
            Ok(Vec::new())
        }
    }

    struct NullNodeStates;
    #[async_trait]
    impl crate::domain::ports::NodeStateRepository for NullNodeStates {
        async fn find(&self, _lab_id: Uuid, _node_id: Uuid) -> DomainResult<Option<crate::domain::models::NodeState>> {
            Ok(None)
        }
        async fn list_by_lab(&self, _lab_id: Uuid) -> DomainResult<Vec<crate::domain::models::NodeState>> {
            Ok(Vec::new())
        }
        async fn list_stale_pending(&self, _older_than_secs: i64) -> DomainResult<Vec<crate::domain::models::NodeState>> {
            Ok(Vec::new())
        }
        async fn list_running_not_ready(&self) -> DomainResult<Vec<crate::domain::models::NodeState>> {
            Ok(Vec::new())
        }
        async fn list_error(&self) -> DomainResult<Vec<crate::domain::models::NodeState>> {
            Ok(Vec::new())
        }
        async fn upsert(&self, _state: &crate::domain::models::NodeState) -> DomainResult<()> {
            Ok(())
        }
    }

    struct NullTopology;
    #[async_trait]
    impl crate::domain::ports::TopologyStore for NullTopology {
        async fn reconstruct_yaml(&self, _lab_id: Uuid) -> DomainResult<Option<String>> {
            Ok(None)
        }
    }

    struct NullPlacements;
    #[async_trait]
    impl crate::domain::ports::NodePlacementRepository for NullPlacements {
        async fn list_by_lab(&self, _lab_id: Uuid) -> DomainResult<Vec<crate::domain::models::NodePlacement>> {
            Ok(Vec::new())
        }
        async fn find(&self, _lab_id: Uuid, _node_name: &str) -> DomainResult<Option<crate::domain::models::NodePlacement>> {
            Ok(None)
        }
        async fn upsert(&self, _placement: &crate::domain::models::NodePlacement) -> DomainResult<()> {
            Ok(())
        }
    }
}
