use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::errors::{ControllerError, DomainResult};
use crate::domain::models::{
    Agent, AgentStatus, Config, Job, JobAction, JobStatus, JobTimeoutKind, Lab, LabState,
    NodeActualState,
};
use crate::domain::ports::{
    AgentClient, AgentClientResult, AgentJobOutcome, AgentRepository, JobRepository, LabRepository,
    NodeActionKind, NodeStateRepository, TopologyStore,
};
use crate::services::multi_host_deployer::MultiHostDeployer;
use crate::services::selector::{SelectionCriteria, Selector};

/// Narrow seam the Job Engine uses to execute `sync:node`/`sync:lab` actions
/// without depending on the Image Sync service's internals, spec.md §4.4
/// job-action language / §4.9.
#[async_trait]
pub trait SyncExecutor: Send + Sync {
    async fn run_node_sync(&self, lab_id: Uuid, node_id: Uuid) -> Result<(), ControllerError>;
    async fn run_lab_sync(&self, lab_id: Uuid) -> Result<(), ControllerError>;
}

/// The dynamic shape of `POST /callbacks/job/{id}`, spec.md §4.4/§6/§9.
#[derive(Debug, Clone, Deserialize)]
pub struct JobCallback {
    pub status: String,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub node_states: Option<HashMap<String, String>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

pub struct JobEngine {
    jobs: Arc<dyn JobRepository>,
    labs: Arc<dyn LabRepository>,
    agents: Arc<dyn AgentRepository>,
    node_states: Arc<dyn NodeStateRepository>,
    topology: Arc<dyn TopologyStore>,
    client: Arc<dyn AgentClient>,
    selector: Arc<Selector>,
    sync_executor: Option<Arc<dyn SyncExecutor>>,
    multi_host: Option<Arc<MultiHostDeployer>>,
    image_sync: Option<Arc<crate::services::image_sync::ImageSync>>,
    config: Config,
}

impl JobEngine {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        labs: Arc<dyn LabRepository>,
        agents: Arc<dyn AgentRepository>,
        node_states: Arc<dyn NodeStateRepository>,
        topology: Arc<dyn TopologyStore>,
        client: Arc<dyn AgentClient>,
        selector: Arc<Selector>,
        sync_executor: Option<Arc<dyn SyncExecutor>>,
        multi_host: Option<Arc<MultiHostDeployer>>,
        image_sync: Option<Arc<crate::services::image_sync::ImageSync>>,
        config: Config,
    ) -> Arc<Self> {
        Arc::new(Self {
            jobs,
            labs,
            agents,
            node_states,
            topology,
            client,
            selector,
            sync_executor,
            multi_host,
            image_sync,
            config,
        })
    }

    /// `enqueue(lab_id, action, user_id)`, spec.md §4.4. Checks the user's
    /// non-terminal job count before inserting and spawning dispatch.
    pub async fn enqueue(
        self: &Arc<Self>,
        lab_id: Option<Uuid>,
        action: JobAction,
        user_id: Option<String>,
    ) -> Result<Job, ControllerError> {
        if let Some(uid) = &user_id {
            let active = self.jobs.count_active_for_user(uid).await?;
            if active >= self.config.jobs.max_concurrent_jobs_per_user {
                return Err(ControllerError::ConcurrencyLimit);
            }
        }

        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            lab_id,
            user_id,
            action: action.to_action_string(),
            status: JobStatus::Queued,
            agent_id: None,
            started_at: None,
            completed_at: None,
            last_heartbeat: None,
            retry_count: 0,
            log: String::new(),
            created_at: now,
        };
        self.jobs.insert(&job).await?;

        let engine = Arc::clone(self);
        let job_id = job.id;
        tokio::spawn(async move {
            if let Err(err) = engine.dispatch(job_id).await {
                tracing::error!(%job_id, error = %err, "job dispatch failed");
            }
        });

        Ok(job)
    }

    async fn dispatch(&self, job_id: Uuid) -> Result<(), ControllerError> {
        let mut job = self
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| ControllerError::JobNotFound(job_id.to_string()))?;

        let Some(parsed) = job.parsed_action() else {
            return Err(ControllerError::InvalidState(format!(
                "unrecognized job action: {}",
                job.action
            )));
        };

        let lab_id = job
            .lab_id
            .ok_or_else(|| ControllerError::InvalidState("job has no lab_id".to_string()))?;
        let mut lab = self
            .labs
            .find_by_id(lab_id)
            .await?
            .ok_or_else(|| ControllerError::ResourceNotFound(format!("lab:{lab_id}")))?;

        let agent = match self.selector.get_agent_for_lab(&lab, &lab.provider).await {
            Ok(agent) => agent,
            Err(err) => {
                self.fail_job(&mut job, &mut lab, &err, None).await?;
                return Ok(());
            }
        };

        let now = Utc::now();
        job.started_at = Some(now);
        job.agent_id = Some(agent.id);
        job.status = JobStatus::Running;
        self.jobs.update(&job).await?;

        match &parsed {
            JobAction::Up => lab.transition(LabState::Starting, None, now),
            JobAction::Down => lab.transition(LabState::Stopping, None, now),
            _ => {}
        }
        self.labs.update(&lab).await?;

        match self.execute(&agent, &job, &parsed, &lab).await {
            Ok(AgentJobOutcome::Accepted) => {
                // Completion arrives later via callback; leave the job running.
            }
            Ok(AgentJobOutcome::Completed) => {
                self.complete_job(&mut job, &mut lab, &parsed, None, None).await?;
            }
            Err(err) => {
                self.fail_job(&mut job, &mut lab, &err, Some(&agent)).await?;
            }
        }

        Ok(())
    }

    async fn execute(
        &self,
        agent: &Agent,
        job: &Job,
        action: &JobAction,
        lab: &Lab,
    ) -> AgentClientResult<AgentJobOutcome> {
        match action {
            JobAction::Up => {
                let yaml = self
                    .topology
                    .reconstruct_yaml(lab.id)
                    .await
                    .map_err(ControllerError::from)?
                    .ok_or_else(|| {
                        ControllerError::InvalidState(
                            "topology is no longer reconstructible for this lab".to_string(),
                        )
                    })?;

                let parsed_graph = crate::topology::yaml_to_graph(&yaml).ok();

                if let (Some(deployer), Some(graph)) = (&self.multi_host, &parsed_graph) {
                    let default_host = lab.agent_id.map(|id| id.to_string()).unwrap_or_default();
                    let analysis = crate::topology::analyze(graph, &default_host);
                    if !analysis.single_host {
                        let log = deployer.deploy(job.id, lab.id, graph, &analysis, &lab.provider).await?;
                        tracing::info!(lab_id = %lab.id, %log, "multi-host deploy completed");
                        return Ok(AgentJobOutcome::Completed);
                    }
                }

                if let (Some(image_sync), Some(graph)) = (&self.image_sync, &parsed_graph) {
                    image_sync.pre_deploy_check(agent, graph).await?;
                }

                self.client.deploy(agent, job.id, lab.id, &yaml, &lab.provider).await
            }
            JobAction::Down => {
                if let Some(deployer) = &self.multi_host {
                    if let Some(yaml) = self.topology.reconstruct_yaml(lab.id).await.map_err(ControllerError::from)? {
                        if let Ok(graph) = crate::topology::yaml_to_graph(&yaml) {
                            let default_host = lab.agent_id.map(|id| id.to_string()).unwrap_or_default();
                            let analysis = crate::topology::analyze(&graph, &default_host);
                            if !analysis.single_host {
                                let log = deployer.destroy(job.id, lab.id, &analysis).await;
                                tracing::info!(lab_id = %lab.id, %log, "multi-host destroy completed");
                                return Ok(AgentJobOutcome::Completed);
                            }
                        }
                    }
                }
                self.client.destroy(agent, job.id, lab.id).await
            }
            JobAction::NodeStart(name) => {
                self.client
                    .node_action(agent, job.id, lab.id, name, NodeActionKind::Start)
                    .await
            }
            JobAction::NodeStop(name) => {
                self.client
                    .node_action(agent, job.id, lab.id, name, NodeActionKind::Stop)
                    .await
            }
            JobAction::SyncNode(node_id) => {
                let Some(executor) = &self.sync_executor else {
                    return Err(ControllerError::Configuration(
                        "no sync executor configured".to_string(),
                    ));
                };
                executor.run_node_sync(lab.id, *node_id).await?;
                Ok(AgentJobOutcome::Completed)
            }
            JobAction::SyncLab => {
                let Some(executor) = &self.sync_executor else {
                    return Err(ControllerError::Configuration(
                        "no sync executor configured".to_string(),
                    ));
                };
                executor.run_lab_sync(lab.id).await?;
                Ok(AgentJobOutcome::Completed)
            }
        }
    }

    async fn complete_job(
        &self,
        job: &mut Job,
        lab: &mut Lab,
        action: &JobAction,
        stdout: Option<&str>,
        stderr: Option<&str>,
    ) -> DomainResult<()> {
        let now = Utc::now();
        job.status = JobStatus::Completed;
        job.completed_at = Some(now);
        if let Some(out) = stdout {
            job.append_log(&format!("stdout: {out}"));
        }
        if let Some(err) = stderr {
            job.append_log(&format!("stderr: {err}"));
        }
        self.jobs.update(job).await?;

        match action {
            JobAction::Up => lab.transition(LabState::Running, None, now),
            JobAction::Down => lab.transition(LabState::Stopped, None, now),
            _ => {}
        }
        self.labs.update(lab).await?;
        Ok(())
    }

    async fn fail_job(
        &self,
        job: &mut Job,
        lab: &mut Lab,
        err: &ControllerError,
        agent: Option<&Agent>,
    ) -> DomainResult<()> {
        let now = Utc::now();
        job.status = JobStatus::Failed;
        job.completed_at = Some(now);
        job.append_log(&format!("ERROR: {err}"));

        match err {
            ControllerError::AgentJobError { message, stdout, stderr } => {
                if let Some(out) = stdout {
                    job.append_log(&format!("stdout: {out}"));
                }
                if let Some(e) = stderr {
                    job.append_log(&format!("stderr: {e}"));
                }
                lab.transition(LabState::Error, Some(message.clone()), now);
            }
            ControllerError::AgentUnavailable(_) => {
                lab.transition(LabState::Unknown, None, now);
                if let Some(agent) = agent {
                    if let Some(mut agent_row) = self.agents.find_by_id(agent.id).await? {
                        agent_row.status = AgentStatus::Offline;
                        self.agents.update(&agent_row).await?;
                    }
                }
            }
            other => {
                lab.transition(LabState::Error, Some(other.to_string()), now);
            }
        }

        self.jobs.update(job).await?;
        self.labs.update(lab).await?;
        Ok(())
    }

    /// Handler for `POST /callbacks/job/{id}`. Idempotent: a no-op if the job
    /// is already terminal.
    pub async fn handle_callback(&self, job_id: Uuid, callback: JobCallback) -> Result<(), ControllerError> {
        let mut job = self
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| ControllerError::JobNotFound(job_id.to_string()))?;

        if job.status.is_terminal() {
            return Ok(());
        }

        let lab_id = job
            .lab_id
            .ok_or_else(|| ControllerError::InvalidState("job has no lab_id".to_string()))?;
        let mut lab = self
            .labs
            .find_by_id(lab_id)
            .await?
            .ok_or_else(|| ControllerError::ResourceNotFound(format!("lab:{lab_id}")))?;
        let Some(parsed) = job.parsed_action() else {
            return Err(ControllerError::InvalidState(format!(
                "unrecognized job action: {}",
                job.action
            )));
        };

        if let Some(started) = callback.started_at {
            job.started_at = Some(started);
        }

        match callback.status.as_str() {
            "completed" => {
                self.complete_job(&mut job, &mut lab, &parsed, callback.stdout.as_deref(), callback.stderr.as_deref())
                    .await?;
            }
            "failed" => {
                let message = callback.error_message.unwrap_or_else(|| "agent reported failure".to_string());
                let err = ControllerError::AgentJobError {
                    message,
                    stdout: callback.stdout,
                    stderr: callback.stderr,
                };
                self.fail_job(&mut job, &mut lab, &err, None).await?;
            }
            other => {
                return Err(ControllerError::InvalidState(format!("unknown callback status: {other}")));
            }
        }

        if let Some(node_states) = callback.node_states {
            self.apply_node_state_updates(lab_id, &node_states).await?;
        }

        Ok(())
    }

    async fn apply_node_state_updates(
        &self,
        lab_id: Uuid,
        updates: &HashMap<String, String>,
    ) -> DomainResult<()> {
        let states = self.node_states.list_by_lab(lab_id).await?;
        for mut state in states {
            if let Some(raw) = updates.get(&state.node_name) {
                if let Some(observed) = NodeActualState::from_str(raw) {
                    state.apply_observed(observed, None);
                    self.node_states.upsert(&state).await?;
                }
            }
        }
        Ok(())
    }

    /// Handler for `POST /callbacks/dead-letter/{id}`: the job is forced to
    /// `failed`, the lab to `unknown`.
    pub async fn handle_dead_letter(&self, job_id: Uuid, diagnostic: &str) -> Result<(), ControllerError> {
        let mut job = self
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| ControllerError::JobNotFound(job_id.to_string()))?;
        if job.status.is_terminal() {
            return Ok(());
        }
        let now = Utc::now();
        job.status = JobStatus::Failed;
        job.completed_at = Some(now);
        job.append_log(&format!("ERROR: dead-letter callback: {diagnostic}"));
        self.jobs.update(&job).await?;

        if let Some(lab_id) = job.lab_id {
            if let Some(mut lab) = self.labs.find_by_id(lab_id).await? {
                lab.transition(LabState::Unknown, None, now);
                self.labs.update(&lab).await?;
            }
        }
        Ok(())
    }

    /// User cancellation: `status=cancelled`, `completed_at=now`, a log note,
    /// `lab.state=unknown`. Agent notification is fire-and-forget.
    pub async fn cancel(&self, job_id: Uuid) -> Result<(), ControllerError> {
        let mut job = self
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| ControllerError::JobNotFound(job_id.to_string()))?;
        if job.status.is_terminal() {
            return Err(ControllerError::JobCancelled);
        }

        let now = Utc::now();
        job.status = JobStatus::Cancelled;
        job.completed_at = Some(now);
        job.append_log("cancelled by user");
        self.jobs.update(&job).await?;

        if let Some(lab_id) = job.lab_id {
            if let Some(mut lab) = self.labs.find_by_id(lab_id).await? {
                lab.transition(LabState::Unknown, None, now);
                self.labs.update(&lab).await?;
            }
        }

        if let (Some(agent_id), Some(lab_id)) = (job.agent_id, job.lab_id) {
            if let Some(agent) = self.agents.find_by_id(agent_id).await? {
                let client = Arc::clone(&self.client);
                tokio::spawn(async move {
                    if let Err(err) = client.release_lock(&agent, lab_id).await {
                        tracing::warn!(%lab_id, error = %err, "best-effort cancel notification failed");
                    }
                });
            }
        }

        Ok(())
    }

    /// Retry-with-failover, spec.md §4.4/§8 scenario 4: marks `failed_job`
    /// failed, releases any stale lock on its agent, then enqueues a new job
    /// with `retry_count+1` excluding that agent from selection. Returns
    /// `None` once `retry_count` has reached `job_max_retries`.
    pub async fn retry_with_failover(self: &Arc<Self>, failed_job: &Job) -> Result<Option<Job>, ControllerError> {
        if failed_job.retry_count >= self.config.jobs.max_retries {
            if let Some(lab_id) = failed_job.lab_id {
                if let Some(mut lab) = self.labs.find_by_id(lab_id).await? {
                    lab.transition(LabState::Error, Some("job retries exhausted".to_string()), Utc::now());
                    self.labs.update(&lab).await?;
                }
            }
            return Ok(None);
        }

        let mut old = failed_job.clone();
        if !old.status.is_terminal() {
            old.status = JobStatus::Failed;
            old.completed_at = Some(Utc::now());
        }
        old.append_log("retrying");
        self.jobs.update(&old).await?;

        if let Some(agent_id) = old.agent_id {
            if let Some(agent) = self.agents.find_by_id(agent_id).await? {
                if let Err(err) = self.client.release_lock(&agent, old.lab_id.unwrap_or_default()).await {
                    tracing::warn!(error = %err, "best-effort lock release before retry failed");
                }
            }
        }

        let Some(parsed) = old.parsed_action() else {
            return Err(ControllerError::InvalidState(format!("unrecognized job action: {}", old.action)));
        };
        if matches!(parsed, JobAction::Up) {
            if let Some(lab_id) = old.lab_id {
                if self.topology.reconstruct_yaml(lab_id).await?.is_none() {
                    return Err(ControllerError::InvalidState(
                        "topology is no longer reconstructible; retry failed permanently".to_string(),
                    ));
                }
            }
        }

        let now = Utc::now();
        let mut new_job = Job {
            id: Uuid::new_v4(),
            lab_id: old.lab_id,
            user_id: old.user_id.clone(),
            action: old.action.clone(),
            status: JobStatus::Queued,
            agent_id: None,
            started_at: None,
            completed_at: None,
            last_heartbeat: None,
            retry_count: old.retry_count + 1,
            log: String::new(),
            created_at: now,
        };
        self.jobs.insert(&new_job).await?;

        let exclude = old.agent_id.into_iter().collect::<Vec<_>>();
        let engine = Arc::clone(self);
        let job_id = new_job.id;
        let exclude_for_spawn = exclude.clone();
        tokio::spawn(async move {
            if let Err(err) = engine.dispatch_excluding(job_id, &exclude_for_spawn).await {
                tracing::error!(%job_id, error = %err, "retried job dispatch failed");
            }
        });

        new_job.retry_count = old.retry_count + 1;
        Ok(Some(new_job))
    }

    async fn dispatch_excluding(&self, job_id: Uuid, exclude_agent_ids: &[Uuid]) -> Result<(), ControllerError> {
        let mut job = self
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| ControllerError::JobNotFound(job_id.to_string()))?;
        let Some(parsed) = job.parsed_action() else {
            return Err(ControllerError::InvalidState(format!("unrecognized job action: {}", job.action)));
        };
        let lab_id = job
            .lab_id
            .ok_or_else(|| ControllerError::InvalidState("job has no lab_id".to_string()))?;
        let mut lab = self
            .labs
            .find_by_id(lab_id)
            .await?
            .ok_or_else(|| ControllerError::ResourceNotFound(format!("lab:{lab_id}")))?;

        let criteria = SelectionCriteria {
            required_provider: lab.provider.clone(),
            prefer_agent_id: None,
            exclude_agent_ids: exclude_agent_ids.to_vec(),
        };
        let agent = match self.selector.select(&criteria).await {
            Ok(agent) => agent,
            Err(err) => {
                self.fail_job(&mut job, &mut lab, &err, None).await?;
                return Ok(());
            }
        };

        let now = Utc::now();
        job.started_at = Some(now);
        job.agent_id = Some(agent.id);
        job.status = JobStatus::Running;
        self.jobs.update(&job).await?;

        match &parsed {
            JobAction::Up => lab.transition(LabState::Starting, None, now),
            JobAction::Down => lab.transition(LabState::Stopping, None, now),
            _ => {}
        }
        self.labs.update(&lab).await?;

        match self.execute(&agent, &job, &parsed, &lab).await {
            Ok(AgentJobOutcome::Accepted) => {}
            Ok(AgentJobOutcome::Completed) => {
                self.complete_job(&mut job, &mut lab, &parsed, None, None).await?;
            }
            Err(err) => {
                self.fail_job(&mut job, &mut lab, &err, Some(&agent)).await?;
            }
        }
        Ok(())
    }

    fn timeout_secs(&self, kind: JobTimeoutKind) -> i64 {
        match kind {
            JobTimeoutKind::Deploy => self.config.jobs.timeout_deploy_secs,
            JobTimeoutKind::Destroy => self.config.jobs.timeout_destroy_secs,
            JobTimeoutKind::Sync => self.config.jobs.timeout_sync_secs,
            JobTimeoutKind::Node => self.config.jobs.timeout_node_secs,
        }
    }

    /// Timeout in seconds for `action`; unrecognized actions default to the
    /// deploy timeout (the longest), mirroring `original_source`'s
    /// `get_job_timeout`.
    #[must_use]
    pub fn get_job_timeout(&self, action: &str) -> i64 {
        JobAction::parse(action).map_or_else(
            || self.timeout_secs(JobTimeoutKind::Deploy),
            |parsed| self.timeout_secs(parsed.timeout_kind()),
        )
    }

    /// When a running job should time out, or `None` if it hasn't started.
    #[must_use]
    pub fn get_job_timeout_at(&self, job: &Job) -> Option<DateTime<Utc>> {
        let started_at = job.started_at?;
        Some(started_at + Duration::seconds(self.get_job_timeout(&job.action)))
    }

    /// spec.md §4.4/§8 scenario 3: a heartbeat within the last
    /// `heartbeat_override_secs` always wins over the timeout, checked before
    /// the status-specific rules.
    #[must_use]
    pub fn is_job_stuck(&self, job: &Job, now: DateTime<Utc>) -> bool {
        if let Some(last_heartbeat) = job.last_heartbeat {
            if (now - last_heartbeat).num_seconds() < self.config.jobs.heartbeat_override_secs {
                return false;
            }
        }

        match job.status {
            JobStatus::Running => match self.get_job_timeout_at(job) {
                Some(timeout_at) => now > timeout_at,
                None => false,
            },
            JobStatus::Queued => {
                let deadline = job.created_at + Duration::seconds(self.config.jobs.queued_stuck_after_secs);
                now > deadline
            }
            _ => false,
        }
    }

    /// Inverse of [`Self::is_job_stuck`] plus a grace period, used by the
    /// Reconciler to decide whether to skip a lab with an active job.
    #[must_use]
    pub fn is_job_within_timeout(&self, job: &Job, now: DateTime<Utc>) -> bool {
        if !job.status.is_active() {
            return false;
        }

        match job.status {
            JobStatus::Running => match job.started_at {
                Some(started) => {
                    let total = self.get_job_timeout(&job.action) + self.config.jobs.stuck_grace_period_secs;
                    now <= started + Duration::seconds(total)
                }
                None => true,
            },
            JobStatus::Queued => {
                let deadline = job.created_at
                    + Duration::seconds(self.config.jobs.queued_stuck_after_secs + self.config.jobs.stuck_grace_period_secs);
                now <= deadline
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(status: JobStatus, started_at: Option<DateTime<Utc>>, last_heartbeat: Option<DateTime<Utc>>) -> Job {
        Job {
            id: Uuid::new_v4(),
            lab_id: Some(Uuid::new_v4()),
            user_id: None,
            action: "up".to_string(),
            status,
            agent_id: None,
            started_at,
            completed_at: None,
            last_heartbeat,
            retry_count: 0,
            log: String::new(),
            created_at: Utc::now() - Duration::seconds(10),
        }
    }

    fn config_with_deploy_timeout(secs: i64) -> Config {
        let mut config = Config::default();
        config.jobs.timeout_deploy_secs = secs;
        config
    }

    #[test]
    fn recent_heartbeat_overrides_timeout() {
        let config = config_with_deploy_timeout(1_200);
        let now = Utc::now();
        let j = job(JobStatus::Running, Some(now - Duration::seconds(1_500)), Some(now - Duration::seconds(30)));
        assert_eq!(JobEngineTestHarness::is_job_stuck(&config, &j, now), false);
    }

    #[test]
    fn queued_job_stuck_after_two_minutes() {
        let config = Config::default();
        let now = Utc::now();
        let mut j = job(JobStatus::Queued, None, None);
        j.created_at = now - Duration::seconds(130);
        assert!(JobEngineTestHarness::is_job_stuck(&config, &j, now));

        let mut fresh = job(JobStatus::Queued, None, None);
        fresh.created_at = now - Duration::seconds(60);
        assert!(!JobEngineTestHarness::is_job_stuck(&config, &fresh, now));
    }

    /// Exercises the pure timeout math without constructing a full
    /// [`JobEngine`] (which needs live repositories); mirrors the logic in
    /// [`JobEngine::is_job_stuck`] exactly.
    struct JobEngineTestHarness;
    impl JobEngineTestHarness {
        fn is_job_stuck(config: &Config, job: &Job, now: DateTime<Utc>) -> bool {
            if let Some(last_heartbeat) = job.last_heartbeat {
                if (now - last_heartbeat).num_seconds() < config.jobs.heartbeat_override_secs {
                    return false;
                }
            }
            match job.status {
                JobStatus::Running => match job.started_at {
                    Some(started) => {
                        let timeout = config.jobs.timeout_deploy_secs;
                        now > started + Duration::seconds(timeout)
                    }
                    None => false,
                },
                JobStatus::Queued => now > job.created_at + Duration::seconds(config.jobs.queued_stuck_after_secs),
                _ => false,
            }
        }
    }
}
