use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Agent, DesiredState, LabState, LinkActualState, LinkDesiredState, LinkState, NodeActualState,
    NodePlacement, NodeState,
};
use crate::domain::ports::{
    AgentClient, AgentRepository, JobRepository, LabRepository, LinkRepository,
    LinkStateRepository, NodePlacementRepository, NodeRepository, NodeStateRepository,
};
use crate::services::job_engine::JobEngine;

/// Makes the database match observed reality without taking action,
/// spec.md §4.6.
pub struct Reconciler {
    labs: Arc<dyn LabRepository>,
    node_states: Arc<dyn NodeStateRepository>,
    link_states: Arc<dyn LinkStateRepository>,
    nodes: Arc<dyn NodeRepository>,
    links: Arc<dyn LinkRepository>,
    placements: Arc<dyn NodePlacementRepository>,
    agents: Arc<dyn AgentRepository>,
    client: Arc<dyn AgentClient>,
    jobs: Arc<dyn JobRepository>,
    job_engine: Arc<JobEngine>,
    stale_pending_threshold_secs: i64,
}

impl Reconciler {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        labs: Arc<dyn LabRepository>,
        node_states: Arc<dyn NodeStateRepository>,
        link_states: Arc<dyn LinkStateRepository>,
        nodes: Arc<dyn NodeRepository>,
        links: Arc<dyn LinkRepository>,
        placements: Arc<dyn NodePlacementRepository>,
        agents: Arc<dyn AgentRepository>,
        client: Arc<dyn AgentClient>,
        jobs: Arc<dyn JobRepository>,
        job_engine: Arc<JobEngine>,
        stale_pending_threshold_secs: i64,
    ) -> Self {
        Self {
            labs,
            node_states,
            link_states,
            nodes,
            links,
            placements,
            agents,
            client,
            jobs,
            job_engine,
            stale_pending_threshold_secs,
        }
    }

    /// One full sweep: readiness polling followed by per-lab reconciliation
    /// over the target-selection union, each lab isolated from the others'
    /// errors.
    pub async fn run_once(&self) {
        if let Err(err) = self.poll_readiness().await {
            tracing::warn!(error = %err, "readiness polling pass failed");
        }

        let target_labs = match self.target_lab_ids().await {
            Ok(ids) => ids,
            Err(err) => {
                tracing::warn!(error = %err, "failed to compute reconciliation target set");
                return;
            }
        };

        for lab_id in target_labs {
            if let Err(err) = self.reconcile_lab(lab_id).await {
                tracing::warn!(%lab_id, error = %err, "reconciliation failed for lab");
            }
        }
    }

    /// The six-criteria target-selection union, spec.md §4.6.
    async fn target_lab_ids(&self) -> DomainResult<HashSet<Uuid>> {
        let mut ids = HashSet::new();

        for lab in self
            .labs
            .find_by_states(&[LabState::Starting, LabState::Stopping, LabState::Unknown])
            .await?
        {
            ids.insert(lab.id);
        }
        for ns in self.node_states.list_stale_pending(self.stale_pending_threshold_secs).await? {
            ids.insert(ns.lab_id);
        }
        for ns in self.node_states.list_running_not_ready().await? {
            ids.insert(ns.lab_id);
        }
        for ns in self.node_states.list_error().await? {
            ids.insert(ns.lab_id);
        }

        for lab in self.labs.list_all().await? {
            for ns in self.node_states.list_by_lab(lab.id).await? {
                let needs_start = ns.desired_state == DesiredState::Running
                    && matches!(ns.actual_state, NodeActualState::Stopped | NodeActualState::Undeployed);
                let missing_placement = ns.actual_state == NodeActualState::Running
                    && self.placements.find(lab.id, &ns.node_name).await?.is_none();
                if needs_start || missing_placement {
                    ids.insert(lab.id);
                }
            }
        }

        Ok(ids)
    }

    /// Readiness polling, run independently of the full reconciliation and
    /// safe during an active job since it only ever flips a boolean.
    pub async fn poll_readiness(&self) -> DomainResult<()> {
        let now = Utc::now();
        for mut state in self.node_states.list_running_not_ready().await? {
            if state.boot_started_at.is_none() {
                state.boot_started_at = Some(now);
                self.node_states.upsert(&state).await?;
            }

            let Some(agent) = self.resolve_agent_for_node(state.lab_id, &state.node_name).await? else {
                continue;
            };

            match self.client.check_node_readiness(&agent, state.lab_id, &state.node_name).await {
                Ok(true) => {
                    state.is_ready = true;
                    self.node_states.upsert(&state).await?;
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::debug!(lab_id = %state.lab_id, node = %state.node_name, error = %err, "readiness check failed");
                }
            }
        }
        Ok(())
    }

    /// The numbered per-lab reconciliation algorithm of spec.md §4.6.
    async fn reconcile_lab(&self, lab_id: Uuid) -> DomainResult<()> {
        let Some(mut lab) = self.labs.find_by_id(lab_id).await? else {
            return Ok(());
        };

        // Step 1: skip labs with a healthy active job; a stuck one is the
        // Health Monitor's responsibility, not ours.
        let active_jobs = self.jobs.list_active_for_lab(lab_id).await?;
        let now = Utc::now();
        if active_jobs.iter().any(|job| self.job_engine.is_job_within_timeout(job, now)) {
            return Ok(());
        }

        // Step 2: candidate agents.
        let mut candidate_agents: HashSet<Uuid> = self
            .placements
            .list_by_lab(lab_id)
            .await?
            .into_iter()
            .map(|p| p.host_id)
            .collect();
        if let Some(agent_id) = lab.agent_id {
            candidate_agents.insert(agent_id);
        }
        if candidate_agents.is_empty() {
            if let Some(agent) = self.agents.list_online().await?.into_iter().next() {
                candidate_agents.insert(agent.id);
            }
        }

        // Step 3: query get_lab_status on each candidate, union results.
        let mut container_status_map: HashMap<String, (String, Uuid)> = HashMap::new();
        for agent_id in &candidate_agents {
            let Some(agent) = self.agents.find_by_id(*agent_id).await? else { continue };
            match self.client.get_lab_status(&agent, lab_id).await {
                Ok(report) => {
                    for container in report.containers {
                        container_status_map.insert(container.node_name, (container.status, agent.id));
                    }
                }
                Err(err) => {
                    tracing::debug!(%lab_id, agent_id = %agent.id, error = %err, "get_lab_status failed");
                }
            }
        }

        // Step 4: update each NodeState's actual_state.
        let mut states = self.node_states.list_by_lab(lab_id).await?;
        for state in &mut states {
            let observed = container_status_map.get(&state.node_name);
            let (actual, error_message) = match observed {
                Some((status, _)) => {
                    let actual = NodeActualState::from_container_status(status);
                    let msg = (actual == NodeActualState::Error)
                        .then(|| format!("container reported status '{status}'"));
                    (actual, msg)
                }
                None => (NodeActualState::Undeployed, None),
            };
            state.apply_observed(actual, error_message);
            self.node_states.upsert(state).await?;

            // Step 5: upsert NodePlacement for every observed container.
            if let Some((_, agent_id)) = observed {
                let placement = NodePlacement {
                    lab_id,
                    node_name: state.node_name.clone(),
                    host_id: *agent_id,
                    status: actual.as_str().to_string(),
                };
                self.placements.upsert(&placement).await?;
            }
        }

        // Step 6: aggregate lab state.
        let aggregated = if states.iter().any(|s| s.actual_state == NodeActualState::Error) {
            LabState::Error
        } else if states.iter().any(|s| s.actual_state == NodeActualState::Running) {
            LabState::Running
        } else {
            LabState::Stopped
        };
        let error_note = states
            .iter()
            .find(|s| s.actual_state == NodeActualState::Error)
            .and_then(|s| s.error_message.clone());
        lab.transition(aggregated, error_note, now);
        self.labs.update(&lab).await?;

        // Steps 7+8: derive LinkState for every defined Link, backfilling
        // missing rows; desired_state is never overwritten.
        let nodes = self.nodes.list_by_lab(lab_id).await?;
        let node_name_by_id: HashMap<Uuid, String> =
            nodes.iter().map(|n| (n.id, n.container_name.clone())).collect();
        let state_by_name: HashMap<&str, &NodeState> =
            states.iter().map(|s| (s.node_name.as_str(), s)).collect();

        let existing_link_states = self.link_states.list_by_lab(lab_id).await?;
        let existing_by_name: HashMap<&str, &LinkState> =
            existing_link_states.iter().map(|ls| (ls.link_name.as_str(), ls)).collect();

        for link in self.links.list_by_lab(lab_id).await? {
            let Some(source_name) = node_name_by_id.get(&link.source_node_id) else { continue };
            let Some(target_name) = node_name_by_id.get(&link.target_node_id) else { continue };

            let source_actual = state_by_name.get(source_name.as_str()).map_or(NodeActualState::Undeployed, |s| s.actual_state);
            let target_actual = state_by_name.get(target_name.as_str()).map_or(NodeActualState::Undeployed, |s| s.actual_state);
            let (derived, error_message) = LinkActualState::derive(source_actual, target_actual);

            let desired_state = existing_by_name
                .get(link.link_name.as_str())
                .map_or(LinkDesiredState::Up, |ls| ls.desired_state);

            let link_state = LinkState {
                lab_id,
                link_name: link.link_name.clone(),
                source_node: source_name.clone(),
                source_interface: link.source_interface.clone(),
                target_node: target_name.clone(),
                target_interface: link.target_interface.clone(),
                desired_state,
                actual_state: derived,
                error_message,
            };
            self.link_states.upsert(&link_state).await?;
        }

        Ok(())
    }

    /// FK to `Node.host_id` first, then `NodePlacement`, then the lab's
    /// default agent.
    async fn resolve_agent_for_node(&self, lab_id: Uuid, node_name: &str) -> DomainResult<Option<Agent>> {
        for node in self.nodes.list_by_lab(lab_id).await? {
            if node.container_name != node_name {
                continue;
            }
            if let Some(host_ref) = &node.host_id {
                if let Some(agent) = self.resolve_agent_by_ref(host_ref).await? {
                    return Ok(Some(agent));
                }
            }
            break;
        }

        if let Some(placement) = self.placements.find(lab_id, node_name).await? {
            if let Some(agent) = self.agents.find_by_id(placement.host_id).await? {
                return Ok(Some(agent));
            }
        }

        if let Some(lab) = self.labs.find_by_id(lab_id).await? {
            if let Some(agent_id) = lab.agent_id {
                return self.agents.find_by_id(agent_id).await;
            }
        }

        Ok(None)
    }

    async fn resolve_agent_by_ref(&self, host_ref: &str) -> DomainResult<Option<Agent>> {
        if let Ok(id) = host_ref.parse::<Uuid>() {
            if let Some(agent) = self.agents.find_by_id(id).await? {
                return Ok(Some(agent));
            }
        }
        Ok(self.agents.list_all().await?.into_iter().find(|a| a.name == host_ref))
    }
}

/// Matches an observed (possibly truncated) lab-id prefix reported by a
/// container runtime against the known lab ids, spec.md §4.6 tie-break:
/// exact match, else prefix match, else shortest-length tie broken by
/// preferring the match whose string length equals the observed prefix's,
/// else the first candidate encountered.
#[must_use]
pub fn match_lab_by_prefix(known: &[Uuid], observed_prefix: &str) -> Option<Uuid> {
    let exact = known.iter().find(|id| id.to_string() == observed_prefix);
    if let Some(id) = exact {
        return Some(*id);
    }

    let mut candidates: Vec<&Uuid> = known
        .iter()
        .filter(|id| id.to_string().starts_with(observed_prefix))
        .collect();
    if candidates.is_empty() {
        return None;
    }
    if candidates.len() == 1 {
        return Some(*candidates[0]);
    }

    candidates.sort_by_key(|id| id.to_string().len());
    let shortest_len = candidates[0].to_string().len();
    candidates
        .iter()
        .find(|id| id.to_string().len() == shortest_len)
        .map(|id| **id)
        .or(Some(*candidates[0]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_wins_over_prefix() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let known = vec![a, b];
        assert_eq!(match_lab_by_prefix(&known, &a.to_string()), Some(a));
    }

    #[test]
    fn prefix_match_when_unique() {
        let a = Uuid::new_v4();
        let prefix = &a.to_string()[..8];
        let known = vec![a];
        assert_eq!(match_lab_by_prefix(&known, prefix), Some(a));
    }

    #[test]
    fn no_match_returns_none() {
        let known = vec![Uuid::new_v4()];
        assert_eq!(match_lab_by_prefix(&known, "deadbeef"), None);
    }

    /// Mirrors `reconcile_lab` step 6's aggregation exactly, without
    /// constructing a full [`Reconciler`] (which needs a live [`JobEngine`]).
    fn aggregate(states: &[NodeActualState]) -> LabState {
        if states.iter().any(|s| *s == NodeActualState::Error) {
            LabState::Error
        } else if states.iter().any(|s| *s == NodeActualState::Running) {
            LabState::Running
        } else {
            LabState::Stopped
        }
    }

    #[test]
    fn one_errored_node_downgrades_the_whole_lab() {
        let states = [NodeActualState::Running, NodeActualState::Error, NodeActualState::Running];
        assert_eq!(aggregate(&states), LabState::Error);
    }

    #[test]
    fn any_running_node_without_errors_keeps_the_lab_running() {
        let states = [NodeActualState::Running, NodeActualState::Stopped];
        assert_eq!(aggregate(&states), LabState::Running);
    }

    #[test]
    fn all_stopped_or_undeployed_settles_the_lab_as_stopped() {
        let states = [NodeActualState::Stopped, NodeActualState::Undeployed];
        assert_eq!(aggregate(&states), LabState::Stopped);
    }
}
