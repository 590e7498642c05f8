use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Agent, DesiredState, JobAction, LabState, NodeActualState, NodePlacement};
use crate::domain::ports::{
    AgentRepository, CooldownStore, JobRepository, LabRepository, NodePlacementRepository,
    NodeRepository, NodeStateRepository,
};
use crate::services::job_engine::JobEngine;

/// Drives `actual_state` toward `desired_state` for stable labs, spec.md
/// §4.7. Grounded on `original_source/api/app/tasks/state_enforcement.py`
/// for the cooldown-gated, FK-then-placement-then-default agent resolution
/// order.
pub struct StateEnforcer {
    labs: Arc<dyn LabRepository>,
    node_states: Arc<dyn NodeStateRepository>,
    nodes: Arc<dyn NodeRepository>,
    placements: Arc<dyn NodePlacementRepository>,
    agents: Arc<dyn AgentRepository>,
    jobs: Arc<dyn JobRepository>,
    cooldown: Arc<dyn CooldownStore>,
    job_engine: Arc<JobEngine>,
    cooldown_secs: i64,
}

impl StateEnforcer {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        labs: Arc<dyn LabRepository>,
        node_states: Arc<dyn NodeStateRepository>,
        nodes: Arc<dyn NodeRepository>,
        placements: Arc<dyn NodePlacementRepository>,
        agents: Arc<dyn AgentRepository>,
        jobs: Arc<dyn JobRepository>,
        cooldown: Arc<dyn CooldownStore>,
        job_engine: Arc<JobEngine>,
        cooldown_secs: i64,
    ) -> Self {
        Self {
            labs,
            node_states,
            nodes,
            placements,
            agents,
            jobs,
            cooldown,
            job_engine,
            cooldown_secs,
        }
    }

    /// One full sweep over every stable lab's drifted NodeStates. Errors
    /// enforcing one node never block the rest.
    pub async fn run_once(&self) {
        let labs = match self
            .labs
            .find_by_states(&[LabState::Running, LabState::Stopped, LabState::Error])
            .await
        {
            Ok(labs) => labs,
            Err(err) => {
                tracing::warn!(error = %err, "failed to list stable labs for enforcement");
                return;
            }
        };

        for lab in labs {
            let states = match self.node_states.list_by_lab(lab.id).await {
                Ok(states) => states,
                Err(err) => {
                    tracing::warn!(lab_id = %lab.id, error = %err, "failed to list node states for enforcement");
                    continue;
                }
            };
            for state in states {
                if let Err(err) = self.enforce_node(lab.id, &state.node_name, state.desired_state, state.actual_state).await
                {
                    tracing::warn!(lab_id = %lab.id, node = %state.node_name, error = %err, "state enforcement failed for node");
                }
            }
        }
    }

    async fn enforce_node(
        &self,
        lab_id: Uuid,
        node_name: &str,
        desired: DesiredState,
        actual: NodeActualState,
    ) -> DomainResult<()> {
        let action = match (desired, actual) {
            (DesiredState::Running, NodeActualState::Stopped | NodeActualState::Undeployed) => JobAction::NodeStart(node_name.to_string()),
            (DesiredState::Stopped, NodeActualState::Running) => JobAction::NodeStop(node_name.to_string()),
            _ => return Ok(()),
        };

        if self.cooldown.is_on_cooldown(lab_id, node_name).await {
            return Ok(());
        }

        if !self.jobs.list_active_for_node(lab_id, node_name).await?.is_empty() {
            return Ok(());
        }

        let lab_has_active_up_down = self
            .jobs
            .list_active_for_lab(lab_id)
            .await?
            .iter()
            .any(|job| matches!(job.parsed_action(), Some(JobAction::Up) | Some(JobAction::Down)));
        if lab_has_active_up_down {
            return Ok(());
        }

        let Some(agent) = self.resolve_agent_for_node(lab_id, node_name).await? else {
            return Ok(());
        };
        if agent.status != crate::domain::models::AgentStatus::Online {
            return Ok(());
        }

        let placement = NodePlacement {
            lab_id,
            node_name: node_name.to_string(),
            host_id: agent.id,
            status: actual.as_str().to_string(),
        };
        self.placements.upsert(&placement).await?;

        self.cooldown.set_cooldown(lab_id, node_name, self.cooldown_secs).await;

        if let Err(err) = self.job_engine.enqueue(Some(lab_id), action, None).await {
            tracing::warn!(lab_id = %lab_id, node = %node_name, error = %err, "failed to enqueue enforcement job");
        }

        Ok(())
    }

    /// FK to `Node.host_id` first, then `NodePlacement`, then the lab's
    /// default agent — same resolution order as the Reconciler's.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_mapping_start() {
        let mapped = match (DesiredState::Running, NodeActualState::Stopped) {
            (DesiredState::Running, NodeActualState::Stopped | NodeActualState::Undeployed) => {
                Some(JobAction::NodeStart("r1".to_string()))
            }
            _ => None,
        };
        assert_eq!(mapped, Some(JobAction::NodeStart("r1".to_string())));
    }

    #[test]
    fn matching_states_need_no_action() {
        let mapped = match (DesiredState::Running, NodeActualState::Running) {
            (DesiredState::Running, NodeActualState::Stopped | NodeActualState::Undeployed) => {
                Some(JobAction::NodeStart("r1".to_string()))
            }
            (DesiredState::Stopped, NodeActualState::Running) => Some(JobAction::NodeStop("r1".to_string())),
            _ => None,
        };
        assert_eq!(mapped, None);
    }
}
