use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::{ControllerError, DomainResult};
use crate::domain::models::{Agent, Lab};
use crate::domain::ports::{AgentRepository, NodePlacementRepository};

/// Capability filter + affinity + load-balancing agent choice, spec.md §4.3.
pub struct SelectionCriteria {
    pub required_provider: String,
    pub prefer_agent_id: Option<Uuid>,
    pub exclude_agent_ids: Vec<Uuid>,
}

pub struct Selector {
    agents: Arc<dyn AgentRepository>,
    placements: Arc<dyn NodePlacementRepository>,
}

impl Selector {
    #[must_use]
    pub const fn new(agents: Arc<dyn AgentRepository>, placements: Arc<dyn NodePlacementRepository>) -> Self {
        Self { agents, placements }
    }

    /// Chooses an agent per spec.md §4.3 steps 1-5.
    pub async fn select(&self, criteria: &SelectionCriteria) -> Result<Agent, ControllerError> {
        let candidates = self.candidates(criteria).await?;
        self.pick(candidates, criteria.prefer_agent_id)
    }

    async fn candidates(&self, criteria: &SelectionCriteria) -> DomainResult<Vec<(Agent, u32)>> {
        let mut result = Vec::new();
        for agent in self.agents.list_online().await? {
            if criteria.exclude_agent_ids.contains(&agent.id) {
                continue;
            }
            if !agent.capabilities.supports(&criteria.required_provider) {
                continue;
            }
            let active = self.agents.active_job_count(agent.id).await?;
            if active >= agent.capabilities.max_concurrent_jobs() {
                continue;
            }
            result.push((agent, active));
        }
        Ok(result)
    }

    fn pick(&self, candidates: Vec<(Agent, u32)>, prefer_agent_id: Option<Uuid>) -> Result<Agent, ControllerError> {
        if candidates.is_empty() {
            return Err(ControllerError::AgentUnavailable(
                "no online agent satisfies the required provider and capacity".to_string(),
            ));
        }

        if let Some(prefer_id) = prefer_agent_id {
            if let Some((agent, _)) = candidates.iter().find(|(a, _)| a.id == prefer_id) {
                return Ok(agent.clone());
            }
        }

        let mut sorted = candidates;
        sorted.sort_by(|(a, a_load), (b, b_load)| a_load.cmp(b_load).then_with(|| a.id.cmp(&b.id)));
        Ok(sorted.into_iter().next().map(|(agent, _)| agent).unwrap())
    }

    /// Extends [`Self::select`] with placement-affinity: prefers the agent
    /// holding the majority of the lab's existing `NodePlacement` rows,
    /// falling back to general selection when none exist.
    pub async fn get_agent_for_lab(&self, lab: &Lab, required_provider: &str) -> Result<Agent, ControllerError> {
        let placements = self.placements.list_by_lab(lab.id).await?;
        let mut counts: HashMap<Uuid, u32> = HashMap::new();
        for placement in &placements {
            *counts.entry(placement.host_id).or_default() += 1;
        }

        let majority_host = counts.into_iter().max_by_key(|(_, count)| *count).map(|(id, _)| id);

        let criteria = SelectionCriteria {
            required_provider: required_provider.to_string(),
            prefer_agent_id: majority_host.or(lab.agent_id),
            exclude_agent_ids: Vec::new(),
        };
        self.select(&criteria).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use crate::domain::models::{AgentCapabilities, AgentRegistration, AgentStatus, NodePlacement};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    struct FakeAgents {
        agents: Vec<Agent>,
        active: HashMap<Uuid, u32>,
    }

    #[async_trait]
    impl AgentRepository for FakeAgents {
        async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Agent>> {
            Ok(self.agents.iter().find(|a| a.id == id).cloned())
        }
        async fn find_by_name_or_address(&self, _name: &str, _address: &str) -> DomainResult<Option<Agent>> {
            Ok(None)
        }
        async fn list_online(&self) -> DomainResult<Vec<Agent>> {
            Ok(self.agents.iter().filter(|a| a.status == AgentStatus::Online).cloned().collect())
        }
        async fn list_all(&self) -> DomainResult<Vec<Agent>> {
            Ok(self.agents.clone())
        }
        async fn insert(&self, _registration: &AgentRegistration) -> DomainResult<Agent> {
            Err(DomainError::Conflict { entity: "agent", reason: "not supported in test fake".into() })
        }
        async fn update(&self, _agent: &Agent) -> DomainResult<()> {
            Ok(())
        }
        async fn active_job_count(&self, agent_id: Uuid) -> DomainResult<u32> {
            Ok(*self.active.get(&agent_id).unwrap_or(&0))
        }
    }

    struct FakePlacements {
        rows: Mutex<Vec<NodePlacement>>,
    }

    #[async_trait]
    impl NodePlacementRepository for FakePlacements {
        async fn list_by_lab(&self, lab_id: Uuid) -> DomainResult<Vec<NodePlacement>> {
            Ok(self.rows.lock().unwrap().iter().filter(|p| p.lab_id == lab_id).cloned().collect())
        }
        async fn find(&self, _lab_id: Uuid, _node_name: &str) -> DomainResult<Option<NodePlacement>> {
            Ok(None)
        }
        async fn upsert(&self, placement: &NodePlacement) -> DomainResult<()> {
            self.rows.lock().unwrap().push(placement.clone());
            Ok(())
        }
    }

    fn agent(id: Uuid, providers: &[&str]) -> Agent {
        Agent {
            id,
            name: id.to_string(),
            address: "http://agent".into(),
            status: AgentStatus::Online,
            capabilities: AgentCapabilities {
                providers: providers.iter().map(|s| s.to_string()).collect(),
                max_concurrent_jobs: Some(4),
                features: Vec::new(),
            },
            version: None,
            last_heartbeat: Utc::now(),
            resource_usage: None,
        }
    }

    #[tokio::test]
    async fn picks_least_loaded_among_capable_agents() {
        let a1 = agent(Uuid::new_v4(), &["containerlab"]);
        let a2 = agent(Uuid::new_v4(), &["libvirt"]);
        let a3 = agent(Uuid::new_v4(), &["containerlab", "libvirt"]);
        let mut active = HashMap::new();
        active.insert(a1.id, 3);
        active.insert(a2.id, 0);
        active.insert(a3.id, 1);
        let agents = Arc::new(FakeAgents { agents: vec![a1, a2.clone(), a3], active });
        let placements = Arc::new(FakePlacements { rows: Mutex::new(Vec::new()) });
        let selector = Selector::new(agents, placements);

        let chosen = selector
            .select(&SelectionCriteria {
                required_provider: "libvirt".into(),
                prefer_agent_id: None,
                exclude_agent_ids: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(chosen.id, a2.id);
    }

    #[tokio::test]
    async fn affinity_wins_even_if_not_least_loaded() {
        let a1 = agent(Uuid::new_v4(), &["containerlab"]);
        let a2 = agent(Uuid::new_v4(), &["containerlab"]);
        let mut active = HashMap::new();
        active.insert(a1.id, 3);
        active.insert(a2.id, 0);
        let agents = Arc::new(FakeAgents { agents: vec![a1.clone(), a2], active });
        let placements = Arc::new(FakePlacements { rows: Mutex::new(Vec::new()) });
        let selector = Selector::new(agents, placements);

        let chosen = selector
            .select(&SelectionCriteria {
                required_provider: "containerlab".into(),
                prefer_agent_id: Some(a1.id),
                exclude_agent_ids: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(chosen.id, a1.id);
    }
}
