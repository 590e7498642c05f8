use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::{ControllerError, DomainResult};
use crate::domain::models::{Agent, AgentRegistration, AgentStatus, ResourceUsage};
use crate::domain::ports::AgentRepository;

/// Identity reconciliation, heartbeat ingestion, staleness sweep, spec.md
/// §4.2. Grounded on the teacher's registration-or-update pattern in
/// `services/swarm_orchestrator/agent_lifecycle.rs`.
pub struct AgentRegistry {
    repo: Arc<dyn AgentRepository>,
    stale_timeout_secs: i64,
}

/// Outcome of [`AgentRegistry::register`]: the id the agent should adopt.
#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub assigned_id: Uuid,
    pub agent: Agent,
}

impl AgentRegistry {
    #[must_use]
    pub const fn new(repo: Arc<dyn AgentRepository>, stale_timeout_secs: i64) -> Self {
        Self { repo, stale_timeout_secs }
    }

    /// `register(agent_info)`: lookup by id → update in place; else lookup by
    /// `name OR address` → update the existing row in place and return *its*
    /// id; else insert new. spec.md §3/§4.2/§8 scenario 1.
    pub async fn register(&self, registration: &AgentRegistration) -> DomainResult<RegisterOutcome> {
        let now = Utc::now();

        if let Some(id) = registration.id {
            if let Some(mut existing) = self.repo.find_by_id(id).await? {
                existing.name = registration.name.clone();
                existing.address = registration.address.clone();
                existing.capabilities = registration.capabilities.clone();
                existing.version = registration.version.clone();
                existing.status = AgentStatus::Online;
                existing.last_heartbeat = now;
                self.repo.update(&existing).await?;
                return Ok(RegisterOutcome { assigned_id: existing.id, agent: existing });
            }
        }

        if let Some(mut existing) = self
            .repo
            .find_by_name_or_address(&registration.name, &registration.address)
            .await?
        {
            existing.name = registration.name.clone();
            existing.address = registration.address.clone();
            existing.capabilities = registration.capabilities.clone();
            existing.version = registration.version.clone();
            existing.status = AgentStatus::Online;
            existing.last_heartbeat = now;
            self.repo.update(&existing).await?;
            return Ok(RegisterOutcome { assigned_id: existing.id, agent: existing });
        }

        let agent = self.repo.insert(registration).await?;
        Ok(RegisterOutcome { assigned_id: agent.id, agent })
    }

    /// `heartbeat(agent_id)`: update status, resource snapshot,
    /// `last_heartbeat`. `pending_jobs` is always empty — see DESIGN.md Open
    /// Question 1.
    pub async fn heartbeat(
        &self,
        agent_id: Uuid,
        resource_usage: Option<ResourceUsage>,
    ) -> Result<Vec<String>, ControllerError> {
        let Some(mut agent) = self.repo.find_by_id(agent_id).await? else {
            return Err(ControllerError::ResourceNotFound(format!("agent:{agent_id}")));
        };
        agent.status = AgentStatus::Online;
        agent.resource_usage = resource_usage;
        agent.last_heartbeat = Utc::now();
        self.repo.update(&agent).await?;
        Ok(Vec::new())
    }

    /// Transitions any `online` agent with a stale `last_heartbeat` to
    /// `offline`. Returns the agents that were just marked offline so the
    /// Job Engine can fail over their jobs.
    pub async fn sweep_stale(&self) -> DomainResult<Vec<Agent>> {
        let now = Utc::now();
        let mut newly_offline = Vec::new();
        for mut agent in self.repo.list_online().await? {
            if agent.is_stale(self.stale_timeout_secs, now) {
                agent.status = AgentStatus::Offline;
                self.repo.update(&agent).await?;
                newly_offline.push(agent);
            }
        }
        Ok(newly_offline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use crate::domain::models::AgentCapabilities;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeAgentRepo {
        agents: Mutex<Vec<Agent>>,
    }

    #[async_trait]
    impl AgentRepository for FakeAgentRepo {
        async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Agent>> {
            Ok(self.agents.lock().unwrap().iter().find(|a| a.id == id).cloned())
        }

        async fn find_by_name_or_address(&self, name: &str, address: &str) -> DomainResult<Option<Agent>> {
            Ok(self
                .agents
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.name == name || a.address == address)
                .cloned())
        }

        async fn list_online(&self) -> DomainResult<Vec<Agent>> {
            Ok(self
                .agents
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.status == AgentStatus::Online)
                .cloned()
                .collect())
        }

        async fn list_all(&self) -> DomainResult<Vec<Agent>> {
            Ok(self.agents.lock().unwrap().clone())
        }

        async fn insert(&self, registration: &AgentRegistration) -> DomainResult<Agent> {
            let agent = Agent {
                id: registration.id.unwrap_or_else(Uuid::new_v4),
                name: registration.name.clone(),
                address: registration.address.clone(),
                status: AgentStatus::Online,
                capabilities: registration.capabilities.clone(),
                version: registration.version.clone(),
                last_heartbeat: Utc::now(),
                resource_usage: None,
            };
            self.agents.lock().unwrap().push(agent.clone());
            Ok(agent)
        }

        async fn update(&self, agent: &Agent) -> DomainResult<()> {
            let mut agents = self.agents.lock().unwrap();
            if let Some(existing) = agents.iter_mut().find(|a| a.id == agent.id) {
                *existing = agent.clone();
                Ok(())
            } else {
                Err(DomainError::NotFound { entity: "agent", id: agent.id.to_string() })
            }
        }

        async fn active_job_count(&self, _agent_id: Uuid) -> DomainResult<u32> {
            Ok(0)
        }
    }

    fn registration(id: Option<Uuid>, name: &str, address: &str) -> AgentRegistration {
        AgentRegistration {
            id,
            name: name.to_string(),
            address: address.to_string(),
            capabilities: AgentCapabilities::default(),
            version: None,
        }
    }

    #[tokio::test]
    async fn duplicate_registration_by_name_and_address_updates_in_place() {
        let repo = Arc::new(FakeAgentRepo { agents: Mutex::new(Vec::new()) });
        let registry = AgentRegistry::new(repo.clone(), 90);

        let first = registry
            .register(&registration(None, "edge1", "10.0.0.1:8080"))
            .await
            .unwrap();

        let second = registry
            .register(&registration(Some(Uuid::new_v4()), "edge1", "10.0.0.1:8080"))
            .await
            .unwrap();

        assert_eq!(second.assigned_id, first.assigned_id);
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sweep_marks_stale_agents_offline() {
        let repo = Arc::new(FakeAgentRepo { agents: Mutex::new(Vec::new()) });
        let registry = AgentRegistry::new(repo.clone(), 90);
        let outcome = registry
            .register(&registration(None, "edge1", "10.0.0.1:8080"))
            .await
            .unwrap();

        {
            let mut agents = repo.agents.lock().unwrap();
            let agent = agents.iter_mut().find(|a| a.id == outcome.assigned_id).unwrap();
            agent.last_heartbeat = Utc::now() - chrono::Duration::seconds(200);
        }

        let offline = registry.sweep_stale().await.unwrap();
        assert_eq!(offline.len(), 1);
        assert_eq!(offline[0].status, AgentStatus::Offline);
    }
}
