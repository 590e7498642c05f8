use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Agent, AgentCapabilities, AgentRegistration, AgentStatus, ResourceUsage};
use crate::domain::ports::AgentRepository;

/// Grounded on `adapters/sqlite/task_repository.rs`: manual `sqlx::query`/
/// `query_as` binding, not compile-time `query!` macros (no database is
/// available in this environment to check macros against).
pub struct SqliteAgentRepository {
    pool: SqlitePool,
}

impl SqliteAgentRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_agent(
        id: String,
        name: String,
        address: String,
        status: String,
        capabilities_json: String,
        version: Option<String>,
        last_heartbeat: String,
        resource_usage_json: Option<String>,
    ) -> DomainResult<Agent> {
        Ok(Agent {
            id: id.parse().map_err(|_| DomainError::Conflict {
                entity: "agent",
                reason: "invalid id".to_string(),
            })?,
            name,
            address,
            status: AgentStatus::from_str(&status).unwrap_or(AgentStatus::Offline),
            capabilities: serde_json::from_str::<AgentCapabilities>(&capabilities_json)?,
            version,
            last_heartbeat: DateTime::parse_from_rfc3339(&last_heartbeat)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            resource_usage: resource_usage_json
                .map(|s| serde_json::from_str::<ResourceUsage>(&s))
                .transpose()?,
        })
    }
}

#[async_trait]
impl AgentRepository for SqliteAgentRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Agent>> {
        let row = sqlx::query(
            "SELECT id, name, address, status, capabilities_json, version, last_heartbeat, resource_usage_json
             FROM agents WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Self::row_to_agent(
                r.get("id"),
                r.get("name"),
                r.get("address"),
                r.get("status"),
                r.get("capabilities_json"),
                r.get("version"),
                r.get("last_heartbeat"),
                r.get("resource_usage_json"),
            )
        })
        .transpose()
    }

    async fn find_by_name_or_address(&self, name: &str, address: &str) -> DomainResult<Option<Agent>> {
        let row = sqlx::query(
            "SELECT id, name, address, status, capabilities_json, version, last_heartbeat, resource_usage_json
             FROM agents WHERE name = ? OR address = ? LIMIT 1",
        )
        .bind(name)
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Self::row_to_agent(
                r.get("id"),
                r.get("name"),
                r.get("address"),
                r.get("status"),
                r.get("capabilities_json"),
                r.get("version"),
                r.get("last_heartbeat"),
                r.get("resource_usage_json"),
            )
        })
        .transpose()
    }

    async fn list_online(&self) -> DomainResult<Vec<Agent>> {
        let rows = sqlx::query(
            "SELECT id, name, address, status, capabilities_json, version, last_heartbeat, resource_usage_json
             FROM agents WHERE status = 'online'",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Self::row_to_agent(
                    r.get("id"),
                    r.get("name"),
                    r.get("address"),
                    r.get("status"),
                    r.get("capabilities_json"),
                    r.get("version"),
                    r.get("last_heartbeat"),
                    r.get("resource_usage_json"),
                )
            })
            .collect()
    }

    async fn list_all(&self) -> DomainResult<Vec<Agent>> {
        let rows = sqlx::query(
            "SELECT id, name, address, status, capabilities_json, version, last_heartbeat, resource_usage_json
             FROM agents",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Self::row_to_agent(
                    r.get("id"),
                    r.get("name"),
                    r.get("address"),
                    r.get("status"),
                    r.get("capabilities_json"),
                    r.get("version"),
                    r.get("last_heartbeat"),
                    r.get("resource_usage_json"),
                )
            })
            .collect()
    }

    async fn insert(&self, registration: &AgentRegistration) -> DomainResult<Agent> {
        let id = registration.id.unwrap_or_else(Uuid::new_v4);
        let now = Utc::now();
        let capabilities_json = serde_json::to_string(&registration.capabilities)?;

        sqlx::query(
            "INSERT INTO agents (id, name, address, status, capabilities_json, version, last_heartbeat, resource_usage_json)
             VALUES (?, ?, ?, 'online', ?, ?, ?, NULL)",
        )
        .bind(id.to_string())
        .bind(&registration.name)
        .bind(&registration.address)
        .bind(&capabilities_json)
        .bind(&registration.version)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Agent {
            id,
            name: registration.name.clone(),
            address: registration.address.clone(),
            status: AgentStatus::Online,
            capabilities: registration.capabilities.clone(),
            version: registration.version.clone(),
            last_heartbeat: now,
            resource_usage: None,
        })
    }

    async fn update(&self, agent: &Agent) -> DomainResult<()> {
        let capabilities_json = serde_json::to_string(&agent.capabilities)?;
        let resource_usage_json = agent
            .resource_usage
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "UPDATE agents SET name = ?, address = ?, status = ?, capabilities_json = ?, version = ?,
             last_heartbeat = ?, resource_usage_json = ? WHERE id = ?",
        )
        .bind(&agent.name)
        .bind(&agent.address)
        .bind(agent.status.as_str())
        .bind(&capabilities_json)
        .bind(&agent.version)
        .bind(agent.last_heartbeat.to_rfc3339())
        .bind(&resource_usage_json)
        .bind(agent.id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn active_job_count(&self, agent_id: Uuid) -> DomainResult<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM jobs WHERE agent_id = ? AND status IN ('queued', 'running')",
        )
        .bind(agent_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        let count: i64 = row.get("count");
        Ok(count as u32)
    }
}
