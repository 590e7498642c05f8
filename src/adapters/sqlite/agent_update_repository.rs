use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AgentUpdateJob, AgentUpdateStatus};
use crate::domain::ports::AgentUpdateRepository;

pub struct SqliteAgentUpdateRepository {
    pool: SqlitePool,
}

impl SqliteAgentUpdateRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_job(row: sqlx::sqlite::SqliteRow) -> DomainResult<AgentUpdateJob> {
        let id: String = row.get("id");
        let agent_id: String = row.get("agent_id");
        let status: String = row.get("status");
        Ok(AgentUpdateJob {
            id: id.parse().map_err(|_| DomainError::Conflict {
                entity: "agent_update_job",
                reason: "invalid id".to_string(),
            })?,
            agent_id: agent_id.parse().map_err(|_| DomainError::Conflict {
                entity: "agent_update_job",
                reason: "invalid agent_id".to_string(),
            })?,
            target_version: row.get("target_version"),
            status: AgentUpdateStatus::from_str(&status).unwrap_or(AgentUpdateStatus::Failed),
            started_at: row
                .get::<Option<String>, _>("started_at")
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.with_timezone(&Utc))),
            completed_at: row
                .get::<Option<String>, _>("completed_at")
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.with_timezone(&Utc))),
            error_message: row.get("error_message"),
        })
    }
}

#[async_trait]
impl AgentUpdateRepository for SqliteAgentUpdateRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<AgentUpdateJob>> {
        let row = sqlx::query(
            "SELECT id, agent_id, target_version, status, started_at, completed_at, error_message
             FROM agent_update_jobs WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_job).transpose()
    }

    async fn insert(&self, job: &AgentUpdateJob) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO agent_update_jobs (id, agent_id, target_version, status, started_at,
             completed_at, error_message) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(job.id.to_string())
        .bind(job.agent_id.to_string())
        .bind(&job.target_version)
        .bind(job.status.as_str())
        .bind(job.started_at.map(|dt| dt.to_rfc3339()))
        .bind(job.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(&job.error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, job: &AgentUpdateJob) -> DomainResult<()> {
        sqlx::query(
            "UPDATE agent_update_jobs SET status = ?, started_at = ?, completed_at = ?,
             error_message = ? WHERE id = ?",
        )
        .bind(job.status.as_str())
        .bind(job.started_at.map(|dt| dt.to_rfc3339()))
        .bind(job.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(&job.error_message)
        .bind(job.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
