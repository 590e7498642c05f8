use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Job, JobStatus};
use crate::domain::ports::JobRepository;

pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_dt(s: Option<String>) -> Option<DateTime<Utc>> {
        s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.with_timezone(&Utc)))
    }

    fn row_to_job(row: sqlx::sqlite::SqliteRow) -> DomainResult<Job> {
        let id: String = row.get("id");
        let lab_id: Option<String> = row.get("lab_id");
        let agent_id: Option<String> = row.get("agent_id");
        let status: String = row.get("status");
        let created_at: String = row.get("created_at");
        Ok(Job {
            id: id.parse().map_err(|_| DomainError::Conflict {
                entity: "job",
                reason: "invalid id".to_string(),
            })?,
            lab_id: lab_id.and_then(|s| s.parse().ok()),
            user_id: row.get("user_id"),
            action: row.get("action"),
            status: JobStatus::from_str(&status).unwrap_or(JobStatus::Failed),
            agent_id: agent_id.and_then(|s| s.parse().ok()),
            started_at: Self::parse_dt(row.get("started_at")),
            completed_at: Self::parse_dt(row.get("completed_at")),
            last_heartbeat: Self::parse_dt(row.get("last_heartbeat")),
            retry_count: row.get::<i64, _>("retry_count") as u32,
            log: row.get("log"),
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Job>> {
        let row = sqlx::query(
            "SELECT id, lab_id, user_id, action, status, agent_id, started_at, completed_at,
             last_heartbeat, retry_count, log, created_at FROM jobs WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_job).transpose()
    }

    async fn insert(&self, job: &Job) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO jobs (id, lab_id, user_id, action, status, agent_id, started_at,
             completed_at, last_heartbeat, retry_count, log, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(job.id.to_string())
        .bind(job.lab_id.map(|id| id.to_string()))
        .bind(&job.user_id)
        .bind(&job.action)
        .bind(job.status.as_str())
        .bind(job.agent_id.map(|id| id.to_string()))
        .bind(job.started_at.map(|dt| dt.to_rfc3339()))
        .bind(job.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(job.last_heartbeat.map(|dt| dt.to_rfc3339()))
        .bind(i64::from(job.retry_count))
        .bind(&job.log)
        .bind(job.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, job: &Job) -> DomainResult<()> {
        sqlx::query(
            "UPDATE jobs SET lab_id = ?, user_id = ?, action = ?, status = ?, agent_id = ?,
             started_at = ?, completed_at = ?, last_heartbeat = ?, retry_count = ?, log = ?
             WHERE id = ?",
        )
        .bind(job.lab_id.map(|id| id.to_string()))
        .bind(&job.user_id)
        .bind(&job.action)
        .bind(job.status.as_str())
        .bind(job.agent_id.map(|id| id.to_string()))
        .bind(job.started_at.map(|dt| dt.to_rfc3339()))
        .bind(job.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(job.last_heartbeat.map(|dt| dt.to_rfc3339()))
        .bind(i64::from(job.retry_count))
        .bind(&job.log)
        .bind(job.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_active_for_user(&self, user_id: &str) -> DomainResult<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM jobs WHERE user_id = ? AND status IN ('queued', 'running')",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("count") as u32)
    }

    async fn list_by_status(&self, status: JobStatus) -> DomainResult<Vec<Job>> {
        let rows = sqlx::query(
            "SELECT id, lab_id, user_id, action, status, agent_id, started_at, completed_at,
             last_heartbeat, retry_count, log, created_at FROM jobs WHERE status = ?",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_job).collect()
    }

    async fn list_active(&self) -> DomainResult<Vec<Job>> {
        let rows = sqlx::query(
            "SELECT id, lab_id, user_id, action, status, agent_id, started_at, completed_at,
             last_heartbeat, retry_count, log, created_at FROM jobs WHERE status IN ('queued', 'running')",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_job).collect()
    }

    async fn list_active_for_lab(&self, lab_id: Uuid) -> DomainResult<Vec<Job>> {
        let rows = sqlx::query(
            "SELECT id, lab_id, user_id, action, status, agent_id, started_at, completed_at,
             last_heartbeat, retry_count, log, created_at FROM jobs
             WHERE lab_id = ? AND status IN ('queued', 'running')",
        )
        .bind(lab_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_job).collect()
    }

    async fn list_active_for_node(&self, lab_id: Uuid, node_name: &str) -> DomainResult<Vec<Job>> {
        let pattern_start = format!("node:start:{node_name}");
        let pattern_stop = format!("node:stop:{node_name}");
        let rows = sqlx::query(
            "SELECT id, lab_id, user_id, action, status, agent_id, started_at, completed_at,
             last_heartbeat, retry_count, log, created_at FROM jobs
             WHERE lab_id = ? AND status IN ('queued', 'running') AND action IN (?, ?)",
        )
        .bind(lab_id.to_string())
        .bind(pattern_start)
        .bind(pattern_stop)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_job).collect()
    }
}
