use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ImageHost, ImageHostStatus, ImageSyncJob, ImageSyncJobStatus};
use crate::domain::ports::{ImageHostRepository, ImageSyncJobRepository};

pub struct SqliteImageHostRepository {
    pool: SqlitePool,
}

impl SqliteImageHostRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_image_host(row: sqlx::sqlite::SqliteRow) -> DomainResult<ImageHost> {
        let host_id: String = row.get("host_id");
        let status: String = row.get("status");
        let synced_at: Option<String> = row.get("synced_at");
        Ok(ImageHost {
            image_id: row.get("image_id"),
            host_id: host_id.parse().map_err(|_| DomainError::Conflict {
                entity: "image_host",
                reason: "invalid host_id".to_string(),
            })?,
            reference: row.get("reference"),
            status: ImageHostStatus::from_str(&status).unwrap_or(ImageHostStatus::Unknown),
            synced_at: synced_at.and_then(|s| DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.with_timezone(&Utc))),
            error_message: row.get("error_message"),
        })
    }
}

#[async_trait]
impl ImageHostRepository for SqliteImageHostRepository {
    async fn find(&self, image_id: &str, host_id: Uuid) -> DomainResult<Option<ImageHost>> {
        let row = sqlx::query(
            "SELECT image_id, host_id, reference, status, synced_at, error_message
             FROM image_hosts WHERE image_id = ? AND host_id = ?",
        )
        .bind(image_id)
        .bind(host_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_image_host).transpose()
    }

    async fn list_by_host(&self, host_id: Uuid) -> DomainResult<Vec<ImageHost>> {
        let rows = sqlx::query(
            "SELECT image_id, host_id, reference, status, synced_at, error_message
             FROM image_hosts WHERE host_id = ?",
        )
        .bind(host_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_image_host).collect()
    }

    async fn upsert(&self, image_host: &ImageHost) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO image_hosts (image_id, host_id, reference, status, synced_at, error_message)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(image_id, host_id) DO UPDATE SET
                reference = excluded.reference, status = excluded.status,
                synced_at = excluded.synced_at, error_message = excluded.error_message",
        )
        .bind(&image_host.image_id)
        .bind(image_host.host_id.to_string())
        .bind(&image_host.reference)
        .bind(image_host.status.as_str())
        .bind(image_host.synced_at.map(|dt| dt.to_rfc3339()))
        .bind(&image_host.error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub struct SqliteImageSyncJobRepository {
    pool: SqlitePool,
}

impl SqliteImageSyncJobRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_sync_job(row: sqlx::sqlite::SqliteRow) -> DomainResult<ImageSyncJob> {
        let id: String = row.get("id");
        let host_id: String = row.get("host_id");
        let status: String = row.get("status");
        Ok(ImageSyncJob {
            id: id.parse().map_err(|_| DomainError::Conflict {
                entity: "image_sync_job",
                reason: "invalid id".to_string(),
            })?,
            image_id: row.get("image_id"),
            host_id: host_id.parse().map_err(|_| DomainError::Conflict {
                entity: "image_sync_job",
                reason: "invalid host_id".to_string(),
            })?,
            status: ImageSyncJobStatus::from_str(&status).unwrap_or(ImageSyncJobStatus::Failed),
            bytes_transferred: row.get::<i64, _>("bytes_transferred") as u64,
            total_bytes: row.get::<Option<i64>, _>("total_bytes").map(|v| v as u64),
            started_at: row
                .get::<Option<String>, _>("started_at")
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.with_timezone(&Utc))),
            completed_at: row
                .get::<Option<String>, _>("completed_at")
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.with_timezone(&Utc))),
        })
    }
}

#[async_trait]
impl ImageSyncJobRepository for SqliteImageSyncJobRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<ImageSyncJob>> {
        let row = sqlx::query(
            "SELECT id, image_id, host_id, status, bytes_transferred, total_bytes, started_at,
             completed_at FROM image_sync_jobs WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_sync_job).transpose()
    }

    async fn insert(&self, job: &ImageSyncJob) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO image_sync_jobs (id, image_id, host_id, status, bytes_transferred,
             total_bytes, started_at, completed_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(job.id.to_string())
        .bind(&job.image_id)
        .bind(job.host_id.to_string())
        .bind(job.status.as_str())
        .bind(job.bytes_transferred as i64)
        .bind(job.total_bytes.map(|v| v as i64))
        .bind(job.started_at.map(|dt| dt.to_rfc3339()))
        .bind(job.completed_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, job: &ImageSyncJob) -> DomainResult<()> {
        sqlx::query(
            "UPDATE image_sync_jobs SET status = ?, bytes_transferred = ?, total_bytes = ?,
             started_at = ?, completed_at = ? WHERE id = ?",
        )
        .bind(job.status.as_str())
        .bind(job.bytes_transferred as i64)
        .bind(job.total_bytes.map(|v| v as i64))
        .bind(job.started_at.map(|dt| dt.to_rfc3339()))
        .bind(job.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(job.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_active_for_host(&self, host_id: Uuid) -> DomainResult<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM image_sync_jobs
             WHERE host_id = ? AND status IN ('pending', 'transferring', 'loading')",
        )
        .bind(host_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("count") as u32)
    }

    async fn list_by_status(&self, status: ImageSyncJobStatus) -> DomainResult<Vec<ImageSyncJob>> {
        let rows = sqlx::query(
            "SELECT id, image_id, host_id, status, bytes_transferred, total_bytes, started_at,
             completed_at FROM image_sync_jobs WHERE status = ?",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_sync_job).collect()
    }
}
