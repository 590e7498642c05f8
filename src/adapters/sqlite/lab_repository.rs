use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Lab, LabState};
use crate::domain::ports::LabRepository;

pub struct SqliteLabRepository {
    pool: SqlitePool,
}

impl SqliteLabRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_lab(row: sqlx::sqlite::SqliteRow) -> DomainResult<Lab> {
        let id: String = row.get("id");
        let state: String = row.get("state");
        let agent_id: Option<String> = row.get("agent_id");
        let state_updated_at: String = row.get("state_updated_at");
        Ok(Lab {
            id: id.parse().map_err(|_| DomainError::Conflict {
                entity: "lab",
                reason: "invalid id".to_string(),
            })?,
            name: row.get("name"),
            owner: row.get("owner"),
            provider: row.get("provider"),
            state: LabState::from_str(&state).unwrap_or(LabState::Unknown),
            agent_id: agent_id.and_then(|s| s.parse().ok()),
            state_updated_at: DateTime::parse_from_rfc3339(&state_updated_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            state_error: row.get("state_error"),
        })
    }
}

#[async_trait]
impl LabRepository for SqliteLabRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Lab>> {
        let row = sqlx::query(
            "SELECT id, name, owner, provider, state, agent_id, state_updated_at, state_error
             FROM labs WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_lab).transpose()
    }

    async fn update(&self, lab: &Lab) -> DomainResult<()> {
        sqlx::query(
            "UPDATE labs SET name = ?, owner = ?, provider = ?, state = ?, agent_id = ?,
             state_updated_at = ?, state_error = ? WHERE id = ?",
        )
        .bind(&lab.name)
        .bind(&lab.owner)
        .bind(&lab.provider)
        .bind(lab.state.as_str())
        .bind(lab.agent_id.map(|id| id.to_string()))
        .bind(lab.state_updated_at.to_rfc3339())
        .bind(&lab.state_error)
        .bind(lab.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_states(&self, states: &[LabState]) -> DomainResult<Vec<Lab>> {
        let placeholders = states.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT id, name, owner, provider, state, agent_id, state_updated_at, state_error
             FROM labs WHERE state IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql);
        for state in states {
            query = query.bind(state.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_lab).collect()
    }

    async fn list_all(&self) -> DomainResult<Vec<Lab>> {
        let rows = sqlx::query(
            "SELECT id, name, owner, provider, state, agent_id, state_updated_at, state_error FROM labs",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_lab).collect()
    }
}
