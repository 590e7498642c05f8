use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    DesiredState, LinkActualState, LinkDesiredState, LinkState, NodeActualState, NodePlacement, NodeState,
};
use crate::domain::ports::{LinkStateRepository, NodePlacementRepository, NodeStateRepository};

pub struct SqliteNodeStateRepository {
    pool: SqlitePool,
}

impl SqliteNodeStateRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_state(row: sqlx::sqlite::SqliteRow) -> DomainResult<NodeState> {
        let lab_id: String = row.get("lab_id");
        let node_id: String = row.get("node_id");
        let desired: String = row.get("desired_state");
        let actual: String = row.get("actual_state");
        let boot_started_at: Option<String> = row.get("boot_started_at");
        Ok(NodeState {
            lab_id: lab_id.parse().map_err(|_| DomainError::Conflict {
                entity: "node_state",
                reason: "invalid lab_id".to_string(),
            })?,
            node_id: node_id.parse().map_err(|_| DomainError::Conflict {
                entity: "node_state",
                reason: "invalid node_id".to_string(),
            })?,
            node_name: row.get("node_name"),
            desired_state: DesiredState::from_str(&desired).unwrap_or(DesiredState::Stopped),
            actual_state: NodeActualState::from_str(&actual).unwrap_or(NodeActualState::Undeployed),
            is_ready: row.get::<i64, _>("is_ready") != 0,
            boot_started_at: boot_started_at.and_then(|s| {
                DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.with_timezone(&Utc))
            }),
            error_message: row.get("error_message"),
        })
    }
}

#[async_trait]
impl NodeStateRepository for SqliteNodeStateRepository {
    async fn find(&self, lab_id: Uuid, node_id: Uuid) -> DomainResult<Option<NodeState>> {
        let row = sqlx::query(
            "SELECT lab_id, node_id, node_name, desired_state, actual_state, is_ready,
             boot_started_at, error_message FROM node_states WHERE lab_id = ? AND node_id = ?",
        )
        .bind(lab_id.to_string())
        .bind(node_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_state).transpose()
    }

    async fn list_by_lab(&self, lab_id: Uuid) -> DomainResult<Vec<NodeState>> {
        let rows = sqlx::query(
            "SELECT lab_id, node_id, node_name, desired_state, actual_state, is_ready,
             boot_started_at, error_message FROM node_states WHERE lab_id = ?",
        )
        .bind(lab_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_state).collect()
    }

    async fn list_stale_pending(&self, older_than_secs: i64) -> DomainResult<Vec<NodeState>> {
        let cutoff = Utc::now() - chrono::Duration::seconds(older_than_secs);
        let rows = sqlx::query(
            "SELECT lab_id, node_id, node_name, desired_state, actual_state, is_ready,
             boot_started_at, error_message FROM node_states
             WHERE actual_state = 'pending' AND boot_started_at IS NOT NULL AND boot_started_at < ?",
        )
        .bind(cutoff.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_state).collect()
    }

    async fn list_running_not_ready(&self) -> DomainResult<Vec<NodeState>> {
        let rows = sqlx::query(
            "SELECT lab_id, node_id, node_name, desired_state, actual_state, is_ready,
             boot_started_at, error_message FROM node_states
             WHERE actual_state = 'running' AND is_ready = 0",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_state).collect()
    }

    async fn list_error(&self) -> DomainResult<Vec<NodeState>> {
        let rows = sqlx::query(
            "SELECT lab_id, node_id, node_name, desired_state, actual_state, is_ready,
             boot_started_at, error_message FROM node_states WHERE actual_state = 'error'",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_state).collect()
    }

    async fn upsert(&self, state: &NodeState) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO node_states (lab_id, node_id, node_name, desired_state, actual_state,
             is_ready, boot_started_at, error_message) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(lab_id, node_id) DO UPDATE SET
                node_name = excluded.node_name,
                desired_state = excluded.desired_state,
                actual_state = excluded.actual_state,
                is_ready = excluded.is_ready,
                boot_started_at = excluded.boot_started_at,
                error_message = excluded.error_message",
        )
        .bind(state.lab_id.to_string())
        .bind(state.node_id.to_string())
        .bind(&state.node_name)
        .bind(state.desired_state.as_str())
        .bind(state.actual_state.as_str())
        .bind(i64::from(state.is_ready))
        .bind(state.boot_started_at.map(|dt| dt.to_rfc3339()))
        .bind(&state.error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub struct SqliteLinkStateRepository {
    pool: SqlitePool,
}

impl SqliteLinkStateRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_state(row: sqlx::sqlite::SqliteRow) -> DomainResult<LinkState> {
        let lab_id: String = row.get("lab_id");
        let desired: String = row.get("desired_state");
        let actual: String = row.get("actual_state");
        Ok(LinkState {
            lab_id: lab_id.parse().map_err(|_| DomainError::Conflict {
                entity: "link_state",
                reason: "invalid lab_id".to_string(),
            })?,
            link_name: row.get("link_name"),
            source_node: row.get("source_node"),
            source_interface: row.get("source_interface"),
            target_node: row.get("target_node"),
            target_interface: row.get("target_interface"),
            desired_state: LinkDesiredState::from_str(&desired).unwrap_or(LinkDesiredState::Down),
            actual_state: LinkActualState::from_str(&actual).unwrap_or(LinkActualState::Unknown),
            error_message: row.get("error_message"),
        })
    }
}

#[async_trait]
impl LinkStateRepository for SqliteLinkStateRepository {
    async fn list_by_lab(&self, lab_id: Uuid) -> DomainResult<Vec<LinkState>> {
        let rows = sqlx::query(
            "SELECT lab_id, link_name, source_node, source_interface, target_node,
             target_interface, desired_state, actual_state, error_message
             FROM link_states WHERE lab_id = ?",
        )
        .bind(lab_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_state).collect()
    }

    async fn upsert(&self, state: &LinkState) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO link_states (lab_id, link_name, source_node, source_interface,
             target_node, target_interface, desired_state, actual_state, error_message)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(lab_id, link_name) DO UPDATE SET
                source_node = excluded.source_node,
                source_interface = excluded.source_interface,
                target_node = excluded.target_node,
                target_interface = excluded.target_interface,
                actual_state = excluded.actual_state,
                error_message = excluded.error_message",
        )
        .bind(state.lab_id.to_string())
        .bind(&state.link_name)
        .bind(&state.source_node)
        .bind(&state.source_interface)
        .bind(&state.target_node)
        .bind(&state.target_interface)
        .bind(state.desired_state.as_str())
        .bind(state.actual_state.as_str())
        .bind(&state.error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub struct SqliteNodePlacementRepository {
    pool: SqlitePool,
}

impl SqliteNodePlacementRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_placement(row: sqlx::sqlite::SqliteRow) -> DomainResult<NodePlacement> {
        let lab_id: String = row.get("lab_id");
        let host_id: String = row.get("host_id");
        Ok(NodePlacement {
            lab_id: lab_id.parse().map_err(|_| DomainError::Conflict {
                entity: "node_placement",
                reason: "invalid lab_id".to_string(),
            })?,
            node_name: row.get("node_name"),
            host_id: host_id.parse().map_err(|_| DomainError::Conflict {
                entity: "node_placement",
                reason: "invalid host_id".to_string(),
            })?,
            status: row.get("status"),
        })
    }
}

#[async_trait]
impl NodePlacementRepository for SqliteNodePlacementRepository {
    async fn list_by_lab(&self, lab_id: Uuid) -> DomainResult<Vec<NodePlacement>> {
        let rows = sqlx::query("SELECT lab_id, node_name, host_id, status FROM node_placements WHERE lab_id = ?")
            .bind(lab_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_placement).collect()
    }

    async fn find(&self, lab_id: Uuid, node_name: &str) -> DomainResult<Option<NodePlacement>> {
        let row = sqlx::query(
            "SELECT lab_id, node_name, host_id, status FROM node_placements WHERE lab_id = ? AND node_name = ?",
        )
        .bind(lab_id.to_string())
        .bind(node_name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_placement).transpose()
    }

    async fn upsert(&self, placement: &NodePlacement) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO node_placements (lab_id, node_name, host_id, status) VALUES (?, ?, ?, ?)
             ON CONFLICT(lab_id, node_name) DO UPDATE SET host_id = excluded.host_id, status = excluded.status",
        )
        .bind(placement.lab_id.to_string())
        .bind(&placement.node_name)
        .bind(placement.host_id.to_string())
        .bind(&placement.status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
