use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Link, Node};
use crate::domain::ports::{LinkRepository, NodeRepository};

pub struct SqliteNodeRepository {
    pool: SqlitePool,
}

impl SqliteNodeRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_node(row: sqlx::sqlite::SqliteRow) -> DomainResult<Node> {
        let id: String = row.get("id");
        let lab_id: String = row.get("lab_id");
        let config_json: String = row.get("config_json");
        Ok(Node {
            id: id.parse().map_err(|_| DomainError::Conflict {
                entity: "node",
                reason: "invalid id".to_string(),
            })?,
            lab_id: lab_id.parse().map_err(|_| DomainError::Conflict {
                entity: "node",
                reason: "invalid lab_id".to_string(),
            })?,
            gui_id: row.get("gui_id"),
            display_name: row.get("display_name"),
            container_name: row.get("container_name"),
            node_type: row.get("node_type"),
            device: row.get("device"),
            image: row.get("image"),
            host_id: row.get("host_id"),
            network_mode: row.get("network_mode"),
            connection_type: row.get("connection_type"),
            parent_interface: row.get("parent_interface"),
            vlan_id: row.get::<Option<i64>, _>("vlan_id").map(|v| v as u16),
            config: serde_json::from_str(&config_json)?,
        })
    }
}

#[async_trait]
impl NodeRepository for SqliteNodeRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Node>> {
        let row = sqlx::query(
            "SELECT id, lab_id, gui_id, display_name, container_name, node_type, device, image,
             host_id, network_mode, connection_type, parent_interface, vlan_id, config_json
             FROM nodes WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_node).transpose()
    }

    async fn list_by_lab(&self, lab_id: Uuid) -> DomainResult<Vec<Node>> {
        let rows = sqlx::query(
            "SELECT id, lab_id, gui_id, display_name, container_name, node_type, device, image,
             host_id, network_mode, connection_type, parent_interface, vlan_id, config_json
             FROM nodes WHERE lab_id = ?",
        )
        .bind(lab_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_node).collect()
    }

    async fn insert(&self, node: &Node) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO nodes (id, lab_id, gui_id, display_name, container_name, node_type, device,
             image, host_id, network_mode, connection_type, parent_interface, vlan_id, config_json)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(node.id.to_string())
        .bind(node.lab_id.to_string())
        .bind(&node.gui_id)
        .bind(&node.display_name)
        .bind(&node.container_name)
        .bind(&node.node_type)
        .bind(&node.device)
        .bind(&node.image)
        .bind(&node.host_id)
        .bind(&node.network_mode)
        .bind(&node.connection_type)
        .bind(&node.parent_interface)
        .bind(node.vlan_id.map(i64::from))
        .bind(serde_json::to_string(&node.config)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub struct SqliteLinkRepository {
    pool: SqlitePool,
}

impl SqliteLinkRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_link(row: sqlx::sqlite::SqliteRow) -> DomainResult<Link> {
        let id: String = row.get("id");
        let lab_id: String = row.get("lab_id");
        let source_node_id: String = row.get("source_node_id");
        let target_node_id: String = row.get("target_node_id");
        Ok(Link {
            id: id.parse().map_err(|_| DomainError::Conflict {
                entity: "link",
                reason: "invalid id".to_string(),
            })?,
            lab_id: lab_id.parse().map_err(|_| DomainError::Conflict {
                entity: "link",
                reason: "invalid lab_id".to_string(),
            })?,
            link_name: row.get("link_name"),
            source_node_id: source_node_id.parse().map_err(|_| DomainError::Conflict {
                entity: "link",
                reason: "invalid source_node_id".to_string(),
            })?,
            source_interface: row.get("source_interface"),
            target_node_id: target_node_id.parse().map_err(|_| DomainError::Conflict {
                entity: "link",
                reason: "invalid target_node_id".to_string(),
            })?,
            target_interface: row.get("target_interface"),
            mtu: row.get::<Option<i64>, _>("mtu").map(|v| v as u32),
            bandwidth: row.get::<Option<i64>, _>("bandwidth").map(|v| v as u32),
        })
    }
}

#[async_trait]
impl LinkRepository for SqliteLinkRepository {
    async fn list_by_lab(&self, lab_id: Uuid) -> DomainResult<Vec<Link>> {
        let rows = sqlx::query(
            "SELECT id, lab_id, link_name, source_node_id, source_interface, target_node_id,
             target_interface, mtu, bandwidth FROM links WHERE lab_id = ?",
        )
        .bind(lab_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_link).collect()
    }

    async fn insert(&self, link: &Link) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO links (id, lab_id, link_name, source_node_id, source_interface,
             target_node_id, target_interface, mtu, bandwidth) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(link.id.to_string())
        .bind(link.lab_id.to_string())
        .bind(&link.link_name)
        .bind(link.source_node_id.to_string())
        .bind(&link.source_interface)
        .bind(link.target_node_id.to_string())
        .bind(&link.target_interface)
        .bind(link.mtu.map(i64::from))
        .bind(link.bandwidth.map(i64::from))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
