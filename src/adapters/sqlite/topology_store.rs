use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::ports::{ImageManifest, ImageManifestEntry, LinkRepository, NodeRepository, TopologyStore};
use crate::topology::{graph_to_yaml, GraphEndpoint, GraphLink, GraphNode, TopologyGraph};

/// Reconstructs a lab's topology YAML from its stored `Node`/`Link` rows,
/// needed to retry a deploy (spec.md §4.4). Grounded on
/// `original_source/api/app/topology.py::graph_to_yaml`, which this crate's
/// `topology::graph_to_yaml` already ports; this adapter only adds the
/// DB-rows-to-graph assembly step, which has no equivalent in the original
/// (there, the graph is the primary representation; here it's reconstructed
/// from the relational Node/Link tables import leaves behind).
pub struct SqliteTopologyStore {
    nodes: Arc<dyn NodeRepository>,
    links: Arc<dyn LinkRepository>,
}

impl SqliteTopologyStore {
    #[must_use]
    pub const fn new(nodes: Arc<dyn NodeRepository>, links: Arc<dyn LinkRepository>) -> Self {
        Self { nodes, links }
    }
}

#[async_trait]
impl TopologyStore for SqliteTopologyStore {
    async fn reconstruct_yaml(&self, lab_id: Uuid) -> DomainResult<Option<String>> {
        let nodes = self.nodes.list_by_lab(lab_id).await?;
        if nodes.is_empty() {
            return Ok(None);
        }
        let links = self.links.list_by_lab(lab_id).await?;

        let id_to_gui_id: HashMap<Uuid, String> =
            nodes.iter().map(|n| (n.id, n.gui_id.clone())).collect();

        let graph_nodes = nodes
            .iter()
            .map(|node| GraphNode {
                id: node.gui_id.clone(),
                name: node.display_name.clone(),
                device: node.device.clone(),
                image: node.image.clone(),
                host: node.host_id.clone(),
                ..Default::default()
            })
            .collect();

        let graph_links = links
            .iter()
            .map(|link| GraphLink {
                endpoints: vec![
                    GraphEndpoint {
                        node: id_to_gui_id.get(&link.source_node_id).cloned().unwrap_or_default(),
                        ifname: Some(link.source_interface.clone()),
                        ..Default::default()
                    },
                    GraphEndpoint {
                        node: id_to_gui_id.get(&link.target_node_id).cloned().unwrap_or_default(),
                        ifname: Some(link.target_interface.clone()),
                        ..Default::default()
                    },
                ],
                mtu: link.mtu.map(i64::from),
                bandwidth: link.bandwidth.map(i64::from),
                ..Default::default()
            })
            .collect();

        let graph = TopologyGraph { nodes: graph_nodes, links: graph_links, defaults: None };
        Ok(Some(graph_to_yaml(&graph)))
    }
}

/// Resolves an image reference to transfer metadata for Image Sync
/// (spec.md §4.9), backed by a flat `images` table populated out of band
/// (by whatever ingests new images into the manifest).
pub struct SqliteImageManifest {
    pool: SqlitePool,
}

impl SqliteImageManifest {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageManifest for SqliteImageManifest {
    async fn resolve(&self, reference: &str) -> DomainResult<Option<ImageManifestEntry>> {
        let row = sqlx::query("SELECT image_id, reference, total_bytes FROM images WHERE reference = ?")
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| ImageManifestEntry {
            image_id: row.get("image_id"),
            reference: row.get("reference"),
            total_bytes: row.get::<Option<i64>, _>("total_bytes").map(|v| v as u64),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Link, Node};

    struct FakeNodes(Vec<Node>);
    struct FakeLinks(Vec<Link>);

    #[async_trait]
    impl NodeRepository for FakeNodes {
        async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Node>> {
            Ok(self.0.iter().find(|n| n.id == id).cloned())
        }
        async fn list_by_lab(&self, lab_id: Uuid) -> DomainResult<Vec<Node>> {
            Ok(self.0.iter().filter(|n| n.lab_id == lab_id).cloned().collect())
        }
        async fn insert(&self, _node: &Node) -> DomainResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl LinkRepository for FakeLinks {
        async fn list_by_lab(&self, lab_id: Uuid) -> DomainResult<Vec<Link>> {
            Ok(self.0.iter().filter(|l| l.lab_id == lab_id).cloned().collect())
        }
        async fn insert(&self, _link: &Link) -> DomainResult<()> {
            Ok(())
        }
    }

    fn node(lab_id: Uuid, gui_id: &str, container_name: &str) -> Node {
        Node {
            id: Uuid::new_v4(),
            lab_id,
            gui_id: gui_id.to_string(),
            display_name: gui_id.to_string(),
            container_name: container_name.to_string(),
            node_type: "ceos".into(),
            device: Some("ceos".into()),
            image: Some("ceos:4.28".into()),
            host_id: None,
            network_mode: None,
            connection_type: None,
            parent_interface: None,
            vlan_id: None,
            config: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn reconstruct_yaml_is_none_for_an_empty_lab() {
        let lab_id = Uuid::new_v4();
        let store = SqliteTopologyStore::new(Arc::new(FakeNodes(Vec::new())), Arc::new(FakeLinks(Vec::new())));
        assert!(store.reconstruct_yaml(lab_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reconstruct_yaml_links_nodes_by_gui_id() {
        let lab_id = Uuid::new_v4();
        let r1 = node(lab_id, "r1", "clab-demo-r1");
        let r2 = node(lab_id, "r2", "clab-demo-r2");
        let link = Link {
            id: Uuid::new_v4(),
            lab_id,
            link_name: "r1:eth0-r2:eth0".into(),
            source_node_id: r1.id,
            source_interface: "eth0".into(),
            target_node_id: r2.id,
            target_interface: "eth0".into(),
            mtu: None,
            bandwidth: None,
        };
        let store = SqliteTopologyStore::new(
            Arc::new(FakeNodes(vec![r1, r2])),
            Arc::new(FakeLinks(vec![link])),
        );

        let yaml = store.reconstruct_yaml(lab_id).await.unwrap().unwrap();
        let graph = crate::topology::yaml_to_graph(&yaml).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.links.len(), 1);
        let endpoint_nodes: Vec<&str> = graph.links[0].endpoints.iter().map(|e| e.node.as_str()).collect();
        assert!(endpoint_nodes.contains(&"r1"));
        assert!(endpoint_nodes.contains(&"r2"));
    }
}
