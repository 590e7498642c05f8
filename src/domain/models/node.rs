use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A topology-defined node. Immutable once imported; lives alongside its
/// runtime counterpart, [`super::node_state::NodeState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: Uuid,
    pub lab_id: Uuid,
    pub gui_id: String,
    pub display_name: String,
    /// Unique per lab.
    pub container_name: String,
    pub node_type: String,
    pub device: Option<String>,
    pub image: Option<String>,
    pub host_id: Option<String>,
    pub network_mode: Option<String>,
    pub connection_type: Option<String>,
    pub parent_interface: Option<String>,
    pub vlan_id: Option<u16>,
    pub config: Value,
}
