use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Records which agent currently hosts a given container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePlacement {
    pub lab_id: Uuid,
    pub node_name: String,
    pub host_id: Uuid,
    pub status: String,
}
