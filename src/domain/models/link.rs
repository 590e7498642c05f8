use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A topology-defined link between two node interfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: Uuid,
    pub lab_id: Uuid,
    /// Unique per lab; canonical form, see [`Link::canonical_name`].
    pub link_name: String,
    pub source_node_id: Uuid,
    pub source_interface: String,
    pub target_node_id: Uuid,
    pub target_interface: String,
    pub mtu: Option<u32>,
    pub bandwidth: Option<u32>,
}

impl Link {
    /// The canonical link name: `node:iface` for both endpoints, sorted
    /// lexicographically and joined with `-` (spec.md §3).
    #[must_use]
    pub fn canonical_name(
        source_node: &str,
        source_interface: &str,
        target_node: &str,
        target_interface: &str,
    ) -> String {
        let a = format!("{source_node}:{source_interface}");
        let b = format!("{target_node}:{target_interface}");
        if a <= b {
            format!("{a}-{b}")
        } else {
            format!("{b}-{a}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_name_is_order_independent() {
        let ab = Link::canonical_name("r1", "eth0", "r2", "eth1");
        let ba = Link::canonical_name("r2", "eth1", "r1", "eth0");
        assert_eq!(ab, ba);
        assert_eq!(ab, "r1:eth0-r2:eth1");
    }
}
