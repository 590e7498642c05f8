use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::graph::{GraphEndpoint, TopologyGraph};

/// Placement of a node on a specific host, for topology analysis purposes
/// (distinct from [`crate::domain::models::NodePlacement`], which tracks
/// *runtime* placement rather than *planned* placement).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannedNodePlacement {
    pub node_name: String,
    pub host_id: String,
}

/// A link whose two endpoints were assigned to different hosts by
/// [`analyze`], needing an overlay tunnel rather than a local veth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrossHostLink {
    pub link_id: String,
    pub node_a: String,
    pub interface_a: String,
    pub host_a: String,
    pub ip_a: Option<String>,
    pub node_b: String,
    pub interface_b: String,
    pub host_b: String,
    pub ip_b: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopologyAnalysis {
    pub placements: HashMap<String, Vec<PlannedNodePlacement>>,
    pub cross_host_links: Vec<CrossHostLink>,
    pub single_host: bool,
}

/// Assigns every node to a host (explicit `node.host`, else `default_host`)
/// and classifies each link as same-host or cross-host. spec.md §4.8: "a
/// link is cross-host iff its two endpoints live on different hosts";
/// non-`node` endpoints (bridge/macvlan/host) are local to their node's host
/// and never make a link cross-host on their own.
#[must_use]
pub fn analyze(graph: &TopologyGraph, default_host: &str) -> TopologyAnalysis {
    let mut host_of: HashMap<&str, &str> = HashMap::new();
    let mut placements: HashMap<String, Vec<PlannedNodePlacement>> = HashMap::new();

    for node in &graph.nodes {
        let host = node.host.as_deref().unwrap_or(default_host);
        host_of.insert(&node.name, host);
        placements.entry(host.to_string()).or_default().push(PlannedNodePlacement {
            node_name: node.name.clone(),
            host_id: host.to_string(),
        });
    }

    let mut cross_host_links = Vec::new();
    for link in &graph.links {
        let node_endpoints: Vec<&GraphEndpoint> = link.endpoints.iter().filter(|e| e.is_node()).collect();
        if node_endpoints.len() != 2 {
            continue;
        }
        let a = node_endpoints[0];
        let b = node_endpoints[1];
        let host_a = host_of.get(a.node.as_str()).copied().unwrap_or(default_host);
        let host_b = host_of.get(b.node.as_str()).copied().unwrap_or(default_host);
        if host_a != host_b {
            let link_id = link
                .name
                .clone()
                .unwrap_or_else(|| format!("{}-{}", a.node, b.node));
            cross_host_links.push(CrossHostLink {
                link_id,
                node_a: a.node.clone(),
                interface_a: a.ifname.clone().unwrap_or_default(),
                host_a: host_a.to_string(),
                ip_a: None,
                node_b: b.node.clone(),
                interface_b: b.ifname.clone().unwrap_or_default(),
                host_b: host_b.to_string(),
                ip_b: None,
            });
        }
    }

    let single_host = placements.len() <= 1;
    TopologyAnalysis { placements, cross_host_links, single_host }
}

/// Splits `graph` into per-host sub-graphs per [`TopologyAnalysis`]. Each
/// sub-graph carries only nodes on that host plus only links with *both*
/// endpoints on that host; cross-host links are omitted (re-established via
/// the overlay protocol instead).
#[must_use]
pub fn split(graph: &TopologyGraph, analysis: &TopologyAnalysis) -> HashMap<String, TopologyGraph> {
    let mut result = HashMap::new();

    for (host_id, placed) in &analysis.placements {
        let node_names: std::collections::HashSet<&str> =
            placed.iter().map(|p| p.node_name.as_str()).collect();

        let nodes: Vec<_> = graph
            .nodes
            .iter()
            .filter(|n| node_names.contains(n.name.as_str()))
            .cloned()
            .collect();

        let links: Vec<_> = graph
            .links
            .iter()
            .filter(|link| {
                let node_endpoints: Vec<&GraphEndpoint> = link.endpoints.iter().filter(|e| e.is_node()).collect();
                node_endpoints.iter().all(|e| node_names.contains(e.node.as_str()))
                    && !node_endpoints.is_empty()
            })
            .cloned()
            .collect();

        result.insert(
            host_id.clone(),
            TopologyGraph { nodes, links, defaults: graph.defaults.clone() },
        );
    }

    result
}
