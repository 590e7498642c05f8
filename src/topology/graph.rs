use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Host-placement-scoped topology graph. This is deliberately not a full
/// topology-format parser (spec.md non-goal: "does not parse or validate
/// topology contents beyond what is needed for host-placement analysis") —
/// it round-trips only the fields the Multi-host Deployer needs plus
/// whatever free-form node vars/link attrs were present, passed through
/// opaquely.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TopologyGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    #[serde(default)]
    pub defaults: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub mgmt: Option<HashMap<String, Value>>,
    #[serde(default)]
    pub vars: Option<HashMap<String, Value>>,
    /// Agent id for multi-host placement; absent means "use the caller's
    /// default host".
    #[serde(default)]
    pub host: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphLink {
    pub endpoints: Vec<GraphEndpoint>,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pool: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub bridge: Option<String>,
    #[serde(default)]
    pub mtu: Option<i64>,
    #[serde(default)]
    pub bandwidth: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphEndpoint {
    pub node: String,
    #[serde(default)]
    pub ifname: Option<String>,
    /// "node" (default), or an external connection type (bridge/macvlan/host).
    #[serde(default = "default_endpoint_type")]
    pub r#type: String,
}

fn default_endpoint_type() -> String {
    "node".to_string()
}

impl GraphEndpoint {
    #[must_use]
    pub fn is_node(&self) -> bool {
        self.r#type == "node"
    }
}

const LINK_ATTRS: &[&str] = &[
    "bandwidth", "bridge", "disable", "gateway", "group", "mtu", "name", "pool", "prefix", "ra",
    "role", "shutdown", "type",
];

/// Renders a [`TopologyGraph`] into agent-consumable topology YAML, the
/// inverse of [`yaml_to_graph`].
#[must_use]
pub fn graph_to_yaml(graph: &TopologyGraph) -> String {
    let mut used_names: HashSet<String> = HashSet::new();
    let mut name_map: HashMap<String, String> = HashMap::new();
    let mut nodes = serde_yaml::Mapping::new();

    for node in &graph.nodes {
        let safe_name = safe_node_name(&node.name, &used_names);
        name_map.insert(node.name.clone(), safe_name.clone());
        used_names.insert(safe_name.clone());

        let mut node_data = serde_yaml::Mapping::new();
        if let Some(v) = &node.device {
            node_data.insert(Value::from("device"), Value::from(v.as_str()));
        }
        if let Some(v) = &node.image {
            node_data.insert(Value::from("image"), Value::from(v.as_str()));
        }
        if let Some(v) = &node.version {
            node_data.insert(Value::from("version"), Value::from(v.as_str()));
        }
        if let Some(v) = &node.role {
            node_data.insert(Value::from("role"), Value::from(v.as_str()));
        }
        if let Some(v) = &node.mgmt {
            node_data.insert(Value::from("mgmt"), map_to_value(v));
        }
        if let Some(vars) = &node.vars {
            for (k, v) in vars {
                node_data.insert(Value::from(k.as_str()), v.clone());
            }
        }

        let value = if node_data.is_empty() {
            Value::Null
        } else {
            Value::Mapping(node_data)
        };
        nodes.insert(Value::from(safe_name), value);
    }

    let mut links = Vec::new();
    for link in &graph.links {
        let mut link_data = serde_yaml::Mapping::new();
        if let Some(v) = &link.r#type {
            link_data.insert(Value::from("type"), Value::from(v.as_str()));
        }
        if let Some(v) = &link.name {
            link_data.insert(Value::from("name"), Value::from(v.as_str()));
        }
        if let Some(v) = &link.pool {
            link_data.insert(Value::from("pool"), Value::from(v.as_str()));
        }
        if let Some(v) = &link.prefix {
            link_data.insert(Value::from("prefix"), Value::from(v.as_str()));
        }
        if let Some(v) = &link.bridge {
            link_data.insert(Value::from("bridge"), Value::from(v.as_str()));
        }
        if let Some(v) = link.mtu {
            link_data.insert(Value::from("mtu"), Value::from(v));
        }
        if let Some(v) = link.bandwidth {
            link_data.insert(Value::from("bandwidth"), Value::from(v));
        }

        for endpoint in &link.endpoints {
            let endpoint_name = name_map
                .get(&endpoint.node)
                .cloned()
                .unwrap_or_else(|| endpoint.node.clone());
            let ep_value = match &endpoint.ifname {
                Some(ifname) => {
                    let mut m = serde_yaml::Mapping::new();
                    m.insert(Value::from("ifname"), Value::from(ifname.as_str()));
                    Value::Mapping(m)
                }
                None => Value::Mapping(serde_yaml::Mapping::new()),
            };
            link_data.insert(Value::from(endpoint_name), ep_value);
        }

        links.push(Value::Mapping(link_data));
    }

    let mut topology = serde_yaml::Mapping::new();
    if let Some(defaults) = &graph.defaults {
        topology.insert(Value::from("defaults"), map_to_value(defaults));
    }
    topology.insert(Value::from("nodes"), Value::Mapping(nodes));
    topology.insert(Value::from("links"), Value::Sequence(links));

    serde_yaml::to_string(&Value::Mapping(topology)).unwrap_or_default()
}

fn map_to_value(map: &HashMap<String, Value>) -> Value {
    let mut m = serde_yaml::Mapping::new();
    for (k, v) in map {
        m.insert(Value::from(k.as_str()), v.clone());
    }
    Value::Mapping(m)
}

fn safe_node_name(name: &str, used: &HashSet<String>) -> String {
    let is_simple = name.len() <= 16
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if is_simple && !used.contains(name) {
        return name.to_string();
    }

    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('_').to_string();
    let mut clean = if cleaned.is_empty()
        || !cleaned
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    {
        if cleaned.is_empty() {
            "n".to_string()
        } else {
            format!("n_{cleaned}")
        }
    } else {
        cleaned
    };
    if clean.is_empty() {
        clean = "n".to_string();
    }

    for attempt in 0..100 {
        let suffix = short_hash(&format!("{name}-{attempt}"));
        let base_max = 16usize.saturating_sub(suffix.len() + 1).max(1);
        let base: String = clean.chars().take(base_max).collect();
        let candidate = format!("{base}_{suffix}");
        if !used.contains(&candidate) {
            return candidate;
        }
    }
    format!("n_{}", short_hash(name))
}

fn short_hash(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..2])
}

/// Parses agent-consumable topology YAML into a [`TopologyGraph`].
pub fn yaml_to_graph(content: &str) -> Result<TopologyGraph, serde_yaml::Error> {
    let data: Value = serde_yaml::from_str(content)?;
    let mapping = match data {
        Value::Mapping(m) => m,
        _ => return Ok(TopologyGraph::default()),
    };

    let defaults = mapping
        .get(Value::from("defaults"))
        .and_then(|v| v.as_mapping())
        .map(mapping_to_map);

    let mut nodes = Vec::new();
    if let Some(nodes_value) = mapping.get(Value::from("nodes")) {
        match nodes_value {
            Value::Sequence(seq) => {
                for item in seq {
                    if let Some(name) = item.as_str() {
                        nodes.push(GraphNode {
                            id: name.to_string(),
                            name: name.to_string(),
                            ..Default::default()
                        });
                    }
                }
            }
            Value::Mapping(node_map) => {
                for (key, attrs) in node_map {
                    let Some(name) = key.as_str() else { continue };
                    let attrs = attrs.as_mapping().cloned().unwrap_or_default();
                    let known = ["device", "image", "version", "role", "mgmt"];
                    let vars: HashMap<String, Value> = attrs
                        .iter()
                        .filter_map(|(k, v)| {
                            let ks = k.as_str()?;
                            if known.contains(&ks) {
                                None
                            } else {
                                Some((ks.to_string(), v.clone()))
                            }
                        })
                        .collect();
                    nodes.push(GraphNode {
                        id: name.to_string(),
                        name: name.to_string(),
                        device: attrs.get(Value::from("device")).and_then(|v| v.as_str()).map(String::from),
                        image: attrs.get(Value::from("image")).and_then(|v| v.as_str()).map(String::from),
                        version: attrs.get(Value::from("version")).and_then(|v| v.as_str()).map(String::from),
                        role: attrs.get(Value::from("role")).and_then(|v| v.as_str()).map(String::from),
                        mgmt: attrs.get(Value::from("mgmt")).and_then(|v| v.as_mapping()).map(mapping_to_map),
                        vars: if vars.is_empty() { None } else { Some(vars) },
                        host: None,
                    });
                }
            }
            _ => {}
        }
    }

    let mut links = Vec::new();
    if let Some(links_value) = mapping.get(Value::from("links")) {
        match links_value {
            Value::Mapping(group_map) => {
                for (_, group_links) in group_map {
                    if let Value::Sequence(seq) = group_links {
                        for item in seq {
                            if let Some(link) = parse_link_item(item) {
                                links.push(link);
                            }
                        }
                    }
                }
            }
            Value::Sequence(seq) => {
                for item in seq {
                    if let Some(link) = parse_link_item(item) {
                        links.push(link);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(TopologyGraph { nodes, links, defaults })
}

fn mapping_to_map(m: &serde_yaml::Mapping) -> HashMap<String, Value> {
    m.iter()
        .filter_map(|(k, v)| k.as_str().map(|ks| (ks.to_string(), v.clone())))
        .collect()
}

fn parse_link_item(item: &Value) -> Option<GraphLink> {
    match item {
        Value::String(s) if s.contains('-') => {
            let parts: Vec<&str> = s.splitn(2, '-').collect();
            if parts.len() == 2 {
                Some(GraphLink {
                    endpoints: vec![
                        GraphEndpoint { node: parts[0].to_string(), ..Default::default() },
                        GraphEndpoint { node: parts[1].to_string(), ..Default::default() },
                    ],
                    ..Default::default()
                })
            } else {
                None
            }
        }
        Value::Sequence(seq) => {
            let endpoints = seq
                .iter()
                .filter_map(|v| v.as_str().map(|s| GraphEndpoint { node: s.to_string(), ..Default::default() }))
                .collect();
            Some(GraphLink { endpoints, ..Default::default() })
        }
        Value::Mapping(m) => {
            let mut endpoints = Vec::new();
            let mut link = GraphLink::default();
            for (k, v) in m {
                let Some(key) = k.as_str() else { continue };
                if LINK_ATTRS.contains(&key) {
                    match key {
                        "type" => link.r#type = v.as_str().map(String::from),
                        "name" => link.name = v.as_str().map(String::from),
                        "pool" => link.pool = v.as_str().map(String::from),
                        "prefix" => link.prefix = v.as_str().map(String::from),
                        "bridge" => link.bridge = v.as_str().map(String::from),
                        "mtu" => link.mtu = v.as_i64(),
                        "bandwidth" => link.bandwidth = v.as_i64(),
                        _ => {}
                    }
                    continue;
                }
                if let Value::Mapping(inner) = v {
                    let ifname = inner.get(Value::from("ifname")).and_then(|v| v.as_str()).map(String::from);
                    endpoints.push(GraphEndpoint { node: key.to_string(), ifname, ..Default::default() });
                } else {
                    endpoints.push(GraphEndpoint { node: key.to_string(), ..Default::default() });
                }
            }
            link.endpoints = endpoints;
            Some(link)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_node_name_passes_through_simple_names() {
        let used = HashSet::new();
        assert_eq!(safe_node_name("r1", &used), "r1");
    }

    #[test]
    fn safe_node_name_sanitizes_and_dedupes() {
        let mut used = HashSet::new();
        used.insert("r1".to_string());
        let name = safe_node_name("r1", &used);
        assert_ne!(name, "r1");
        assert!(name.starts_with("r1_") || name.starts_with("n_"));
    }

    #[test]
    fn round_trips_simple_topology() {
        let graph = TopologyGraph {
            nodes: vec![
                GraphNode { id: "r1".into(), name: "r1".into(), device: Some("ceos".into()), ..Default::default() },
                GraphNode { id: "r2".into(), name: "r2".into(), ..Default::default() },
            ],
            links: vec![GraphLink {
                endpoints: vec![
                    GraphEndpoint { node: "r1".into(), ifname: Some("eth0".into()), ..Default::default() },
                    GraphEndpoint { node: "r2".into(), ifname: Some("eth0".into()), ..Default::default() },
                ],
                ..Default::default()
            }],
            defaults: None,
        };

        let yaml = graph_to_yaml(&graph);
        let parsed = yaml_to_graph(&yaml).unwrap();
        assert_eq!(parsed.nodes.len(), 2);
        assert_eq!(parsed.links.len(), 1);
        assert_eq!(parsed.links[0].endpoints.len(), 2);
    }

    #[test]
    fn parses_shorthand_dash_link() {
        let yaml = "nodes:\n  r1: {}\n  r2: {}\nlinks:\n  - r1-r2\n";
        let graph = yaml_to_graph(yaml).unwrap();
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.links[0].endpoints[0].node, "r1");
        assert_eq!(graph.links[0].endpoints[1].node, "r2");
    }
}
