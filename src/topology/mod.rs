pub mod analysis;
pub mod graph;

pub use analysis::{analyze, split, CrossHostLink, PlannedNodePlacement, TopologyAnalysis};
pub use graph::{graph_to_yaml, yaml_to_graph, GraphEndpoint, GraphLink, GraphNode, TopologyGraph};
