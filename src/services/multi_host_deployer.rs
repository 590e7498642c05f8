use std::sync::Arc;

use futures::future::join_all;
use uuid::Uuid;

use crate::domain::errors::ControllerError;
use crate::domain::models::Agent;
use crate::domain::ports::{AgentClient, AgentRepository, CrossHostLinkSetup, NodeRepository};
use crate::topology::{graph_to_yaml, CrossHostLink, TopologyAnalysis, TopologyGraph};

/// Deploys/destroys a topology split across more than one host, spec.md
/// §4.8. Activated whenever [`crate::topology::analyze`] reports
/// `single_host=false`.
pub struct MultiHostDeployer {
    agents: Arc<dyn AgentRepository>,
    nodes: Arc<dyn NodeRepository>,
    client: Arc<dyn AgentClient>,
}

impl MultiHostDeployer {
    #[must_use]
    pub const fn new(
        agents: Arc<dyn AgentRepository>,
        nodes: Arc<dyn NodeRepository>,
        client: Arc<dyn AgentClient>,
    ) -> Self {
        Self { agents, nodes, client }
    }

    /// The graph's node `id` is the node's `gui_id`; the agent wants the
    /// actual container name (e.g. `clab-<labprefix>-r2`), per spec.md §8
    /// scenario 5.
    async fn container_name(&self, lab_id: Uuid, graph_node_id: &str) -> String {
        self.nodes
            .list_by_lab(lab_id)
            .await
            .ok()
            .and_then(|nodes| nodes.into_iter().find(|n| n.gui_id == graph_node_id))
            .map_or_else(|| graph_node_id.to_string(), |n| n.container_name)
    }

    /// Resolves a topology host string (either an agent's id or its name) to
    /// an online [`Agent`]. `provider` gates deploy-time resolution down to
    /// agents that actually support it; teardown passes `None` since the
    /// agent was already deployed to and no capability check is needed to
    /// tear it back down.
    async fn resolve_host(&self, host_ref: &str, provider: Option<&str>) -> Option<Agent> {
        let agent = if let Ok(id) = host_ref.parse::<Uuid>() {
            self.agents.find_by_id(id).await.ok().flatten()
        } else {
            self.agents
                .list_all()
                .await
                .ok()?
                .into_iter()
                .find(|a| a.name == host_ref)
        }?;
        let supports = provider.map_or(true, |p| agent.capabilities.supports(p));
        (agent.status == crate::domain::models::AgentStatus::Online && supports).then_some(agent)
    }

    /// Deploy flow steps 1-5. On success, returns a job-log string
    /// summarizing per-host outcomes and any overlay failures (which never
    /// fail the job). On failure, the job should be failed and the lab
    /// transitioned to `error` by the caller.
    pub async fn deploy(
        &self,
        job_id: Uuid,
        lab_id: Uuid,
        graph: &TopologyGraph,
        analysis: &TopologyAnalysis,
        provider: &str,
    ) -> Result<String, ControllerError> {
        let mut resolved: Vec<(String, Agent)> = Vec::new();
        let mut missing: Vec<String> = Vec::new();
        for host_ref in analysis.placements.keys() {
            match self.resolve_host(host_ref, Some(provider)).await {
                Some(agent) => resolved.push((host_ref.clone(), agent)),
                None => missing.push(host_ref.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(ControllerError::InvalidState(format!("missing hosts: {}", missing.join(", "))));
        }

        let sub_graphs = crate::topology::split(graph, analysis);

        let deploys = resolved.iter().map(|(host_ref, agent)| {
            let client = Arc::clone(&self.client);
            let agent = agent.clone();
            let yaml = sub_graphs.get(host_ref).map(graph_to_yaml).unwrap_or_default();
            let host_ref = host_ref.clone();
            let provider = provider.to_string();
            async move {
                let outcome = client.deploy(&agent, job_id, lab_id, &yaml, &provider).await;
                (host_ref, outcome)
            }
        });
        let outcomes = join_all(deploys).await;

        let mut log = String::new();
        let mut any_failed = false;
        for (host_ref, outcome) in &outcomes {
            match outcome {
                Ok(_) => log.push_str(&format!("host {host_ref}: deploy accepted\n")),
                Err(err) => {
                    any_failed = true;
                    log.push_str(&format!("host {host_ref}: deploy failed: {err}\n"));
                }
            }
        }
        if any_failed {
            return Err(ControllerError::AgentJobError {
                message: "one or more hosts failed to deploy".to_string(),
                stdout: Some(log),
                stderr: None,
            });
        }

        for cross_link in &analysis.cross_host_links {
            if let Err(err) = self.setup_overlay(lab_id, cross_link, &resolved).await {
                log.push_str(&format!(
                    "overlay link {}: setup failed (degraded connectivity): {err}\n",
                    cross_link.link_id
                ));
            } else {
                log.push_str(&format!("overlay link {}: established\n", cross_link.link_id));
            }
        }

        Ok(log)
    }

    async fn setup_overlay(
        &self,
        lab_id: Uuid,
        cross_link: &CrossHostLink,
        resolved: &[(String, Agent)],
    ) -> Result<(), ControllerError> {
        let agent_a = resolved
            .iter()
            .find(|(host, _)| *host == cross_link.host_a)
            .map(|(_, a)| a)
            .ok_or_else(|| ControllerError::InvalidState(format!("unknown host {}", cross_link.host_a)))?;
        let agent_b = resolved
            .iter()
            .find(|(host, _)| *host == cross_link.host_b)
            .map(|(_, a)| a)
            .ok_or_else(|| ControllerError::InvalidState(format!("unknown host {}", cross_link.host_b)))?;

        let setup = CrossHostLinkSetup {
            lab_id,
            link_id: cross_link.link_id.clone(),
            container_a: self.container_name(lab_id, &cross_link.node_a).await,
            interface_a: cross_link.interface_a.clone(),
            ip_a: cross_link.ip_a.clone(),
            container_b: self.container_name(lab_id, &cross_link.node_b).await,
            interface_b: cross_link.interface_b.clone(),
            ip_b: cross_link.ip_b.clone(),
        };
        self.client.setup_cross_host_link(agent_a, agent_b, &setup).await
    }

    /// Destroy flow: `cleanup_overlay` then `destroy` per agent, best-effort.
    /// Always "succeeds" from the job's point of view; returns an aggregated
    /// log.
    pub async fn destroy(&self, job_id: Uuid, lab_id: Uuid, analysis: &TopologyAnalysis) -> String {
        let mut agents: Vec<Agent> = Vec::new();
        for host_ref in analysis.placements.keys() {
            if let Some(agent) = self.resolve_host(host_ref, None).await {
                agents.push(agent);
            }
        }

        let mut log = String::new();
        for agent in &agents {
            if let Err(err) = self.client.cleanup_overlay(agent, lab_id).await {
                log.push_str(&format!("host {}: overlay cleanup failed: {err}\n", agent.name));
            }
        }

        let destroys = agents.iter().map(|agent| {
            let client = Arc::clone(&self.client);
            let agent = agent.clone();
            async move { (agent.name.clone(), client.destroy(&agent, job_id, lab_id).await) }
        });
        for (name, outcome) in join_all(destroys).await {
            match outcome {
                Ok(_) => log.push_str(&format!("host {name}: destroy accepted\n")),
                Err(err) => log.push_str(&format!("host {name}: destroy failed (best-effort): {err}\n")),
            }
        }
        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainResult;
    use crate::domain::models::{AgentCapabilities, AgentRegistration, AgentStatus};
    use crate::domain::ports::{
        AgentClientResult, AgentJobOutcome, DiscoveredLab, ImageInventoryEntry, LabStatusReport,
        LockStatus, NodeActionKind,
    };
    use crate::topology::analyze;
    use async_trait::async_trait;
    use chrono::Utc;

    struct FakeAgents {
        agents: Vec<Agent>,
    }

    #[derive(Default)]
    struct FakeNodes {
        nodes: Vec<crate::domain::models::Node>,
    }

    #[async_trait]
    impl NodeRepository for FakeNodes {
        async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<crate::domain::models::Node>> {
            Ok(self.nodes.iter().find(|n| n.id == id).cloned())
        }
        async fn list_by_lab(&self, lab_id: Uuid) -> DomainResult<Vec<crate::domain::models::Node>> {
            Ok(self.nodes.iter().filter(|n| n.lab_id == lab_id).cloned().collect())
        }
        async fn insert(&self, _node: &crate::domain::models::Node) -> DomainResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl AgentRepository for FakeAgents {
        async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Agent>> {
            Ok(self.agents.iter().find(|a| a.id == id).cloned())
        }
        async fn find_by_name_or_address(&self, _name: &str, _address: &str) -> DomainResult<Option<Agent>> {
            Ok(None)
        }
        async fn list_online(&self) -> DomainResult<Vec<Agent>> {
            Ok(self.agents.iter().filter(|a| a.status == AgentStatus::Online).cloned().collect())
        }
        async fn list_all(&self) -> DomainResult<Vec<Agent>> {
            Ok(self.agents.clone())
        }
        async fn insert(&self, _registration: &AgentRegistration) -> DomainResult<Agent> {
            unreachable!()
        }
        async fn update(&self, _agent: &Agent) -> DomainResult<()> {
            Ok(())
        }
        async fn active_job_count(&self, _agent_id: Uuid) -> DomainResult<u32> {
            Ok(0)
        }
    }

    struct FakeClient {
        deploys: std::sync::Mutex<Vec<(String, String)>>,
        overlays: std::sync::Mutex<Vec<CrossHostLinkSetup>>,
    }

    impl Default for FakeClient {
        fn default() -> Self {
            Self { deploys: std::sync::Mutex::new(Vec::new()), overlays: std::sync::Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl AgentClient for FakeClient {
        async fn check_health(&self, _agent: &Agent) -> AgentClientResult<()> {
            Ok(())
        }
        async fn deploy(
            &self,
            agent: &Agent,
            _job_id: Uuid,
            _lab_id: Uuid,
            topology_yaml: &str,
            _provider: &str,
        ) -> AgentClientResult<AgentJobOutcome> {
            self.deploys.lock().unwrap().push((agent.name.clone(), topology_yaml.to_string()));
            Ok(AgentJobOutcome::Accepted)
        }
        async fn destroy(&self, _agent: &Agent, _job_id: Uuid, _lab_id: Uuid) -> AgentClientResult<AgentJobOutcome> {
            Ok(AgentJobOutcome::Accepted)
        }
        async fn node_action(
            &self,
            _agent: &Agent,
            _job_id: Uuid,
            _lab_id: Uuid,
            _node: &str,
            _action: NodeActionKind,
        ) -> AgentClientResult<AgentJobOutcome> {
            Ok(AgentJobOutcome::Accepted)
        }
        async fn get_lab_status(&self, _agent: &Agent, _lab_id: Uuid) -> AgentClientResult<LabStatusReport> {
            Ok(LabStatusReport::default())
        }
        async fn discover_labs(&self, _agent: &Agent) -> AgentClientResult<Vec<DiscoveredLab>> {
            Ok(Vec::new())
        }
        async fn cleanup_orphans(&self, _agent: &Agent, _known_lab_ids: &[Uuid]) -> AgentClientResult<()> {
            Ok(())
        }
        async fn check_node_readiness(&self, _agent: &Agent, _lab_id: Uuid, _node: &str) -> AgentClientResult<bool> {
            Ok(true)
        }
        async fn setup_cross_host_link(
            &self,
            _agent_a: &Agent,
            _agent_b: &Agent,
            setup: &CrossHostLinkSetup,
        ) -> AgentClientResult<()> {
            self.overlays.lock().unwrap().push(setup.clone());
            Ok(())
        }
        async fn cleanup_overlay(&self, _agent: &Agent, _lab_id: Uuid) -> AgentClientResult<()> {
            Ok(())
        }
        async fn get_lock_status(&self, _agent: &Agent) -> AgentClientResult<Vec<LockStatus>> {
            Ok(Vec::new())
        }
        async fn release_lock(&self, _agent: &Agent, _lab_id: Uuid) -> AgentClientResult<()> {
            Ok(())
        }
        async fn get_image_inventory(&self, _agent: &Agent) -> AgentClientResult<Vec<ImageInventoryEntry>> {
            Ok(Vec::new())
        }
        async fn check_image(&self, _agent: &Agent, _reference: &str) -> AgentClientResult<bool> {
            Ok(true)
        }
    }

    fn agent(name: &str) -> Agent {
        Agent {
            id: Uuid::new_v4(),
            name: name.to_string(),
            address: "http://agent".into(),
            status: AgentStatus::Online,
            capabilities: AgentCapabilities {
                providers: vec!["containerlab".to_string()],
                max_concurrent_jobs: Some(4),
                features: Vec::new(),
            },
            version: None,
            last_heartbeat: Utc::now(),
            resource_usage: None,
        }
    }

    fn node(lab_id: Uuid, gui_id: &str, container_name: &str) -> crate::domain::models::Node {
        crate::domain::models::Node {
            id: Uuid::new_v4(),
            lab_id,
            gui_id: gui_id.to_string(),
            display_name: gui_id.to_string(),
            container_name: container_name.to_string(),
            node_type: "router".to_string(),
            device: None,
            image: None,
            host_id: None,
            network_mode: None,
            connection_type: None,
            parent_interface: None,
            vlan_id: None,
            config: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn deploy_fails_when_a_host_is_missing() {
        use crate::topology::{GraphEndpoint, GraphLink, GraphNode};

        let a = agent("hostA");
        let agents = Arc::new(FakeAgents { agents: vec![a] });
        let client = Arc::new(FakeClient::default());
        let deployer = MultiHostDeployer::new(agents, Arc::new(FakeNodes::default()), client);

        let graph = TopologyGraph {
            nodes: vec![
                GraphNode { id: "r1".into(), name: "r1".into(), host: Some("hostA".into()), ..Default::default() },
                GraphNode { id: "r2".into(), name: "r2".into(), host: Some("hostB".into()), ..Default::default() },
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
        let analysis = analyze(&graph, "hostA");

        let result = deployer.deploy(Uuid::new_v4(), Uuid::new_v4(), &graph, &analysis, "containerlab").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn deploy_splits_across_two_hosts_and_sets_up_the_overlay_link() {
        use crate::topology::{GraphEndpoint, GraphLink, GraphNode};

        let lab_id = Uuid::new_v4();
        let job_id = Uuid::new_v4();
        let host_a = agent("hostA");
        let host_b = agent("hostB");
        let agents = Arc::new(FakeAgents { agents: vec![host_a, host_b] });
        let nodes = Arc::new(FakeNodes {
            nodes: vec![node(lab_id, "r1", "clab-demo-r1"), node(lab_id, "r2", "clab-demo-r2")],
        });
        let client = Arc::new(FakeClient::default());
        let deployer = MultiHostDeployer::new(agents, nodes, client.clone());

        let graph = TopologyGraph {
            nodes: vec![
                GraphNode { id: "r1".into(), name: "r1".into(), host: Some("hostA".into()), ..Default::default() },
                GraphNode { id: "r2".into(), name: "r2".into(), host: Some("hostB".into()), ..Default::default() },
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
        let analysis = analyze(&graph, "hostA");
        assert!(!analysis.single_host);
        assert_eq!(analysis.cross_host_links.len(), 1);

        let log = deployer
            .deploy(job_id, lab_id, &graph, &analysis, "containerlab")
            .await
            .expect("both hosts resolve and accept the deploy");

        assert!(log.contains("hostA: deploy accepted"));
        assert!(log.contains("hostB: deploy accepted"));
        assert!(log.contains("overlay link"));
        assert!(log.contains("established"));

        let deploys = client.deploys.lock().unwrap();
        assert_eq!(deploys.len(), 2);
        assert!(deploys.iter().any(|(host, yaml)| host == "hostA" && yaml.contains("r1")));
        assert!(deploys.iter().any(|(host, yaml)| host == "hostB" && yaml.contains("r2")));
        drop(deploys);

        let overlays = client.overlays.lock().unwrap();
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].container_a, "clab-demo-r1");
        assert_eq!(overlays[0].container_b, "clab-demo-r2");
    }

    #[tokio::test]
    async fn destroy_tears_down_every_host_in_the_analysis_by_name() {
        let lab_id = Uuid::new_v4();
        let job_id = Uuid::new_v4();
        let host_a = agent("hostA");
        let host_b = agent("hostB");
        let agents = Arc::new(FakeAgents { agents: vec![host_a, host_b] });
        let client = Arc::new(FakeClient::default());
        let deployer = MultiHostDeployer::new(agents, Arc::new(FakeNodes::default()), client.clone());

        let mut placements = std::collections::HashMap::new();
        placements.insert("hostA".to_string(), Vec::new());
        placements.insert("hostB".to_string(), Vec::new());
        let analysis = TopologyAnalysis { placements, cross_host_links: Vec::new(), single_host: false };

        let log = deployer.destroy(job_id, lab_id, &analysis).await;

        assert!(log.contains("hostA: destroy accepted"));
        assert!(log.contains("hostB: destroy accepted"));

        let deploys = client.deploys.lock().unwrap();
        assert!(deploys.is_empty());
    }
}
