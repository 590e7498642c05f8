use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;

use crate::domain::models::{Agent, AgentCapabilities, Config};
use crate::domain::ports::agent_client::{
    AgentClient, AgentClientResult, AgentJobOutcome, CrossHostLinkSetup, DiscoveredLab,
    ImageInventoryEntry, LabStatusReport, LockStatus, NodeActionKind,
};
use uuid::Uuid;

use super::capabilities::parse_capabilities;
use super::errors::AgentApiError;
use super::retry::RetryPolicy;

/// Concrete [`AgentClient`] over `reqwest`. Grounded on
/// `infrastructure/claude/client.rs`'s `ClaudeClientImpl`: owns the shared
/// HTTP connection pool (spec.md §9 "the only in-process shared state ...
/// is the HTTP client connection pool") and a [`RetryPolicy`].
pub struct AgentClientImpl {
    http: Client,
    retry: RetryPolicy,
    deploy_timeout: Duration,
    destroy_timeout: Duration,
    node_action_timeout: Duration,
    status_timeout: Duration,
    health_timeout: Duration,
}

impl AgentClientImpl {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let cfg = &config.agent;
        Self {
            http: Client::builder()
                .build()
                .expect("reqwest client builds with default TLS config"),
            retry: RetryPolicy::new(cfg.max_retries, cfg.retry_backoff_base_ms, cfg.retry_backoff_max_ms),
            deploy_timeout: Duration::from_secs(cfg.deploy_timeout_secs),
            destroy_timeout: Duration::from_secs(cfg.destroy_timeout_secs),
            node_action_timeout: Duration::from_secs(cfg.node_action_timeout_secs),
            status_timeout: Duration::from_secs(cfg.status_timeout_secs),
            health_timeout: Duration::from_secs(cfg.health_check_timeout_secs),
        }
    }

    async fn post<B, T>(&self, agent: &Agent, path: &str, body: &B, timeout: Duration) -> Result<T, AgentApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", agent.address.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get<T>(&self, agent: &Agent, path: &str, timeout: Duration) -> Result<T, AgentApiError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", agent.address.trim_end_matches('/'));
        let response = self.http.get(&url).timeout(timeout).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AgentApiError> {
        let status = response.status();
        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| AgentApiError::Decode(e.to_string()))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AgentApiError::Http {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// `202 Accepted` means the operation will complete via callback instead
    /// of in the response body (spec.md §4.4 "Async callback path").
    fn job_outcome(status: StatusCode) -> AgentJobOutcome {
        if status == StatusCode::ACCEPTED {
            AgentJobOutcome::Accepted
        } else {
            AgentJobOutcome::Completed
        }
    }
}

#[async_trait]
impl AgentClient for AgentClientImpl {
    async fn check_health(&self, agent: &Agent) -> AgentClientResult<()> {
        let timeout = self.health_timeout;
        self.retry
            .execute(|| async {
                self.get::<serde_json::Value>(agent, "/health", timeout)
                    .await
                    .map(|_| ())
                    .map_err(AgentApiError::classify)
            })
            .await
    }

    async fn deploy(
        &self,
        agent: &Agent,
        job_id: Uuid,
        lab_id: Uuid,
        topology_yaml: &str,
        provider: &str,
    ) -> AgentClientResult<AgentJobOutcome> {
        let timeout = self.deploy_timeout;
        let body = json!({
            "job_id": job_id,
            "lab_id": lab_id,
            "topology_yaml": topology_yaml,
            "provider": provider,
        });
        self.retry
            .execute(|| async {
                let url = format!("{}/deploy", agent.address.trim_end_matches('/'));
                let response = self
                    .http
                    .post(&url)
                    .timeout(timeout)
                    .json(&body)
                    .send()
                    .await
                    .map_err(AgentApiError::from)
                    .map_err(AgentApiError::classify)?;
                let status = response.status();
                if status.is_success() || status == StatusCode::ACCEPTED {
                    Ok(Self::job_outcome(status))
                } else {
                    let text = response.text().await.unwrap_or_default();
                    Err(AgentApiError::Http { status: status.as_u16(), body: text }.classify())
                }
            })
            .await
    }

    async fn destroy(&self, agent: &Agent, job_id: Uuid, lab_id: Uuid) -> AgentClientResult<AgentJobOutcome> {
        let timeout = self.destroy_timeout;
        let body = json!({ "job_id": job_id, "lab_id": lab_id });
        self.retry
            .execute(|| async {
                let url = format!("{}/destroy", agent.address.trim_end_matches('/'));
                let response = self
                    .http
                    .post(&url)
                    .timeout(timeout)
                    .json(&body)
                    .send()
                    .await
                    .map_err(AgentApiError::from)
                    .map_err(AgentApiError::classify)?;
                let status = response.status();
                if status.is_success() || status == StatusCode::ACCEPTED {
                    Ok(Self::job_outcome(status))
                } else {
                    let text = response.text().await.unwrap_or_default();
                    Err(AgentApiError::Http { status: status.as_u16(), body: text }.classify())
                }
            })
            .await
    }

    async fn node_action(
        &self,
        agent: &Agent,
        job_id: Uuid,
        lab_id: Uuid,
        node: &str,
        action: NodeActionKind,
    ) -> AgentClientResult<AgentJobOutcome> {
        let timeout = self.node_action_timeout;
        let body = json!({
            "job_id": job_id,
            "lab_id": lab_id,
            "node": node,
            "action": action.as_str(),
        });
        self.retry
            .execute(|| async {
                let url = format!("{}/node_action", agent.address.trim_end_matches('/'));
                let response = self
                    .http
                    .post(&url)
                    .timeout(timeout)
                    .json(&body)
                    .send()
                    .await
                    .map_err(AgentApiError::from)
                    .map_err(AgentApiError::classify)?;
                let status = response.status();
                if status.is_success() || status == StatusCode::ACCEPTED {
                    Ok(Self::job_outcome(status))
                } else {
                    let text = response.text().await.unwrap_or_default();
                    Err(AgentApiError::Http { status: status.as_u16(), body: text }.classify())
                }
            })
            .await
    }

    async fn get_lab_status(&self, agent: &Agent, lab_id: Uuid) -> AgentClientResult<LabStatusReport> {
        let timeout = self.status_timeout;
        self.retry
            .execute(|| async {
                self.get::<LabStatusReport>(agent, &format!("/status/{lab_id}"), timeout)
                    .await
                    .map_err(AgentApiError::classify)
            })
            .await
    }

    async fn discover_labs(&self, agent: &Agent) -> AgentClientResult<Vec<DiscoveredLab>> {
        let timeout = self.status_timeout;
        self.retry
            .execute(|| async {
                self.get::<Vec<DiscoveredLab>>(agent, "/discover", timeout)
                    .await
                    .map_err(AgentApiError::classify)
            })
            .await
    }

    async fn cleanup_orphans(&self, agent: &Agent, known_lab_ids: &[Uuid]) -> AgentClientResult<()> {
        let timeout = self.status_timeout;
        let body = json!({ "known_lab_ids": known_lab_ids });
        self.retry
            .execute(|| async {
                self.post::<_, serde_json::Value>(agent, "/cleanup_orphans", &body, timeout)
                    .await
                    .map(|_| ())
                    .map_err(AgentApiError::classify)
            })
            .await
    }

    async fn check_node_readiness(&self, agent: &Agent, lab_id: Uuid, node: &str) -> AgentClientResult<bool> {
        let timeout = self.status_timeout;
        #[derive(serde::Deserialize)]
        struct Readiness {
            is_ready: bool,
        }
        self.retry
            .execute(|| async {
                self.get::<Readiness>(agent, &format!("/nodes/{lab_id}/{node}/readiness"), timeout)
                    .await
                    .map(|r| r.is_ready)
                    .map_err(AgentApiError::classify)
            })
            .await
    }

    async fn setup_cross_host_link(
        &self,
        agent_a: &Agent,
        _agent_b: &Agent,
        setup: &CrossHostLinkSetup,
    ) -> AgentClientResult<()> {
        let timeout = self.node_action_timeout;
        let body = json!({
            "lab_id": setup.lab_id,
            "link_id": setup.link_id,
            "container_a": setup.container_a,
            "interface_a": setup.interface_a,
            "ip_a": setup.ip_a,
            "container_b": setup.container_b,
            "interface_b": setup.interface_b,
            "ip_b": setup.ip_b,
        });
        self.retry
            .execute(|| async {
                self.post::<_, serde_json::Value>(agent_a, "/overlay/cross_host", &body, timeout)
                    .await
                    .map(|_| ())
                    .map_err(AgentApiError::classify)
            })
            .await
    }

    async fn cleanup_overlay(&self, agent: &Agent, lab_id: Uuid) -> AgentClientResult<()> {
        let timeout = self.destroy_timeout;
        self.retry
            .execute(|| async {
                let url = format!("{}/overlay/{lab_id}", agent.address.trim_end_matches('/'));
                let response = self
                    .http
                    .delete(&url)
                    .timeout(timeout)
                    .send()
                    .await
                    .map_err(AgentApiError::from)
                    .map_err(AgentApiError::classify)?;
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(AgentApiError::Http { status: response.status().as_u16(), body: String::new() }.classify())
                }
            })
            .await
    }

    async fn get_lock_status(&self, agent: &Agent) -> AgentClientResult<Vec<LockStatus>> {
        let timeout = self.status_timeout;
        self.retry
            .execute(|| async {
                self.get::<Vec<LockStatus>>(agent, "/locks/status", timeout)
                    .await
                    .map_err(AgentApiError::classify)
            })
            .await
    }

    async fn release_lock(&self, agent: &Agent, lab_id: Uuid) -> AgentClientResult<()> {
        let timeout = self.status_timeout;
        self.retry
            .execute(|| async {
                self.post::<_, serde_json::Value>(agent, &format!("/locks/{lab_id}/release"), &json!({}), timeout)
                    .await
                    .map(|_| ())
                    .map_err(AgentApiError::classify)
            })
            .await
    }

    async fn get_image_inventory(&self, agent: &Agent) -> AgentClientResult<Vec<ImageInventoryEntry>> {
        let timeout = self.status_timeout;
        self.retry
            .execute(|| async {
                self.get::<Vec<ImageInventoryEntry>>(agent, "/images", timeout)
                    .await
                    .map_err(AgentApiError::classify)
            })
            .await
    }

    async fn check_image(&self, agent: &Agent, reference: &str) -> AgentClientResult<bool> {
        let timeout = self.status_timeout;
        #[derive(serde::Deserialize)]
        struct Presence {
            present: bool,
        }
        self.retry
            .execute(|| async {
                self.get::<Presence>(agent, &format!("/images/{reference}"), timeout)
                    .await
                    .map(|p| p.present)
                    .map_err(AgentApiError::classify)
            })
            .await
    }
}

/// Extracts capabilities from a just-registered agent's raw JSON payload.
#[must_use]
pub fn parse_agent_capabilities(raw: &serde_json::Value) -> AgentCapabilities {
    parse_capabilities(raw)
}
