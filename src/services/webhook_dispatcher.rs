use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Webhook, WebhookDelivery, WebhookEvent};
use crate::domain::ports::{WebhookDeliveryRepository, WebhookRepository};

type HmacSha256 = Hmac<Sha256>;

/// Matches lifecycle events to subscribers and delivers them, spec.md
/// §4.10. Grounded on the teacher's `adapters/mcp/events_http.rs`
/// (`compute_hmac_signature`, `test_webhook`) for signing and the
/// synthetic-test-event path.
pub struct WebhookDispatcher {
    webhooks: Arc<dyn WebhookRepository>,
    deliveries: Arc<dyn WebhookDeliveryRepository>,
    http: reqwest::Client,
    user_agent: String,
}

impl WebhookDispatcher {
    #[must_use]
    pub fn new(
        webhooks: Arc<dyn WebhookRepository>,
        deliveries: Arc<dyn WebhookDeliveryRepository>,
        user_agent: String,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { webhooks, deliveries, http, user_agent }
    }

    /// Finds every enabled webhook whose match set covers `event` and
    /// delivers to each concurrently. Failures are logged and recorded as
    /// delivery rows; they never propagate to the caller, since webhook
    /// delivery is a best-effort side channel for lifecycle events.
    pub async fn dispatch(&self, event: &WebhookEvent) {
        let subscribers = match self.webhooks.list_enabled().await {
            Ok(webhooks) => webhooks,
            Err(err) => {
                tracing::warn!(error = %err, "failed to list webhooks for dispatch");
                return;
            }
        };

        let matched: Vec<Webhook> = subscribers
            .into_iter()
            .filter(|webhook| webhook.matches(&event.owner_id, &event.event, event.lab_id))
            .collect();

        let deliveries = matched.iter().map(|webhook| self.deliver(webhook, event));
        futures::future::join_all(deliveries).await;
    }

    /// Sends a synthetic `test` event through the same delivery machinery,
    /// spec.md §4.10 `test_webhook`.
    pub async fn test_webhook(&self, webhook_id: Uuid) -> DomainResult<WebhookDelivery> {
        let webhook = self
            .webhooks
            .find_by_id(webhook_id)
            .await?
            .ok_or_else(|| crate::domain::errors::DomainError::NotFound {
                entity: "webhook",
                id: webhook_id.to_string(),
            })?;

        let event = WebhookEvent {
            id: Uuid::new_v4(),
            event: "test".to_string(),
            timestamp: Utc::now(),
            owner_id: webhook.owner_id.clone(),
            lab_id: webhook.lab_id,
            payload: serde_json::json!({ "message": "synthetic test event" }),
        };

        Ok(self.deliver(&webhook, &event).await)
    }

    async fn deliver(&self, webhook: &Webhook, event: &WebhookEvent) -> WebhookDelivery {
        let body = serde_json::to_string(&event.payload).unwrap_or_else(|_| "{}".to_string());

        let mut request = self
            .http
            .post(&webhook.url)
            .header("Content-Type", "application/json")
            .header("User-Agent", &self.user_agent)
            .header("X-Webhook-Event", event.event.clone())
            .header("X-Webhook-Delivery", event.id.to_string());

        if let Some(secret) = &webhook.secret {
            request = request.header("X-Webhook-Signature", sign(secret, &body));
        }

        for (name, value) in &webhook.custom_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let started = tokio::time::Instant::now();
        let outcome = request.body(body).send().await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (status_code, error, success) = match outcome {
            Ok(response) => {
                let status = response.status();
                (Some(status.as_u16()), None, status.is_success())
            }
            Err(err) => (None, Some(err.to_string()), false),
        };

        let delivery = WebhookDelivery {
            id: Uuid::new_v4(),
            webhook_id: webhook.id,
            event_id: event.id,
            event_name: event.event.clone(),
            status_code,
            error,
            duration_ms,
            success,
            delivered_at: Utc::now(),
        };

        if let Err(err) = self.deliveries.insert(&delivery).await {
            tracing::warn!(webhook_id = %webhook.id, error = %err, "failed to record webhook delivery");
        }

        let mut updated = webhook.clone();
        updated.last_delivery_at = Some(delivery.delivered_at);
        updated.last_delivery_success = Some(success);
        if let Err(err) = self.webhooks.update(&updated).await {
            tracing::warn!(webhook_id = %webhook.id, error = %err, "failed to update webhook delivery summary");
        }

        delivery
    }
}

/// `sha256=<hex>`, HMAC-SHA256 over the exact body sent.
fn sign(secret: &str, body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any size");
    mac.update(body.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use std::sync::Mutex;

    struct FakeWebhooks(Mutex<Vec<Webhook>>);

    #[async_trait::async_trait]
    impl WebhookRepository for FakeWebhooks {
        async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Webhook>> {
            Ok(self.0.lock().unwrap().iter().find(|w| w.id == id).cloned())
        }
        async fn list_for_owner(&self, owner_id: &str) -> DomainResult<Vec<Webhook>> {
            Ok(self.0.lock().unwrap().iter().filter(|w| w.owner_id == owner_id).cloned().collect())
        }
        async fn list_enabled(&self) -> DomainResult<Vec<Webhook>> {
            Ok(self.0.lock().unwrap().iter().filter(|w| w.enabled).cloned().collect())
        }
        async fn insert(&self, webhook: &Webhook) -> DomainResult<()> {
            self.0.lock().unwrap().push(webhook.clone());
            Ok(())
        }
        async fn update(&self, webhook: &Webhook) -> DomainResult<()> {
            let mut rows = self.0.lock().unwrap();
            if let Some(existing) = rows.iter_mut().find(|w| w.id == webhook.id) {
                *existing = webhook.clone();
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeDeliveries(Mutex<Vec<WebhookDelivery>>);

    #[async_trait::async_trait]
    impl WebhookDeliveryRepository for FakeDeliveries {
        async fn insert(&self, delivery: &WebhookDelivery) -> DomainResult<()> {
            self.0.lock().unwrap().push(delivery.clone());
            Ok(())
        }
        async fn list_for_webhook(&self, webhook_id: Uuid) -> DomainResult<Vec<WebhookDelivery>> {
            Ok(self.0.lock().unwrap().iter().filter(|d| d.webhook_id == webhook_id).cloned().collect())
        }
    }

    fn webhook(url: &str) -> Webhook {
        Webhook {
            id: Uuid::new_v4(),
            owner_id: "u1".into(),
            url: url.to_string(),
            events: vec!["lab.deploy_complete".into()],
            enabled: true,
            secret: Some("s3cr3t".into()),
            lab_id: None,
            custom_headers: HashMap::new(),
            last_delivery_at: None,
            last_delivery_success: None,
        }
    }

    #[test]
    fn sign_is_stable_for_a_given_body_and_secret() {
        let a = sign("s3cr3t", "{\"a\":1}");
        let b = sign("s3cr3t", "{\"a\":1}");
        assert_eq!(a, b);
        assert!(a.starts_with("sha256="));
    }

    #[test]
    fn sign_changes_with_the_body() {
        let a = sign("s3cr3t", "{\"a\":1}");
        let b = sign("s3cr3t", "{\"a\":2}");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn deliver_to_an_unreachable_url_records_a_failed_delivery() {
        let wh = webhook("http://127.0.0.1:1");
        let wh_id = wh.id;
        let webhooks = Arc::new(FakeWebhooks(Mutex::new(vec![wh])));
        let deliveries = Arc::new(FakeDeliveries::default());
        let dispatcher = WebhookDispatcher::new(webhooks.clone(), deliveries.clone(), "netlab-controller/test".into());

        let event = WebhookEvent {
            id: Uuid::new_v4(),
            event: "lab.deploy_complete".into(),
            timestamp: Utc::now(),
            owner_id: "u1".into(),
            lab_id: None,
            payload: serde_json::json!({}),
        };

        dispatcher.dispatch(&event).await;

        let rows = deliveries.list_for_webhook(wh_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].success);
    }

    #[tokio::test]
    async fn dispatch_skips_webhooks_outside_the_match_set() {
        let mut wh = webhook("http://127.0.0.1:1");
        wh.events = vec!["job.completed".into()];
        let webhooks = Arc::new(FakeWebhooks(Mutex::new(vec![wh])));
        let deliveries = Arc::new(FakeDeliveries::default());
        let dispatcher = WebhookDispatcher::new(webhooks, deliveries.clone(), "netlab-controller/test".into());

        let event = WebhookEvent {
            id: Uuid::new_v4(),
            event: "lab.deploy_complete".into(),
            timestamp: Utc::now(),
            owner_id: "u1".into(),
            lab_id: None,
            payload: serde_json::json!({}),
        };

        dispatcher.dispatch(&event).await;
        let rows = deliveries.0.lock().unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_webhook_delivers_a_synthetic_test_event() {
        let wh = webhook("http://127.0.0.1:1");
        let wh_id = wh.id;
        let webhooks = Arc::new(FakeWebhooks(Mutex::new(vec![wh])));
        let deliveries = Arc::new(FakeDeliveries::default());
        let dispatcher = WebhookDispatcher::new(webhooks, deliveries, "netlab-controller/test".into());

        let delivery = dispatcher.test_webhook(wh_id).await.unwrap();
        assert_eq!(delivery.event_name, "test");
    }

    #[tokio::test]
    async fn test_webhook_fails_for_unknown_id() {
        let webhooks = Arc::new(FakeWebhooks(Mutex::new(Vec::new())));
        let deliveries = Arc::new(FakeDeliveries::default());
        let dispatcher = WebhookDispatcher::new(webhooks, deliveries, "netlab-controller/test".into());

        let err = dispatcher.test_webhook(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
