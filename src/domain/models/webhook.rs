use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A user-registered webhook subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub id: Uuid,
    pub owner_id: String,
    pub url: String,
    pub events: Vec<String>,
    pub enabled: bool,
    pub secret: Option<String>,
    pub lab_id: Option<Uuid>,
    pub custom_headers: HashMap<String, String>,
    pub last_delivery_at: Option<DateTime<Utc>>,
    pub last_delivery_success: Option<bool>,
}

impl Webhook {
    /// Match-set test per spec.md §4.10: owner-scoped, enabled, event in
    /// `events`, and (webhook.lab_id is null OR == event.lab_id).
    #[must_use]
    pub fn matches(&self, event_owner_id: &str, event_name: &str, event_lab_id: Option<Uuid>) -> bool {
        self.enabled
            && self.owner_id == event_owner_id
            && self.events.iter().any(|e| e == event_name)
            && self.lab_id.is_none_or(|lab_id| Some(lab_id) == event_lab_id)
    }
}

/// Per-attempt delivery audit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDelivery {
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub event_id: Uuid,
    pub event_name: String,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub success: bool,
    pub delivered_at: DateTime<Utc>,
}

/// A lifecycle event dispatched to matching webhooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: Uuid,
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub owner_id: String,
    pub lab_id: Option<Uuid>,
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webhook(lab_id: Option<Uuid>) -> Webhook {
        Webhook {
            id: Uuid::new_v4(),
            owner_id: "u1".into(),
            url: "https://example.com/hook".into(),
            events: vec!["lab.deploy_complete".into()],
            enabled: true,
            secret: None,
            lab_id,
            custom_headers: HashMap::new(),
            last_delivery_at: None,
            last_delivery_success: None,
        }
    }

    #[test]
    fn unscoped_webhook_matches_any_lab() {
        let wh = webhook(None);
        assert!(wh.matches("u1", "lab.deploy_complete", Some(Uuid::new_v4())));
    }

    #[test]
    fn scoped_webhook_only_matches_its_lab() {
        let lab_id = Uuid::new_v4();
        let wh = webhook(Some(lab_id));
        assert!(wh.matches("u1", "lab.deploy_complete", Some(lab_id)));
        assert!(!wh.matches("u1", "lab.deploy_complete", Some(Uuid::new_v4())));
    }

    #[test]
    fn disabled_webhook_never_matches() {
        let mut wh = webhook(None);
        wh.enabled = false;
        assert!(!wh.matches("u1", "lab.deploy_complete", None));
    }
}
