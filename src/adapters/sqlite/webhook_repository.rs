use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Webhook, WebhookDelivery};
use crate::domain::ports::{WebhookDeliveryRepository, WebhookRepository};

pub struct SqliteWebhookRepository {
    pool: SqlitePool,
}

impl SqliteWebhookRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_webhook(row: sqlx::sqlite::SqliteRow) -> DomainResult<Webhook> {
        let id: String = row.get("id");
        let lab_id: Option<String> = row.get("lab_id");
        let events_json: String = row.get("events_json");
        let headers_json: String = row.get("custom_headers_json");
        let last_delivery_at: Option<String> = row.get("last_delivery_at");
        Ok(Webhook {
            id: id.parse().map_err(|_| DomainError::Conflict {
                entity: "webhook",
                reason: "invalid id".to_string(),
            })?,
            owner_id: row.get("owner_id"),
            url: row.get("url"),
            events: serde_json::from_str::<Vec<String>>(&events_json)?,
            enabled: row.get::<i64, _>("enabled") != 0,
            secret: row.get("secret"),
            lab_id: lab_id.and_then(|s| s.parse().ok()),
            custom_headers: serde_json::from_str::<HashMap<String, String>>(&headers_json)?,
            last_delivery_at: last_delivery_at
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.with_timezone(&Utc))),
            last_delivery_success: row.get::<Option<i64>, _>("last_delivery_success").map(|v| v != 0),
        })
    }
}

#[async_trait]
impl WebhookRepository for SqliteWebhookRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Webhook>> {
        let row = sqlx::query(
            "SELECT id, owner_id, url, events_json, enabled, secret, lab_id, custom_headers_json,
             last_delivery_at, last_delivery_success FROM webhooks WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_webhook).transpose()
    }

    async fn list_for_owner(&self, owner_id: &str) -> DomainResult<Vec<Webhook>> {
        let rows = sqlx::query(
            "SELECT id, owner_id, url, events_json, enabled, secret, lab_id, custom_headers_json,
             last_delivery_at, last_delivery_success FROM webhooks WHERE owner_id = ?",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_webhook).collect()
    }

    async fn list_enabled(&self) -> DomainResult<Vec<Webhook>> {
        let rows = sqlx::query(
            "SELECT id, owner_id, url, events_json, enabled, secret, lab_id, custom_headers_json,
             last_delivery_at, last_delivery_success FROM webhooks WHERE enabled = 1",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_webhook).collect()
    }

    async fn insert(&self, webhook: &Webhook) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO webhooks (id, owner_id, url, events_json, enabled, secret, lab_id,
             custom_headers_json, last_delivery_at, last_delivery_success)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(webhook.id.to_string())
        .bind(&webhook.owner_id)
        .bind(&webhook.url)
        .bind(serde_json::to_string(&webhook.events)?)
        .bind(i64::from(webhook.enabled))
        .bind(&webhook.secret)
        .bind(webhook.lab_id.map(|id| id.to_string()))
        .bind(serde_json::to_string(&webhook.custom_headers)?)
        .bind(webhook.last_delivery_at.map(|dt| dt.to_rfc3339()))
        .bind(webhook.last_delivery_success.map(i64::from))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, webhook: &Webhook) -> DomainResult<()> {
        sqlx::query(
            "UPDATE webhooks SET url = ?, events_json = ?, enabled = ?, secret = ?, lab_id = ?,
             custom_headers_json = ?, last_delivery_at = ?, last_delivery_success = ? WHERE id = ?",
        )
        .bind(&webhook.url)
        .bind(serde_json::to_string(&webhook.events)?)
        .bind(i64::from(webhook.enabled))
        .bind(&webhook.secret)
        .bind(webhook.lab_id.map(|id| id.to_string()))
        .bind(serde_json::to_string(&webhook.custom_headers)?)
        .bind(webhook.last_delivery_at.map(|dt| dt.to_rfc3339()))
        .bind(webhook.last_delivery_success.map(i64::from))
        .bind(webhook.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub struct SqliteWebhookDeliveryRepository {
    pool: SqlitePool,
}

impl SqliteWebhookDeliveryRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookDeliveryRepository for SqliteWebhookDeliveryRepository {
    async fn insert(&self, delivery: &WebhookDelivery) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO webhook_deliveries (id, webhook_id, event_id, event_name, status_code,
             error, duration_ms, success, delivered_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(delivery.id.to_string())
        .bind(delivery.webhook_id.to_string())
        .bind(delivery.event_id.to_string())
        .bind(&delivery.event_name)
        .bind(delivery.status_code.map(i64::from))
        .bind(&delivery.error)
        .bind(delivery.duration_ms as i64)
        .bind(i64::from(delivery.success))
        .bind(delivery.delivered_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_webhook(&self, webhook_id: Uuid) -> DomainResult<Vec<WebhookDelivery>> {
        let rows = sqlx::query(
            "SELECT id, webhook_id, event_id, event_name, status_code, error, duration_ms,
             success, delivered_at FROM webhook_deliveries WHERE webhook_id = ? ORDER BY delivered_at DESC",
        )
        .bind(webhook_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.get("id");
                let webhook_id: String = row.get("webhook_id");
                let event_id: String = row.get("event_id");
                let delivered_at: String = row.get("delivered_at");
                Ok(WebhookDelivery {
                    id: id.parse().map_err(|_| DomainError::Conflict {
                        entity: "webhook_delivery",
                        reason: "invalid id".to_string(),
                    })?,
                    webhook_id: webhook_id.parse().map_err(|_| DomainError::Conflict {
                        entity: "webhook_delivery",
                        reason: "invalid webhook_id".to_string(),
                    })?,
                    event_id: event_id.parse().unwrap_or_else(|_| Uuid::nil()),
                    event_name: row.get("event_name"),
                    status_code: row.get::<Option<i64>, _>("status_code").map(|v| v as u16),
                    error: row.get("error"),
                    duration_ms: row.get::<i64, _>("duration_ms") as u64,
                    success: row.get::<i64, _>("success") != 0,
                    delivered_at: DateTime::parse_from_rfc3339(&delivered_at)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                })
            })
            .collect()
    }
}
