use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::warn;
use uuid::Uuid;

use crate::domain::ports::CooldownStore;

/// Grounded on `original_source/api/app/tasks/state_enforcement.py`: key
/// format `enforcement_cooldown:{lab_id}:{node_name}`, `SETEX` for TTL,
/// `EXISTS` to check. Fails open on any Redis error — a cooldown-store outage
/// must never block state enforcement (spec.md §5 "Per-(lab, node) cooldown
/// keys live in a shared external key-value store with native TTL").
pub struct RedisCooldownStore {
    client: redis::Client,
}

impl RedisCooldownStore {
    pub fn new(redis_url: &str) -> Result<Self, redis::RedisError> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
        })
    }

    fn cooldown_key(lab_id: Uuid, node_name: &str) -> String {
        format!("enforcement_cooldown:{lab_id}:{node_name}")
    }
}

#[async_trait]
impl CooldownStore for RedisCooldownStore {
    async fn is_on_cooldown(&self, lab_id: Uuid, node_name: &str) -> bool {
        let key = Self::cooldown_key(lab_id, node_name);
        match self.client.get_multiplexed_async_connection().await {
            Ok(mut conn) => match conn.exists::<_, bool>(&key).await {
                Ok(exists) => exists,
                Err(err) => {
                    warn!(error = %err, %key, "cooldown store EXISTS failed, failing open");
                    false
                }
            },
            Err(err) => {
                warn!(error = %err, %key, "cooldown store connection failed, failing open");
                false
            }
        }
    }

    async fn set_cooldown(&self, lab_id: Uuid, node_name: &str, ttl_secs: i64) {
        let key = Self::cooldown_key(lab_id, node_name);
        let ttl = ttl_secs.max(1) as u64;
        match self.client.get_multiplexed_async_connection().await {
            Ok(mut conn) => {
                if let Err(err) = conn.set_ex::<_, _, ()>(&key, 1, ttl).await {
                    warn!(error = %err, %key, "cooldown store SETEX failed");
                }
            }
            Err(err) => {
                warn!(error = %err, %key, "cooldown store connection failed, cooldown not recorded");
            }
        }
    }
}
