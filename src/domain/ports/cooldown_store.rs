use async_trait::async_trait;
use uuid::Uuid;

/// External, TTL-backed key-value store for enforcement cooldowns, spec.md
/// §4.7/§5: "stored externally so it survives controller restarts". Grounded
/// on `original_source/api/app/tasks/state_enforcement.py`'s Redis usage.
#[async_trait]
pub trait CooldownStore: Send + Sync {
    /// True if `(lab_id, node_name)` is currently on cooldown. Implementations
    /// must fail open (treat errors as "not on cooldown") rather than block
    /// enforcement on infrastructure hiccups.
    async fn is_on_cooldown(&self, lab_id: Uuid, node_name: &str) -> bool;

    /// Sets the cooldown key with the given TTL. Best-effort: a failure here
    /// is logged by the caller but does not block the enforcement action
    /// that triggered it.
    async fn set_cooldown(&self, lab_id: Uuid, node_name: &str, ttl_secs: i64);
}
