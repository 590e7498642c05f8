use serde::{Deserialize, Serialize};

/// Top-level controller configuration. Every recognized option named in
/// spec.md §6 has a field here; defaults mirror
/// `original_source/api/app/config.py` where that file gives one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub agent: AgentClientConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub jobs: JobEngineConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    #[serde(default)]
    pub enforcement: StateEnforcementConfig,
    #[serde(default)]
    pub image_sync: ImageSyncConfig,
    #[serde(default)]
    pub cooldown_store: CooldownStoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            agent: AgentClientConfig::default(),
            registry: RegistryConfig::default(),
            jobs: JobEngineConfig::default(),
            reconciliation: ReconciliationConfig::default(),
            enforcement: StateEnforcementConfig::default(),
            image_sync: ImageSyncConfig::default(),
            cooldown_store: CooldownStoreConfig::default(),
        }
    }
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_acquire_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_db_path() -> String {
    "netlab_controller.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub log_dir: Option<String>,
    #[serde(default = "default_true")]
    pub enable_stdout: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            enable_stdout: true,
        }
    }
}

/// Per-call deadlines and the retry wrapper's knobs, spec.md §4.1/§5/§6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentClientConfig {
    #[serde(default = "default_deploy_timeout_secs")]
    pub deploy_timeout_secs: u64,
    #[serde(default = "default_destroy_timeout_secs")]
    pub destroy_timeout_secs: u64,
    #[serde(default = "default_node_action_timeout_secs")]
    pub node_action_timeout_secs: u64,
    #[serde(default = "default_status_timeout_secs")]
    pub status_timeout_secs: u64,
    #[serde(default = "default_health_check_timeout_secs")]
    pub health_check_timeout_secs: u64,
    #[serde(default = "default_agent_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_base_ms")]
    pub retry_backoff_base_ms: u64,
    #[serde(default = "default_retry_backoff_max_ms")]
    pub retry_backoff_max_ms: u64,
}

const fn default_deploy_timeout_secs() -> u64 {
    900
}
const fn default_destroy_timeout_secs() -> u64 {
    300
}
const fn default_node_action_timeout_secs() -> u64 {
    60
}
const fn default_status_timeout_secs() -> u64 {
    30
}
const fn default_health_check_timeout_secs() -> u64 {
    5
}
const fn default_agent_max_retries() -> u32 {
    3
}
const fn default_retry_backoff_base_ms() -> u64 {
    1_000
}
const fn default_retry_backoff_max_ms() -> u64 {
    10_000
}

impl Default for AgentClientConfig {
    fn default() -> Self {
        Self {
            deploy_timeout_secs: default_deploy_timeout_secs(),
            destroy_timeout_secs: default_destroy_timeout_secs(),
            node_action_timeout_secs: default_node_action_timeout_secs(),
            status_timeout_secs: default_status_timeout_secs(),
            health_check_timeout_secs: default_health_check_timeout_secs(),
            max_retries: default_agent_max_retries(),
            retry_backoff_base_ms: default_retry_backoff_base_ms(),
            retry_backoff_max_ms: default_retry_backoff_max_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
    #[serde(default = "default_stale_timeout_secs")]
    pub stale_timeout_secs: i64,
}

const fn default_health_check_interval_secs() -> u64 {
    30
}
const fn default_stale_timeout_secs() -> i64 {
    90
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            health_check_interval_secs: default_health_check_interval_secs(),
            stale_timeout_secs: default_stale_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEngineConfig {
    #[serde(default = "default_max_concurrent_jobs_per_user")]
    pub max_concurrent_jobs_per_user: u32,
    #[serde(default = "default_job_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
    #[serde(default = "default_job_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_job_timeout_deploy_secs")]
    pub timeout_deploy_secs: i64,
    #[serde(default = "default_job_timeout_destroy_secs")]
    pub timeout_destroy_secs: i64,
    #[serde(default = "default_job_timeout_sync_secs")]
    pub timeout_sync_secs: i64,
    #[serde(default = "default_job_timeout_node_secs")]
    pub timeout_node_secs: i64,
    #[serde(default = "default_job_stuck_grace_period_secs")]
    pub stuck_grace_period_secs: i64,
    #[serde(default = "default_job_heartbeat_override_secs")]
    pub heartbeat_override_secs: i64,
    #[serde(default = "default_queued_stuck_after_secs")]
    pub queued_stuck_after_secs: i64,
}

const fn default_max_concurrent_jobs_per_user() -> u32 {
    2
}
const fn default_job_health_check_interval_secs() -> u64 {
    30
}
const fn default_job_max_retries() -> u32 {
    2
}
const fn default_job_timeout_deploy_secs() -> i64 {
    1_200
}
const fn default_job_timeout_destroy_secs() -> i64 {
    600
}
const fn default_job_timeout_sync_secs() -> i64 {
    600
}
const fn default_job_timeout_node_secs() -> i64 {
    300
}
const fn default_job_stuck_grace_period_secs() -> i64 {
    60
}
const fn default_job_heartbeat_override_secs() -> i64 {
    60
}
const fn default_queued_stuck_after_secs() -> i64 {
    120
}

impl Default for JobEngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs_per_user: default_max_concurrent_jobs_per_user(),
            health_check_interval_secs: default_job_health_check_interval_secs(),
            max_retries: default_job_max_retries(),
            timeout_deploy_secs: default_job_timeout_deploy_secs(),
            timeout_destroy_secs: default_job_timeout_destroy_secs(),
            timeout_sync_secs: default_job_timeout_sync_secs(),
            timeout_node_secs: default_job_timeout_node_secs(),
            stuck_grace_period_secs: default_job_stuck_grace_period_secs(),
            heartbeat_override_secs: default_job_heartbeat_override_secs(),
            queued_stuck_after_secs: default_queued_stuck_after_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    #[serde(default = "default_reconciliation_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_stale_pending_threshold_secs")]
    pub stale_pending_threshold_secs: i64,
    #[serde(default = "default_stale_starting_threshold_secs")]
    pub stale_starting_threshold_secs: i64,
}

const fn default_reconciliation_interval_secs() -> u64 {
    30
}
const fn default_stale_pending_threshold_secs() -> i64 {
    600
}
const fn default_stale_starting_threshold_secs() -> i64 {
    600
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reconciliation_interval_secs(),
            stale_pending_threshold_secs: default_stale_pending_threshold_secs(),
            stale_starting_threshold_secs: default_stale_starting_threshold_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEnforcementConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_enforcement_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_enforcement_cooldown_secs")]
    pub cooldown_secs: i64,
}

const fn default_enforcement_interval_secs() -> u64 {
    30
}
const fn default_enforcement_cooldown_secs() -> i64 {
    120
}

impl Default for StateEnforcementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_enforcement_interval_secs(),
            cooldown_secs: default_enforcement_cooldown_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSyncConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_fallback_strategy")]
    pub fallback_strategy: String,
    #[serde(default = "default_true")]
    pub pre_deploy_check: bool,
    #[serde(default = "default_image_sync_timeout_secs")]
    pub timeout_secs: i64,
    #[serde(default = "default_image_sync_max_concurrent")]
    pub max_concurrent: u32,
    #[serde(default = "default_image_sync_chunk_size")]
    pub chunk_size: u64,
    #[serde(default = "default_image_sync_job_pending_timeout_secs")]
    pub job_pending_timeout_secs: i64,
}

fn default_fallback_strategy() -> String {
    "on_demand".to_string()
}
const fn default_image_sync_timeout_secs() -> i64 {
    600
}
const fn default_image_sync_max_concurrent() -> u32 {
    2
}
const fn default_image_sync_chunk_size() -> u64 {
    1_048_576
}
const fn default_image_sync_job_pending_timeout_secs() -> i64 {
    300
}

impl Default for ImageSyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fallback_strategy: default_fallback_strategy(),
            pre_deploy_check: true,
            timeout_secs: default_image_sync_timeout_secs(),
            max_concurrent: default_image_sync_max_concurrent(),
            chunk_size: default_image_sync_chunk_size(),
            job_pending_timeout_secs: default_image_sync_job_pending_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownStoreConfig {
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

impl Default for CooldownStoreConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
        }
    }
}
