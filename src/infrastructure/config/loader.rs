use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Grounded on `infrastructure/config/loader.rs`'s `ConfigLoader`: defaults →
/// optional YAML file → environment variables, environment taking highest
/// priority. One tier fewer than the teacher (no project-local override
/// file — there is no project-local convention in this domain).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub struct ConfigLoader {
    config_file: Option<PathBuf>,
}

impl ConfigLoader {
    #[must_use]
    pub fn new(config_file: Option<PathBuf>) -> Self {
        Self { config_file }
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = &self.config_file {
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment.merge(Env::prefixed("NETLAB_").split("__"));

        let config: Config = figment.extract()?;
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.jobs.max_concurrent_jobs_per_user == 0 {
        return Err(ConfigError::Invalid(
            "jobs.max_concurrent_jobs_per_user must be at least 1".to_string(),
        ));
    }
    if config.agent.max_retries == 0 {
        return Err(ConfigError::Invalid(
            "agent.max_retries must be at least 1".to_string(),
        ));
    }
    if config.agent.retry_backoff_base_ms > config.agent.retry_backoff_max_ms {
        return Err(ConfigError::Invalid(
            "agent.retry_backoff_base_ms must not exceed agent.retry_backoff_max_ms".to_string(),
        ));
    }
    if config.image_sync.max_concurrent == 0 {
        return Err(ConfigError::Invalid(
            "image_sync.max_concurrent must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn zero_concurrency_is_invalid() {
        let mut config = Config::default();
        config.jobs.max_concurrent_jobs_per_user = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn backoff_base_above_max_is_invalid() {
        let mut config = Config::default();
        config.agent.retry_backoff_base_ms = 20_000;
        config.agent.retry_backoff_max_ms = 10_000;
        assert!(validate(&config).is_err());
    }
}
