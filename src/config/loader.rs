//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered with the
//! `config` crate: compiled defaults, `dmq.{yaml,toml}`, the environment
//! override file `dmq.{env}.{yaml,toml}`, then `DMQ__`-prefixed environment
//! variables (`DMQ__RECONCILER__MAX_ATTEMPTS=5`).

use super::error::{ConfigResult, ConfigurationError};
use super::DmqConfig;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BASE_FILE_STEM: &str = "dmq";
const ENV_PREFIX: &str = "DMQ";
const ENV_SEPARATOR: &str = "__";

/// Resolved configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: DmqConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection from `./config`
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading DMQ configuration"
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = %environment,
            namespace_suffix = %config.namespace_suffix,
            tracking_queue = %config.tracking_queue_name(),
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration (tests, embedded use)
    pub fn from_config(config: DmqConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            environment: config.environment.clone(),
            config,
            config_directory: PathBuf::from("config"),
        }))
    }

    pub fn config(&self) -> &DmqConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    fn load_and_merge_config(directory: &Path, environment: &str) -> ConfigResult<DmqConfig> {
        let defaults = Config::try_from(&DmqConfig::default())
            .map_err(|e| ConfigurationError::load_error(directory, e))?;

        let base_file = directory.join(BASE_FILE_STEM);
        let env_file = directory.join(format!("{BASE_FILE_STEM}.{environment}"));

        let merged = Config::builder()
            .add_source(defaults)
            .add_source(File::with_name(&base_file.to_string_lossy()).required(false))
            .add_source(File::with_name(&env_file.to_string_lossy()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .set_override("environment", environment)
            .map_err(|e| ConfigurationError::load_error(directory, e))?
            .build()
            .map_err(|e| ConfigurationError::load_error(directory, e))?;

        merged
            .try_deserialize::<DmqConfig>()
            .map_err(ConfigurationError::deserialization_error)
    }

    fn detect_environment() -> String {
        env::var("DMQ_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap();

        assert_eq!(manager.environment(), "test");
        assert_eq!(manager.config().environment, "test");
        assert_eq!(manager.config().reconciler.max_attempts, 10);
        assert_eq!(manager.config().queues.tracking_queue, "dmq-job-events");
    }

    #[test]
    fn test_environment_file_overrides_base_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("dmq.yaml"),
            "namespace_suffix: shared\nreconciler:\n  max_attempts: 4\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("dmq.production.yaml"),
            "namespace_suffix: prod\nreconciler:\n  retry_delay_ms: 2500\n",
        )
        .unwrap();

        let manager = ConfigManager::load_from_directory_with_env(
            Some(dir.path().to_path_buf()),
            "production",
        )
        .unwrap();
        let config = manager.config();

        assert_eq!(config.namespace_suffix, "prod");
        assert_eq!(config.reconciler.max_attempts, 4);
        assert_eq!(config.reconciler.retry_delay_ms, 2500);
        assert_eq!(config.tracking_queue_name(), "dmq-job-events-prod");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dmq.toml"), "[reconciler]\nmax_attempts = 0\n").unwrap();

        let result =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }
}
