//! # DMQ Configuration System
//!
//! Layered configuration for the envelope, gateway, scheduler and tracking
//! components. Values are resolved once at process start by
//! [`ConfigManager`] and handed to components at construction; core logic
//! never reads the environment itself.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dmq_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let tracking_queue = manager.config().tracking_queue_name();
//! let max_attempts = manager.config().reconciler.max_attempts;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/dmq.yaml`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DmqConfig {
    /// Deployment environment name (development, test, production, ...)
    pub environment: String,

    /// Opaque queue namespace suffix appended to every queue name
    pub namespace_suffix: String,

    pub database: DatabaseConfig,
    pub queues: QueuesConfig,
    pub reconciler: ReconcilerConfig,
    pub delivery: DeliveryConfig,
    pub backoff: BackoffConfig,
    pub logging: LoggingConfig,
}

impl Default for DmqConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            namespace_suffix: String::new(),
            database: DatabaseConfig::default(),
            queues: QueuesConfig::default(),
            reconciler: ReconcilerConfig::default(),
            delivery: DeliveryConfig::default(),
            backoff: BackoffConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Relational store connection settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            acquire_timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

/// Base names of the queues the framework owns (suffix is applied separately)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueuesConfig {
    pub tracking_queue: String,
    pub scheduler_queue: String,
}

impl Default for QueuesConfig {
    fn default() -> Self {
        Self {
            tracking_queue: constants::queues::TRACKING_QUEUE.to_string(),
            scheduler_queue: constants::queues::SCHEDULER_QUEUE.to_string(),
        }
    }
}

/// Bounded retry protocol for lifecycle events that arrive before their job exists
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    pub retry_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: constants::reconciler::RETRY_DELAY_MS,
            max_attempts: constants::reconciler::MAX_ATTEMPTS,
        }
    }
}

impl ReconcilerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Priority and delay applied to lifecycle events on the tracking queue
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub active_priority: u32,
    pub active_delay_ms: u64,
    pub standard_priority: u32,
    pub standard_delay_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            active_priority: constants::delivery::ACTIVE_PRIORITY,
            active_delay_ms: constants::delivery::ACTIVE_DELAY_MS,
            standard_priority: constants::delivery::STANDARD_PRIORITY,
            standard_delay_ms: constants::delivery::STANDARD_DELAY_MS,
        }
    }
}

/// Default retry policy handed to the broker for framework-owned jobs
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub attempts: u32,
    pub delay_ms: u64,
    pub exponential: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            attempts: constants::backoff::DEFAULT_ATTEMPTS,
            delay_ms: constants::backoff::DEFAULT_DELAY_MS,
            exponential: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl DmqConfig {
    /// Render a queue name inside this deployment's namespace
    pub fn queue_name(&self, base: &str) -> String {
        if self.namespace_suffix.is_empty() {
            base.to_string()
        } else {
            format!("{base}-{}", self.namespace_suffix)
        }
    }

    /// Reverse of [`DmqConfig::queue_name`]; names without the suffix pass through
    pub fn strip_namespace_suffix<'a>(&self, queue_name: &'a str) -> &'a str {
        strip_namespace_suffix(queue_name, &self.namespace_suffix)
    }

    pub fn tracking_queue_name(&self) -> String {
        self.queue_name(&self.queues.tracking_queue)
    }

    pub fn scheduler_queue_name(&self) -> String {
        self.queue_name(&self.queues.scheduler_queue)
    }

    /// Validate configuration values that would otherwise fail at runtime
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.queues.tracking_queue.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "queues.tracking_queue",
                "queue configuration",
            ));
        }

        if self.queues.scheduler_queue.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "queues.scheduler_queue",
                "queue configuration",
            ));
        }

        if self.reconciler.max_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "reconciler.max_attempts",
                "0",
                "at least one reconciliation attempt is required",
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "pool size must be greater than 0",
            ));
        }

        if self.backoff.attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "backoff.attempts",
                "0",
                "broker jobs need at least one attempt",
            ));
        }

        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            return Err(ConfigurationError::invalid_value(
                "logging.level",
                self.logging.level.clone(),
                "not a valid tracing filter directive",
            ));
        }

        Ok(())
    }
}

/// Strip a `-{suffix}` namespace suffix from a queue name
pub fn strip_namespace_suffix<'a>(queue_name: &'a str, suffix: &str) -> &'a str {
    if suffix.is_empty() {
        return queue_name;
    }
    queue_name
        .strip_suffix(suffix)
        .and_then(|rest| rest.strip_suffix('-'))
        .filter(|base| !base.is_empty())
        .unwrap_or(queue_name)
}
