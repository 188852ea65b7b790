//! # Structured Logging Module
//!
//! Console logging for queue, gateway and reconciliation operations, in
//! human-readable or JSON form depending on [`LoggingConfig`].

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging; subsequent calls are no-ops
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let console = if config.json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        // A host process may already own the global subscriber
        if tracing_subscriber::registry().with(console).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            level = %config.level,
            json = config.json,
            "STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Log structured data for a tracked job lifecycle transition
pub fn log_job_event(
    kind: &str,
    tenant_id: Option<&str>,
    job_id: &str,
    queue: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        kind = %kind,
        tenant_id = tenant_id,
        job_id = %job_id,
        queue = %queue,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "JOB_EVENT"
    );
}

/// Log structured data for gateway publish/send operations
pub fn log_gateway_operation(
    gateway: &str,
    message_type: &str,
    message_id: &str,
    status: &str,
    job_id: Option<&str>,
) {
    tracing::info!(
        gateway = %gateway,
        message_type = %message_type,
        message_id = %message_id,
        status = %status,
        job_id = job_id,
        timestamp = %Utc::now().to_rfc3339(),
        "GATEWAY_OPERATION"
    );
}

/// Log structured data for recurring schedule registration
pub fn log_schedule_operation(
    operation: &str,
    queue: &str,
    name: &str,
    dedup_id: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        queue = %queue,
        name = %name,
        dedup_id = %dedup_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "SCHEDULE_OPERATION"
    );
}

/// Log structured data for vault key management
pub fn log_vault_operation(
    operation: &str,
    tenant_id: &str,
    vault_id: Option<&str>,
    entity_id: Option<&str>,
    status: &str,
) {
    tracing::info!(
        operation = %operation,
        tenant_id = %tenant_id,
        vault_id = vault_id,
        entity_id = entity_id,
        status = %status,
        timestamp = %Utc::now().to_rfc3339(),
        "VAULT_OPERATION"
    );
}
