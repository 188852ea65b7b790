//! Crate-wide error type.
//!
//! Each subsystem owns a narrow error enum; `DmqError` aggregates them so
//! application wiring code can use a single `Result` alias.

use thiserror::Error;

use crate::broker::BrokerError;
use crate::config::ConfigurationError;
use crate::gateway::GatewayError;
use crate::messaging::MessagingError;
use crate::scheduler::SchedulerError;
use crate::store::StoreError;
use crate::tracking::ReconcileError;
use crate::vault::VaultError;

#[derive(Debug, Error)]
pub enum DmqError {
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for DmqError {
    fn from(error: serde_json::Error) -> Self {
        DmqError::Messaging(MessagingError::from(error))
    }
}

pub type Result<T> = std::result::Result<T, DmqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_errors_convert() {
        let err: DmqError = GatewayError::not_allowed("orders", "com.acme.order.created").into();
        assert!(matches!(err, DmqError::Gateway(_)));
        assert!(err.to_string().contains("com.acme.order.created"));

        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: DmqError = json_err.into();
        assert!(matches!(err, DmqError::Messaging(_)));
    }
}
