//! Job tracking error types.

use thiserror::Error;

use crate::broker::BrokerError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Unknown job event kind: {kind}")]
    UnknownEventKind { kind: String },

    /// The tracked job never appeared; the event is permanently stuck
    #[error("Tracked job {job_id} still missing after {attempts} reconciliation attempts")]
    RetriesExhausted { job_id: String, attempts: u32 },

    #[error("Job {job_id} carries no tenant id")]
    MissingTenant { job_id: String },

    #[error("Invalid lifecycle event: {reason}")]
    InvalidEvent { reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl ReconcileError {
    pub fn unknown_event_kind(kind: impl Into<String>) -> Self {
        Self::UnknownEventKind { kind: kind.into() }
    }

    pub fn retries_exhausted(job_id: impl Into<String>, attempts: u32) -> Self {
        Self::RetriesExhausted {
            job_id: job_id.into(),
            attempts,
        }
    }

    pub fn missing_tenant(job_id: impl Into<String>) -> Self {
        Self::MissingTenant {
            job_id: job_id.into(),
        }
    }

    pub fn invalid_event(reason: impl Into<String>) -> Self {
        Self::InvalidEvent {
            reason: reason.into(),
        }
    }

    /// True for failures that no amount of redelivery will fix
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::UnknownEventKind { .. }
                | Self::RetriesExhausted { .. }
                | Self::MissingTenant { .. }
                | Self::InvalidEvent { .. }
        )
    }
}

impl From<serde_json::Error> for ReconcileError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_event(err.to_string())
    }
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
