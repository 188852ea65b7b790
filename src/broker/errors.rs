//! Broker queue error types.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrokerError {
    #[error("Job {job_id} not found on queue {queue}")]
    JobNotFound { queue: String, job_id: String },

    #[error("Enqueue to {queue} failed: {reason}")]
    Enqueue { queue: String, reason: String },

    #[error("Invalid repeat specification: {reason}")]
    InvalidRepeat { reason: String },

    #[error("Broker backend error: {message}")]
    Backend { message: String },

    #[error("Broker serialization error: {message}")]
    Serialization { message: String },
}

impl BrokerError {
    pub fn job_not_found(queue: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self::JobNotFound {
            queue: queue.into(),
            job_id: job_id.into(),
        }
    }

    pub fn enqueue(queue: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Enqueue {
            queue: queue.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_repeat(reason: impl Into<String>) -> Self {
        Self::InvalidRepeat {
            reason: reason.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

pub type BrokerResult<T> = Result<T, BrokerError>;
