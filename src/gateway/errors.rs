//! Gateway error types.

use thiserror::Error;

use crate::broker::BrokerError;
use crate::messaging::MessagingError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The message type is not on the gateway's inbound allow-list
    #[error("Gateway {gateway} does not accept messages of type {message_type}")]
    NotAllowed {
        gateway: String,
        message_type: String,
    },

    #[error("No gateway registered for queue {queue}")]
    UnknownQueue { queue: String },

    #[error("Invalid binding: {reason}")]
    InvalidBinding { reason: String },

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),
}

impl GatewayError {
    pub fn not_allowed(gateway: impl Into<String>, message_type: impl Into<String>) -> Self {
        Self::NotAllowed {
            gateway: gateway.into(),
            message_type: message_type.into(),
        }
    }

    pub fn unknown_queue(queue: impl Into<String>) -> Self {
        Self::UnknownQueue {
            queue: queue.into(),
        }
    }

    pub fn invalid_binding(reason: impl Into<String>) -> Self {
        Self::InvalidBinding {
            reason: reason.into(),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
