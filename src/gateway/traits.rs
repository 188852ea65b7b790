//! Narrow gateway capabilities.

use async_trait::async_trait;

use super::errors::GatewayResult;
use crate::broker::JobHandle;
use crate::messaging::Envelope;

/// Inbound allow-list check
pub trait Allower: Send + Sync {
    fn is_allowed(&self, envelope: &Envelope) -> bool;
}

/// Hands an allowed message to a queue
#[async_trait]
pub trait Publisher: Allower {
    /// Enqueue `envelope`, failing with `NotAllowed` when the allow-list rejects it
    async fn publish_or_send(&self, envelope: &Envelope) -> GatewayResult<JobHandle>;
}
