//! # Queue Gateway
//!
//! A gateway in front of one broker queue: inbound bindings form its
//! allow-list and allowed messages are enqueued with the message type as the
//! job's dispatch name.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::binding::Binding;
use super::errors::{GatewayError, GatewayResult};
use super::traits::{Allower, Publisher};
use crate::broker::{EnqueueOptions, Enqueuer, JobHandle, RetryPolicy};
use crate::logging::log_gateway_operation;
use crate::messaging::Envelope;

pub struct QueueGateway {
    name: String,
    queue: String,
    allowed_types: HashSet<String>,
    enqueuer: Arc<dyn Enqueuer>,
    retry_policy: RetryPolicy,
}

impl std::fmt::Debug for QueueGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueGateway")
            .field("name", &self.name)
            .field("queue", &self.queue)
            .field("allowed_types", &self.allowed_types)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

impl QueueGateway {
    /// Gateway `name` enqueueing onto the already-namespaced `queue`
    pub fn new(name: impl Into<String>, queue: impl Into<String>, enqueuer: Arc<dyn Enqueuer>) -> Self {
        Self {
            name: name.into(),
            queue: queue.into(),
            allowed_types: HashSet::new(),
            enqueuer,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Add an inbound binding; outbound bindings belong to an [`OutboundRouter`](super::OutboundRouter)
    pub fn with_binding(mut self, binding: Binding) -> GatewayResult<Self> {
        if !binding.is_inbound() {
            return Err(GatewayError::invalid_binding(format!(
                "gateway {} only takes inbound bindings, got outbound binding for {}",
                self.name, binding.message_type
            )));
        }
        self.allowed_types.insert(binding.message_type);
        Ok(self)
    }

    pub fn with_bindings<I>(self, bindings: I) -> GatewayResult<Self>
    where
        I: IntoIterator<Item = Binding>,
    {
        bindings
            .into_iter()
            .try_fold(self, |gateway, binding| gateway.with_binding(binding))
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }
}

impl Allower for QueueGateway {
    fn is_allowed(&self, envelope: &Envelope) -> bool {
        self.allowed_types.is_empty() || self.allowed_types.contains(&envelope.message_type)
    }
}

#[async_trait]
impl Publisher for QueueGateway {
    async fn publish_or_send(&self, envelope: &Envelope) -> GatewayResult<JobHandle> {
        if !self.is_allowed(envelope) {
            warn!(
                gateway = %self.name,
                message_type = %envelope.message_type,
                message_id = %envelope.id,
                "Message type not allowed by gateway"
            );
            return Err(GatewayError::not_allowed(&self.name, &envelope.message_type));
        }

        // Job id is independent of the message id; redelivery creates a new job
        let options = EnqueueOptions::default()
            .with_job_id(Uuid::new_v4().to_string())
            .with_retry_policy(self.retry_policy);

        let job = self
            .enqueuer
            .enqueue(&self.queue, &envelope.message_type, envelope.to_json()?, options)
            .await?;

        log_gateway_operation(
            &self.name,
            &envelope.message_type,
            &envelope.id,
            "enqueued",
            Some(&job.id),
        );
        Ok(job)
    }
}
