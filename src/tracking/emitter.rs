//! # Lifecycle Event Emitter
//!
//! The hook an instrumented executor calls whenever a broker job changes
//! state. Each call snapshots the job into a [`JobLifecycleEvent`] and
//! enqueues it on the tracking queue, where [`super::TrackedJobReconciler`]
//! picks it up.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::events::JobLifecycleEvent;
use super::states::JobEventKind;
use crate::broker::{BrokerResult, EnqueueOptions, Enqueuer, JobHandle, RetryPolicy};
use crate::config::{DeliveryConfig, DmqConfig};

/// Priority and delay for one lifecycle event on the tracking queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub priority: u32,
    pub delay_ms: u64,
}

/// How lifecycle events are prioritised on the tracking queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum EventDeliveryPolicy {
    /// `active` events jump the queue so job starts become visible first;
    /// every other kind waits out a fixed delay at standard priority
    VisibilityFirst { active: Delivery, standard: Delivery },
    /// Every kind is delivered alike
    Uniform { delivery: Delivery },
}

impl EventDeliveryPolicy {
    pub fn delivery_for(&self, kind: JobEventKind) -> Delivery {
        match self {
            Self::VisibilityFirst { active, standard } => match kind {
                JobEventKind::Active => *active,
                _ => *standard,
            },
            Self::Uniform { delivery } => *delivery,
        }
    }
}

impl From<&DeliveryConfig> for EventDeliveryPolicy {
    fn from(config: &DeliveryConfig) -> Self {
        Self::VisibilityFirst {
            active: Delivery {
                priority: config.active_priority,
                delay_ms: config.active_delay_ms,
            },
            standard: Delivery {
                priority: config.standard_priority,
                delay_ms: config.standard_delay_ms,
            },
        }
    }
}

impl Default for EventDeliveryPolicy {
    fn default() -> Self {
        Self::from(&DeliveryConfig::default())
    }
}

pub struct JobEventEmitter {
    enqueuer: Arc<dyn Enqueuer>,
    tracking_queue: String,
    policy: EventDeliveryPolicy,
    retry_policy: RetryPolicy,
}

impl std::fmt::Debug for JobEventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobEventEmitter")
            .field("tracking_queue", &self.tracking_queue)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl JobEventEmitter {
    pub fn new(enqueuer: Arc<dyn Enqueuer>, tracking_queue: impl Into<String>) -> Self {
        Self {
            enqueuer,
            tracking_queue: tracking_queue.into(),
            policy: EventDeliveryPolicy::default(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn from_config(enqueuer: Arc<dyn Enqueuer>, config: &DmqConfig) -> Self {
        Self {
            enqueuer,
            tracking_queue: config.tracking_queue_name(),
            policy: EventDeliveryPolicy::from(&config.delivery),
            retry_policy: RetryPolicy::from(&config.backoff),
        }
    }

    pub fn with_policy(mut self, policy: EventDeliveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn policy(&self) -> &EventDeliveryPolicy {
        &self.policy
    }

    pub fn tracking_queue(&self) -> &str {
        &self.tracking_queue
    }

    /// Snapshot `job` as a `kind` event and enqueue it
    pub async fn emit(&self, kind: JobEventKind, job: &JobHandle) -> BrokerResult<JobLifecycleEvent> {
        let event = JobLifecycleEvent::from_job(kind, job);
        self.emit_event(&event).await?;
        Ok(event)
    }

    /// Enqueue a prepared event; its `job_event_id` doubles as the broker job id
    pub async fn emit_event(&self, event: &JobLifecycleEvent) -> BrokerResult<JobHandle> {
        let delivery = self.policy.delivery_for(event.kind);
        let options = EnqueueOptions::default()
            .with_job_id(event.job_event_id.clone())
            .with_priority(delivery.priority)
            .with_delay_ms(delivery.delay_ms)
            .with_retry_policy(self.retry_policy);

        let handle = self
            .enqueuer
            .enqueue(
                &self.tracking_queue,
                event.kind.as_str(),
                serde_json::to_value(event)?,
                options,
            )
            .await?;

        debug!(
            kind = %event.kind,
            job_id = %event.job_id,
            job_event_id = %event.job_event_id,
            priority = delivery.priority,
            delay_ms = delivery.delay_ms,
            "Emitted job lifecycle event"
        );
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::InMemoryBroker;
    use chrono::Utc;
    use serde_json::json;

    fn job() -> JobHandle {
        JobHandle {
            id: "job-1".to_string(),
            name: "com.acme.order.created".to_string(),
            queue: "orders".to_string(),
            data: json!({"tenantid": "t-1"}),
            attempts_made: 0,
            progress: None,
            timestamp: Utc::now().timestamp_millis(),
            processed_on: None,
            finished_on: None,
            failed_reason: None,
            delay_ms: 0,
            priority: 0,
        }
    }

    #[test]
    fn test_visibility_first_favours_active() {
        let policy = EventDeliveryPolicy::default();
        let active = policy.delivery_for(JobEventKind::Active);
        let completed = policy.delivery_for(JobEventKind::Completed);

        assert_eq!(active.delay_ms, 0);
        assert!(active.priority < completed.priority);
        assert!(completed.delay_ms > 0);
    }

    #[test]
    fn test_uniform_policy() {
        let delivery = Delivery {
            priority: 3,
            delay_ms: 250,
        };
        let policy = EventDeliveryPolicy::Uniform { delivery };
        for kind in JobEventKind::ALL {
            assert_eq!(policy.delivery_for(kind), delivery);
        }
    }

    #[tokio::test]
    async fn test_emit_enqueues_on_tracking_queue() {
        let broker = Arc::new(InMemoryBroker::new());
        let emitter = JobEventEmitter::new(broker.clone(), "events");

        let event = emitter.emit(JobEventKind::Active, &job()).await.unwrap();
        emitter.emit(JobEventKind::Completed, &job()).await.unwrap();

        let due = broker.take_due("events", Utc::now()).await;
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].name, "active");
        assert_eq!(due[0].id, event.job_event_id);
        assert_eq!(due[0].data["jobId"], "job-1");
        assert_eq!(broker.pending_count("events").await, 1);
    }
}
