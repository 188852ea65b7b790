//! # Tracked Job Reconciler
//!
//! Projects job lifecycle events from the tracking queue into the relational
//! store.
//!
//! Lifecycle events of one job arrive on independent retry schedules, so an
//! update (`completed`, `failed`, `progress`, `stalled`, `delayed`) can reach
//! the reconciler before the `active` event that creates the tracked job.
//! Such an update is never dropped: it is re-submitted to the tracking queue
//! after a fixed delay with an incremented attempt counter until the row
//! exists or the attempt cap is reached. Correctness rests on idempotent
//! creation (natural key `(tenant_id, job_id)`) and idempotent appends
//! (`job_event_id`), not on ordering or locks.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::emitter::EventDeliveryPolicy;
use super::errors::{ReconcileError, ReconcileResult};
use super::events::JobLifecycleEvent;
use super::progress::{completed_progress, recalc_progress};
use super::states::JobEventKind;
use crate::broker::{Broker, EnqueueOptions, JobHandle};
use crate::config::{strip_namespace_suffix, DmqConfig, ReconcilerConfig};
use crate::logging::log_job_event;
use crate::models::{NewTrackedJob, TrackedJob, UpdateTrackedJob};
use crate::store::TrackedJobStore;

/// What handling one lifecycle event did
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The event was appended to the tracked job
    Applied(TrackedJob),
    /// The event was already recorded; the job is returned unchanged
    Duplicate(TrackedJob),
    /// The tracked job does not exist yet; the event was re-submitted
    Deferred { attempt: u32, retry_at_ms: i64 },
}

impl ReconcileOutcome {
    pub fn tracked_job(&self) -> Option<&TrackedJob> {
        match self {
            Self::Applied(job) | Self::Duplicate(job) => Some(job),
            Self::Deferred { .. } => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }
}

pub struct TrackedJobReconciler {
    store: Arc<dyn TrackedJobStore>,
    broker: Arc<dyn Broker>,
    config: ReconcilerConfig,
    delivery: EventDeliveryPolicy,
    tracking_queue: String,
    namespace_suffix: String,
}

impl std::fmt::Debug for TrackedJobReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedJobReconciler")
            .field("config", &self.config)
            .field("delivery", &self.delivery)
            .field("tracking_queue", &self.tracking_queue)
            .field("namespace_suffix", &self.namespace_suffix)
            .finish_non_exhaustive()
    }
}

impl TrackedJobReconciler {
    pub fn new(
        store: Arc<dyn TrackedJobStore>,
        broker: Arc<dyn Broker>,
        tracking_queue: impl Into<String>,
    ) -> Self {
        Self {
            store,
            broker,
            config: ReconcilerConfig::default(),
            delivery: EventDeliveryPolicy::default(),
            tracking_queue: tracking_queue.into(),
            namespace_suffix: String::new(),
        }
    }

    pub fn from_config(
        store: Arc<dyn TrackedJobStore>,
        broker: Arc<dyn Broker>,
        config: &DmqConfig,
    ) -> Self {
        Self {
            store,
            broker,
            config: config.reconciler.clone(),
            delivery: EventDeliveryPolicy::from(&config.delivery),
            tracking_queue: config.tracking_queue_name(),
            namespace_suffix: config.namespace_suffix.clone(),
        }
    }

    pub fn with_reconciler_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Priority policy for re-submitted events; the delay always comes from
    /// the reconciler config
    pub fn with_delivery_policy(mut self, delivery: EventDeliveryPolicy) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_namespace_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.namespace_suffix = suffix.into();
        self
    }

    pub fn tracking_queue(&self) -> &str {
        &self.tracking_queue
    }

    /// Handle one job taken from the tracking queue
    ///
    /// The job name selects the event kind; an unknown name is a hard error.
    pub async fn handle_job(&self, job: &JobHandle) -> ReconcileResult<ReconcileOutcome> {
        let kind: JobEventKind = job.name.parse().map_err(|e: ReconcileError| {
            error!(job_id = %job.id, name = %job.name, "Unknown job event kind on tracking queue");
            e
        })?;

        let event: JobLifecycleEvent = serde_json::from_value(job.data.clone())?;
        if event.kind != kind {
            return Err(ReconcileError::invalid_event(format!(
                "job name '{}' does not match payload kind '{}'",
                job.name, event.kind
            )));
        }

        self.handle_event(event).await
    }

    /// Typed entry point
    pub async fn handle_event(&self, event: JobLifecycleEvent) -> ReconcileResult<ReconcileOutcome> {
        debug!(
            kind = %event.kind,
            job_id = %event.job_id,
            job_event_id = %event.job_event_id,
            attempt = event.attempt,
            "Reconciling job lifecycle event"
        );

        let result = match event.kind {
            JobEventKind::Active => self.on_active(event.clone()).await,
            JobEventKind::Completed
            | JobEventKind::Failed
            | JobEventKind::Progress
            | JobEventKind::Stalled
            | JobEventKind::Delayed => self.on_update(event.clone()).await,
        };

        if let Err(e) = &result {
            log_job_event(
                event.kind.as_str(),
                event.tenant_id.as_deref(),
                &event.job_id,
                &event.queue_id,
                "error",
                Some(&e.to_string()),
            );
        }
        result
    }

    async fn on_active(&self, event: JobLifecycleEvent) -> ReconcileResult<ReconcileOutcome> {
        let tracked = match self.find_tracked_job(&event).await? {
            Some(tracked) => tracked,
            None => self.create_tracked_job(&event).await?,
        };
        self.apply(event, tracked).await
    }

    async fn on_update(&self, event: JobLifecycleEvent) -> ReconcileResult<ReconcileOutcome> {
        match self.find_tracked_job(&event).await? {
            Some(tracked) => self.apply(event, tracked).await,
            None => self.defer(event).await,
        }
    }

    /// Tenant-scoped lookup, or by job id alone while the tenant is unknown
    async fn find_tracked_job(&self, event: &JobLifecycleEvent) -> ReconcileResult<Option<TrackedJob>> {
        let tracked = match event.tenant_id.as_deref() {
            Some(tenant_id) => self.store.find_tracked_job(tenant_id, &event.job_id).await?,
            None => self.store.find_tracked_job_by_job_id(&event.job_id).await?,
        };
        Ok(tracked)
    }

    async fn create_tracked_job(&self, event: &JobLifecycleEvent) -> ReconcileResult<TrackedJob> {
        let tenant_id = event
            .tenant_id
            .clone()
            .ok_or_else(|| ReconcileError::missing_tenant(&event.job_id))?;
        let queue_id = self.queue_id(&event.queue_id);
        let progress = event.progress.as_ref().and_then(recalc_progress);

        // Insert is a no-op returning the existing row when a redelivered
        // active event races this one
        let tracked = self
            .store
            .create_tracked_job(NewTrackedJob {
                tenant_id,
                job_id: event.job_id.clone(),
                queue_id: queue_id.clone(),
                name: event.job_name.clone(),
                data: event.data.clone(),
                metadata: event.metadata_snapshot(&queue_id, progress),
            })
            .await?;

        info!(
            tracked_job_id = %tracked.id,
            tenant_id = %tracked.tenant_id,
            job_id = %tracked.job_id,
            queue = %tracked.queue_id,
            "Tracked job created"
        );
        Ok(tracked)
    }

    /// Append `event` to an existing tracked job, enriched from the live broker
    async fn apply(
        &self,
        mut event: JobLifecycleEvent,
        tracked: TrackedJob,
    ) -> ReconcileResult<ReconcileOutcome> {
        if let Some(live) = self.fetch_live_job(&event).await {
            event.attempts_made = live.attempts_made;
        }
        let log = self.fetch_log(&event).await;

        let progress = match event.kind {
            JobEventKind::Completed => completed_progress(event.progress.as_ref()),
            _ => event.progress.as_ref().and_then(recalc_progress),
        };
        let queue_id = self.queue_id(&event.queue_id);
        let state = event.kind.target_state(tracked.job_state());

        let appended = self
            .store
            .update_tracked_job(UpdateTrackedJob {
                tenant_id: tracked.tenant_id.clone(),
                job_id: tracked.job_id.clone(),
                job_event_id: event.job_event_id.clone(),
                event: event.kind,
                state,
                metadata: event.metadata_snapshot(&queue_id, progress),
                log,
            })
            .await?;

        if !appended.appended {
            debug!(
                job_id = %event.job_id,
                job_event_id = %event.job_event_id,
                "Lifecycle event already applied"
            );
            return Ok(ReconcileOutcome::Duplicate(appended.job));
        }

        log_job_event(
            event.kind.as_str(),
            Some(&appended.job.tenant_id),
            &appended.job.job_id,
            &appended.job.queue_id,
            appended.job.state.as_str(),
            None,
        );
        Ok(ReconcileOutcome::Applied(appended.job))
    }

    /// Re-submit an update whose tracked job does not exist yet
    async fn defer(&self, event: JobLifecycleEvent) -> ReconcileResult<ReconcileOutcome> {
        if event.attempt >= self.config.max_attempts {
            error!(
                kind = %event.kind,
                job_id = %event.job_id,
                job_event_id = %event.job_event_id,
                attempts = event.attempt,
                "Tracked job never appeared, giving up on lifecycle event"
            );
            return Err(ReconcileError::retries_exhausted(&event.job_id, event.attempt));
        }

        let mut retry = event.next_attempt();
        if let Some(live) = self.fetch_live_job(&event).await {
            retry.refresh_from(&live);
        }

        let retry_at_ms = Utc::now()
            .timestamp_millis()
            .saturating_add(i64::try_from(self.config.retry_delay_ms).unwrap_or(i64::MAX));
        let options = EnqueueOptions::default()
            .with_job_id(format!("{}-retry-{}", retry.job_event_id, retry.attempt))
            .with_priority(self.delivery.delivery_for(retry.kind).priority)
            .with_delay_ms(self.config.retry_delay_ms);
        self.broker
            .enqueue(
                &self.tracking_queue,
                retry.kind.as_str(),
                serde_json::to_value(&retry)?,
                options,
            )
            .await?;

        info!(
            kind = %retry.kind,
            job_id = %retry.job_id,
            job_event_id = %retry.job_event_id,
            attempt = retry.attempt,
            max_attempts = self.config.max_attempts,
            retry_delay_ms = self.config.retry_delay_ms,
            "Tracked job not found yet, lifecycle event deferred"
        );

        Ok(ReconcileOutcome::Deferred {
            attempt: retry.attempt,
            retry_at_ms,
        })
    }

    async fn fetch_live_job(&self, event: &JobLifecycleEvent) -> Option<JobHandle> {
        match self.broker.fetch_job(&event.queue_id, &event.job_id).await {
            Ok(job) => job,
            Err(e) => {
                warn!(
                    job_id = %event.job_id,
                    queue = %event.queue_id,
                    error = %e,
                    "Could not fetch live job, continuing without it"
                );
                None
            }
        }
    }

    /// Accumulated broker log, or None when empty or unavailable
    async fn fetch_log(&self, event: &JobLifecycleEvent) -> Option<String> {
        match self.broker.fetch_job_log(&event.queue_id, &event.job_id).await {
            Ok(lines) if lines.is_empty() => None,
            Ok(lines) => Some(lines.join("\n")),
            Err(e) => {
                warn!(
                    job_id = %event.job_id,
                    queue = %event.queue_id,
                    error = %e,
                    "Could not fetch job log, continuing without it"
                );
                None
            }
        }
    }

    fn queue_id(&self, queue: &str) -> String {
        strip_namespace_suffix(queue, &self.namespace_suffix).to_string()
    }
}
