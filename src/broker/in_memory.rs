//! # In-Memory Broker
//!
//! Thread-safe in-memory implementation of the [`Broker`] contract for tests
//! and local development.
//!
//! - **Delayed visibility**: a job is only handed out by [`InMemoryBroker::take_due`]
//!   once its delay has elapsed
//! - **Priorities**: due jobs are drained lowest priority value first, then by
//!   due time, then by insertion order
//! - **Job ids**: enqueueing with an id that already exists returns the existing
//!   job unchanged, matching broker-side dedup
//! - **Recurring registrations** are stored and listed but never fired

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::errors::{BrokerError, BrokerResult};
use super::traits::{Broker, Enqueuer};
use super::types::{EnqueueOptions, JobHandle, RecurringRegistration, RetryPolicy};

const DEFAULT_PRIORITY: u32 = 0;

#[derive(Debug, Clone)]
struct StoredJob {
    handle: JobHandle,
    due_at_ms: i64,
    seq: u64,
    taken: bool,
    retry_policy: Option<RetryPolicy>,
}

#[derive(Debug, Default)]
struct InMemoryQueue {
    jobs: HashMap<String, StoredJob>,
    logs: HashMap<String, Vec<String>>,
    recurring: BTreeMap<String, RecurringRegistration>,
    next_seq: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryBroker {
    queues: RwLock<HashMap<String, InMemoryQueue>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out every job on `queue` that is due at `now`, marking it as processing
    pub async fn take_due(&self, queue: &str, now: DateTime<Utc>) -> Vec<JobHandle> {
        let now_ms = now.timestamp_millis();
        let mut queues = self.queues.write().await;
        let Some(state) = queues.get_mut(queue) else {
            return Vec::new();
        };

        let mut due: Vec<&mut StoredJob> = state
            .jobs
            .values_mut()
            .filter(|job| !job.taken && job.due_at_ms <= now_ms)
            .collect();
        due.sort_by_key(|job| (job.handle.priority, job.due_at_ms, job.seq));

        due.into_iter()
            .map(|job| {
                job.taken = true;
                job.handle.processed_on = Some(now_ms);
                job.handle.clone()
            })
            .collect()
    }

    /// Record a successful run
    pub async fn complete_job(&self, queue: &str, job_id: &str, now: DateTime<Utc>) -> BrokerResult<JobHandle> {
        self.with_job(queue, job_id, |job| {
            job.handle.attempts_made += 1;
            job.handle.finished_on = Some(now.timestamp_millis());
            job.handle.failed_reason = None;
        })
        .await
    }

    /// Record a failed run; the job is re-queued while its retry policy allows
    pub async fn fail_job(
        &self,
        queue: &str,
        job_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> BrokerResult<JobHandle> {
        let now_ms = now.timestamp_millis();
        self.with_job(queue, job_id, |job| {
            job.handle.attempts_made += 1;
            job.handle.failed_reason = Some(reason.to_string());

            let retry = job
                .retry_policy
                .filter(|policy| job.handle.attempts_made < policy.attempts);
            match retry {
                Some(policy) => {
                    let delay = policy.backoff.delay_for(job.handle.attempts_made);
                    job.due_at_ms = now_ms.saturating_add(i64::try_from(delay).unwrap_or(i64::MAX));
                    job.taken = false;
                }
                None => job.handle.finished_on = Some(now_ms),
            }
        })
        .await
    }

    /// Append one line to a job's log
    pub async fn add_log(&self, queue: &str, job_id: &str, line: impl Into<String>) -> BrokerResult<()> {
        let mut queues = self.queues.write().await;
        let state = queues
            .get_mut(queue)
            .filter(|state| state.jobs.contains_key(job_id))
            .ok_or_else(|| BrokerError::job_not_found(queue, job_id))?;
        state.logs.entry(job_id.to_string()).or_default().push(line.into());
        Ok(())
    }

    /// Jobs on `queue` not yet handed out, due or not
    pub async fn pending_count(&self, queue: &str) -> usize {
        let queues = self.queues.read().await;
        queues
            .get(queue)
            .map(|state| state.jobs.values().filter(|job| !job.taken).count())
            .unwrap_or(0)
    }

    /// Every job ever enqueued on `queue`, in insertion order
    pub async fn jobs(&self, queue: &str) -> Vec<JobHandle> {
        let queues = self.queues.read().await;
        let mut jobs: Vec<&StoredJob> = queues
            .get(queue)
            .map(|state| state.jobs.values().collect())
            .unwrap_or_default();
        jobs.sort_by_key(|job| job.seq);
        jobs.into_iter().map(|job| job.handle.clone()).collect()
    }

    async fn with_job<F>(&self, queue: &str, job_id: &str, mutate: F) -> BrokerResult<JobHandle>
    where
        F: FnOnce(&mut StoredJob) + Send,
    {
        let mut queues = self.queues.write().await;
        let job = queues
            .get_mut(queue)
            .and_then(|state| state.jobs.get_mut(job_id))
            .ok_or_else(|| BrokerError::job_not_found(queue, job_id))?;
        mutate(job);
        Ok(job.handle.clone())
    }
}

#[async_trait]
impl Enqueuer for InMemoryBroker {
    async fn enqueue(
        &self,
        queue: &str,
        name: &str,
        payload: Value,
        options: EnqueueOptions,
    ) -> BrokerResult<JobHandle> {
        let now = Utc::now();
        let job_id = options
            .job_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut queues = self.queues.write().await;
        let state = queues.entry(queue.to_string()).or_default();

        if let Some(repeat) = options.repeat {
            let next_fire_time = repeat.next_fire_after(now)?;
            let key = format!("{name}:{job_id}:{}", repeat.descriptor());
            let registration = RecurringRegistration {
                key: key.clone(),
                name: name.to_string(),
                job_id: job_id.clone(),
                repeat,
                next_fire_time,
            };
            state.recurring.insert(key.clone(), registration);
            debug!(queue = %queue, key = %key, "Installed recurring registration");

            return Ok(JobHandle {
                id: format!("repeat:{key}"),
                name: name.to_string(),
                queue: queue.to_string(),
                data: payload,
                attempts_made: 0,
                progress: None,
                timestamp: now.timestamp_millis(),
                processed_on: None,
                finished_on: None,
                failed_reason: None,
                delay_ms: 0,
                priority: options.priority.unwrap_or(DEFAULT_PRIORITY),
            });
        }

        if let Some(existing) = state.jobs.get(&job_id) {
            debug!(queue = %queue, job_id = %job_id, "Job id already present, keeping existing job");
            return Ok(existing.handle.clone());
        }

        let delay_ms = options.delay_ms.unwrap_or(0);
        let timestamp = now.timestamp_millis();
        let handle = JobHandle {
            id: job_id.clone(),
            name: name.to_string(),
            queue: queue.to_string(),
            data: payload,
            attempts_made: 0,
            progress: None,
            timestamp,
            processed_on: None,
            finished_on: None,
            failed_reason: None,
            delay_ms,
            priority: options.priority.unwrap_or(DEFAULT_PRIORITY),
        };

        let seq = state.next_seq;
        state.next_seq += 1;
        state.jobs.insert(
            job_id,
            StoredJob {
                handle: handle.clone(),
                due_at_ms: timestamp.saturating_add(i64::try_from(delay_ms).unwrap_or(i64::MAX)),
                seq,
                taken: false,
                retry_policy: options.retry_policy,
            },
        );

        Ok(handle)
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn list_recurring_registrations(
        &self,
        queue: &str,
    ) -> BrokerResult<Vec<RecurringRegistration>> {
        let queues = self.queues.read().await;
        Ok(queues
            .get(queue)
            .map(|state| state.recurring.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn remove_recurring_registration(&self, queue: &str, key: &str) -> BrokerResult<bool> {
        let mut queues = self.queues.write().await;
        Ok(queues
            .get_mut(queue)
            .map(|state| state.recurring.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn fetch_job(&self, queue: &str, job_id: &str) -> BrokerResult<Option<JobHandle>> {
        let queues = self.queues.read().await;
        Ok(queues
            .get(queue)
            .and_then(|state| state.jobs.get(job_id))
            .map(|job| job.handle.clone()))
    }

    async fn fetch_job_log(&self, queue: &str, job_id: &str) -> BrokerResult<Vec<String>> {
        let queues = self.queues.read().await;
        Ok(queues
            .get(queue)
            .and_then(|state| state.logs.get(job_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn move_to_delayed(&self, queue: &str, job_id: &str, fire_at_ms: i64) -> BrokerResult<()> {
        self.with_job(queue, job_id, |job| {
            job.due_at_ms = fire_at_ms;
            job.taken = false;
        })
        .await
        .map(|_| ())
    }

    async fn update_progress(&self, queue: &str, job_id: &str, progress: Value) -> BrokerResult<()> {
        self.with_job(queue, job_id, |job| job.handle.progress = Some(progress))
            .await
            .map(|_| ())
    }
}
