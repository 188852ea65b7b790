//! # Task Scheduler
//!
//! Installs recurring task envelopes on the broker, deduplicated by content.
//!
//! The registration job id is the content hash of the task's type and
//! payload, so identical tasks always land in the same slot. Before a new
//! registration is installed, every existing registration with that job id or
//! with the same human readable name is removed. The list/remove/install
//! sequence runs without a lock; concurrent schedulers converge because they
//! compute the same hash.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};

use super::errors::{SchedulerError, SchedulerResult};
use super::options::ScheduleOptions;
use crate::broker::{Broker, EnqueueOptions, RecurringRegistration, RepeatSpec, RetryPolicy};
use crate::config::DmqConfig;
use crate::logging::log_schedule_operation;
use crate::messaging::Envelope;
use crate::utils::canonical::content_hash;

/// Result of installing a recurring task
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask {
    pub name: String,
    pub dedup_id: String,
    pub queue: String,
    pub repeat: RepeatSpec,
    /// Keys of the registrations this one replaced
    pub replaced: Vec<String>,
    pub next_fire_time: Option<DateTime<Utc>>,
}

pub struct TaskScheduler {
    broker: Arc<dyn Broker>,
    queue: String,
    retry_policy: RetryPolicy,
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("queue", &self.queue)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl TaskScheduler {
    pub fn new(broker: Arc<dyn Broker>, queue: impl Into<String>) -> Self {
        Self {
            broker,
            queue: queue.into(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Scheduler on the configured (namespaced) task queue
    pub fn from_config(broker: Arc<dyn Broker>, config: &DmqConfig) -> Self {
        Self {
            broker,
            queue: config.scheduler_queue_name(),
            retry_policy: RetryPolicy::from(&config.backoff),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Content hash identifying a task's schedule slot
    pub fn dedup_id(task: &Envelope) -> SchedulerResult<String> {
        Ok(content_hash(&json!({
            "type": task.message_type,
            "data": task.data,
        }))?)
    }

    /// Install `task` as a recurring job, replacing stale registrations of the
    /// same content or name
    pub async fn schedule_every(
        &self,
        task: &Envelope,
        options: &ScheduleOptions,
    ) -> SchedulerResult<ScheduledTask> {
        let schedule = options.validate().map_err(|violations| {
            log_schedule_operation(
                "schedule_every",
                &self.queue,
                options.name.as_deref().unwrap_or(&task.message_type),
                "",
                "invalid",
                Some(&violations.to_string()),
            );
            SchedulerError::schedule_violations(violations)
        })?;

        let dedup_id = Self::dedup_id(task)?;
        let name = format!(
            "{}:{}",
            options.name.as_deref().unwrap_or(&task.message_type),
            schedule.descriptor
        );

        let replaced = self.remove_matching(&dedup_id, &name).await?;

        let payload = serde_json::to_value(task)?;
        let enqueue_options = EnqueueOptions::default()
            .with_job_id(dedup_id.clone())
            .with_retry_policy(self.retry_policy)
            .with_repeat(schedule.repeat.clone());
        self.broker
            .enqueue(&self.queue, &name, payload, enqueue_options)
            .await?;

        let next_fire_time = schedule.repeat.next_fire_after(Utc::now())?;

        log_schedule_operation(
            "schedule_every",
            &self.queue,
            &name,
            &dedup_id,
            "installed",
            Some(&format!("replaced {}", replaced.len())),
        );

        Ok(ScheduledTask {
            name,
            dedup_id,
            queue: self.queue.clone(),
            repeat: schedule.repeat,
            replaced,
            next_fire_time,
        })
    }

    pub async fn list_schedules(&self) -> SchedulerResult<Vec<RecurringRegistration>> {
        Ok(self.broker.list_recurring_registrations(&self.queue).await?)
    }

    /// Remove every registration named `name`; returns how many were removed
    pub async fn unschedule(&self, name: &str) -> SchedulerResult<usize> {
        let mut removed = 0;
        for registration in self.list_schedules().await? {
            if registration.name == name
                && self
                    .broker
                    .remove_recurring_registration(&self.queue, &registration.key)
                    .await?
            {
                removed += 1;
            }
        }

        info!(queue = %self.queue, name = %name, removed = removed, "Unscheduled recurring task");
        Ok(removed)
    }

    async fn remove_matching(&self, dedup_id: &str, name: &str) -> SchedulerResult<Vec<String>> {
        let mut replaced = Vec::new();
        for registration in self.list_schedules().await? {
            if registration.job_id != dedup_id && registration.name != name {
                continue;
            }
            if self
                .broker
                .remove_recurring_registration(&self.queue, &registration.key)
                .await?
            {
                debug!(
                    queue = %self.queue,
                    key = %registration.key,
                    "Removed stale recurring registration"
                );
                replaced.push(registration.key);
            }
        }
        Ok(replaced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::InMemoryBroker;

    fn task(report: &str) -> Envelope {
        Envelope::new(
            "com.acme.report.generate",
            "t-1",
            "reports",
            json!({"report": report}),
            None,
        )
        .unwrap()
    }

    fn scheduler() -> TaskScheduler {
        TaskScheduler::new(Arc::new(InMemoryBroker::new()), "tasks")
    }

    #[tokio::test]
    async fn test_same_task_twice_keeps_one_registration() {
        let scheduler = scheduler();
        let options = ScheduleOptions::every("PT5M");

        let first = scheduler.schedule_every(&task("daily"), &options).await.unwrap();
        let second = scheduler.schedule_every(&task("daily"), &options).await.unwrap();

        assert_eq!(first.dedup_id, second.dedup_id);
        assert!(first.replaced.is_empty());
        assert_eq!(second.replaced.len(), 1);
        assert_eq!(scheduler.list_schedules().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_new_cadence_replaces_old_one() {
        let scheduler = scheduler();
        scheduler
            .schedule_every(&task("daily"), &ScheduleOptions::every("PT5M"))
            .await
            .unwrap();
        let scheduled = scheduler
            .schedule_every(&task("daily"), &ScheduleOptions::cron("0 9 * * *"))
            .await
            .unwrap();

        let registrations = scheduler.list_schedules().await.unwrap();
        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].name, "com.acme.report.generate:0 9 * * * UTC");
        assert_eq!(registrations[0].job_id, scheduled.dedup_id);
        assert!(scheduled.next_fire_time.is_some());
    }

    #[tokio::test]
    async fn test_distinct_tasks_coexist_and_unschedule() {
        let scheduler = scheduler();
        let options = ScheduleOptions::every("PT1H");
        scheduler.schedule_every(&task("daily"), &options).await.unwrap();
        let weekly = scheduler
            .schedule_every(&task("weekly"), &options.clone().with_name("weekly-report"))
            .await
            .unwrap();

        assert_eq!(scheduler.list_schedules().await.unwrap().len(), 2);
        assert_eq!(weekly.name, "weekly-report:PT1H");

        assert_eq!(scheduler.unschedule("weekly-report:PT1H").await.unwrap(), 1);
        assert_eq!(scheduler.unschedule("weekly-report:PT1H").await.unwrap(), 0);
        assert_eq!(scheduler.list_schedules().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_options_install_nothing() {
        let scheduler = scheduler();
        let options = ScheduleOptions {
            frequency: Some("PT5M".to_string()),
            pattern: Some("0 * * * *".to_string()),
            ..ScheduleOptions::default()
        };

        let error = scheduler.schedule_every(&task("daily"), &options).await.unwrap_err();
        assert_eq!(error.violations().map(|v| v.len()), Some(2));
        assert!(scheduler.list_schedules().await.unwrap().is_empty());
    }
}
