//! Broker queue contract.
//!
//! The broker's own queue and worker implementation is external; these traits
//! are the narrow surface the gateway, scheduler and reconciler consume. Every
//! call names the queue it targets.

use async_trait::async_trait;
use serde_json::Value;

use super::errors::BrokerResult;
use super::types::{EnqueueOptions, JobHandle, RecurringRegistration};

#[async_trait]
pub trait Enqueuer: Send + Sync {
    /// Add a job; `name` is the dispatch name a worker switches on
    async fn enqueue(
        &self,
        queue: &str,
        name: &str,
        payload: Value,
        options: EnqueueOptions,
    ) -> BrokerResult<JobHandle>;
}

#[async_trait]
pub trait Broker: Enqueuer {
    async fn list_recurring_registrations(
        &self,
        queue: &str,
    ) -> BrokerResult<Vec<RecurringRegistration>>;

    /// Returns false when no registration had that key
    async fn remove_recurring_registration(&self, queue: &str, key: &str) -> BrokerResult<bool>;

    async fn fetch_job(&self, queue: &str, job_id: &str) -> BrokerResult<Option<JobHandle>>;

    async fn fetch_job_log(&self, queue: &str, job_id: &str) -> BrokerResult<Vec<String>>;

    /// Park a job until `fire_at_ms` (epoch milliseconds)
    async fn move_to_delayed(&self, queue: &str, job_id: &str, fire_at_ms: i64) -> BrokerResult<()>;

    async fn update_progress(&self, queue: &str, job_id: &str, progress: Value) -> BrokerResult<()>;
}
