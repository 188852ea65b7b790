//! Lifecycle events carried on the tracking queue.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::states::JobEventKind;
use crate::broker::JobHandle;
use crate::constants::metadata_keys;
use crate::messaging::TENANT_FIELD;

/// One lifecycle transition of a broker job, as emitted by an instrumented executor
///
/// The job name on the tracking queue is the kind's name; the payload is this
/// struct. `attempt` counts how often the reconciler has deferred the event
/// while waiting for the tracked job to exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobLifecycleEvent {
    pub kind: JobEventKind,
    /// Stable across redelivery and deferral
    pub job_event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub job_id: String,
    /// Full (namespaced) name of the queue the job runs on
    pub queue_id: String,
    pub job_name: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
    #[serde(default)]
    pub attempts_made: u32,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_on: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_on: Option<i64>,
    #[serde(default)]
    pub attempt: u32,
}

impl JobLifecycleEvent {
    /// Snapshot a broker job for `kind`
    pub fn from_job(kind: JobEventKind, job: &JobHandle) -> Self {
        Self {
            kind,
            job_event_id: Uuid::now_v7().to_string(),
            tenant_id: tenant_of(&job.data),
            job_id: job.id.clone(),
            queue_id: job.queue.clone(),
            job_name: job.name.clone(),
            data: job.data.clone(),
            progress: job.progress.clone(),
            failed_reason: job.failed_reason.clone(),
            attempts_made: job.attempts_made,
            timestamp: job.timestamp,
            processed_on: job.processed_on,
            finished_on: job.finished_on,
            attempt: 0,
        }
    }

    /// Copy of this event for the next reconciliation attempt
    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }

    /// Refresh live counters from a freshly fetched broker job
    pub fn refresh_from(&mut self, job: &JobHandle) {
        self.attempts_made = job.attempts_made;
        if job.progress.is_some() {
            self.progress = job.progress.clone();
        }
        if job.failed_reason.is_some() {
            self.failed_reason = job.failed_reason.clone();
        }
        self.processed_on = job.processed_on.or(self.processed_on);
        self.finished_on = job.finished_on.or(self.finished_on);
        if self.tenant_id.is_none() {
            self.tenant_id = tenant_of(&job.data);
        }
    }

    /// Metadata snapshot stored with the tracked job event
    pub fn metadata_snapshot(&self, queue_id: &str, progress: Option<Value>) -> Value {
        let mut metadata = Map::new();
        metadata.insert(
            metadata_keys::ATTEMPTS_MADE.to_string(),
            Value::from(self.attempts_made),
        );
        metadata.insert(metadata_keys::QUEUE_ID.to_string(), Value::from(queue_id));
        metadata.insert(metadata_keys::TIMESTAMP.to_string(), Value::from(self.timestamp));
        if let Some(progress) = progress {
            metadata.insert(metadata_keys::PROGRESS.to_string(), progress);
        }
        if let Some(reason) = &self.failed_reason {
            metadata.insert(
                metadata_keys::FAILED_REASON.to_string(),
                Value::from(reason.as_str()),
            );
        }
        if let Some(processed_on) = self.processed_on {
            metadata.insert(
                metadata_keys::PROCESSED_ON.to_string(),
                Value::from(processed_on),
            );
        }
        if let Some(finished_on) = self.finished_on {
            metadata.insert(metadata_keys::FINISHED_ON.to_string(), Value::from(finished_on));
        }
        if self.attempt > 0 {
            metadata.insert(
                metadata_keys::RECONCILE_ATTEMPT.to_string(),
                Value::from(self.attempt),
            );
        }
        Value::Object(metadata)
    }
}

/// Tenant of a job payload: an envelope's `tenantid`, or `tenantId` at the
/// top level or inside `data`
pub fn tenant_of(payload: &Value) -> Option<String> {
    payload
        .get("tenantid")
        .or_else(|| payload.get(TENANT_FIELD))
        .or_else(|| payload.get("data").and_then(|data| data.get(TENANT_FIELD)))
        .and_then(Value::as_str)
        .map(str::to_string)
}
