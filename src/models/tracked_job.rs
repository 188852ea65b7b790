//! # Tracked Job Model
//!
//! The durable, reconciled record of one broker job's lifecycle.
//!
//! ## Database Schema
//!
//! Maps to `dmq_tracked_jobs`, natural key `(tenant_id, job_id)`:
//!
//! ```sql
//! CREATE TABLE dmq_tracked_jobs (
//!   id UUID PRIMARY KEY,
//!   tenant_id TEXT NOT NULL,
//!   job_id TEXT NOT NULL,
//!   queue_id TEXT NOT NULL,
//!   name TEXT NOT NULL,
//!   state TEXT NOT NULL,
//!   data JSONB NOT NULL DEFAULT '{}',
//!   log TEXT NOT NULL DEFAULT '',
//!   metadata JSONB NOT NULL DEFAULT '{}',
//!   created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
//!   updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
//!   UNIQUE (tenant_id, job_id)
//! );
//! CREATE INDEX idx_dmq_tracked_jobs_job_id ON dmq_tracked_jobs (job_id);
//! ```
//!
//! Rows are never deleted; every transition is kept in
//! [`TrackedJobEvent`](super::TrackedJobEvent).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::tracking::{JobEventKind, JobState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TrackedJob {
    pub id: Uuid,
    pub tenant_id: String,
    pub job_id: String,
    /// Queue name with the namespace suffix stripped
    pub queue_id: String,
    pub name: String,
    pub state: String,
    /// Original payload snapshot
    pub data: Value,
    /// Accumulated free-text job log
    pub log: String,
    /// Metadata of the latest event
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackedJob {
    /// Parsed state; unknown strings are treated as waiting
    pub fn job_state(&self) -> JobState {
        self.state.parse().unwrap_or(JobState::Waiting)
    }
}

/// Parameters for creating a tracked job in the `waiting` state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrackedJob {
    pub tenant_id: String,
    pub job_id: String,
    pub queue_id: String,
    pub name: String,
    pub data: Value,
    pub metadata: Value,
}

/// Parameters for applying one lifecycle event to an existing tracked job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTrackedJob {
    pub tenant_id: String,
    pub job_id: String,
    /// Idempotency key of the appended event
    pub job_event_id: String,
    pub event: JobEventKind,
    pub state: JobState,
    pub metadata: Value,
    /// Replaces the stored log when present
    pub log: Option<String>,
}

/// Result of an event append
#[derive(Debug, Clone, PartialEq)]
pub struct AppendedEvent {
    pub job: TrackedJob,
    /// False when the event id was already recorded
    pub appended: bool,
}
