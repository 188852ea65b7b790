//! # Tracked Job Event Model
//!
//! Immutable lifecycle transition belonging to one tracked job. Maps to
//! `dmq_tracked_job_events`:
//!
//! ```sql
//! CREATE TABLE dmq_tracked_job_events (
//!   id UUID PRIMARY KEY,
//!   tracked_job_id UUID NOT NULL REFERENCES dmq_tracked_jobs (id),
//!   job_event_id TEXT NOT NULL UNIQUE,
//!   event TEXT NOT NULL,
//!   state TEXT NOT NULL,
//!   state_prev TEXT,
//!   metadata JSONB NOT NULL DEFAULT '{}',
//!   sort_key INTEGER NOT NULL,
//!   created_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TrackedJobEvent {
    pub id: Uuid,
    pub tracked_job_id: Uuid,
    pub job_event_id: String,
    pub event: String,
    pub state: String,
    pub state_prev: Option<String>,
    pub metadata: Value,
    /// Append order within the tracked job, starting at 1
    pub sort_key: i32,
    pub created_at: DateTime<Utc>,
}
