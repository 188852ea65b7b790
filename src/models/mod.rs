//! # Data Models
//!
//! Relational rows owned by job tracking and the vault, plus the parameter
//! structs used to create and update them.

pub mod tracked_job;
pub mod tracked_job_event;
pub mod vault_record;

pub use tracked_job::{AppendedEvent, NewTrackedJob, TrackedJob, UpdateTrackedJob};
pub use tracked_job_event::TrackedJobEvent;
pub use vault_record::{NewVaultRecord, VaultRecord, VAULT_STATE_ACTIVE, VAULT_STATE_DESTROYED};
