//! # Job Tracking
//!
//! Durable, reconciled records of every broker job's lifecycle.
//!
//! An instrumented executor reports each transition through
//! [`JobEventEmitter`], which puts a [`JobLifecycleEvent`] on the tracking
//! queue. [`TrackedJobReconciler`] consumes that queue and projects the events
//! into [`crate::store::TrackedJobStore`], tolerating duplicate and
//! out-of-order delivery.

pub mod emitter;
pub mod errors;
pub mod events;
pub mod progress;
pub mod reconciler;
pub mod states;

pub use emitter::{Delivery, EventDeliveryPolicy, JobEventEmitter};
pub use errors::{ReconcileError, ReconcileResult};
pub use events::{tenant_of, JobLifecycleEvent};
pub use progress::{completed_progress, recalc_progress};
pub use reconciler::{ReconcileOutcome, TrackedJobReconciler};
pub use states::{JobEventKind, JobState};
