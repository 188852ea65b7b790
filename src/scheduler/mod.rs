//! # Recurring Task Scheduling
//!
//! Validates schedule options (collecting every violation), and installs task
//! envelopes as deduplicated recurring registrations on the broker.

pub mod duration;
pub mod errors;
pub mod options;
pub mod task_scheduler;

pub use duration::IsoDuration;
pub use errors::{ScheduleViolation, ScheduleViolations, SchedulerError, SchedulerResult};
pub use options::{ScheduleOptions, ValidatedSchedule};
pub use task_scheduler::{ScheduledTask, TaskScheduler};
