//! # Broker Queue Contract
//!
//! The external job broker as seen by this crate: enqueueing jobs, looking up
//! jobs and their logs, and managing recurring registrations.
//! [`InMemoryBroker`] implements the contract for tests and local use.

pub mod errors;
pub mod in_memory;
pub mod traits;
pub mod types;

pub use errors::{BrokerError, BrokerResult};
pub use in_memory::InMemoryBroker;
pub use traits::{Broker, Enqueuer};
pub use types::{
    normalize_cron, parse_cron, parse_time_zone, Backoff, EnqueueOptions, JobHandle,
    RecurringRegistration, RepeatSpec, RetryPolicy,
};
