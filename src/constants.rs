//! # System Constants
//!
//! Defaults shared by the envelope builder, scheduler and job tracking.
//! Runtime values come from [`crate::config::DmqConfig`]; these constants are
//! the compiled defaults it falls back to.

/// Envelope wire format version written into `specversion`
pub const ENVELOPE_SPEC_VERSION: &str = "1.0";

/// Content type stamped on message definitions that do not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Queues used by the framework itself
pub mod queues {
    /// Secondary queue carrying job lifecycle events to the reconciler
    pub const TRACKING_QUEUE: &str = "dmq-job-events";

    /// Primary queue recurring tasks are installed on
    pub const SCHEDULER_QUEUE: &str = "dmq-tasks";
}

/// Reconciliation retry defaults
pub mod reconciler {
    /// Fixed delay before a lifecycle event whose tracked job is missing is re-submitted
    pub const RETRY_DELAY_MS: u64 = 5_000;

    /// Attempts allowed before a missing tracked job is declared permanently stuck
    pub const MAX_ATTEMPTS: u32 = 10;
}

/// Delivery defaults for lifecycle events on the tracking queue
pub mod delivery {
    /// Lower number wins, matching broker priority semantics
    pub const ACTIVE_PRIORITY: u32 = 1;
    pub const ACTIVE_DELAY_MS: u64 = 0;
    pub const STANDARD_PRIORITY: u32 = 5;
    pub const STANDARD_DELAY_MS: u64 = 1_000;
}

/// Retry defaults handed to the broker for framework-owned jobs
pub mod backoff {
    pub const DEFAULT_ATTEMPTS: u32 = 5;
    pub const DEFAULT_DELAY_MS: u64 = 1_000;
}

/// Keys used inside tracked job event metadata snapshots
pub mod metadata_keys {
    pub const ATTEMPTS_MADE: &str = "attemptsMade";
    pub const PROGRESS: &str = "progress";
    pub const FAILED_REASON: &str = "failedReason";
    pub const QUEUE_ID: &str = "queueId";
    pub const TIMESTAMP: &str = "timestamp";
    pub const PROCESSED_ON: &str = "processedOn";
    pub const FINISHED_ON: &str = "finishedOn";
    pub const RECONCILE_ATTEMPT: &str = "reconcileAttempt";
}
