use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::ReconcileError;

/// Tracked job state, denormalized from the latest lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Created, not yet picked up (or parked by a delay)
    Waiting,
    /// A worker is processing the job
    Active,
    Completed,
    Failed,
}

impl JobState {
    /// Terminal states still accept late events; they are recorded as history
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid job state: {s}")),
        }
    }
}

/// Lifecycle event kinds emitted by an instrumented executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobEventKind {
    Active,
    Completed,
    Failed,
    Progress,
    Stalled,
    Delayed,
}

impl JobEventKind {
    pub const ALL: [JobEventKind; 6] = [
        Self::Active,
        Self::Completed,
        Self::Failed,
        Self::Progress,
        Self::Stalled,
        Self::Delayed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Progress => "progress",
            Self::Stalled => "stalled",
            Self::Delayed => "delayed",
        }
    }

    /// State a tracked job moves to when this event is applied
    ///
    /// Progress leaves the state alone; stalled re-enters active and delayed
    /// re-enters waiting, except that neither reopens a terminal job.
    pub fn target_state(&self, current: JobState) -> JobState {
        match self {
            Self::Stalled | Self::Delayed if current.is_terminal() => current,
            Self::Active | Self::Stalled => JobState::Active,
            Self::Completed => JobState::Completed,
            Self::Failed => JobState::Failed,
            Self::Delayed => JobState::Waiting,
            Self::Progress => current,
        }
    }
}

impl fmt::Display for JobEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobEventKind {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ReconcileError::unknown_event_kind(s))
    }
}
