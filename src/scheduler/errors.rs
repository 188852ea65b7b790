//! Scheduler error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::broker::BrokerError;

/// One broken scheduling rule, keyed by the option it concerns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleViolation {
    /// Wire name of the offending option (`frequency`, `timeZone`, ...)
    pub field: String,
    pub rule: String,
    pub message: String,
}

impl ScheduleViolation {
    pub fn new(field: impl Into<String>, rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule: rule.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ScheduleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every violation found in one set of schedule options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleViolations(pub Vec<ScheduleViolation>);

impl ScheduleViolations {
    pub fn push(&mut self, violation: ScheduleViolation) {
        self.0.push(violation);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScheduleViolation> {
        self.0.iter()
    }

    /// True when some violation concerns `field`
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|violation| violation.field == field)
    }

    pub fn has_rule(&self, field: &str, rule: &str) -> bool {
        self.0
            .iter()
            .any(|violation| violation.field == field && violation.rule == rule)
    }
}

impl fmt::Display for ScheduleViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join("; "))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("Invalid schedule: {violations}")]
    ScheduleViolations { violations: ScheduleViolations },

    #[error("Task serialization error: {message}")]
    Serialization { message: String },

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl SchedulerError {
    pub fn schedule_violations(violations: ScheduleViolations) -> Self {
        Self::ScheduleViolations { violations }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// The collected violations when this is a validation failure
    pub fn violations(&self) -> Option<&ScheduleViolations> {
        match self {
            Self::ScheduleViolations { violations } => Some(violations),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
