//! Recurring schedule options and their validation.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::duration::IsoDuration;
use super::errors::{ScheduleViolation, ScheduleViolations};
use crate::broker::{parse_cron, parse_time_zone, RepeatSpec};

const UTC_ZONE: &str = "UTC";

/// Cadence of a recurring task: exactly one of `frequency` (ISO-8601
/// duration) or `pattern` (cron). Time zone and the start/end window only
/// apply to cron patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_at: Option<String>,
    /// Overrides the task type in the registration name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Options that passed validation, ready to hand to the broker
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSchedule {
    pub repeat: RepeatSpec,
    /// Cadence part of the registration name
    pub descriptor: String,
}

impl ScheduleOptions {
    pub fn every(frequency: impl Into<String>) -> Self {
        Self {
            frequency: Some(frequency.into()),
            ..Self::default()
        }
    }

    pub fn cron(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    pub fn with_start_at(mut self, start_at: impl Into<String>) -> Self {
        self.start_at = Some(start_at.into());
        self
    }

    pub fn with_end_at(mut self, end_at: impl Into<String>) -> Self {
        self.end_at = Some(end_at.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Check every rule and report all violations together
    pub fn validate(&self) -> Result<ValidatedSchedule, ScheduleViolations> {
        let mut violations = ScheduleViolations::default();

        match (&self.frequency, &self.pattern) {
            (None, None) => violations.push(ScheduleViolation::new(
                "frequency",
                "required",
                "either frequency or pattern is required",
            )),
            (Some(_), Some(_)) => {
                violations.push(ScheduleViolation::new(
                    "frequency",
                    "exclusive",
                    "frequency cannot be combined with pattern",
                ));
                violations.push(ScheduleViolation::new(
                    "pattern",
                    "exclusive",
                    "pattern cannot be combined with frequency",
                ));
            }
            _ => {}
        }

        let frequency = self.frequency.as_deref().and_then(|frequency| {
            IsoDuration::parse(frequency)
                .map_err(|reason| {
                    violations.push(ScheduleViolation::new("frequency", "format", reason));
                })
                .ok()
        });
        let frequency = frequency.filter(|duration| {
            let in_range = RepeatSpec::every(duration.as_millis())
                .next_fire_after(Utc::now())
                .is_ok();
            if !in_range {
                violations.push(ScheduleViolation::new(
                    "frequency",
                    "range",
                    format!("frequency '{duration}' is out of range"),
                ));
            }
            in_range
        });

        if let Some(pattern) = self.pattern.as_deref() {
            if let Err(reason) = parse_cron(pattern) {
                violations.push(ScheduleViolation::new("pattern", "cron", reason));
            }
        }

        let zone = self.time_zone.as_deref().and_then(|name| {
            parse_time_zone(name)
                .map_err(|reason| {
                    violations.push(ScheduleViolation::new("timeZone", "timezone", reason));
                })
                .ok()
        });

        let start = Self::parse_instant("startAt", self.start_at.as_deref(), &mut violations);
        let end = Self::parse_instant("endAt", self.end_at.as_deref(), &mut violations);
        if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                violations.push(ScheduleViolation::new(
                    "endAt",
                    "order",
                    "endAt must be after startAt",
                ));
            }
        }

        if self.frequency.is_some() {
            for (field, present) in [
                ("timeZone", self.time_zone.is_some()),
                ("startAt", self.start_at.is_some()),
                ("endAt", self.end_at.is_some()),
            ] {
                if present {
                    violations.push(ScheduleViolation::new(
                        field,
                        "pattern_only",
                        format!("{field} only applies to cron patterns, not frequency"),
                    ));
                }
            }
        }

        if !violations.is_empty() {
            return Err(violations);
        }

        match (frequency, self.pattern.as_deref()) {
            (Some(frequency), None) => Ok(ValidatedSchedule {
                repeat: RepeatSpec::every(frequency.as_millis()),
                descriptor: frequency.to_string(),
            }),
            (None, Some(pattern)) => {
                let tz = self.time_zone.clone().unwrap_or_else(|| UTC_ZONE.to_string());
                let abbreviation = zone.map_or_else(|| UTC_ZONE.to_string(), zone_abbreviation);
                Ok(ValidatedSchedule {
                    repeat: RepeatSpec::Cron {
                        pattern: pattern.trim().to_string(),
                        tz,
                        start_date: start,
                        end_date: end,
                    },
                    descriptor: format!("{} {abbreviation}", pattern.trim()),
                })
            }
            _ => Err(ScheduleViolations(vec![ScheduleViolation::new(
                "frequency",
                "required",
                "either frequency or pattern is required",
            )])),
        }
    }

    fn parse_instant(
        field: &str,
        value: Option<&str>,
        violations: &mut ScheduleViolations,
    ) -> Option<DateTime<Utc>> {
        let value = value?;
        match DateTime::parse_from_rfc3339(value) {
            Ok(instant) => Some(instant.with_timezone(&Utc)),
            Err(e) => {
                violations.push(ScheduleViolation::new(
                    field,
                    "format",
                    format!("{field} '{value}' is not an RFC 3339 timestamp: {e}"),
                ));
                None
            }
        }
    }
}

/// Current abbreviation of a zone (`CET`, `EST`, ...)
fn zone_abbreviation(zone: Tz) -> String {
    Utc::now().with_timezone(&zone).format("%Z").to_string()
}
