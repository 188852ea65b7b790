//! Broker-side data shapes: job handles, enqueue options, retry and repeat specs.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use super::errors::{BrokerError, BrokerResult};
use crate::config::BackoffConfig;

/// Broker-side view of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub id: String,
    /// Dispatch name a worker switches on
    pub name: String,
    pub queue: String,
    pub data: Value,
    pub attempts_made: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Value>,
    /// Creation time, epoch milliseconds
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_on: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_on: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
    pub delay_ms: u64,
    pub priority: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Backoff {
    Fixed { delay_ms: u64 },
    Exponential { delay_ms: u64 },
}

impl Backoff {
    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> u64 {
        match *self {
            Self::Fixed { delay_ms } => delay_ms,
            Self::Exponential { delay_ms } => {
                let exponent = attempt.saturating_sub(1).min(20);
                delay_ms.saturating_mul(1u64 << exponent)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(attempts: u32, delay_ms: u64) -> Self {
        Self {
            attempts,
            backoff: Backoff::Fixed { delay_ms },
        }
    }

    pub fn exponential(attempts: u32, delay_ms: u64) -> Self {
        Self {
            attempts,
            backoff: Backoff::Exponential { delay_ms },
        }
    }
}

impl From<&BackoffConfig> for RetryPolicy {
    fn from(config: &BackoffConfig) -> Self {
        if config.exponential {
            Self::exponential(config.attempts, config.delay_ms)
        } else {
            Self::fixed(config.attempts, config.delay_ms)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&BackoffConfig::default())
    }
}

/// How a recurring registration fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepeatSpec {
    Every {
        every: u64,
    },
    Cron {
        pattern: String,
        tz: String,
        #[serde(rename = "startDate", default, skip_serializing_if = "Option::is_none")]
        start_date: Option<DateTime<Utc>>,
        #[serde(rename = "endDate", default, skip_serializing_if = "Option::is_none")]
        end_date: Option<DateTime<Utc>>,
    },
}

impl RepeatSpec {
    pub fn every(every_ms: u64) -> Self {
        Self::Every { every: every_ms }
    }

    /// Short cadence descriptor used in registration keys
    pub fn descriptor(&self) -> String {
        match self {
            Self::Every { every } => every.to_string(),
            Self::Cron { pattern, tz, .. } => format!("{pattern}:{tz}"),
        }
    }

    /// Next fire time strictly after `now`, or None once the window has closed
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> BrokerResult<Option<DateTime<Utc>>> {
        match self {
            Self::Every { every } => {
                if *every == 0 {
                    return Err(BrokerError::invalid_repeat("interval must be positive"));
                }
                let every = i64::try_from(*every)
                    .map_err(|_| BrokerError::invalid_repeat("interval out of range"))?;
                let next = chrono::Duration::try_milliseconds(every)
                    .and_then(|delta| now.checked_add_signed(delta))
                    .ok_or_else(|| BrokerError::invalid_repeat("interval out of range"))?;
                Ok(Some(next))
            }
            Self::Cron {
                pattern,
                tz,
                start_date,
                end_date,
            } => {
                let schedule = parse_cron(pattern).map_err(BrokerError::invalid_repeat)?;
                let zone = parse_time_zone(tz).map_err(BrokerError::invalid_repeat)?;

                let from = match start_date {
                    Some(start) if *start > now => *start - chrono::Duration::milliseconds(1),
                    _ => now,
                };
                let next = schedule
                    .after(&zone.from_utc_datetime(&from.naive_utc()))
                    .next()
                    .map(|fire| fire.with_timezone(&Utc));

                Ok(next.filter(|fire| end_date.map_or(true, |end| *fire <= end)))
            }
        }
    }
}

/// Parse a 5-field (minute precision) or 6/7-field (second precision) cron pattern
pub fn parse_cron(pattern: &str) -> Result<Schedule, String> {
    Schedule::from_str(&normalize_cron(pattern)).map_err(|e| format!("invalid cron pattern '{pattern}': {e}"))
}

/// Prepend a seconds field to classic 5-field patterns
pub fn normalize_cron(pattern: &str) -> String {
    let trimmed = pattern.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    }
}

pub fn parse_time_zone(name: &str) -> Result<Tz, String> {
    name.parse::<Tz>()
        .map_err(|_| format!("unknown time zone '{name}'"))
}

/// Broker-owned recurring schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringRegistration {
    pub key: String,
    pub name: String,
    /// Job id every fired job is derived from
    pub job_id: String,
    pub repeat: RepeatSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_fire_time: Option<DateTime<Utc>>,
}

impl RecurringRegistration {
    pub fn interval_ms(&self) -> Option<u64> {
        match self.repeat {
            RepeatSpec::Every { every } => Some(every),
            RepeatSpec::Cron { .. } => None,
        }
    }

    pub fn pattern(&self) -> Option<&str> {
        match &self.repeat {
            RepeatSpec::Cron { pattern, .. } => Some(pattern),
            RepeatSpec::Every { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnqueueOptions {
    /// Broker assigns an id when absent
    pub job_id: Option<String>,
    /// Lower value is served first
    pub priority: Option<u32>,
    pub delay_ms: Option<u64>,
    pub retry_policy: Option<RetryPolicy>,
    pub repeat: Option<RepeatSpec>,
}

impl EnqueueOptions {
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn with_repeat(mut self, repeat: RepeatSpec) -> Self {
        self.repeat = Some(repeat);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_doubles() {
        let policy = RetryPolicy::exponential(5, 1000);
        assert_eq!(policy.backoff.delay_for(1), 1000);
        assert_eq!(policy.backoff.delay_for(3), 4000);
        assert_eq!(RetryPolicy::fixed(3, 250).backoff.delay_for(3), 250);
    }

    #[test]
    fn test_five_field_cron_is_normalized() {
        assert_eq!(normalize_cron("*/5 * * * *"), "0 */5 * * * *");
        assert_eq!(normalize_cron("0 0 * * * *"), "0 0 * * * *");
        assert!(parse_cron("*/5 * * * *").is_ok());
        assert!(parse_cron("every tuesday").is_err());
    }

    #[test]
    fn test_cron_next_fire_respects_zone_and_window() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let repeat = RepeatSpec::Cron {
            pattern: "0 12 * * *".to_string(),
            tz: "Europe/Oslo".to_string(),
            start_date: None,
            end_date: None,
        };
        let next = repeat.next_fire_after(now).unwrap().unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap());

        let closed = RepeatSpec::Cron {
            pattern: "0 12 * * *".to_string(),
            tz: "UTC".to_string(),
            start_date: None,
            end_date: Some(now),
        };
        assert_eq!(closed.next_fire_after(now).unwrap(), None);
    }

    #[test]
    fn test_interval_next_fire() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let next = RepeatSpec::every(60_000).next_fire_after(now).unwrap().unwrap();
        assert_eq!(next - now, chrono::Duration::minutes(1));
        assert!(RepeatSpec::every(0).next_fire_after(now).is_err());
    }

    #[test]
    fn test_interval_past_calendar_range_is_rejected() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let million_years = 1_000_000 * 365 * 86_400_000;
        assert!(matches!(
            RepeatSpec::every(million_years).next_fire_after(now),
            Err(BrokerError::InvalidRepeat { .. })
        ));
        assert!(RepeatSpec::every(u64::MAX).next_fire_after(now).is_err());
    }
}
