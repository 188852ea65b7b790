//! ISO-8601 durations (`PT15M`, `P1DT12H`, `PT0.5S`) for fixed-interval schedules.
//!
//! Calendar units are converted with fixed lengths: a year is 365 days and a
//! month is 30 days.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

const ISO_DURATION_PATTERN: &str = r"^P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(\d+(?:\.\d+)?S)?)?$";

const SECOND_MS: u64 = 1_000;
const MINUTE_MS: u64 = 60 * SECOND_MS;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

static ISO_DURATION: OnceLock<Option<Regex>> = OnceLock::new();

fn iso_duration_regex() -> Option<&'static Regex> {
    ISO_DURATION
        .get_or_init(|| Regex::new(ISO_DURATION_PATTERN).ok())
        .as_ref()
}

/// A parsed, positive ISO-8601 duration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoDuration {
    text: String,
    millis: u64,
}

impl IsoDuration {
    pub fn parse(input: &str) -> Result<Self, String> {
        let text = input.trim().to_ascii_uppercase();
        let regex = iso_duration_regex().ok_or_else(|| "duration parser unavailable".to_string())?;
        let captures = regex
            .captures(&text)
            .ok_or_else(|| format!("'{input}' is not an ISO-8601 duration"))?;

        if text == "P" || text.ends_with('T') {
            return Err(format!("'{input}' has no duration components"));
        }

        let units = [
            (1, 365 * DAY_MS),
            (2, 30 * DAY_MS),
            (3, 7 * DAY_MS),
            (4, DAY_MS),
            (5, HOUR_MS),
            (6, MINUTE_MS),
        ];

        let mut millis: u64 = 0;
        for (group, unit_ms) in units {
            if let Some(amount) = captures.get(group) {
                let amount: u64 = amount
                    .as_str()
                    .parse()
                    .map_err(|_| format!("'{input}' component out of range"))?;
                millis = amount
                    .checked_mul(unit_ms)
                    .and_then(|part| millis.checked_add(part))
                    .ok_or_else(|| format!("'{input}' is too long"))?;
            }
        }

        if let Some(seconds) = captures.get(7) {
            let seconds: f64 = seconds
                .as_str()
                .trim_end_matches('S')
                .parse()
                .map_err(|_| format!("'{input}' has invalid seconds"))?;
            let seconds_ms = (seconds * SECOND_MS as f64).round();
            if !seconds_ms.is_finite() || seconds_ms >= u64::MAX as f64 {
                return Err(format!("'{input}' is too long"));
            }
            millis = millis
                .checked_add(seconds_ms as u64)
                .ok_or_else(|| format!("'{input}' is too long"))?;
        }

        if millis == 0 {
            return Err(format!("'{input}' must be longer than zero"));
        }

        Ok(Self { text, millis })
    }

    pub fn as_millis(&self) -> u64 {
        self.millis
    }

    /// Normalised (upper-case) ISO text
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for IsoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
