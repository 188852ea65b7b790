//! Input validation for message payloads
//!
//! Size and shape limits applied before schema validation, plus the
//! structured report type returned by [`crate::messaging::Message::validate`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Maximum allowed size for a serialized payload (1MB)
const MAX_JSON_SIZE_BYTES: usize = 1024 * 1024;

/// Maximum nesting depth for JSON objects/arrays
const MAX_JSON_DEPTH: usize = 16;

/// Maximum number of keys in a JSON object or items in an array
const MAX_JSON_KEYS: usize = 1000;

/// Maximum string length for JSON keys and string values
const MAX_JSON_STRING_LENGTH: usize = 64 * 1024;

/// One violated rule, addressed by JSON pointer path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{path}: {}", self.message)
    }
}

/// Outcome of validating a payload; `is_valid` is true iff `errors` is empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_issues(errors: Vec<ValidationIssue>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    pub fn first_error(&self) -> Option<&ValidationIssue> {
        self.errors.first()
    }
}

/// Validates a payload against size and structure limits
pub fn validate_payload_limits(value: &Value) -> Result<(), ValidationIssue> {
    let serialized = serde_json::to_string(value)
        .map_err(|e| ValidationIssue::new("", format!("Invalid JSON structure: {e}")))?;

    if serialized.len() > MAX_JSON_SIZE_BYTES {
        return Err(ValidationIssue::new(
            "",
            format!(
                "payload too large: {} bytes (max: {MAX_JSON_SIZE_BYTES})",
                serialized.len()
            ),
        ));
    }

    validate_json_depth(value, 0, "")
}

fn validate_json_depth(value: &Value, current_depth: usize, path: &str) -> Result<(), ValidationIssue> {
    if current_depth > MAX_JSON_DEPTH {
        return Err(ValidationIssue::new(
            path,
            format!("nesting too deep: {current_depth} (max: {MAX_JSON_DEPTH})"),
        ));
    }

    match value {
        Value::Object(map) => {
            if map.len() > MAX_JSON_KEYS {
                return Err(ValidationIssue::new(
                    path,
                    format!("too many keys: {} (max: {MAX_JSON_KEYS})", map.len()),
                ));
            }

            for (key, val) in map {
                let child = format!("{path}/{}", escape_pointer(key));
                if key.len() > MAX_JSON_STRING_LENGTH {
                    return Err(ValidationIssue::new(
                        child,
                        format!("key too long: {} chars (max: {MAX_JSON_STRING_LENGTH})", key.len()),
                    ));
                }
                validate_json_depth(val, current_depth + 1, &child)?;
            }
        }
        Value::Array(arr) => {
            if arr.len() > MAX_JSON_KEYS {
                return Err(ValidationIssue::new(
                    path,
                    format!("array too large: {} items (max: {MAX_JSON_KEYS})", arr.len()),
                ));
            }

            for (index, item) in arr.iter().enumerate() {
                validate_json_depth(item, current_depth + 1, &format!("{path}/{index}"))?;
            }
        }
        Value::String(s) => {
            if s.len() > MAX_JSON_STRING_LENGTH {
                return Err(ValidationIssue::new(
                    path,
                    format!("string too long: {} chars (max: {MAX_JSON_STRING_LENGTH})", s.len()),
                ));
            }
        }
        _ => {}
    }

    Ok(())
}

/// RFC 6901 escaping for a single pointer segment
fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}
