//! Progress normalisation.
//!
//! Producers report progress either as a fraction, a percentage or a
//! composite object. Stored progress is a fraction in `(0, 1]`, an object, or
//! absent.

use serde_json::{json, Value};

/// Normalise a raw progress value
///
/// - objects pass through unchanged
/// - `0` and non-numbers yield `None`
/// - `(0, 1]` is already a fraction
/// - `(1, 100]` is a percentage and is divided by 100
/// - anything above 100, or below 0, is preserved as `{"value": n}`
pub fn recalc_progress(progress: &Value) -> Option<Value> {
    match progress {
        Value::Object(_) => Some(progress.clone()),
        Value::Number(number) => {
            let n = number.as_f64()?;
            if n == 0.0 {
                None
            } else if n > 0.0 && n <= 1.0 {
                Some(progress.clone())
            } else if n > 1.0 && n <= 100.0 {
                Some(json!(n / 100.0))
            } else {
                Some(json!({ "value": progress }))
            }
        }
        _ => None,
    }
}

/// Progress recorded when a job completes
///
/// Numeric progress is forced to `1.0`; object progress is left for the
/// producer to finalise and anything else normalises as usual.
pub fn completed_progress(progress: Option<&Value>) -> Option<Value> {
    match progress {
        Some(Value::Number(_)) => Some(json!(1.0)),
        other => other.and_then(recalc_progress),
    }
}
