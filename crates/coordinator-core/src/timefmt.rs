//! Scheduler wall-time formatting.
//!
//! Batch directives take `HH:MM:SS`; queue listings report elapsed time with
//! one, two, or three colon-separated components. Minutes are fractional in
//! both directions.

use thiserror::Error;

/// A wall-time string that could not be parsed.
#[derive(Debug, Error)]
#[error("invalid wall-time string: {0:?}")]
pub struct TimeParseError(pub String);

/// Format fractional minutes as `HH:MM:SS` for a scheduler directive.
///
/// Seconds are rounded to the nearest whole second.
pub fn format_minutes(minutes: f64) -> String {
    let total_secs = (minutes * 60.0).round().max(0.0) as u64;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{hours:02}:{mins:02}:{secs:02}")
}

/// Parse a queue-reported elapsed time back into fractional minutes.
///
/// Accepts `SS`, `MM:SS`, and `HH:MM:SS` forms.
pub fn parse_minutes(text: &str) -> Result<f64, TimeParseError> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    let (hours, mins, secs) = match parts.as_slice() {
        [s] => ("0", "0", *s),
        [m, s] => ("0", *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(TimeParseError(text.to_string())),
    };

    let field = |raw: &str| -> Result<f64, TimeParseError> {
        raw.parse::<f64>().map_err(|_| TimeParseError(text.to_string()))
    };

    Ok(field(hours)? * 60.0 + field(mins)? + field(secs)? / 60.0)
}
