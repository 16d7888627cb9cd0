//! Human-readable formatting of values shown in report cells.

use chrono::TimeDelta;

const BYTE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Formats a float with a precision that shrinks as the value grows.
///
/// NaN formats as an empty string.
#[must_use]
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return String::new();
    }
    let abs = value.abs();
    let formatted = if abs >= 10.0 {
        format!("{value:.0}")
    } else if abs >= 1.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.2}")
    };
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

/// Formats a byte count, returning the value and its unit.
///
/// # Example
///
/// ```
/// use analytics::format::format_bytes;
///
/// assert_eq!(format_bytes(512.0), ("512".to_string(), "B"));
/// assert_eq!(format_bytes(1536.0), ("1.5".to_string(), "KB"));
/// ```
#[must_use]
pub fn format_bytes(bytes: f64) -> (String, &'static str) {
    if bytes.is_nan() {
        return (String::new(), "");
    }
    let mut value = bytes;
    let mut unit = 0;
    while value.abs() >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    (format_float(value), BYTE_UNITS[unit])
}

/// Formats a duration using at most `precision` units, largest first.
///
/// Durations under a second are shown in milliseconds.
///
/// # Example
///
/// ```
/// use analytics::format::format_duration;
/// use chrono::TimeDelta;
///
/// let d = TimeDelta::seconds(3 * 3600 + 25 * 60);
/// assert_eq!(format_duration(d, 1), "3h");
/// assert_eq!(format_duration(d, 2), "3h25m");
/// ```
#[must_use]
pub fn format_duration(duration: TimeDelta, precision: usize) -> String {
    let duration = duration.abs();
    let total = duration.num_seconds();
    if total == 0 {
        let ms = duration.num_milliseconds();
        return if ms == 0 {
            "0s".to_string()
        } else {
            format!("{ms}ms")
        };
    }

    let parts = [
        (total / 86_400, "d"),
        (total % 86_400 / 3_600, "h"),
        (total % 3_600 / 60, "m"),
        (total % 60, "s"),
    ];

    let first = parts.iter().position(|(n, _)| *n > 0).unwrap_or(parts.len() - 1);
    parts[first..]
        .iter()
        .take(precision.max(1))
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| format!("{n}{unit}"))
        .collect()
}

/// Formats a duration for narrow cells: the largest unit only, and `<1m`
/// for anything shorter than a minute.
#[must_use]
pub fn format_duration_short(duration: TimeDelta) -> String {
    if duration.abs() < TimeDelta::minutes(1) {
        return "<1m".to_string();
    }
    format_duration(duration, 1)
}
