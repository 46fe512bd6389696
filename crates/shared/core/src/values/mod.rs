use chrono::{DateTime, Utc};
use std::time::Duration as StdDuration;

/// Timestamp in UTC (both wall and logical instants)
pub type Timestamp = DateTime<Utc>;

/// Multiply a signed duration by a factor, saturating at the nanosecond range
///
/// Durations longer than ~292 years fall back to microsecond precision.
pub fn scale_delta(delta: chrono::Duration, factor: f64) -> chrono::Duration {
    match delta.num_nanoseconds() {
        Some(nanos) => chrono::Duration::nanoseconds((nanos as f64 * factor) as i64),
        None => {
            let micros = delta.num_microseconds().unwrap_or(i64::MAX);
            chrono::Duration::microseconds((micros as f64 * factor) as i64)
        }
    }
}

/// Shift an instant by a signed duration, clamping at the representable range
pub fn shift(at: Timestamp, delta: chrono::Duration) -> Timestamp {
    at.checked_add_signed(delta).unwrap_or(if delta < chrono::Duration::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// Convert a std duration into a signed one, saturating at the max
pub fn to_delta(d: StdDuration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}

/// Convert a signed duration into a std one; negative values become zero
pub fn to_std(delta: chrono::Duration) -> StdDuration {
    delta.to_std().unwrap_or(StdDuration::ZERO)
}
