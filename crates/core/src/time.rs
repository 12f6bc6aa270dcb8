// SPDX-License-Identifier: MIT

//! Wall-clock time points and the comparison epsilon

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The wall-clock instant type used for file times and timeouts.
pub type TimePoint = SystemTime;

/// The zero time point, used as "never observed".
pub const EPOCH: TimePoint = UNIX_EPOCH;

/// Tolerance for comparing file times that may have crossed a library
/// boundary with millisecond precision.
pub const TIME_EPSILON: Duration = Duration::from_millis(5);

/// Compare two time points within [`TIME_EPSILON`].
pub fn times_equal_eps(a: TimePoint, b: TimePoint) -> bool {
    let delta = match a.duration_since(b) {
        Ok(d) => d,
        Err(e) => e.duration(),
    };
    delta <= TIME_EPSILON
}

/// Milliseconds since the Unix epoch, saturating at zero for pre-epoch times.
pub fn time_to_millis(t: TimePoint) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// Reconstruct a time point from persisted epoch milliseconds.
pub fn millis_to_time(ms: u64) -> TimePoint {
    UNIX_EPOCH + Duration::from_millis(ms)
}

/// Format an elapsed duration in seconds as a short human string.
///
/// Seconds below 100 print as-is; beyond that the unit climbs through
/// minutes, hours and days with one decimal while the magnitude is small.
pub fn format_elapsed_secs(secs: u64) -> String {
    if secs < 100 {
        return format!("{}s", secs);
    }
    let deci_minutes = secs / 6;
    if deci_minutes < 600 {
        return if deci_minutes < 100 {
            format!("{}.{}m", deci_minutes / 10, deci_minutes % 10)
        } else {
            format!("{}m", deci_minutes / 10)
        };
    }
    let deci_hours = deci_minutes / 60;
    if deci_hours < 240 {
        return if deci_hours < 100 {
            format!("{}.{}h", deci_hours / 10, deci_hours % 10)
        } else {
            format!("{}h", deci_hours / 10)
        };
    }
    let deci_days = deci_hours / 24;
    if deci_days < 100 {
        format!("{}.{}d", deci_days / 10, deci_days % 10)
    } else {
        format!("{}d", deci_days / 10)
    }
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod tests;
