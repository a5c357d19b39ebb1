//! Progress display helpers
//!
//! Pure functions projecting a playback position and duration onto the
//! values a player surface shows: a `M:SS` clock and a progress percentage.
//! Nothing in here holds state.

/// Placeholder shown for times that cannot be displayed (NaN, infinite).
pub const UNKNOWN_TIME: &str = "0:00";

/// Format seconds as `M:SS`.
///
/// Minutes are not wrapped into hours, so an hour-long track reads `60:00`.
/// Non-finite input yields `"0:00"`; negative input is treated as zero.
///
/// # Examples
///
/// ```
/// use dualtrack_common::progress::format_time;
///
/// assert_eq!(format_time(125.0), "2:05");
/// assert_eq!(format_time(59.99), "0:59");
/// assert_eq!(format_time(f64::NAN), "0:00");
/// assert_eq!(format_time(f64::INFINITY), "0:00");
/// ```
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return UNKNOWN_TIME.to_string();
    }

    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{}:{:02}", minutes, secs)
}

/// Position as a fraction of duration, clamped to `[0, 1]`.
///
/// Returns 0 when the duration is zero, negative or not a number. This is
/// the value carried across a rendition switch.
pub fn fraction(position: f64, duration: f64) -> f64 {
    if duration > 0.0 && position.is_finite() {
        (position / duration).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Position as a percentage of duration, clamped to `[0, 100]`.
///
/// # Examples
///
/// ```
/// use dualtrack_common::progress::percentage;
///
/// assert_eq!(percentage(30.0, 120.0), 25.0);
/// assert_eq!(percentage(10.0, 0.0), 0.0);
/// ```
pub fn percentage(position: f64, duration: f64) -> f64 {
    if duration > 0.0 && position.is_finite() {
        (position / duration * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}
