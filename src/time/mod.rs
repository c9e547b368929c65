//! Time module for orbital epoch handling
//!
//! Element sets carry their epoch as a two-digit year plus a fractional day of
//! year. Propagation works in Julian dates and minutes since epoch, while the
//! outside world mostly speaks `chrono::DateTime<Utc>`. This module converts
//! between the three and provides the Greenwich sidereal time needed by the
//! deep-space model.

use crate::constants::{DAY_S, DEG2RAD, J2000, JD_UNIX_EPOCH, TAU};
use chrono::{DateTime, Duration, TimeZone, Utc};
use thiserror::Error;

/// Error type for time operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimeError {
    #[error("Day of year {0} is outside 1..367")]
    DayOfYearOutOfRange(f64),

    #[error("Julian date {0} cannot be represented as a calendar time")]
    Unrepresentable(f64),
}

/// Result type for time operations
pub type Result<T> = std::result::Result<T, TimeError>;

/// Expand a two-digit element-set year using the NORAD pivot at 57
///
/// Years below 57 belong to the 2000s, the rest to the 1900s.
pub fn full_year(two_digit: u32) -> i32 {
    if two_digit < 57 {
        2000 + two_digit as i32
    } else {
        1900 + two_digit as i32
    }
}

/// Julian date of a Gregorian calendar instant
///
/// Valid for years 1901 through 2099, which covers every element set ever
/// published.
pub fn julian_date(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: f64) -> f64 {
    let year = year as f64;
    let month = month as f64;
    367.0 * year - (7.0 * (year + ((month + 9.0) / 12.0).floor()) * 0.25).floor()
        + (275.0 * month / 9.0).floor()
        + day as f64
        + 1_721_013.5
        + ((second / 60.0 + minute as f64) / 60.0 + hour as f64) / 24.0
}

/// Julian date of an element-set epoch given as year and fractional day of year
///
/// Day 1.0 is January 1st at 00:00 UTC.
pub fn epoch_to_jd(year: i32, day_of_year: f64) -> Result<f64> {
    if !(1.0..367.0).contains(&day_of_year) {
        return Err(TimeError::DayOfYearOutOfRange(day_of_year));
    }
    Ok(julian_date(year, 1, 1, 0, 0, 0.0) + (day_of_year - 1.0))
}

/// Convert a Julian date to a UTC calendar time (millisecond resolution)
pub fn jd_to_datetime(jd: f64) -> Result<DateTime<Utc>> {
    let millis = ((jd - JD_UNIX_EPOCH) * DAY_S * 1000.0).round();
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return Err(TimeError::Unrepresentable(jd));
    }
    Utc.timestamp_millis_opt(millis as i64)
        .single()
        .ok_or(TimeError::Unrepresentable(jd))
}

/// Convert a UTC calendar time to a Julian date
pub fn datetime_to_jd(datetime: &DateTime<Utc>) -> f64 {
    JD_UNIX_EPOCH + datetime.timestamp_millis() as f64 / (DAY_S * 1000.0)
}

/// Minutes elapsed from `epoch_jd` to `jd`
pub fn minutes_between(epoch_jd: f64, jd: f64) -> f64 {
    (jd - epoch_jd) * 1440.0
}

/// Offset a calendar time by a fractional number of minutes
pub fn add_minutes(datetime: &DateTime<Utc>, minutes: f64) -> DateTime<Utc> {
    *datetime + Duration::milliseconds((minutes * 60_000.0).round() as i64)
}

/// Greenwich mean sidereal time in radians, IAU-82 model
pub fn gstime(jd_ut1: f64) -> f64 {
    let tut1 = (jd_ut1 - J2000) / 36_525.0;
    let seconds = -6.2e-6 * tut1 * tut1 * tut1
        + 0.093_104 * tut1 * tut1
        + (876_600.0 * 3600.0 + 8_640_184.812_866) * tut1
        + 67_310.548_41;
    // 360 degrees per 86400 seconds of sidereal time
    let mut theta = (seconds * DEG2RAD / 240.0) % TAU;
    if theta < 0.0 {
        theta += TAU;
    }
    theta
}
