//! Utility functions for streak-core
//!
//! Local wall-clock parsing and the millisecond encoding used for stored
//! entry timestamps.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Error, Result};

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a user-supplied instant into local wall-clock time
///
/// Accepts a bare date (midnight), naive date-times with `T` or a space, and
/// RFC 3339 timestamps, which are converted to the local timezone.
pub fn parse_local_datetime(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Local).naive_local());
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(Default::default()));
    }

    Err(Error::validation(format!(
        "Invalid date/time: {}. Use YYYY-MM-DD[THH:MM[:SS[.fff]]] or RFC 3339",
        s
    )))
}

/// Current local wall-clock time, millisecond precision
pub fn local_now() -> NaiveDateTime {
    truncate_to_millis(Local::now().naive_local())
}

/// Drop sub-millisecond precision
pub fn truncate_to_millis(dt: NaiveDateTime) -> NaiveDateTime {
    dt - Duration::nanoseconds(i64::from(dt.nanosecond() % 1_000_000))
}

/// Encode a wall-clock instant as milliseconds for storage
pub fn to_millis(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp_millis()
}

/// Decode a stored millisecond value
pub fn from_millis(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}
