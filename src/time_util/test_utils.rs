//! Small helpers for building epoch-second timestamps in tests without
//! reaching for `chrono` at every call site.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

/// Seconds since the epoch for a given UTC date/time. Monday-anchored
/// dates are the easiest to reason about against the weekday convention
/// (0 = Monday); 1970-01-05 is the first Monday after the epoch.
pub fn utc_epoch_secs(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> i64 {
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| panic!("invalid date {year:04}-{month:02}-{day:02}"));
    let time = NaiveTime::from_hms_opt(hour, minute, second)
        .unwrap_or_else(|| panic!("invalid time {hour:02}:{minute:02}:{second:02}"));
    Utc.from_utc_datetime(&date.and_time(time)).timestamp()
}

/// `epoch_secs` for the Monday that anchors slot-base arithmetic:
/// 1970-01-05T00:00:00Z.
pub fn monday_anchor_secs() -> i64 {
    utc_epoch_secs(1970, 1, 5, 0, 0, 0)
}
