//! Wall-clock source: monotonic-under-normal-operation seconds since the
//! epoch, plus localtime decomposition into weekday/hour/minute/second.
//!
//! A trait with a real implementation backed by the system clock and a
//! dummy implementation that a test can drive forward by hand.

pub mod test_utils;

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};

/// A decomposed local timestamp, truncated to second resolution.
///
/// `weekday` is 0 = Monday .. 6 = Sunday, i.e.
/// `chrono::Weekday::num_days_from_monday`, spelled out here since the
/// rest of this crate addresses weekdays as plain `u8`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

pub trait Clock {
    /// Seconds since the Unix epoch. Monotone under normal operation; may
    /// jump backwards if the RTC is set back.
    fn now(&self) -> i64;

    /// Decompose a wall-clock timestamp into local weekday/hour/minute/second.
    fn localtime(&self, epoch_secs: i64) -> LocalTime;
}

#[derive(Default)]
pub struct RealClock {}

impl Clock for RealClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }

    fn localtime(&self, epoch_secs: i64) -> LocalTime {
        decompose(Local.timestamp_opt(epoch_secs, 0).single().unwrap_or_else(|| {
            // Ambiguous/non-existent local time around a DST transition; UTC
            // never has this problem, so fall back to it rather than panic.
            DateTime::<Utc>::from_timestamp(epoch_secs, 0)
                .unwrap_or_default()
                .with_timezone(&Local)
        }))
    }
}

fn decompose<Tz: chrono::TimeZone>(dt: DateTime<Tz>) -> LocalTime {
    LocalTime {
        weekday: dt.weekday().num_days_from_monday() as u8,
        hour: dt.hour() as u8,
        minute: dt.minute() as u8,
        second: dt.second() as u8,
    }
}

/// A clock a test can set and advance by hand: `set`/`advance` ergonomics,
/// always reachable from a plain `i64` rather than requiring a `DateTime`
/// at every call site.
#[derive(Debug, Clone)]
pub struct DummyClock {
    epoch_secs: i64,
}

impl DummyClock {
    pub fn new(epoch_secs: i64) -> Self {
        Self { epoch_secs }
    }

    pub fn set(&mut self, epoch_secs: i64) {
        self.epoch_secs = epoch_secs;
    }

    pub fn advance(&mut self, secs: i64) {
        self.epoch_secs += secs;
    }
}

impl Clock for DummyClock {
    fn now(&self) -> i64 {
        self.epoch_secs
    }

    fn localtime(&self, epoch_secs: i64) -> LocalTime {
        let dt = DateTime::<Utc>::from_timestamp(epoch_secs, 0).unwrap_or_default();
        decompose(dt)
    }
}
