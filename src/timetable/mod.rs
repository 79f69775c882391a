//! The learned weekly timetable.
//!
//! A sorted `Vec<Slot>` rather than a tree or hash map: the table holds at
//! most a few hundred entries at weekly granularity, so a contiguous
//! buffer with linear insertion-sort avoids allocator churn on an MCU
//! while staying trivial to reason about. Persistence is `serde_json`
//! plus an atomic write-then-rename.

use crate::time_util::{Clock, LocalTime};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;

/// A learned weekly demand slot. `second` is always 0 but is kept as an
/// explicit field so the on-disk 5-tuple matches
/// `(weekday, hour, minute, second, count)` literally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub count: u32,
}

impl Slot {
    fn key(&self) -> (u8, u8, u8, u8) {
        (self.weekday, self.hour, self.minute, self.second)
    }

    /// Seconds-since-Monday-midnight base used for total ordering and for
    /// `next_alarm_delay`'s wraparound arithmetic.
    fn base_offset(&self) -> i64 {
        self.weekday as i64 * 86400 + self.hour as i64 * 3600 + self.minute as i64 * 60 + self.second as i64
    }
}

const SECONDS_PER_WEEK: i64 = 7 * 86400;

/// A serialisable snapshot of the timetable file. The JSON encoding here
/// is textual but we still carry a version so the format can evolve.
#[derive(Serialize, Deserialize)]
struct TimetableFile {
    version: u32,
    slots: Vec<Slot>,
}

const FILE_VERSION: u32 = 1;

pub struct Timetable {
    slots: Vec<Slot>,
    slot_size_min: u8,
}

impl Timetable {
    pub fn new(slot_size_min: u8) -> Self {
        assert!(
            slot_size_min > 0 && 60 % slot_size_min == 0,
            "slot_size_min must divide 60"
        );
        Timetable {
            slots: Vec::new(),
            slot_size_min,
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn quantize(&self, lt: LocalTime) -> (u8, u8, u8, u8) {
        let minute = (lt.minute / self.slot_size_min) * self.slot_size_min;
        (lt.weekday, lt.hour, minute, 0)
    }

    /// Commits a demand observation at wall-time `t`. Returns `true` if
    /// this was the first slot ever recorded (a fresh timetable had
    /// nothing to schedule against before).
    pub fn record(&mut self, clock: &dyn Clock, t: i64, increase: bool) -> bool {
        let was_empty = self.slots.is_empty();
        let (weekday, hour, minute, second) = self.quantize(clock.localtime(t));

        match self
            .slots
            .binary_search_by(|s| s.key().cmp(&(weekday, hour, minute, second)))
        {
            Ok(idx) => {
                if increase {
                    self.slots[idx].count += 1;
                } else if self.slots[idx].count > 1 {
                    self.slots[idx].count -= 1;
                } else {
                    self.slots.remove(idx);
                }
            }
            Err(idx) => {
                if increase {
                    self.slots.insert(
                        idx,
                        Slot {
                            weekday,
                            hour,
                            minute,
                            second,
                            count: 1,
                        },
                    );
                }
                // A decrement against a slot that doesn't exist has nothing
                // to remove; this can legitimately happen if a scheduled
                // run's target slot was already cleared (e.g. by a manual
                // backup-button flush racing a rearm).
            }
        }

        was_empty && !self.slots.is_empty()
    }

    /// Seconds from `t` to the start of the next upcoming slot, wrapping
    /// across the week boundary.
    pub fn next_alarm_delay(&self, clock: &dyn Clock, t: i64) -> Option<i64> {
        if self.slots.is_empty() {
            return None;
        }
        let now_lt = clock.localtime(t);
        let now_base = now_lt.weekday as i64 * 86400
            + now_lt.hour as i64 * 3600
            + now_lt.minute as i64 * 60
            + now_lt.second as i64;

        self.slots
            .iter()
            .map(|slot| {
                let slot_base = slot.base_offset();
                if slot_base <= now_base {
                    slot_base + SECONDS_PER_WEEK - now_base
                } else {
                    slot_base - now_base
                }
            })
            .min()
    }

    /// Writes the timetable to `path`. Returns `false` without touching
    /// the medium if the table is empty.
    pub fn persist(&self, path: impl AsRef<Path>) -> bool {
        if self.slots.is_empty() {
            return false;
        }
        let path = path.as_ref();
        let file = TimetableFile {
            version: FILE_VERSION,
            slots: self.slots.clone(),
        };
        let json = match serde_json::to_string_pretty(&file) {
            Ok(j) => j,
            Err(e) => {
                error!("Failed to serialise timetable: {}", e);
                return false;
            }
        };

        let tmp_path = path.with_extension("tmp");
        if let Err(e) = fs::write(&tmp_path, json) {
            error!("Failed to write timetable tmp file {:?}: {}", tmp_path, e);
            return false;
        }
        if let Err(e) = fs::rename(&tmp_path, path) {
            error!(
                "Failed to atomically swap timetable file {:?} -> {:?}: {}",
                tmp_path, path, e
            );
            return false;
        }
        true
    }

    /// Loads a timetable from `path`. A missing file is a benign empty
    /// table; other read/parse failures are logged and also treated as
    /// empty rather than aborting startup.
    pub fn load(path: impl AsRef<Path>, slot_size_min: u8) -> Self {
        let path = path.as_ref();
        let mut table = Timetable::new(slot_size_min);
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return table;
            }
            Err(e) => {
                warn!("Failed to read timetable file {:?}: {}", path, e);
                return table;
            }
        };

        match serde_json::from_str::<TimetableFile>(&contents) {
            Ok(mut file) => {
                file.slots.sort_by(|a, b| cmp_slots(a, b));
                table.slots = file.slots;
            }
            Err(e) => {
                warn!("Failed to deserialise timetable file {:?}: {}", path, e);
            }
        }
        table
    }
}

fn cmp_slots(a: &Slot, b: &Slot) -> Ordering {
    a.key().cmp(&b.key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_util::DummyClock;
    use crate::time_util::test_utils::utc_epoch_secs;

    fn mon_0730() -> i64 {
        // 1970-01-05 is a Monday.
        utc_epoch_secs(1970, 1, 5, 7, 30, 5)
    }

    #[test]
    fn record_creates_first_slot_and_reports_first_flag() {
        let clock = DummyClock::new(0);
        let mut table = Timetable::new(15);
        let first = table.record(&clock, mon_0730(), true);
        assert!(first);
        assert_eq!(table.slots().len(), 1);
        let slot = table.slots()[0];
        assert_eq!((slot.weekday, slot.hour, slot.minute, slot.second, slot.count), (0, 7, 30, 0, 1));
    }

    #[test]
    fn record_same_slot_increments_not_duplicates() {
        let clock = DummyClock::new(0);
        let mut table = Timetable::new(15);
        table.record(&clock, mon_0730(), true);
        let second_time = mon_0730() + 20; // still within Mon 7:30 slot
        let first = table.record(&clock, second_time, true);
        assert!(!first);
        assert_eq!(table.slots().len(), 1);
        assert_eq!(table.slots()[0].count, 2);
    }

    #[test]
    fn boundary_is_low_inclusive_high_exclusive() {
        let clock = DummyClock::new(0);
        let mut table = Timetable::new(15);
        let low_edge = utc_epoch_secs(1970, 1, 5, 7, 30, 0);
        table.record(&clock, low_edge, true);
        assert_eq!(table.slots()[0].minute, 30);

        let mut table2 = Timetable::new(15);
        let high_edge = utc_epoch_secs(1970, 1, 5, 7, 45, 0);
        table2.record(&clock, high_edge, true);
        assert_eq!(table2.slots()[0].minute, 45, "7:45:00 belongs to the next slot");
    }

    #[test]
    fn decrement_to_zero_removes_slot() {
        let clock = DummyClock::new(0);
        let mut table = Timetable::new(15);
        table.record(&clock, mon_0730(), true);
        table.record(&clock, mon_0730(), false);
        assert!(table.is_empty());
    }

    #[test]
    fn second_slot_inserted_in_sorted_order() {
        let clock = DummyClock::new(0);
        let mut table = Timetable::new(15);
        table.record(&clock, mon_0730(), true);
        let later = utc_epoch_secs(1970, 1, 5, 7, 45, 10);
        table.record(&clock, later, true);
        assert_eq!(table.slots().len(), 2);
        assert!(table.slots()[0].minute < table.slots()[1].minute);
    }

    #[test]
    fn next_alarm_delay_none_when_empty() {
        let clock = DummyClock::new(0);
        let table = Timetable::new(15);
        assert_eq!(table.next_alarm_delay(&clock, mon_0730()), None);
    }

    #[test]
    fn next_alarm_delay_before_slot_start() {
        let clock = DummyClock::new(0);
        let mut table = Timetable::new(15);
        table.record(&clock, mon_0730(), true); // slot quantizes to Mon 07:30:00
        let now = utc_epoch_secs(1970, 1, 5, 7, 29, 0); // one minute before
        let delay = table.next_alarm_delay(&clock, now).unwrap();
        assert_eq!(delay, 60);
    }

    #[test]
    fn next_alarm_delay_wraps_when_now_is_past_slot() {
        let clock = DummyClock::new(0);
        let mut table = Timetable::new(15);
        table.record(&clock, mon_0730(), true); // slot quantizes to Mon 07:30:00
        let now = utc_epoch_secs(1970, 1, 5, 7, 30, 10); // 10s after the slot start
        let delay = table.next_alarm_delay(&clock, now).unwrap();
        assert_eq!(delay, SECONDS_PER_WEEK - 10);
        assert!(delay > 0 && delay <= SECONDS_PER_WEEK);
    }

    #[test]
    fn persist_then_load_round_trips() {
        let clock = DummyClock::new(0);
        let mut table = Timetable::new(15);
        table.record(&clock, mon_0730(), true);
        table.record(&clock, utc_epoch_secs(1970, 1, 5, 7, 45, 0), true);

        let dir = std::env::temp_dir().join(format!("wwpumpe-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("timetable");

        assert!(table.persist(&path));
        let loaded = Timetable::load(&path, 15);
        assert_eq!(loaded.slots(), table.slots());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn persist_empty_table_is_noop() {
        let table = Timetable::new(15);
        let dir = std::env::temp_dir().join(format!("wwpumpe-test-empty-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("timetable");
        assert!(!table.persist(&path));
        assert!(!path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_missing_file_is_benign_empty() {
        let table = Timetable::load("/nonexistent/path/to/timetable-xyz", 15);
        assert!(table.is_empty());
    }
}
