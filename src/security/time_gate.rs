//! Time-of-day access window.

use chrono::{NaiveDateTime, NaiveTime};

/// Admits requests whose local time of day lies in `[start, end]`.
///
/// The check is a plain inclusive range comparison, so a window with
/// `start > end` (crossing midnight) admits nothing. Config validation
/// rejects such windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDayGate {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeOfDayGate {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn allows(&self, now: NaiveDateTime) -> bool {
        let time = now.time();
        self.start <= time && time <= self.end
    }

    /// Fixed message returned with the 403.
    pub fn denial_reason(&self) -> String {
        format!(
            "Chat access is only allowed between {} and {}.",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}
