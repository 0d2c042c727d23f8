//! Day rollover detection for archival.

use crate::pipeline::clock::{DayKey, TimePoint};

/// Fires once per calendar-day transition with the day that just ended.
///
/// Besides the previous cycle's reading, the trigger remembers the day of the
/// last sample it was shown. A day that flips during a cycle without a sample
/// (a 429, a transport fault) is still archived on the next sample.
#[derive(Debug, Clone, Default)]
pub struct ArchivalTrigger {
    open_day: Option<DayKey>,
    last_fired: Option<DayKey>,
}

impl ArchivalTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare the current sample's reading with the previous one.
    ///
    /// Returns the ended day's key when the day changed and that day has not
    /// been handed out before. The very first sample of the process, with no
    /// previous reading, never fires.
    pub fn check(&mut self, current: &TimePoint, previous: Option<&TimePoint>) -> Option<DayKey> {
        let today = current.day_key();
        let ended = self.open_day.or_else(|| previous.map(TimePoint::day_key));
        self.open_day = Some(today);

        let ended = ended.filter(|day| *day != today)?;
        if self.last_fired == Some(ended) {
            return None;
        }
        self.last_fired = Some(ended);
        Some(ended)
    }

    /// Day of the most recent sample.
    pub fn open_day(&self) -> Option<DayKey> {
        self.open_day
    }

    pub fn last_fired(&self) -> Option<DayKey> {
        self.last_fired
    }
}
