//! Wall-clock readings bucketed by calendar day.

use std::fmt;

use chrono::{DateTime, FixedOffset, Local, NaiveDate};

/// Calendar-day identifier, displayed as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse a `YYYY-MM-DD` string.
    pub fn parse(s: &str) -> Option<Self> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// An observed instant.
///
/// Day comparisons use the local calendar date of the reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePoint(DateTime<FixedOffset>);

impl TimePoint {
    pub fn new(instant: DateTime<FixedOffset>) -> Self {
        Self(instant)
    }

    pub fn day_key(&self) -> DayKey {
        DayKey(self.0.date_naive())
    }

    /// Timestamp prefix used for persisted samples.
    pub fn display(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
    }

    /// Whether `self` falls on a later (or different) calendar day than `previous`.
    pub fn is_day_pass(&self, previous: &TimePoint) -> bool {
        self.day_key() != previous.day_key()
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> TimePoint;
}

/// The process's local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimePoint {
        TimePoint(Local::now().fixed_offset())
    }
}
