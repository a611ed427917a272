//! Timeslot and weekly time models.
//!
//! # Time Model
//! A timeslot is one teaching period on one weekday. Within a day, slots
//! are ordered by start time; a slot's position in that order is its
//! *period* (0-based). Consecutive periods form the contiguity basis for
//! multi-period sessions, regardless of any break between them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Day of the week.
///
/// Declaration order is calendar order (Monday first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A time-of-day interval [start, end), in minutes from midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Interval start (minutes, inclusive).
    pub start_minute: u16,
    /// Interval end (minutes, exclusive).
    pub end_minute: u16,
}

impl TimeRange {
    /// Creates a new time range.
    pub fn new(start_minute: u16, end_minute: u16) -> Self {
        Self {
            start_minute,
            end_minute,
        }
    }

    /// Creates a range from `(hour, minute)` pairs.
    pub fn from_hm(start: (u16, u16), end: (u16, u16)) -> Self {
        Self::new(start.0 * 60 + start.1, end.0 * 60 + end.1)
    }

    /// Length of the range (minutes).
    #[inline]
    pub fn duration_minutes(&self) -> u16 {
        self.end_minute.saturating_sub(self.start_minute)
    }

    /// Whether the range has positive length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end_minute <= self.start_minute
    }

    /// Whether two ranges overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start_minute < other.end_minute && other.start_minute < self.end_minute
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start_minute / 60,
            self.start_minute % 60,
            self.end_minute / 60,
            self.end_minute % 60
        )
    }
}

/// One teaching period on one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeslot {
    /// Unique timeslot identifier.
    pub id: String,
    /// Day of the week.
    pub day: Weekday,
    /// Time of day.
    pub time: TimeRange,
}

impl Timeslot {
    /// Creates a new timeslot.
    pub fn new(id: impl Into<String>, day: Weekday, time: TimeRange) -> Self {
        Self {
            id: id.into(),
            day,
            time,
        }
    }

    /// Creates a one-hour slot starting at `hour:00`.
    pub fn hourly(id: impl Into<String>, day: Weekday, hour: u16) -> Self {
        Self::new(id, day, TimeRange::from_hm((hour, 0), (hour + 1, 0)))
    }
}

/// A `(day, period)` cell of the weekly grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodRef {
    /// Day of the week.
    pub day: Weekday,
    /// 0-based position of the timeslot within the day.
    pub period: usize,
}

impl PeriodRef {
    /// Creates a new period reference.
    pub fn new(day: Weekday, period: usize) -> Self {
        Self { day, period }
    }
}

impl fmt::Display for PeriodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} P{}", self.day, self.period)
    }
}
