//! Schedule (solution) model.
//!
//! A schedule holds one session per obligation: who teaches it, where,
//! and which contiguous run of periods it occupies. Constraint
//! violations found by the checker are reported separately as
//! [`Violation`] records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

use super::{ObligationId, Weekday};

/// A timetable: one scheduled session per obligation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Scheduled sessions, in obligation order.
    pub sessions: Vec<ScheduledSession>,
}

/// An obligation placed on a teacher, a room and a run of periods.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScheduledSession {
    /// Obligation served by this session.
    pub obligation: ObligationId,
    /// Assigned teacher ID.
    pub teacher_id: String,
    /// Assigned room ID.
    pub room_id: String,
    /// ID of the first timeslot occupied.
    pub timeslot_id: String,
    /// Day of the session (denormalized from the timeslot).
    pub day: Weekday,
    /// Period of the first timeslot within the day.
    pub start_period: usize,
    /// Number of contiguous periods occupied (== course duration).
    pub periods: usize,
}

impl ScheduledSession {
    /// Periods occupied within the day, `[start, start + periods)`.
    #[inline]
    pub fn period_range(&self) -> Range<usize> {
        self.start_period..self.start_period + self.periods
    }

    /// Whether this session occupies a `(day, period)` cell.
    pub fn occupies(&self, day: Weekday, period: usize) -> bool {
        self.day == day && self.period_range().contains(&period)
    }

    /// Whether two sessions share at least one `(day, period)` cell.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.day == other.day
            && self.start_period < other.start_period + other.periods
            && other.start_period < self.start_period + self.periods
    }

    /// Group ID (from the obligation).
    #[inline]
    pub fn group_id(&self) -> &str {
        &self.obligation.group_id
    }

    /// Course ID (from the obligation).
    #[inline]
    pub fn course_id(&self) -> &str {
        &self.obligation.course_id
    }
}

/// A hard-constraint violation found in a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Offending obligation, when the violation concerns one session.
    pub obligation: Option<ObligationId>,
    /// Related entity ID (teacher, room, group, or course).
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
    /// Severity (0-100, higher = worse).
    pub severity: i32,
}

/// Classification of hard-constraint violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationType {
    /// Teacher double-booked.
    TeacherConflict,
    /// Room double-booked.
    RoomConflict,
    /// Group double-booked.
    GroupConflict,
    /// Room type not allowed for the course type.
    RoomTypeMismatch,
    /// Room smaller than the group.
    RoomTooSmall,
    /// Teacher not qualified for the course.
    UnqualifiedTeacher,
    /// Teacher scheduled during an unavailable period.
    TeacherUnavailable,
    /// Session runs past the end of its day or mismatches its timeslot.
    BrokenContiguity,
    /// Session length differs from the course duration.
    DurationMismatch,
    /// An obligation has no session.
    MissingObligation,
    /// An obligation has more than one session, or a session serves no obligation.
    DuplicateObligation,
    /// Two instances of the same weekly course share a day.
    SiblingSameDay,
    /// Session references an entity missing from the model.
    UnknownEntity,
}

impl ViolationType {
    /// Default severity for this violation type.
    pub fn severity(&self) -> i32 {
        match self {
            ViolationType::TeacherConflict
            | ViolationType::RoomConflict
            | ViolationType::GroupConflict => 95,
            ViolationType::MissingObligation
            | ViolationType::DuplicateObligation
            | ViolationType::UnknownEntity => 100,
            ViolationType::UnqualifiedTeacher | ViolationType::TeacherUnavailable => 90,
            ViolationType::BrokenContiguity | ViolationType::DurationMismatch => 90,
            ViolationType::RoomTypeMismatch | ViolationType::RoomTooSmall => 80,
            ViolationType::SiblingSameDay => 70,
        }
    }
}

impl Violation {
    /// Creates a violation with the type's default severity.
    pub fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            obligation: None,
            entity_id: entity_id.into(),
            message: message.into(),
            severity: violation_type.severity(),
        }
    }

    /// Attaches the offending obligation.
    pub fn for_obligation(mut self, obligation: &ObligationId) -> Self {
        self.obligation = Some(obligation.clone());
        self
    }
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a schedule from sessions.
    pub fn from_sessions(sessions: Vec<ScheduledSession>) -> Self {
        Self { sessions }
    }

    /// Adds a session.
    pub fn add_session(&mut self, session: ScheduledSession) {
        self.sessions.push(session);
    }

    /// Number of sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the schedule has no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Finds the session for an obligation.
    pub fn session_for(&self, obligation: &ObligationId) -> Option<&ScheduledSession> {
        self.sessions.iter().find(|s| &s.obligation == obligation)
    }

    /// All sessions of a group.
    pub fn sessions_for_group(&self, group_id: &str) -> Vec<&ScheduledSession> {
        self.sessions
            .iter()
            .filter(|s| s.group_id() == group_id)
            .collect()
    }

    /// All sessions taught by a teacher.
    pub fn sessions_for_teacher(&self, teacher_id: &str) -> Vec<&ScheduledSession> {
        self.sessions
            .iter()
            .filter(|s| s.teacher_id == teacher_id)
            .collect()
    }

    /// All sessions held in a room.
    pub fn sessions_for_room(&self, room_id: &str) -> Vec<&ScheduledSession> {
        self.sessions
            .iter()
            .filter(|s| s.room_id == room_id)
            .collect()
    }

    /// Total weekly periods per teacher (only teachers with sessions).
    pub fn teacher_periods(&self) -> BTreeMap<String, usize> {
        let mut load = BTreeMap::new();
        for s in &self.sessions {
            *load.entry(s.teacher_id.clone()).or_insert(0) += s.periods;
        }
        load
    }

    /// Sessions sorted by obligation, for order-independent comparison.
    pub fn sorted_sessions(&self) -> Vec<ScheduledSession> {
        let mut sorted = self.sessions.clone();
        sorted.sort();
        sorted
    }

    /// Whether two schedules contain the same sessions, ignoring order.
    pub fn same_sessions(&self, other: &Schedule) -> bool {
        self.sorted_sessions() == other.sorted_sessions()
    }
}
