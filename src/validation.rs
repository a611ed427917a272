//! Input validation for timetabling problems.
//!
//! Two layers report through the same [`ValidationError`] type:
//!
//! - **Entity checks** ([`validate_entities`]), run by
//!   [`EntityModel::new`](crate::models::EntityModel::new): duplicate IDs,
//!   unknown or repeated course references, invalid durations, malformed
//!   timeslots.
//! - **Supply checks**, run by the constraint builder before any search:
//!   obligations with no qualified teacher, no compatible room, or no day
//!   long enough for their duration. These carry the offending obligation.
//!
//! All issues are collected rather than stopping at the first one.

use std::collections::{HashMap, HashSet};
use std::fmt;

use thiserror::Error;

use crate::models::{Course, Group, ObligationId, Room, Teacher, Timeslot};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Offending obligation, for supply checks.
    pub obligation: Option<ObligationId>,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    /// Two entities of the same collection share an ID.
    DuplicateId,
    /// A teacher or group references a course that doesn't exist.
    UnknownCourse,
    /// A teacher or group lists the same course more than once.
    DuplicateCourseReference,
    /// A course duration is outside 1..=2 periods.
    InvalidDuration,
    /// A timeslot ends at or before its start.
    EmptyTimeRange,
    /// Two timeslots on one day start at the same time.
    DuplicateStartTime,
    /// A teacher is marked unavailable on a period the day doesn't have.
    UnknownPeriod,
    /// No teacher is qualified for an obligation's course.
    NoQualifiedTeacher,
    /// No room satisfies an obligation's room-type policy and group size.
    NoCompatibleRoom,
    /// No day has enough contiguous periods for an obligation's duration.
    NoContiguousPeriods,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            obligation: None,
        }
    }

    pub(crate) fn for_obligation(
        kind: ValidationErrorKind,
        obligation: &ObligationId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            obligation: Some(obligation.clone()),
        }
    }
}

/// Maximum contiguous periods a course may span.
pub const MAX_DURATION: usize = 2;

/// Validates the five entity collections.
///
/// Checks:
/// 1. No duplicate IDs within courses, teachers, rooms, timeslots, groups
/// 2. Course durations are 1..=[`MAX_DURATION`]
/// 3. Teacher qualifications and group requirements reference known
///    courses, each at most once
/// 4. Timeslots have positive length and distinct start times per day
/// 5. Teacher unavailability cells exist on days that have timeslots
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_entities(
    courses: &[Course],
    teachers: &[Teacher],
    rooms: &[Room],
    timeslots: &[Timeslot],
    groups: &[Group],
) -> ValidationResult {
    let mut errors = Vec::new();

    let course_ids = collect_ids(courses.iter().map(|c| c.id.as_str()), "course", &mut errors);
    collect_ids(teachers.iter().map(|t| t.id.as_str()), "teacher", &mut errors);
    collect_ids(rooms.iter().map(|r| r.id.as_str()), "room", &mut errors);
    collect_ids(timeslots.iter().map(|t| t.id.as_str()), "timeslot", &mut errors);
    collect_ids(groups.iter().map(|g| g.id.as_str()), "group", &mut errors);

    for course in courses {
        if course.duration == 0 || course.duration > MAX_DURATION {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidDuration,
                format!(
                    "Course '{}' has duration {} (expected 1..={MAX_DURATION})",
                    course.id, course.duration
                ),
            ));
        }
    }

    for teacher in teachers {
        let mut listed = HashSet::new();
        for course_id in &teacher.courses {
            if !listed.insert(course_id.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DuplicateCourseReference,
                    format!("Teacher '{}' lists course '{course_id}' twice", teacher.id),
                ));
            }
            if !course_ids.contains(course_id.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownCourse,
                    format!(
                        "Teacher '{}' is qualified for unknown course '{course_id}'",
                        teacher.id
                    ),
                ));
            }
        }
    }

    for group in groups {
        let mut listed = HashSet::new();
        for course_id in &group.courses {
            if !listed.insert(course_id.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DuplicateCourseReference,
                    format!("Group '{}' requires course '{course_id}' twice", group.id),
                ));
            }
            if !course_ids.contains(course_id.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownCourse,
                    format!("Group '{}' requires unknown course '{course_id}'", group.id),
                ));
            }
        }
    }

    // Per-day slot counts and start-time uniqueness
    let mut periods_per_day = HashMap::new();
    let mut starts = HashSet::new();
    for slot in timeslots {
        if slot.time.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyTimeRange,
                format!("Timeslot '{}' has empty time range {}", slot.id, slot.time),
            ));
        }
        if !starts.insert((slot.day, slot.time.start_minute)) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateStartTime,
                format!(
                    "Timeslot '{}' starts at the same time as another {} slot",
                    slot.id, slot.day
                ),
            ));
        }
        *periods_per_day.entry(slot.day).or_insert(0usize) += 1;
    }

    for teacher in teachers {
        for cell in &teacher.unavailable {
            if let Some(&count) = periods_per_day.get(&cell.day) {
                if cell.period >= count {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::UnknownPeriod,
                        format!(
                            "Teacher '{}' is unavailable on {cell}, but {} has {count} periods",
                            teacher.id, cell.day
                        ),
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn collect_ids<'a>(
    ids: impl Iterator<Item = &'a str>,
    what: &str,
    errors: &mut Vec<ValidationError>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate {what} ID: {id}"),
            ));
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TimeRange, Weekday};

    fn sample_courses() -> Vec<Course> {
        vec![Course::theory("C1"), Course::lab("C2").with_duration(2)]
    }

    fn sample_timeslots() -> Vec<Timeslot> {
        vec![
            Timeslot::hourly("MON1", Weekday::Monday, 9),
            Timeslot::hourly("MON2", Weekday::Monday, 10),
        ]
    }

    fn run(
        courses: &[Course],
        teachers: &[Teacher],
        rooms: &[Room],
        timeslots: &[Timeslot],
        groups: &[Group],
    ) -> Vec<ValidationError> {
        validate_entities(courses, teachers, rooms, timeslots, groups)
            .err()
            .unwrap_or_default()
    }

    #[test]
    fn test_valid_input() {
        let teachers = vec![Teacher::new("T1").with_course("C1").with_course("C2")];
        let rooms = vec![Room::classroom("R1", 40)];
        let groups = vec![Group::new("G1").with_course("C1")];
        assert!(validate_entities(
            &sample_courses(),
            &teachers,
            &rooms,
            &sample_timeslots(),
            &groups
        )
        .is_ok());
    }

    #[test]
    fn test_duplicate_ids() {
        let courses = vec![Course::theory("C1"), Course::theory("C1")];
        let rooms = vec![Room::classroom("R1", 40), Room::lab("R1", 20)];
        let errors = run(&courses, &[], &rooms, &sample_timeslots(), &[]);
        let dups: Vec<_> = errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::DuplicateId)
            .collect();
        assert_eq!(dups.len(), 2);
        assert!(dups.iter().any(|e| e.message.contains("room")));
    }

    #[test]
    fn test_invalid_duration() {
        let courses = vec![Course::theory("C0").with_duration(0), Course::theory("C3").with_duration(3)];
        let errors = run(&courses, &[], &[], &sample_timeslots(), &[]);
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.kind == ValidationErrorKind::InvalidDuration)
                .count(),
            2
        );
    }

    #[test]
    fn test_unknown_course_references() {
        let teachers = vec![Teacher::new("T1").with_course("NOPE")];
        let groups = vec![Group::new("G1").with_course("ALSO_NOPE")];
        let errors = run(&sample_courses(), &teachers, &[], &sample_timeslots(), &groups);
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.kind == ValidationErrorKind::UnknownCourse)
                .count(),
            2
        );
    }

    #[test]
    fn test_repeated_course_references() {
        let teachers = vec![Teacher::new("T1").with_course("C1").with_course("C1")];
        let groups = vec![Group::new("G1")
            .with_course("C1")
            .with_course("C2")
            .with_course("C1")];
        let errors = run(&sample_courses(), &teachers, &[], &sample_timeslots(), &groups);
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| e.kind == ValidationErrorKind::DuplicateCourseReference));
        assert!(errors.iter().any(|e| e.message.contains("Group 'G1'")));
    }

    #[test]
    fn test_malformed_timeslots() {
        let timeslots = vec![
            Timeslot::new("A", Weekday::Monday, TimeRange::new(540, 540)),
            Timeslot::new("B", Weekday::Monday, TimeRange::new(540, 600)),
        ];
        let errors = run(&sample_courses(), &[], &[], &timeslots, &[]);
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::EmptyTimeRange));
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateStartTime));
    }

    #[test]
    fn test_unknown_period() {
        let teachers = vec![Teacher::new("T1")
            .with_unavailable(Weekday::Monday, 5)
            .with_unavailable(Weekday::Sunday, 0)]; // No Sunday slots: ignored
        let errors = run(&sample_courses(), &teachers, &[], &sample_timeslots(), &[]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::UnknownPeriod);
    }

    #[test]
    fn test_error_display() {
        let e = ValidationError::for_obligation(
            ValidationErrorKind::NoCompatibleRoom,
            &ObligationId::new("G1", "C2", 1),
            "no lab rooms",
        );
        assert_eq!(e.to_string(), "NoCompatibleRoom: no lab rooms");
        assert_eq!(e.obligation.as_ref().unwrap().course_id, "C2");
    }
}
