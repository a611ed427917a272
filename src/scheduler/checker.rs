//! Hard-constraint checker.
//!
//! Validates a finished schedule against the entity model independently
//! of how it was produced. Used as the final guard of the pipeline and as
//! the verdict source for KPI classification.
//!
//! # Checks
//!
//! | Check | Violation |
//! |-------|-----------|
//! | Session references known entities | `UnknownEntity` |
//! | Timeslot matches day/start, run fits the day | `BrokenContiguity` |
//! | Length equals the course duration | `DurationMismatch` |
//! | Teacher qualified | `UnqualifiedTeacher` |
//! | Teacher available on every period | `TeacherUnavailable` |
//! | Room type allowed, room seats the group | `RoomTypeMismatch`, `RoomTooSmall` |
//! | Every obligation exactly once | `MissingObligation`, `DuplicateObligation` |
//! | No teacher / room / group double-booking | `*Conflict` |
//! | Sibling instances on distinct days | `SiblingSameDay` |
//!
//! Pairwise violations are attributed to the later session of the pair.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;

use crate::config::TimetableConfig;
use crate::models::{
    EntityModel, ObligationId, Schedule, ScheduledSession, Violation, ViolationType,
};

/// Checks a schedule and returns every violation found.
///
/// An empty result means the schedule is feasible for `model` under the
/// room policy and session frequency of `config`.
pub fn check_schedule(
    model: &EntityModel,
    schedule: &Schedule,
    config: &TimetableConfig,
) -> Vec<Violation> {
    let mut violations: Vec<Violation> = schedule
        .sessions
        .iter()
        .flat_map(|s| check_session(model, s, config))
        .collect();

    violations.extend(check_coverage(model, schedule, config));

    let sessions = &schedule.sessions;
    let pairwise: Vec<Violation> = (0..sessions.len())
        .into_par_iter()
        .flat_map_iter(|j| {
            (0..j).flat_map(move |i| check_pair(&sessions[i], &sessions[j]))
        })
        .collect();
    violations.extend(pairwise);
    violations
}

/// Per-session verdict: `true` when no violation names the session.
pub fn session_validity(schedule: &Schedule, violations: &[Violation]) -> Vec<bool> {
    let flagged: BTreeSet<&ObligationId> = violations
        .iter()
        .filter_map(|v| v.obligation.as_ref())
        .collect();
    schedule
        .sessions
        .iter()
        .map(|s| !flagged.contains(&s.obligation))
        .collect()
}

fn check_session(
    model: &EntityModel,
    session: &ScheduledSession,
    config: &TimetableConfig,
) -> Vec<Violation> {
    let id = &session.obligation;
    let mut out = Vec::new();
    let flag = |out: &mut Vec<Violation>, kind: ViolationType, entity: &str, message: String| {
        out.push(Violation::new(kind, entity, message).for_obligation(id));
    };

    let course = model.course(session.course_id());
    let teacher = model.teacher(&session.teacher_id);
    let room = model.room(&session.room_id);
    let group = model.group(session.group_id());
    let slot = model.locate(&session.timeslot_id);
    let day = model.day_index(session.day);

    let (Some(course), Some(teacher), Some(room), Some(group), Some(slot), Some(day)) =
        (course, teacher, room, group, slot, day)
    else {
        flag(
            &mut out,
            ViolationType::UnknownEntity,
            &id.to_string(),
            format!(
                "Session {id} references an unknown course, teacher, room, group, timeslot or day"
            ),
        );
        return out;
    };

    if slot != (day, session.start_period) {
        flag(
            &mut out,
            ViolationType::BrokenContiguity,
            &session.timeslot_id,
            format!(
                "Session {id}: timeslot '{}' is not period {} of {}",
                session.timeslot_id, session.start_period, session.day
            ),
        );
    }
    if session.start_period + session.periods > model.periods_in_day(day) {
        flag(
            &mut out,
            ViolationType::BrokenContiguity,
            &session.timeslot_id,
            format!("Session {id} runs past the end of {}", session.day),
        );
    }
    if session.periods != course.duration {
        flag(
            &mut out,
            ViolationType::DurationMismatch,
            &course.id,
            format!(
                "Session {id} spans {} period(s), course '{}' needs {}",
                session.periods, course.id, course.duration
            ),
        );
    }
    if !teacher.can_teach(&course.id) {
        flag(
            &mut out,
            ViolationType::UnqualifiedTeacher,
            &teacher.id,
            format!("Teacher '{}' is not qualified for '{}'", teacher.id, course.id),
        );
    }
    if let Some(p) = session
        .period_range()
        .find(|&p| !teacher.is_available(session.day, p))
    {
        flag(
            &mut out,
            ViolationType::TeacherUnavailable,
            &teacher.id,
            format!("Teacher '{}' is unavailable on {} P{p}", teacher.id, session.day),
        );
    }
    if !config.room_policy.allows(course.course_type, room.room_type) {
        flag(
            &mut out,
            ViolationType::RoomTypeMismatch,
            &room.id,
            format!(
                "Room '{}' ({}) cannot host {} course '{}'",
                room.id, room.room_type, course.course_type, course.id
            ),
        );
    }
    if let Some(size) = group.size.filter(|&size| size > room.capacity) {
        flag(
            &mut out,
            ViolationType::RoomTooSmall,
            &room.id,
            format!(
                "Room '{}' seats {}, group '{}' has {size}",
                room.id, room.capacity, group.id
            ),
        );
    }
    out
}

fn check_coverage(
    model: &EntityModel,
    schedule: &Schedule,
    config: &TimetableConfig,
) -> Vec<Violation> {
    let expected: BTreeSet<ObligationId> = model
        .obligations(&config.frequency)
        .into_iter()
        .map(|o| o.id)
        .collect();

    let mut seen: BTreeMap<&ObligationId, usize> = BTreeMap::new();
    for s in &schedule.sessions {
        *seen.entry(&s.obligation).or_insert(0) += 1;
    }

    let mut out = Vec::new();
    for (&id, &count) in &seen {
        if !expected.contains(id) {
            out.push(
                Violation::new(
                    ViolationType::DuplicateObligation,
                    id.to_string(),
                    format!("Session {id} serves no obligation of the model"),
                )
                .for_obligation(id),
            );
        } else if count > 1 {
            out.push(
                Violation::new(
                    ViolationType::DuplicateObligation,
                    id.to_string(),
                    format!("Obligation {id} is scheduled {count} times"),
                )
                .for_obligation(id),
            );
        }
    }
    for id in expected.iter().filter(|id| !seen.contains_key(id)) {
        out.push(Violation::new(
            ViolationType::MissingObligation,
            id.to_string(),
            format!("Obligation {id} has no session"),
        ));
    }
    out
}

fn check_pair(a: &ScheduledSession, b: &ScheduledSession) -> Vec<Violation> {
    let mut out = Vec::new();
    if a.overlaps(b) {
        let clashes = [
            (a.teacher_id == b.teacher_id, ViolationType::TeacherConflict, &b.teacher_id, "Teacher"),
            (a.room_id == b.room_id, ViolationType::RoomConflict, &b.room_id, "Room"),
            (
                a.group_id() == b.group_id(),
                ViolationType::GroupConflict,
                &b.obligation.group_id,
                "Group",
            ),
        ];
        for (clash, kind, entity, what) in clashes {
            if clash {
                out.push(
                    Violation::new(
                        kind,
                        entity.as_str(),
                        format!(
                            "{what} '{entity}' double-booked on {}: {} and {}",
                            b.day, a.obligation, b.obligation
                        ),
                    )
                    .for_obligation(&b.obligation),
                );
            }
        }
    }
    if a.day == b.day
        && a.group_id() == b.group_id()
        && a.course_id() == b.course_id()
        && a.obligation.instance != b.obligation.instance
    {
        out.push(
            Violation::new(
                ViolationType::SiblingSameDay,
                b.course_id(),
                format!(
                    "{} and {} are on the same day ({})",
                    a.obligation, b.obligation, b.day
                ),
            )
            .for_obligation(&b.obligation),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Course, Group, Room, SessionFrequency, Teacher, Timeslot, Weekday};

    fn model() -> EntityModel {
        EntityModel::new(
            vec![Course::theory("C1"), Course::lab("C2").with_duration(2)],
            vec![
                Teacher::new("T1").with_course("C1").with_unavailable(Weekday::Monday, 3),
                Teacher::new("T2").with_course("C2"),
            ],
            vec![Room::classroom("R1", 40), Room::lab("L1", 20)],
            (0..4)
                .map(|i| Timeslot::hourly(format!("MON{i}"), Weekday::Monday, 9 + i))
                .collect(),
            vec![Group::new("G1").with_course("C1").with_course("C2")],
        )
        .unwrap()
    }

    fn session(course: &str, teacher: &str, room: &str, start: usize, periods: usize) -> ScheduledSession {
        ScheduledSession {
            obligation: ObligationId::new("G1", course, 1),
            teacher_id: teacher.into(),
            room_id: room.into(),
            timeslot_id: format!("MON{start}"),
            day: Weekday::Monday,
            start_period: start,
            periods,
        }
    }

    fn kinds(violations: &[Violation]) -> Vec<ViolationType> {
        violations.iter().map(|v| v.violation_type).collect()
    }

    #[test]
    fn test_valid_schedule() {
        let schedule = Schedule::from_sessions(vec![
            session("C1", "T1", "R1", 0, 1),
            session("C2", "T2", "L1", 1, 2),
        ]);
        let violations = check_schedule(&model(), &schedule, &TimetableConfig::default());
        assert!(violations.is_empty(), "{violations:?}");
        assert_eq!(session_validity(&schedule, &violations), vec![true, true]);
    }

    #[test]
    fn test_group_conflict() {
        let schedule = Schedule::from_sessions(vec![
            session("C1", "T1", "R1", 1, 1),
            session("C2", "T2", "L1", 0, 2),
        ]);
        let violations = check_schedule(&model(), &schedule, &TimetableConfig::default());
        assert_eq!(kinds(&violations), vec![ViolationType::GroupConflict]);
        assert_eq!(violations[0].obligation, Some(ObligationId::new("G1", "C2", 1)));
        assert_eq!(session_validity(&schedule, &violations), vec![true, false]);
    }

    #[test]
    fn test_resource_conflicts() {
        let model = EntityModel::new(
            vec![Course::theory("C1")],
            vec![Teacher::new("T1").with_course("C1")],
            vec![Room::classroom("R1", 40)],
            vec![Timeslot::hourly("MON0", Weekday::Monday, 9)],
            vec![Group::new("G1").with_course("C1"), Group::new("G2").with_course("C1")],
        )
        .unwrap();
        let mut second = session("C1", "T1", "R1", 0, 1);
        second.obligation.group_id = "G2".into();
        let schedule = Schedule::from_sessions(vec![session("C1", "T1", "R1", 0, 1), second]);
        let violations = check_schedule(&model, &schedule, &TimetableConfig::default());
        assert_eq!(
            kinds(&violations),
            vec![ViolationType::TeacherConflict, ViolationType::RoomConflict]
        );
    }

    #[test]
    fn test_session_level_checks() {
        let schedule = Schedule::from_sessions(vec![
            // T1 unavailable at P3; wrong teacher for nothing else
            session("C1", "T1", "R1", 3, 1),
            // Lab in a classroom, unqualified teacher, wrong length
            session("C2", "T1", "R1", 0, 1),
        ]);
        let violations = check_schedule(&model(), &schedule, &TimetableConfig::default());
        let found = kinds(&violations);
        assert!(found.contains(&ViolationType::TeacherUnavailable));
        assert!(found.contains(&ViolationType::UnqualifiedTeacher));
        assert!(found.contains(&ViolationType::RoomTypeMismatch));
        assert!(found.contains(&ViolationType::DurationMismatch));
    }

    #[test]
    fn test_contiguity() {
        let mut misplaced = session("C2", "T2", "L1", 3, 2);
        let schedule = Schedule::from_sessions(vec![session("C1", "T1", "R1", 0, 1), misplaced.clone()]);
        let violations = check_schedule(&model(), &schedule, &TimetableConfig::default());
        assert_eq!(kinds(&violations), vec![ViolationType::BrokenContiguity]);

        misplaced.start_period = 2;
        misplaced.timeslot_id = "MON1".into();
        let schedule = Schedule::from_sessions(vec![session("C1", "T1", "R1", 0, 1), misplaced]);
        let violations = check_schedule(&model(), &schedule, &TimetableConfig::default());
        assert_eq!(kinds(&violations), vec![ViolationType::BrokenContiguity]);
    }

    #[test]
    fn test_coverage() {
        let schedule = Schedule::from_sessions(vec![
            session("C1", "T1", "R1", 0, 1),
            session("C1", "T1", "R1", 2, 1),
        ]);
        let violations = check_schedule(&model(), &schedule, &TimetableConfig::default());
        let found = kinds(&violations);
        assert!(found.contains(&ViolationType::DuplicateObligation));
        assert!(found.contains(&ViolationType::MissingObligation));
    }

    #[test]
    fn test_room_too_small() {
        let model = EntityModel::new(
            vec![Course::theory("C1")],
            vec![Teacher::new("T1").with_course("C1")],
            vec![Room::classroom("R1", 10)],
            vec![Timeslot::hourly("MON0", Weekday::Monday, 9)],
            vec![Group::new("G1").with_course("C1").with_size(30)],
        )
        .unwrap();
        let schedule = Schedule::from_sessions(vec![session("C1", "T1", "R1", 0, 1)]);
        let violations = check_schedule(&model, &schedule, &TimetableConfig::default());
        assert_eq!(kinds(&violations), vec![ViolationType::RoomTooSmall]);
    }

    #[test]
    fn test_siblings_same_day() {
        let config = TimetableConfig::default().with_frequency(SessionFrequency {
            theory: 2,
            ..SessionFrequency::default()
        });
        let model = EntityModel::new(
            vec![Course::theory("C1")],
            vec![Teacher::new("T1").with_course("C1")],
            vec![Room::classroom("R1", 40)],
            (0..2)
                .map(|i| Timeslot::hourly(format!("MON{i}"), Weekday::Monday, 9 + i))
                .collect(),
            vec![Group::new("G1").with_course("C1")],
        )
        .unwrap();
        let mut second = session("C1", "T1", "R1", 1, 1);
        second.obligation.instance = 2;
        let schedule = Schedule::from_sessions(vec![session("C1", "T1", "R1", 0, 1), second]);
        let violations = check_schedule(&model, &schedule, &config);
        assert_eq!(kinds(&violations), vec![ViolationType::SiblingSameDay]);
    }

    #[test]
    fn test_unknown_entity() {
        let schedule = Schedule::from_sessions(vec![
            session("C1", "T9", "R1", 0, 1),
            session("C2", "T2", "L1", 1, 2),
        ]);
        let violations = check_schedule(&model(), &schedule, &TimetableConfig::default());
        assert_eq!(kinds(&violations), vec![ViolationType::UnknownEntity]);
    }
}
