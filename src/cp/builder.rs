//! Constraint builder: entity model → candidate domains.
//!
//! For each obligation, enumerates every `(teacher, room, day, start)`
//! placement that satisfies the *static* hard constraints:
//!
//! - teacher is qualified for the course
//! - room type is allowed for the course type and seats the group
//! - `duration` consecutive periods exist on the day
//! - teacher is available on every occupied period
//!
//! What remains for the search is the dynamic part: no double-booking of
//! teachers, rooms and groups, and distinct days for sibling instances.
//!
//! # Candidate Order
//! Day, start period, teacher declaration order, room declaration order.
//! The order is part of the determinism contract of the solver.

use std::collections::HashMap;

use tracing::debug;

use crate::config::TimetableConfig;
use crate::models::{
    CourseType, EntityModel, Obligation, RoomPolicy, Schedule, ScheduledSession, SessionFrequency,
};
use crate::scoring::{ScoreDims, SessionShape};
use crate::validation::{ValidationError, ValidationErrorKind};

/// One candidate assignment for an obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    /// Teacher index (model declaration order).
    pub teacher: usize,
    /// Room index (model declaration order).
    pub room: usize,
    /// Day index (into `EntityModel::days`).
    pub day: usize,
    /// First period occupied.
    pub start: usize,
}

/// An obligation with its resolved indices and candidate placements.
#[derive(Debug, Clone)]
pub struct ObligationDomain {
    /// The obligation itself.
    pub obligation: Obligation,
    /// Group index.
    pub group: usize,
    /// Course index.
    pub course: usize,
    /// `(group, course)` series index shared by sibling instances.
    pub series: usize,
    /// Candidate placements, in deterministic order.
    pub candidates: Vec<Placement>,
}

/// Pre-computed lookup structure shared read-only by solver and refiner.
#[derive(Debug, Clone)]
pub struct ProblemIndex<'a> {
    model: &'a EntityModel,
    domains: Vec<ObligationDomain>,
    /// course index → qualified teacher indices.
    qualified: Vec<Vec<usize>>,
    /// course type → room indices allowed by policy.
    rooms_by_type: [Vec<usize>; 4],
    /// teacher × cell → unavailable.
    unavailable: Vec<bool>,
    /// series index → number of sibling obligations.
    series_sizes: Vec<usize>,
    max_periods: usize,
}

#[inline]
fn type_slot(course_type: CourseType) -> usize {
    match course_type {
        CourseType::Theory => 0,
        CourseType::Practical => 1,
        CourseType::Lab => 2,
        CourseType::Project => 3,
    }
}

impl<'a> ProblemIndex<'a> {
    /// The entity model this index was built from.
    pub fn model(&self) -> &'a EntityModel {
        self.model
    }

    /// All obligation domains, in obligation order.
    pub fn domains(&self) -> &[ObligationDomain] {
        &self.domains
    }

    /// Domain of one obligation.
    pub fn domain(&self, obligation: usize) -> &ObligationDomain {
        &self.domains[obligation]
    }

    /// Number of obligations.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Whether there is nothing to schedule.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Total candidate placements across all obligations.
    pub fn candidate_count(&self) -> usize {
        self.domains.iter().map(|d| d.candidates.len()).sum()
    }

    /// Teachers qualified for a course.
    pub fn qualified_teachers(&self, course: usize) -> &[usize] {
        &self.qualified[course]
    }

    /// Rooms allowed for a course type.
    pub fn compatible_rooms(&self, course_type: CourseType) -> &[usize] {
        &self.rooms_by_type[type_slot(course_type)]
    }

    /// Whether a teacher is blocked on a `(day, period)` cell.
    #[inline]
    pub fn is_unavailable(&self, teacher: usize, day: usize, period: usize) -> bool {
        self.unavailable[teacher * self.cells_per_week() + self.cell(day, period)]
    }

    /// Number of sibling obligations in a series.
    #[inline]
    pub fn series_size(&self, series: usize) -> usize {
        self.series_sizes[series]
    }

    /// Number of `(group, course)` series.
    pub fn series_count(&self) -> usize {
        self.series_sizes.len()
    }

    /// Periods in the longest day (grid row width).
    #[inline]
    pub fn max_periods(&self) -> usize {
        self.max_periods
    }

    /// Cells in one entity's weekly grid.
    #[inline]
    pub fn cells_per_week(&self) -> usize {
        self.model.days().len() * self.max_periods
    }

    /// Flat index of a `(day, period)` cell.
    #[inline]
    pub fn cell(&self, day: usize, period: usize) -> usize {
        day * self.max_periods + period
    }

    /// Scoring grid sizes.
    pub fn score_dims(&self) -> ScoreDims {
        ScoreDims::from_model(self.model)
    }

    /// Scoring footprint of an obligation placed at `placement`.
    pub fn shape(&self, obligation: usize, placement: &Placement) -> SessionShape {
        let d = &self.domains[obligation];
        SessionShape {
            group: d.group,
            course: d.course,
            teacher: placement.teacher,
            day: placement.day,
            start: placement.start,
            periods: d.obligation.duration,
        }
    }

    /// Builds the output record of an obligation placed at `placement`.
    pub fn session(&self, obligation: usize, placement: &Placement) -> ScheduledSession {
        let d = &self.domains[obligation];
        let timeslot_id = self
            .model
            .timeslot_at(placement.day, placement.start)
            .map(|t| t.id.clone())
            .unwrap_or_default();
        ScheduledSession {
            obligation: d.obligation.id.clone(),
            teacher_id: self.model.teachers()[placement.teacher].id.clone(),
            room_id: self.model.rooms()[placement.room].id.clone(),
            timeslot_id,
            day: self.model.days()[placement.day],
            start_period: placement.start,
            periods: d.obligation.duration,
        }
    }

    /// Builds a schedule from one candidate index per obligation.
    pub fn schedule_from_choices(&self, choices: &[usize]) -> Schedule {
        Schedule::from_sessions(
            choices
                .iter()
                .enumerate()
                .map(|(o, &c)| self.session(o, &self.domains[o].candidates[c]))
                .collect(),
        )
    }
}

/// Builds a [`ProblemIndex`] from an entity model.
///
/// # Example
/// ```
/// use u_timetable::cp::ConstraintBuilder;
/// use u_timetable::models::*;
///
/// let model = EntityModel::new(
///     vec![Course::theory("C1")],
///     vec![Teacher::new("T1").with_course("C1")],
///     vec![Room::classroom("R1", 40)],
///     vec![Timeslot::hourly("MON1", Weekday::Monday, 9)],
///     vec![Group::new("G1").with_course("C1")],
/// ).unwrap();
///
/// let index = ConstraintBuilder::new(&model).build().unwrap();
/// assert_eq!(index.len(), 1);
/// assert_eq!(index.domain(0).candidates.len(), 1);
/// ```
pub struct ConstraintBuilder<'a> {
    model: &'a EntityModel,
    room_policy: RoomPolicy,
    frequency: SessionFrequency,
}

impl<'a> ConstraintBuilder<'a> {
    /// Creates a builder with the default room policy and frequency.
    pub fn new(model: &'a EntityModel) -> Self {
        Self {
            model,
            room_policy: RoomPolicy::default(),
            frequency: SessionFrequency::default(),
        }
    }

    /// Creates a builder using the room policy and frequency of a config.
    pub fn from_config(model: &'a EntityModel, config: &TimetableConfig) -> Self {
        Self::new(model)
            .with_room_policy(config.room_policy.clone())
            .with_frequency(config.frequency)
    }

    /// Sets the room policy.
    pub fn with_room_policy(mut self, policy: RoomPolicy) -> Self {
        self.room_policy = policy;
        self
    }

    /// Sets the weekly session frequency.
    pub fn with_frequency(mut self, frequency: SessionFrequency) -> Self {
        self.frequency = frequency;
        self
    }

    /// Derives obligations and their candidate domains.
    ///
    /// # Errors
    /// One [`ValidationError`] per obligation that has no qualified
    /// teacher, no compatible room, or no day long enough. Teacher
    /// unavailability alone never fails here; an obligation it empties is
    /// reported by the solver as infeasible.
    pub fn build(&self) -> Result<ProblemIndex<'a>, Vec<ValidationError>> {
        let model = self.model;
        let days = model.days().len();
        let max_periods = model.max_periods();
        let cells = days * max_periods;

        let qualified: Vec<Vec<usize>> = model
            .courses()
            .iter()
            .map(|course| {
                model
                    .teachers()
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.can_teach(&course.id))
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();

        let rooms_by_type: [Vec<usize>; 4] = CourseType::ALL.map(|ct| {
            model
                .rooms()
                .iter()
                .enumerate()
                .filter(|(_, r)| self.room_policy.allows(ct, r.room_type))
                .map(|(i, _)| i)
                .collect()
        });

        let mut unavailable = vec![false; model.teachers().len() * cells];
        for (t, teacher) in model.teachers().iter().enumerate() {
            for blocked in &teacher.unavailable {
                if let Some(d) = model.day_index(blocked.day) {
                    if blocked.period < model.periods_in_day(d) {
                        unavailable[t * cells + d * max_periods + blocked.period] = true;
                    }
                }
            }
        }

        let mut errors = Vec::new();
        let mut domains = Vec::new();
        let mut series_of: HashMap<(usize, usize), usize> = HashMap::new();
        let mut series_sizes = Vec::new();

        for obligation in model.obligations(&self.frequency) {
            let (Some(group), Some(course)) = (
                model.group_position(&obligation.id.group_id),
                model.course_position(&obligation.id.course_id),
            ) else {
                continue;
            };

            let next_series = series_of.len();
            let series = *series_of.entry((group, course)).or_insert(next_series);
            if series == series_sizes.len() {
                series_sizes.push(0);
            }
            series_sizes[series] += 1;

            let teachers = &qualified[course];
            if teachers.is_empty() {
                errors.push(ValidationError::for_obligation(
                    ValidationErrorKind::NoQualifiedTeacher,
                    &obligation.id,
                    format!(
                        "Obligation {}: no teacher is qualified for course '{}'",
                        obligation.id, obligation.id.course_id
                    ),
                ));
            }

            let typed_rooms = &rooms_by_type[type_slot(obligation.course_type)];
            let group_size = model.groups()[group].size;
            let rooms: Vec<usize> = typed_rooms
                .iter()
                .copied()
                .filter(|&r| group_size.map_or(true, |size| model.rooms()[r].capacity >= size))
                .collect();
            if rooms.is_empty() {
                let reason = if typed_rooms.is_empty() {
                    format!(
                        "no room type allowed for {} courses exists",
                        obligation.course_type
                    )
                } else {
                    format!(
                        "no compatible room seats {} students",
                        group_size.unwrap_or_default()
                    )
                };
                errors.push(ValidationError::for_obligation(
                    ValidationErrorKind::NoCompatibleRoom,
                    &obligation.id,
                    format!("Obligation {}: {reason}", obligation.id),
                ));
            }

            let duration = obligation.duration;
            if !(0..days).any(|d| model.periods_in_day(d) >= duration) {
                errors.push(ValidationError::for_obligation(
                    ValidationErrorKind::NoContiguousPeriods,
                    &obligation.id,
                    format!(
                        "Obligation {}: no day has {duration} contiguous periods",
                        obligation.id
                    ),
                ));
            }

            let mut candidates = Vec::new();
            for day in 0..days {
                let periods = model.periods_in_day(day);
                if periods < duration {
                    continue;
                }
                for start in 0..=periods - duration {
                    for &teacher in teachers {
                        let base = teacher * cells + day * max_periods;
                        if (start..start + duration).any(|p| unavailable[base + p]) {
                            continue;
                        }
                        candidates.extend(rooms.iter().map(|&room| Placement {
                            teacher,
                            room,
                            day,
                            start,
                        }));
                    }
                }
            }

            domains.push(ObligationDomain {
                obligation,
                group,
                course,
                series,
                candidates,
            });
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let index = ProblemIndex {
            model,
            domains,
            qualified,
            rooms_by_type,
            unavailable,
            series_sizes,
            max_periods,
        };
        debug!(
            event = "index_built",
            obligations = index.len(),
            candidates = index.candidate_count(),
            series = index.series_count(),
        );
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Course, Group, ObligationId, Room, RoomType, Teacher, Timeslot, Weekday};

    fn one_day(slots: usize) -> Vec<Timeslot> {
        (0..slots)
            .map(|i| Timeslot::hourly(format!("MON{i}"), Weekday::Monday, 9 + i as u16))
            .collect()
    }

    fn model_with(
        courses: Vec<Course>,
        teachers: Vec<Teacher>,
        rooms: Vec<Room>,
        timeslots: Vec<Timeslot>,
        groups: Vec<Group>,
    ) -> EntityModel {
        EntityModel::new(courses, teachers, rooms, timeslots, groups).unwrap()
    }

    #[test]
    fn test_candidate_enumeration() {
        let model = model_with(
            vec![Course::theory("C1"), Course::theory("C2").with_duration(2)],
            vec![
                Teacher::new("T1").with_course("C1"),
                Teacher::new("T2").with_course("C1").with_course("C2"),
            ],
            vec![Room::classroom("R1", 40), Room::classroom("R2", 40), Room::lab("L1", 20)],
            one_day(4),
            vec![Group::new("G1").with_course("C1").with_course("C2")],
        );
        let index = ConstraintBuilder::new(&model).build().unwrap();

        // C1: 4 starts × 2 teachers × 2 classrooms
        assert_eq!(index.domain(0).candidates.len(), 16);
        // C2: 3 starts × 1 teacher × 2 classrooms
        assert_eq!(index.domain(1).candidates.len(), 6);
        assert_eq!(index.candidate_count(), 22);
        assert!(index.domain(1).candidates.iter().all(|p| p.start <= 2 && p.teacher == 1));
        assert_eq!(index.qualified_teachers(0), &[0, 1]);
        assert_eq!(index.compatible_rooms(CourseType::Lab), &[2]);
    }

    #[test]
    fn test_candidate_order_is_day_start_teacher_room() {
        let model = model_with(
            vec![Course::theory("C1")],
            vec![Teacher::new("T1").with_course("C1"), Teacher::new("T2").with_course("C1")],
            vec![Room::classroom("R1", 40), Room::classroom("R2", 40)],
            one_day(2),
            vec![Group::new("G1").with_course("C1")],
        );
        let index = ConstraintBuilder::new(&model).build().unwrap();
        let c = &index.domain(0).candidates;
        assert_eq!(c[0], Placement { teacher: 0, room: 0, day: 0, start: 0 });
        assert_eq!(c[1], Placement { teacher: 0, room: 1, day: 0, start: 0 });
        assert_eq!(c[2], Placement { teacher: 1, room: 0, day: 0, start: 0 });
        assert_eq!(c[4].start, 1);
    }

    #[test]
    fn test_unavailability_filters_candidates() {
        let model = model_with(
            vec![Course::theory("C1").with_duration(2)],
            vec![Teacher::new("T1")
                .with_course("C1")
                .with_unavailable(Weekday::Monday, 1)],
            vec![Room::classroom("R1", 40)],
            one_day(4),
            vec![Group::new("G1").with_course("C1")],
        );
        let index = ConstraintBuilder::new(&model).build().unwrap();
        // Starts 0 and 1 both cover P1; only start 2 remains
        let starts: Vec<usize> = index.domain(0).candidates.iter().map(|p| p.start).collect();
        assert_eq!(starts, vec![2]);
        assert!(index.is_unavailable(0, 0, 1));
        assert!(!index.is_unavailable(0, 0, 2));
    }

    #[test]
    fn test_unavailability_never_fails_validation() {
        // Isolated free periods for a 2-period course: empty domain, no error
        let model = model_with(
            vec![Course::theory("C1").with_duration(2)],
            vec![Teacher::new("T1")
                .with_course("C1")
                .with_unavailable(Weekday::Monday, 1)
                .with_unavailable(Weekday::Monday, 3)],
            vec![Room::classroom("R1", 40)],
            one_day(4),
            vec![Group::new("G1").with_course("C1")],
        );
        let index = ConstraintBuilder::new(&model).build().unwrap();
        assert!(index.domain(0).candidates.is_empty());
    }

    #[test]
    fn test_lab_without_lab_rooms_fails() {
        let model = model_with(
            vec![Course::theory("C1"), Course::lab("C2")],
            vec![Teacher::new("T1").with_course("C1").with_course("C2")],
            vec![Room::classroom("R1", 40)],
            one_day(4),
            vec![Group::new("G1").with_course("C1").with_course("C2")],
        );
        let errors = ConstraintBuilder::new(&model).build().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::NoCompatibleRoom);
        assert_eq!(errors[0].obligation, Some(ObligationId::new("G1", "C2", 1)));
    }

    #[test]
    fn test_no_qualified_teacher_fails() {
        let model = model_with(
            vec![Course::theory("C1")],
            vec![Teacher::new("T1")],
            vec![Room::classroom("R1", 40)],
            one_day(2),
            vec![Group::new("G1").with_course("C1")],
        );
        let errors = ConstraintBuilder::new(&model).build().unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::NoQualifiedTeacher);
    }

    #[test]
    fn test_day_too_short_fails() {
        let model = model_with(
            vec![Course::theory("C1").with_duration(2)],
            vec![Teacher::new("T1").with_course("C1")],
            vec![Room::classroom("R1", 40)],
            one_day(1),
            vec![Group::new("G1").with_course("C1")],
        );
        let errors = ConstraintBuilder::new(&model).build().unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::NoContiguousPeriods);
    }

    #[test]
    fn test_group_size_filters_rooms() {
        let model = model_with(
            vec![Course::theory("C1")],
            vec![Teacher::new("T1").with_course("C1")],
            vec![Room::classroom("SMALL", 20), Room::classroom("BIG", 80)],
            one_day(1),
            vec![Group::new("G1").with_course("C1").with_size(50)],
        );
        let index = ConstraintBuilder::new(&model).build().unwrap();
        assert!(index.domain(0).candidates.iter().all(|p| p.room == 1));

        let model = model_with(
            vec![Course::theory("C1")],
            vec![Teacher::new("T1").with_course("C1")],
            vec![Room::classroom("SMALL", 20)],
            one_day(1),
            vec![Group::new("G1").with_course("C1").with_size(50)],
        );
        let errors = ConstraintBuilder::new(&model).build().unwrap_err();
        assert!(errors[0].message.contains("seats 50"));
    }

    #[test]
    fn test_room_policy_override() {
        let model = model_with(
            vec![Course::lab("C1")],
            vec![Teacher::new("T1").with_course("C1")],
            vec![Room::classroom("R1", 40)],
            one_day(1),
            vec![Group::new("G1").with_course("C1")],
        );
        let policy = RoomPolicy::default().with_rule(CourseType::Lab, vec![RoomType::Classroom]);
        let index = ConstraintBuilder::new(&model)
            .with_room_policy(policy)
            .build()
            .unwrap();
        assert_eq!(index.domain(0).candidates.len(), 1);
    }

    #[test]
    fn test_series_for_frequency() {
        let model = model_with(
            vec![Course::theory("C1"), Course::lab("C2")],
            vec![Teacher::new("T1").with_course("C1").with_course("C2")],
            vec![Room::classroom("R1", 40), Room::lab("L1", 40)],
            one_day(4),
            vec![Group::new("G1").with_course("C1").with_course("C2")],
        );
        let freq = SessionFrequency {
            theory: 3,
            ..SessionFrequency::default()
        };
        let index = ConstraintBuilder::new(&model).with_frequency(freq).build().unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.series_count(), 2);
        assert_eq!(index.domain(0).series, index.domain(2).series);
        assert_eq!(index.series_size(index.domain(0).series), 3);
        assert_eq!(index.series_size(index.domain(3).series), 1);
    }

    #[test]
    fn test_session_record() {
        let model = model_with(
            vec![Course::theory("C1").with_duration(2)],
            vec![Teacher::new("T1").with_course("C1")],
            vec![Room::classroom("R1", 40)],
            one_day(3),
            vec![Group::new("G1").with_course("C1")],
        );
        let index = ConstraintBuilder::new(&model).build().unwrap();
        let s = index.session(0, &index.domain(0).candidates[1]);
        assert_eq!(s.teacher_id, "T1");
        assert_eq!(s.timeslot_id, "MON1");
        assert_eq!(s.start_period, 1);
        assert_eq!(s.periods, 2);
        assert_eq!(s.day, Weekday::Monday);
    }
}
