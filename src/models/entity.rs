//! Validated, immutable entity model.
//!
//! Owns the five input collections and the derived weekly grid: the days
//! present in the timeslot set and, per day, the timeslots ordered by
//! start time. Entities keep their declaration order, which fixes the
//! order of obligations and candidates downstream.

use std::collections::HashMap;

use super::{
    Course, Group, Obligation, ObligationId, Room, SessionFrequency, Teacher, Timeslot, Weekday,
};
use crate::validation::{validate_entities, ValidationError};

/// The validated input of one timetabling run.
///
/// Constructed once per run via [`EntityModel::new`] and never mutated.
#[derive(Debug, Clone)]
pub struct EntityModel {
    courses: Vec<Course>,
    teachers: Vec<Teacher>,
    rooms: Vec<Room>,
    timeslots: Vec<Timeslot>,
    groups: Vec<Group>,
    course_index: HashMap<String, usize>,
    teacher_index: HashMap<String, usize>,
    room_index: HashMap<String, usize>,
    group_index: HashMap<String, usize>,
    /// timeslot id → (day index, period).
    slot_position: HashMap<String, (usize, usize)>,
    /// Days present, in calendar order.
    days: Vec<Weekday>,
    /// Per day index: timeslot indices ordered by start time.
    day_slots: Vec<Vec<usize>>,
}

impl EntityModel {
    /// Validates the collections and builds the model.
    ///
    /// # Errors
    /// Every structural issue found (duplicate IDs, unknown course
    /// references, invalid durations, malformed timeslots).
    pub fn new(
        courses: Vec<Course>,
        teachers: Vec<Teacher>,
        rooms: Vec<Room>,
        timeslots: Vec<Timeslot>,
        groups: Vec<Group>,
    ) -> Result<Self, Vec<ValidationError>> {
        validate_entities(&courses, &teachers, &rooms, &timeslots, &groups)?;

        let course_index = index_by(&courses, |c| &c.id);
        let teacher_index = index_by(&teachers, |t| &t.id);
        let room_index = index_by(&rooms, |r| &r.id);
        let group_index = index_by(&groups, |g| &g.id);

        let mut days: Vec<Weekday> = timeslots.iter().map(|t| t.day).collect();
        days.sort();
        days.dedup();

        let mut day_slots: Vec<Vec<usize>> = vec![Vec::new(); days.len()];
        for (idx, slot) in timeslots.iter().enumerate() {
            // `days` is sorted and contains every slot's day
            if let Ok(d) = days.binary_search(&slot.day) {
                day_slots[d].push(idx);
            }
        }
        for slots in &mut day_slots {
            slots.sort_by_key(|&i| (timeslots[i].time.start_minute, i));
        }

        let mut slot_position = HashMap::with_capacity(timeslots.len());
        for (d, slots) in day_slots.iter().enumerate() {
            for (period, &i) in slots.iter().enumerate() {
                slot_position.insert(timeslots[i].id.clone(), (d, period));
            }
        }

        Ok(Self {
            courses,
            teachers,
            rooms,
            timeslots,
            groups,
            course_index,
            teacher_index,
            room_index,
            group_index,
            slot_position,
            days,
            day_slots,
        })
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn timeslots(&self) -> &[Timeslot] {
        &self.timeslots
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Looks up a course by ID.
    pub fn course(&self, id: &str) -> Option<&Course> {
        self.course_index.get(id).map(|&i| &self.courses[i])
    }

    /// Looks up a teacher by ID.
    pub fn teacher(&self, id: &str) -> Option<&Teacher> {
        self.teacher_index.get(id).map(|&i| &self.teachers[i])
    }

    /// Looks up a room by ID.
    pub fn room(&self, id: &str) -> Option<&Room> {
        self.room_index.get(id).map(|&i| &self.rooms[i])
    }

    /// Looks up a group by ID.
    pub fn group(&self, id: &str) -> Option<&Group> {
        self.group_index.get(id).map(|&i| &self.groups[i])
    }

    /// Position of a course in declaration order.
    pub fn course_position(&self, id: &str) -> Option<usize> {
        self.course_index.get(id).copied()
    }

    /// Position of a teacher in declaration order.
    pub fn teacher_position(&self, id: &str) -> Option<usize> {
        self.teacher_index.get(id).copied()
    }

    /// Position of a room in declaration order.
    pub fn room_position(&self, id: &str) -> Option<usize> {
        self.room_index.get(id).copied()
    }

    /// Position of a group in declaration order.
    pub fn group_position(&self, id: &str) -> Option<usize> {
        self.group_index.get(id).copied()
    }

    /// Days that have at least one timeslot, in calendar order.
    pub fn days(&self) -> &[Weekday] {
        &self.days
    }

    /// Index of a day within [`days`](Self::days).
    pub fn day_index(&self, day: Weekday) -> Option<usize> {
        self.days.binary_search(&day).ok()
    }

    /// Number of periods on a day.
    pub fn periods_in_day(&self, day_idx: usize) -> usize {
        self.day_slots.get(day_idx).map_or(0, Vec::len)
    }

    /// Longest day, in periods.
    pub fn max_periods(&self) -> usize {
        self.day_slots.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Timeslot at `(day index, period)`.
    pub fn timeslot_at(&self, day_idx: usize, period: usize) -> Option<&Timeslot> {
        self.day_slots
            .get(day_idx)
            .and_then(|slots| slots.get(period))
            .map(|&i| &self.timeslots[i])
    }

    /// `(day index, period)` of a timeslot.
    pub fn locate(&self, timeslot_id: &str) -> Option<(usize, usize)> {
        self.slot_position.get(timeslot_id).copied()
    }

    /// Derives the teaching obligations.
    ///
    /// Order: groups in declaration order, then each group's courses in
    /// listed order, then instances `1..=n`. Course references are known
    /// to resolve because the model was validated.
    pub fn obligations(&self, frequency: &SessionFrequency) -> Vec<Obligation> {
        let mut obligations = Vec::new();
        for group in &self.groups {
            for course_id in &group.courses {
                let Some(course) = self.course(course_id) else {
                    continue;
                };
                for instance in 1..=frequency.sessions_for(course.course_type) {
                    obligations.push(Obligation {
                        id: ObligationId::new(&group.id, &course.id, instance),
                        course_type: course.course_type,
                        duration: course.duration,
                    });
                }
            }
        }
        obligations
    }
}

fn index_by<T>(items: &[T], key: impl Fn(&T) -> &String) -> HashMap<String, usize> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (key(item).clone(), i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseType, TimeRange};
    use crate::validation::ValidationErrorKind;

    fn sample_model() -> EntityModel {
        let courses = vec![
            Course::theory("C1"),
            Course::lab("C2").with_duration(2),
        ];
        let teachers = vec![Teacher::new("T1").with_course("C1").with_course("C2")];
        let rooms = vec![Room::classroom("R1", 40), Room::lab("L1", 30)];
        // Declared out of order on purpose
        let timeslots = vec![
            Timeslot::hourly("TUE1", Weekday::Tuesday, 9),
            Timeslot::hourly("MON2", Weekday::Monday, 10),
            Timeslot::hourly("MON1", Weekday::Monday, 9),
            Timeslot::hourly("MON3", Weekday::Monday, 11),
        ];
        let groups = vec![Group::new("G1").with_course("C1").with_course("C2")];
        EntityModel::new(courses, teachers, rooms, timeslots, groups).unwrap()
    }

    #[test]
    fn test_days_and_periods() {
        let m = sample_model();
        assert_eq!(m.days(), &[Weekday::Monday, Weekday::Tuesday]);
        assert_eq!(m.periods_in_day(0), 3);
        assert_eq!(m.periods_in_day(1), 1);
        assert_eq!(m.max_periods(), 3);
        assert_eq!(m.day_index(Weekday::Tuesday), Some(1));
        assert_eq!(m.day_index(Weekday::Friday), None);
    }

    #[test]
    fn test_slots_ordered_by_start_time() {
        let m = sample_model();
        assert_eq!(m.timeslot_at(0, 0).unwrap().id, "MON1");
        assert_eq!(m.timeslot_at(0, 1).unwrap().id, "MON2");
        assert_eq!(m.timeslot_at(0, 2).unwrap().id, "MON3");
        assert!(m.timeslot_at(1, 1).is_none());
        assert_eq!(m.locate("MON3"), Some((0, 2)));
        assert_eq!(m.locate("TUE1"), Some((1, 0)));
        assert_eq!(m.locate("NOPE"), None);
    }

    #[test]
    fn test_lookups() {
        let m = sample_model();
        assert_eq!(m.course("C2").unwrap().duration, 2);
        assert_eq!(m.teacher_position("T1"), Some(0));
        assert_eq!(m.room("L1").unwrap().capacity, 30);
        assert!(m.group("G9").is_none());
    }

    #[test]
    fn test_obligations_default_frequency() {
        let m = sample_model();
        let obs = m.obligations(&SessionFrequency::default());
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].id, ObligationId::new("G1", "C1", 1));
        assert_eq!(obs[1].course_type, CourseType::Lab);
        assert_eq!(obs[1].duration, 2);
    }

    #[test]
    fn test_obligations_with_frequency() {
        let m = sample_model();
        let freq = SessionFrequency {
            theory: 3,
            ..SessionFrequency::default()
        };
        let obs = m.obligations(&freq);
        assert_eq!(obs.len(), 4);
        assert_eq!(obs[2].id, ObligationId::new("G1", "C1", 3));
        assert_eq!(obs[3].id.course_id, "C2");
    }

    #[test]
    fn test_group_listing_course_twice_rejected() {
        let errors = EntityModel::new(
            vec![Course::theory("C1")],
            vec![Teacher::new("T1").with_course("C1")],
            vec![Room::classroom("R1", 40)],
            vec![
                Timeslot::hourly("MON1", Weekday::Monday, 9),
                Timeslot::hourly("TUE1", Weekday::Tuesday, 9),
            ],
            vec![Group::new("G1").with_course("C1").with_course("C1")],
        )
        .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::DuplicateCourseReference);
    }

    #[test]
    fn test_invalid_model_rejected() {
        let errors = EntityModel::new(
            vec![Course::theory("C1").with_duration(3)],
            vec![],
            vec![],
            vec![Timeslot::new("S1", Weekday::Monday, TimeRange::new(600, 540))],
            vec![Group::new("G1").with_course("C9")],
        )
        .unwrap_err();
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::InvalidDuration));
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::EmptyTimeRange));
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::UnknownCourse));
    }
}
