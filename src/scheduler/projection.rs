//! Per-entity timetable views.
//!
//! A [`Timetable`] is one entity's week: the sessions it takes part in and
//! a `(day, period)` grid pointing at them. [`Projections`] holds one per
//! group, teacher and room of the model, including idle ones.
//!
//! Projection is lossless: the sessions of all timetables of one kind,
//! taken together, are exactly the sessions of the source schedule.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{EntityModel, Schedule, ScheduledSession, Weekday};

/// One entity's weekly grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timetable {
    /// Group, teacher or room ID.
    pub entity_id: String,
    /// Days of the grid, in calendar order.
    pub days: Vec<Weekday>,
    /// Sessions involving the entity, in schedule order.
    pub sessions: Vec<ScheduledSession>,
    /// `grid[day][period]` → index into `sessions`.
    grid: Vec<Vec<Option<usize>>>,
}

impl Timetable {
    fn empty(entity_id: &str, model: &EntityModel) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            days: model.days().to_vec(),
            sessions: Vec::new(),
            grid: (0..model.days().len())
                .map(|d| vec![None; model.periods_in_day(d)])
                .collect(),
        }
    }

    fn insert(&mut self, model: &EntityModel, session: &ScheduledSession) {
        let slot = self.sessions.len();
        self.sessions.push(session.clone());
        if let Some(row) = model.day_index(session.day).and_then(|d| self.grid.get_mut(d)) {
            for p in session.period_range() {
                if let Some(cell) = row.get_mut(p) {
                    *cell = Some(slot);
                }
            }
        }
    }

    /// Session occupying a cell, if any.
    pub fn cell(&self, day: Weekday, period: usize) -> Option<&ScheduledSession> {
        let d = self.days.iter().position(|&x| x == day)?;
        let slot = (*self.grid.get(d)?.get(period)?)?;
        self.sessions.get(slot)
    }

    /// Periods of a day in the grid.
    pub fn periods(&self, day: Weekday) -> usize {
        self.days
            .iter()
            .position(|&x| x == day)
            .map_or(0, |d| self.grid[d].len())
    }

    /// Number of occupied cells.
    pub fn busy_periods(&self) -> usize {
        self.grid.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// Whether the entity has no session.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions of the timetable.
    pub fn flatten(&self) -> Vec<ScheduledSession> {
        self.sessions.clone()
    }
}

/// Timetables per group, teacher and room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projections {
    pub by_group: BTreeMap<String, Timetable>,
    pub by_teacher: BTreeMap<String, Timetable>,
    pub by_room: BTreeMap<String, Timetable>,
}

impl Projections {
    /// Projects a schedule onto every group, teacher and room.
    pub fn build(model: &EntityModel, schedule: &Schedule) -> Self {
        let empty_views = |ids: Vec<&String>| -> BTreeMap<String, Timetable> {
            ids.into_iter()
                .map(|id| (id.clone(), Timetable::empty(id, model)))
                .collect()
        };
        let mut projections = Self {
            by_group: empty_views(model.groups().iter().map(|g| &g.id).collect()),
            by_teacher: empty_views(model.teachers().iter().map(|t| &t.id).collect()),
            by_room: empty_views(model.rooms().iter().map(|r| &r.id).collect()),
        };

        for s in &schedule.sessions {
            for (views, id) in [
                (&mut projections.by_group, s.group_id()),
                (&mut projections.by_teacher, s.teacher_id.as_str()),
                (&mut projections.by_room, s.room_id.as_str()),
            ] {
                views
                    .entry(id.to_string())
                    .or_insert_with(|| Timetable::empty(id, model))
                    .insert(model, s);
            }
        }
        projections
    }

    /// Timetable of a group.
    pub fn group(&self, id: &str) -> Option<&Timetable> {
        self.by_group.get(id)
    }

    /// Timetable of a teacher.
    pub fn teacher(&self, id: &str) -> Option<&Timetable> {
        self.by_teacher.get(id)
    }

    /// Timetable of a room.
    pub fn room(&self, id: &str) -> Option<&Timetable> {
        self.by_room.get(id)
    }

    /// All sessions of one projection kind, as a schedule.
    pub fn flatten(views: &BTreeMap<String, Timetable>) -> Schedule {
        Schedule::from_sessions(views.values().flat_map(Timetable::flatten).collect())
    }
}
