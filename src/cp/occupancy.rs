//! Incremental occupancy bookkeeping for the dynamic hard constraints.
//!
//! One boolean grid per teacher, room and group over `(day, period)`
//! cells, plus a day bitmask per `(group, course)` series. Placing and
//! removing a session are O(duration); a consistency check never
//! allocates.

use crate::error::ConstraintClass;

use super::builder::{Placement, ProblemIndex};

/// Why a placement is inconsistent with the current occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conflict {
    /// Teacher already busy on an occupied period.
    Teacher,
    /// Room already busy on an occupied period.
    Room,
    /// Group already busy on an occupied period.
    Group,
    /// A sibling instance of the same course already sits on this day.
    SiblingDay,
}

impl Conflict {
    /// Constraint family this conflict counts towards.
    pub fn class(self) -> ConstraintClass {
        match self {
            Conflict::Teacher => ConstraintClass::TeacherSupply,
            Conflict::Room => ConstraintClass::RoomTypeSupply,
            Conflict::Group | Conflict::SiblingDay => ConstraintClass::TimeslotSupply,
        }
    }
}

/// Busy cells of every teacher, room and group.
#[derive(Debug, Clone)]
pub struct Occupancy {
    teacher: Vec<bool>,
    room: Vec<bool>,
    group: Vec<bool>,
    series_days: Vec<u32>,
    week: usize,
    row: usize,
}

impl Occupancy {
    /// Empty occupancy for a problem.
    pub fn new(index: &ProblemIndex<'_>) -> Self {
        let model = index.model();
        let week = index.cells_per_week();
        Self {
            teacher: vec![false; model.teachers().len() * week],
            room: vec![false; model.rooms().len() * week],
            group: vec![false; model.groups().len() * week],
            series_days: vec![0; index.series_count()],
            week,
            row: index.max_periods(),
        }
    }

    /// Checks a placement against the current occupancy.
    ///
    /// Conflicts are reported in order teacher, room, group, sibling day.
    pub fn check(
        &self,
        index: &ProblemIndex<'_>,
        obligation: usize,
        placement: &Placement,
    ) -> Result<(), Conflict> {
        let domain = index.domain(obligation);
        let duration = domain.obligation.duration;
        let first = placement.day * self.row + placement.start;
        let cells = first..first + duration;

        let t = placement.teacher * self.week;
        if cells.clone().any(|c| self.teacher[t + c]) {
            return Err(Conflict::Teacher);
        }
        let r = placement.room * self.week;
        if cells.clone().any(|c| self.room[r + c]) {
            return Err(Conflict::Room);
        }
        let g = domain.group * self.week;
        if cells.into_iter().any(|c| self.group[g + c]) {
            return Err(Conflict::Group);
        }
        if index.series_size(domain.series) > 1
            && self.series_days[domain.series] & (1 << placement.day) != 0
        {
            return Err(Conflict::SiblingDay);
        }
        Ok(())
    }

    /// Whether a placement is consistent.
    #[inline]
    pub fn fits(&self, index: &ProblemIndex<'_>, obligation: usize, placement: &Placement) -> bool {
        self.check(index, obligation, placement).is_ok()
    }

    /// Marks a placement's cells busy. The caller checked consistency.
    pub fn place(&mut self, index: &ProblemIndex<'_>, obligation: usize, placement: &Placement) {
        self.mark(index, obligation, placement, true);
    }

    /// Frees a placement's cells.
    pub fn remove(&mut self, index: &ProblemIndex<'_>, obligation: usize, placement: &Placement) {
        self.mark(index, obligation, placement, false);
    }

    fn mark(&mut self, index: &ProblemIndex<'_>, obligation: usize, placement: &Placement, busy: bool) {
        let domain = index.domain(obligation);
        let first = placement.day * self.row + placement.start;
        let (t, r, g) = (
            placement.teacher * self.week,
            placement.room * self.week,
            domain.group * self.week,
        );
        for c in first..first + domain.obligation.duration {
            self.teacher[t + c] = busy;
            self.room[r + c] = busy;
            self.group[g + c] = busy;
        }
        let bit = 1u32 << placement.day;
        if busy {
            self.series_days[domain.series] |= bit;
        } else {
            self.series_days[domain.series] &= !bit;
        }
    }
}
