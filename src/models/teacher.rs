//! Teacher model.
//!
//! A teacher is qualified for a set of courses and may be unavailable on
//! specific `(day, period)` cells of the weekly grid.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{PeriodRef, Weekday};

/// A teacher who can be assigned to sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    /// Unique teacher identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Course IDs this teacher is qualified to teach.
    pub courses: Vec<String>,
    /// Cells during which the teacher cannot teach.
    #[serde(default)]
    pub unavailable: BTreeSet<PeriodRef>,
}

impl Teacher {
    /// Creates a teacher with no qualifications.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            courses: Vec::new(),
            unavailable: BTreeSet::new(),
        }
    }

    /// Sets the teacher name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a qualified course.
    pub fn with_course(mut self, course_id: impl Into<String>) -> Self {
        self.courses.push(course_id.into());
        self
    }

    /// Marks a `(day, period)` cell as unavailable.
    pub fn with_unavailable(mut self, day: Weekday, period: usize) -> Self {
        self.unavailable.insert(PeriodRef::new(day, period));
        self
    }

    /// Whether this teacher is qualified for a course.
    pub fn can_teach(&self, course_id: &str) -> bool {
        self.courses.iter().any(|c| c == course_id)
    }

    /// Whether this teacher can teach during a cell.
    pub fn is_available(&self, day: Weekday, period: usize) -> bool {
        !self.unavailable.contains(&PeriodRef::new(day, period))
    }
}
