//! Teaching obligations.
//!
//! An obligation is one weekly session a group must receive for a course.
//! Obligations are derived once from `Group.courses × Course`; a course
//! taught several times a week (see [`SessionFrequency`]) yields one
//! obligation per instance.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::CourseType;

/// Identity of an obligation: `(group, course, instance)`.
///
/// `instance` is 1-based and is always 1 unless the course type is taught
/// more than once per week.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObligationId {
    /// Group receiving the session.
    pub group_id: String,
    /// Course taught.
    pub course_id: String,
    /// Weekly instance number (1-based).
    pub instance: u32,
}

impl ObligationId {
    /// Creates a new obligation ID.
    pub fn new(group_id: impl Into<String>, course_id: impl Into<String>, instance: u32) -> Self {
        Self {
            group_id: group_id.into(),
            course_id: course_id.into(),
            instance,
        }
    }
}

impl fmt::Display for ObligationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.group_id, self.course_id, self.instance)
    }
}

/// A schedulable teaching obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    /// Obligation identity.
    pub id: ObligationId,
    /// Course type (denormalized for room filtering).
    pub course_type: CourseType,
    /// Contiguous periods required.
    pub duration: usize,
}

/// Weekly sessions per course type.
///
/// All ones by default: one obligation per `(group, course)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionFrequency {
    pub theory: u32,
    pub practical: u32,
    pub lab: u32,
    pub project: u32,
}

impl Default for SessionFrequency {
    fn default() -> Self {
        Self {
            theory: 1,
            practical: 1,
            lab: 1,
            project: 1,
        }
    }
}

impl SessionFrequency {
    /// Weekly sessions for a course type (at least 1).
    pub fn sessions_for(&self, course_type: CourseType) -> u32 {
        let n = match course_type {
            CourseType::Theory => self.theory,
            CourseType::Practical => self.practical,
            CourseType::Lab => self.lab,
            CourseType::Project => self.project,
        };
        n.max(1)
    }
}
