//! Course model.
//!
//! A course is the unit of teaching content. Its type determines which
//! rooms can host it and its duration is the number of contiguous periods
//! one weekly session occupies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A course offered in the timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Unique course identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Teaching format.
    pub course_type: CourseType,
    /// Semester tag (e.g. "S3").
    pub semester: String,
    /// Contiguous periods per session (1 or 2).
    pub duration: usize,
}

/// Teaching format of a course.
///
/// Drives room compatibility through [`RoomPolicy`](super::RoomPolicy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseType {
    /// Lecture-style theory course.
    Theory,
    /// Practical/tutorial course.
    Practical,
    /// Laboratory course.
    Lab,
    /// Project course.
    Project,
}

impl CourseType {
    /// All course types, in declaration order.
    pub const ALL: [CourseType; 4] = [
        CourseType::Theory,
        CourseType::Practical,
        CourseType::Lab,
        CourseType::Project,
    ];
}

impl fmt::Display for CourseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CourseType::Theory => "THEORY",
            CourseType::Practical => "PRACTICAL",
            CourseType::Lab => "LAB",
            CourseType::Project => "PROJECT",
        };
        f.write_str(s)
    }
}

impl Course {
    /// Creates a single-period course.
    pub fn new(id: impl Into<String>, course_type: CourseType) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            course_type,
            semester: String::new(),
            duration: 1,
        }
    }

    /// Creates a theory course.
    pub fn theory(id: impl Into<String>) -> Self {
        Self::new(id, CourseType::Theory)
    }

    /// Creates a lab course.
    pub fn lab(id: impl Into<String>) -> Self {
        Self::new(id, CourseType::Lab)
    }

    /// Sets the course name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the semester tag.
    pub fn with_semester(mut self, semester: impl Into<String>) -> Self {
        self.semester = semester.into();
        self
    }

    /// Sets the session duration in periods.
    pub fn with_duration(mut self, duration: usize) -> Self {
        self.duration = duration;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_builder() {
        let c = Course::lab("CS201L")
            .with_name("Data Structures Lab")
            .with_semester("S3")
            .with_duration(2);

        assert_eq!(c.id, "CS201L");
        assert_eq!(c.name, "Data Structures Lab");
        assert_eq!(c.course_type, CourseType::Lab);
        assert_eq!(c.semester, "S3");
        assert_eq!(c.duration, 2);
    }

    #[test]
    fn test_default_duration() {
        assert_eq!(Course::theory("C1").duration, 1);
    }

    #[test]
    fn test_course_type_serde() {
        let json = serde_json::to_string(&CourseType::Project).unwrap();
        assert_eq!(json, "\"PROJECT\"");
        let back: CourseType = serde_json::from_str("\"PRACTICAL\"").unwrap();
        assert_eq!(back, CourseType::Practical);
    }
}
