//! Student group model.

use serde::{Deserialize, Serialize};

/// A cohort of students that attends the same courses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Unique group identifier.
    pub id: String,
    /// Semester tag.
    pub semester: String,
    /// Course IDs the group must receive.
    pub courses: Vec<String>,
    /// Head count. `None` = rooms are not filtered by capacity.
    #[serde(default)]
    pub size: Option<u32>,
}

impl Group {
    /// Creates a group with no courses.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            semester: String::new(),
            courses: Vec::new(),
            size: None,
        }
    }

    /// Sets the semester tag.
    pub fn with_semester(mut self, semester: impl Into<String>) -> Self {
        self.semester = semester.into();
        self
    }

    /// Adds a required course.
    pub fn with_course(mut self, course_id: impl Into<String>) -> Self {
        self.courses.push(course_id.into());
        self
    }

    /// Sets the head count.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }
}
