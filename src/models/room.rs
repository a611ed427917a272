//! Room model and course-type room policy.
//!
//! # Room Policy
//! Which room types may host which course types is configuration, not
//! data: the default maps LAB to labs, PROJECT to project rooms, and
//! THEORY/PRACTICAL to classrooms.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::CourseType;

/// A room that can host sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Unique room identifier.
    pub id: String,
    /// Seating capacity.
    pub capacity: u32,
    /// Room classification.
    pub room_type: RoomType,
}

/// Room classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    /// General-purpose lecture room.
    Classroom,
    /// Laboratory.
    Lab,
    /// Project/studio room.
    ProjectRoom,
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoomType::Classroom => "classroom",
            RoomType::Lab => "lab",
            RoomType::ProjectRoom => "project-room",
        };
        f.write_str(s)
    }
}

impl Room {
    /// Creates a new room.
    pub fn new(id: impl Into<String>, room_type: RoomType, capacity: u32) -> Self {
        Self {
            id: id.into(),
            capacity,
            room_type,
        }
    }

    /// Creates a classroom.
    pub fn classroom(id: impl Into<String>, capacity: u32) -> Self {
        Self::new(id, RoomType::Classroom, capacity)
    }

    /// Creates a lab.
    pub fn lab(id: impl Into<String>, capacity: u32) -> Self {
        Self::new(id, RoomType::Lab, capacity)
    }
}

/// Allowed room types per course type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomPolicy {
    /// Rooms for THEORY courses.
    pub theory: Vec<RoomType>,
    /// Rooms for PRACTICAL courses.
    pub practical: Vec<RoomType>,
    /// Rooms for LAB courses.
    pub lab: Vec<RoomType>,
    /// Rooms for PROJECT courses.
    pub project: Vec<RoomType>,
}

impl Default for RoomPolicy {
    fn default() -> Self {
        Self {
            theory: vec![RoomType::Classroom],
            practical: vec![RoomType::Classroom],
            lab: vec![RoomType::Lab],
            project: vec![RoomType::ProjectRoom],
        }
    }
}

impl RoomPolicy {
    /// Room types allowed for a course type.
    pub fn allowed(&self, course_type: CourseType) -> &[RoomType] {
        match course_type {
            CourseType::Theory => &self.theory,
            CourseType::Practical => &self.practical,
            CourseType::Lab => &self.lab,
            CourseType::Project => &self.project,
        }
    }

    /// Whether a room type may host a course type.
    pub fn allows(&self, course_type: CourseType, room_type: RoomType) -> bool {
        self.allowed(course_type).contains(&room_type)
    }

    /// Replaces the allowed room types for one course type.
    pub fn with_rule(mut self, course_type: CourseType, rooms: Vec<RoomType>) -> Self {
        match course_type {
            CourseType::Theory => self.theory = rooms,
            CourseType::Practical => self.practical = rooms,
            CourseType::Lab => self.lab = rooms,
            CourseType::Project => self.project = rooms,
        }
        self
    }
}
