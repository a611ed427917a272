//! Timetabling domain models.
//!
//! Provides the entities of a weekly timetabling problem and the schedule
//! that solves it.
//!
//! | Entity | Role |
//! |--------|------|
//! | Course | What is taught (type, duration in periods) |
//! | Teacher | Who teaches (qualifications, unavailability) |
//! | Room | Where (type, capacity) |
//! | Timeslot | When (weekday, time range) |
//! | Group | Who attends (required courses) |
//! | Obligation | Derived `(group, course)` weekly session |
//! | Schedule | One `ScheduledSession` per obligation |

mod course;
mod entity;
mod group;
mod obligation;
mod room;
mod schedule;
mod teacher;
mod timeslot;

pub use course::{Course, CourseType};
pub use entity::EntityModel;
pub use group::Group;
pub use obligation::{Obligation, ObligationId, SessionFrequency};
pub use room::{Room, RoomPolicy, RoomType};
pub use schedule::{Schedule, ScheduledSession, Violation, ViolationType};
pub use teacher::Teacher;
pub use timeslot::{PeriodRef, TimeRange, Timeslot, Weekday};
