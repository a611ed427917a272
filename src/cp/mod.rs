//! Feasibility layer: candidate domains and backtracking search.
//!
//! [`ConstraintBuilder`] turns an [`EntityModel`](crate::models::EntityModel)
//! into a [`ProblemIndex`]: one candidate domain per obligation, already
//! filtered by qualification, room policy, contiguity and teacher
//! availability. [`BacktrackingSolver`] then searches those domains for an
//! assignment with no teacher, room or group double-booking.
//!
//! The index is also the shared read-only context of the genetic refiner,
//! which encodes a timetable as one candidate index per obligation.
//!
//! # Reference
//! - Russell & Norvig (2020), "Artificial Intelligence: A Modern Approach", ch. 6
//! - Burke & Petrovic (2002), "Recent Research Directions in Automated Timetabling"

mod builder;
mod occupancy;
mod solver;

pub use builder::{ConstraintBuilder, ObligationDomain, Placement, ProblemIndex};
pub use occupancy::{Conflict, Occupancy};
pub use solver::{BacktrackingSolver, ObligationOrder, SearchStats, Solution};
