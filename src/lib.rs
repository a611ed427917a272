//! Weekly course timetabling for the U-Engine ecosystem.
//!
//! Assigns every `(group, course)` obligation a teacher, a room and a run
//! of contiguous periods such that no hard constraint is broken, then
//! improves the soft quality of the result.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Course`, `Teacher`, `Room`, `Timeslot`,
//!   `Group`, `EntityModel`, `Schedule`
//! - **`validation`**: Input integrity checks (duplicate IDs, unknown
//!   courses, durations, timeslot layout)
//! - **`cp`**: Constraint index and backtracking feasibility search
//! - **`ga`**: Genetic refinement of feasible timetables
//! - **`scoring`**: Soft penalty (gaps, distribution, workload)
//! - **`scheduler`**: End-to-end pipeline, checker, metrics and projections
//! - **`config`**: TOML-loadable run configuration
//! - **`error`**: Error types
//!
//! # Architecture
//!
//! Hard constraints are never traded against soft ones: the solver finds a
//! feasible timetable, and the refiner only ever moves between feasible
//! timetables.
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Burke, Elliman & Weare (1995), "A Hybrid Genetic Algorithm for Highly
//!   Constrained Timetabling Problems"

pub mod config;
pub mod cp;
pub mod error;
pub mod ga;
pub mod models;
pub mod scheduler;
pub mod scoring;
pub mod validation;

pub use config::TimetableConfig;
pub use error::{Result, TimetableError};
pub use scheduler::{TimetableOutput, TimetableScheduler};
