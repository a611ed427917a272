//! Timetable pipeline and evaluation.
//!
//! [`TimetableScheduler`] runs the whole flow for one request. The
//! evaluation pieces are pure functions of a model and a schedule and can
//! be used on their own:
//!
//! - [`checker`]: Hard-constraint checker reporting per-session violations
//! - [`QualityMetrics`], [`SummaryStatistics`]: Penalty, validity classification and counts
//! - [`Projections`]: Per-group, per-teacher and per-room grids
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Burke & Petrovic (2002), "Recent Research Directions in Automated Timetabling"

pub mod checker;
mod kpi;
mod pipeline;
mod projection;

pub use checker::check_schedule;
pub use kpi::{
    ClassificationSummary, ConfusionScorer, QualityMetrics, SummaryStatistics, ValidityScorer,
};
pub use pipeline::{TimetableOutput, TimetableScheduler};
pub use projection::{Projections, Timetable};
