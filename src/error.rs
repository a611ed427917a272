//! Error types for timetable generation.
//!
//! Validation and feasibility failures abort a run. Refinement running
//! out of budget does not: [`RefinementIncomplete`] travels as a warning
//! next to a valid schedule.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::cp::SearchStats;
use crate::models::ObligationId;
use crate::validation::ValidationError;

/// Main error type for timetable generation.
#[derive(Debug, Error)]
pub enum TimetableError {
    /// Entity or supply validation failed before search.
    #[error("validation failed with {} issue(s): {}", .0.len(), join_messages(.0))]
    Validation(Vec<ValidationError>),

    /// The search space was exhausted without a consistent assignment.
    #[error(transparent)]
    Infeasible(#[from] InfeasibilityError),

    /// The search budget ran out before an answer was found.
    #[error(transparent)]
    Timeout(#[from] SolverTimeoutError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<Vec<ValidationError>> for TimetableError {
    fn from(errors: Vec<ValidationError>) -> Self {
        TimetableError::Validation(errors)
    }
}

/// Result type alias for timetable operations.
pub type Result<T> = std::result::Result<T, TimetableError>;

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Hard-constraint family that limited the search most.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintClass {
    /// Qualified teachers busy or unavailable.
    TeacherSupply,
    /// Compatible rooms busy.
    RoomTypeSupply,
    /// Group periods (or sibling days) exhausted.
    TimeslotSupply,
}

impl fmt::Display for ConstraintClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConstraintClass::TeacherSupply => "teacher supply",
            ConstraintClass::RoomTypeSupply => "room-type supply",
            ConstraintClass::TimeslotSupply => "timeslot supply",
        };
        f.write_str(s)
    }
}

/// The feasibility search proved no consistent assignment exists.
#[derive(Debug, Clone, Error)]
#[error("no feasible timetable exists{}{}", binding_suffix(.binding), domain_suffix(.empty_domain))]
pub struct InfeasibilityError {
    /// Constraint class with the most rejections, if any were recorded.
    pub binding: Option<ConstraintClass>,
    /// An obligation left with no candidate at all, if the search never started.
    pub empty_domain: Option<ObligationId>,
    /// Search statistics at exhaustion.
    pub stats: SearchStats,
}

fn binding_suffix(binding: &Option<ConstraintClass>) -> String {
    binding
        .map(|b| format!(" (most binding: {b})"))
        .unwrap_or_default()
}

fn domain_suffix(obligation: &Option<ObligationId>) -> String {
    obligation
        .as_ref()
        .map(|o| format!("; obligation {o} has no available placement"))
        .unwrap_or_default()
}

/// The feasibility search hit its node or time budget.
///
/// Feasibility is undetermined; retry with a larger budget.
#[derive(Debug, Clone, Error)]
#[error("solver budget exhausted after {} nodes and {elapsed_ms} ms ({assigned}/{total} obligations placed at best)", .stats.nodes)]
pub struct SolverTimeoutError {
    /// Search statistics at expiry.
    pub stats: SearchStats,
    /// Wall-clock time spent (ms).
    pub elapsed_ms: u64,
    /// Deepest partial assignment reached.
    pub assigned: usize,
    /// Total obligations.
    pub total: usize,
}

/// Refinement stopped on its budget before converging.
///
/// A warning: the best schedule found so far is still returned.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("refinement stopped after {generations_run} of {generations_planned} generations (budget {budget_ms} ms)")]
pub struct RefinementIncomplete {
    pub generations_run: usize,
    pub generations_planned: usize,
    pub budget_ms: u64,
}
