//! End-to-end timetable generation.
//!
//! # Algorithm
//!
//! 1. Validate the configuration
//! 2. Build the constraint index (static hard constraints, supply checks)
//! 3. Backtracking search for a feasible assignment
//! 4. Genetic refinement of the soft penalty, seeded with that assignment
//! 5. Re-check the result, then compute metrics, summary and projections
//!
//! Steps 1 to 3 may fail; refinement and evaluation never do.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::TimetableConfig;
use crate::cp::{BacktrackingSolver, ConstraintBuilder, ProblemIndex};
use crate::error::Result;
use crate::ga::{GeneticRefiner, RefinementOutcome, StopReason};
use crate::models::{EntityModel, Schedule, Violation};

use super::checker::check_schedule;
use super::kpi::{ConfusionScorer, QualityMetrics, SummaryStatistics, ValidityScorer};
use super::projection::Projections;

/// Everything produced for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableOutput {
    /// The final timetable.
    pub schedule: Schedule,
    /// Per-group, per-teacher and per-room views.
    pub projections: Projections,
    /// Quality indicators.
    pub metrics: QualityMetrics,
    /// Plain counts.
    pub summary: SummaryStatistics,
    /// Refinement trace.
    pub refinement: RefinementOutcome,
    /// Hard-constraint violations found by the final check (normally empty).
    pub violations: Vec<Violation>,
}

/// Runs builder, solver, refiner and evaluation.
///
/// # Example
///
/// ```
/// use u_timetable::config::TimetableConfig;
/// use u_timetable::models::*;
/// use u_timetable::scheduler::TimetableScheduler;
///
/// let model = EntityModel::new(
///     vec![Course::theory("C1"), Course::theory("C2")],
///     vec![Teacher::new("T1").with_course("C1"), Teacher::new("T2").with_course("C2")],
///     vec![Room::classroom("R1", 40), Room::classroom("R2", 40)],
///     (0..4).map(|i| Timeslot::hourly(format!("MON{i}"), Weekday::Monday, 9 + i)).collect(),
///     vec![Group::new("G1").with_course("C1").with_course("C2")],
/// ).unwrap();
///
/// let output = TimetableScheduler::new(TimetableConfig::default())
///     .schedule(&model)
///     .unwrap();
/// assert_eq!(output.schedule.session_count(), 2);
/// assert!(output.metrics.is_valid());
/// ```
pub struct TimetableScheduler {
    config: TimetableConfig,
    scorer: Box<dyn ValidityScorer>,
}

impl TimetableScheduler {
    /// Creates a scheduler with the default [`ConfusionScorer`].
    pub fn new(config: TimetableConfig) -> Self {
        Self {
            config,
            scorer: Box::new(ConfusionScorer),
        }
    }

    /// Replaces the validity scorer used for classification metrics.
    pub fn with_scorer(mut self, scorer: impl ValidityScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    /// Run configuration.
    pub fn config(&self) -> &TimetableConfig {
        &self.config
    }

    /// Generates a timetable for the model.
    ///
    /// # Errors
    /// - [`TimetableError::Config`](crate::TimetableError::Config) for out-of-range settings
    /// - [`TimetableError::Validation`](crate::TimetableError::Validation) when some
    ///   obligation has no teacher, room or contiguous periods
    /// - [`TimetableError::Infeasible`](crate::TimetableError::Infeasible) when no
    ///   timetable exists
    /// - [`TimetableError::Timeout`](crate::TimetableError::Timeout) when the solver
    ///   budget runs out
    pub fn schedule(&self, model: &EntityModel) -> Result<TimetableOutput> {
        self.config.validate()?;
        let started = Instant::now();
        info!(
            event = "timetable_start",
            courses = model.courses().len(),
            teachers = model.teachers().len(),
            rooms = model.rooms().len(),
            timeslots = model.timeslots().len(),
            groups = model.groups().len(),
        );

        let index = ConstraintBuilder::from_config(model, &self.config).build()?;
        let solution = BacktrackingSolver::new(&index, self.config.solver.clone()).solve()?;
        let refinement = self.refine(&index, solution.choices);

        let schedule = refinement.schedule.clone();
        let violations = check_schedule(model, &schedule, &self.config);
        if !violations.is_empty() {
            warn!(event = "final_check_failed", violations = violations.len());
        }

        let metrics = QualityMetrics::calculate(
            model,
            &schedule,
            &violations,
            &self.config.weights,
            self.scorer.as_ref(),
        );
        let summary = SummaryStatistics::calculate(model, &schedule);
        let projections = Projections::build(model, &schedule);

        info!(
            event = "timetable_complete",
            sessions = schedule.session_count(),
            penalty = metrics.penalty.total,
            violations = violations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
        );

        Ok(TimetableOutput {
            schedule,
            projections,
            metrics,
            summary,
            refinement,
            violations,
        })
    }

    fn refine(&self, index: &ProblemIndex<'_>, seed: Vec<usize>) -> RefinementOutcome {
        let weights = &self.config.weights;
        if !self.config.refiner.enabled {
            return RefinementOutcome::unrefined(index, seed, weights, StopReason::Disabled);
        }
        let refiner = GeneticRefiner::new(index, self.config.refiner.clone(), *weights);
        match refiner.run(std::slice::from_ref(&seed)) {
            Some(outcome) => outcome,
            None => {
                warn!(event = "refine_skipped", reason = "inconsistent seed");
                RefinementOutcome::unrefined(index, seed, weights, StopReason::Generations)
            }
        }
    }
}
