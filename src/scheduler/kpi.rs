//! Timetable quality metrics (KPIs).
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Penalty | Weighted gap / distribution / workload breakdown |
//! | Violations | Hard-constraint violations found by the checker |
//! | Classification | Accuracy, precision, recall, F1 over per-session validity |
//!
//! Classification is produced by a pluggable [`ValidityScorer`]. The
//! default [`ConfusionScorer`] treats "valid" as the positive class.
//!
//! [`SummaryStatistics`] adds plain counts for reporting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{CourseType, EntityModel, Schedule, Violation, Weekday};
use crate::scoring::{schedule_penalty, PenaltyBreakdown, PenaltyWeights};

use super::checker::session_validity;

/// Confusion counts and derived ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSummary {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl ClassificationSummary {
    /// Derives ratios from confusion counts.
    ///
    /// With no samples at all every ratio is 1.0; otherwise a ratio with an
    /// empty denominator is 0.0.
    pub fn from_counts(tp: usize, fp: usize, tn: usize, fn_: usize) -> Self {
        let total = tp + fp + tn + fn_;
        let ratio = |num: usize, den: usize| {
            if total == 0 {
                1.0
            } else if den == 0 {
                0.0
            } else {
                num as f64 / den as f64
            }
        };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            true_positives: tp,
            false_positives: fp,
            true_negatives: tn,
            false_negatives: fn_,
            accuracy: ratio(tp + tn, total),
            precision,
            recall,
            f1,
        }
    }
}

/// Turns per-session validity into a classification summary.
///
/// `expected[i]` is the ground truth for session `i`, `predicted[i]` the
/// checker's verdict; both are `true` for valid.
pub trait ValidityScorer: Send + Sync {
    fn score(&self, expected: &[bool], predicted: &[bool]) -> ClassificationSummary;
}

/// Standard confusion-matrix scorer with "valid" as the positive class.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfusionScorer;

impl ValidityScorer for ConfusionScorer {
    fn score(&self, expected: &[bool], predicted: &[bool]) -> ClassificationSummary {
        let (mut tp, mut fp, mut tn, mut fn_) = (0, 0, 0, 0);
        for (&e, &p) in expected.iter().zip(predicted) {
            match (e, p) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (false, false) => tn += 1,
                (true, false) => fn_ += 1,
            }
        }
        ClassificationSummary::from_counts(tp, fp, tn, fn_)
    }
}

/// Quality indicators of a finished timetable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Soft-penalty breakdown.
    pub penalty: PenaltyBreakdown,
    /// Fitness (`-penalty.total`).
    pub fitness: f64,
    /// Hard-constraint violations.
    pub violation_count: usize,
    /// Sessions scored.
    pub session_count: usize,
    /// Validity classification.
    pub classification: ClassificationSummary,
}

impl QualityMetrics {
    /// Computes metrics for a schedule and its checker output.
    ///
    /// Every session is expected valid; the prediction is whether the
    /// checker flagged it.
    pub fn calculate(
        model: &EntityModel,
        schedule: &Schedule,
        violations: &[Violation],
        weights: &PenaltyWeights,
        scorer: &dyn ValidityScorer,
    ) -> Self {
        let penalty = schedule_penalty(model, schedule, weights);
        let predicted = session_validity(schedule, violations);
        let expected = vec![true; predicted.len()];
        Self {
            penalty,
            fitness: penalty.fitness(),
            violation_count: violations.len(),
            session_count: schedule.session_count(),
            classification: scorer.score(&expected, &predicted),
        }
    }

    /// Whether the schedule has no hard-constraint violation.
    pub fn is_valid(&self) -> bool {
        self.violation_count == 0
    }

    /// Whether the schedule is valid and within a penalty ceiling.
    pub fn meets_thresholds(&self, max_penalty: f64) -> bool {
        self.is_valid() && self.penalty.total <= max_penalty
    }
}

/// Plain counts over a schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Sessions scheduled.
    pub total_sessions: usize,
    /// Sessions per course type.
    pub sessions_by_type: BTreeMap<CourseType, usize>,
    /// Periods taught per teacher (every teacher of the model, idle ones at 0).
    pub teacher_workload: BTreeMap<String, usize>,
    /// Periods occupied per room (every room of the model).
    pub room_usage: BTreeMap<String, usize>,
    /// Sessions per group (every group of the model).
    pub sessions_per_group: BTreeMap<String, usize>,
    /// Sessions per day.
    pub sessions_per_day: BTreeMap<Weekday, usize>,
}

impl SummaryStatistics {
    /// Counts sessions of a schedule.
    pub fn calculate(model: &EntityModel, schedule: &Schedule) -> Self {
        let mut stats = Self {
            total_sessions: schedule.session_count(),
            teacher_workload: model.teachers().iter().map(|t| (t.id.clone(), 0)).collect(),
            room_usage: model.rooms().iter().map(|r| (r.id.clone(), 0)).collect(),
            sessions_per_group: model.groups().iter().map(|g| (g.id.clone(), 0)).collect(),
            ..Self::default()
        };

        for s in &schedule.sessions {
            if let Some(course) = model.course(s.course_id()) {
                *stats.sessions_by_type.entry(course.course_type).or_insert(0) += 1;
            }
            *stats.teacher_workload.entry(s.teacher_id.clone()).or_insert(0) += s.periods;
            *stats.room_usage.entry(s.room_id.clone()).or_insert(0) += s.periods;
            *stats
                .sessions_per_group
                .entry(s.group_id().to_string())
                .or_insert(0) += 1;
            *stats.sessions_per_day.entry(s.day).or_insert(0) += 1;
        }
        stats
    }

    /// Room usage as a fraction of the week's periods.
    pub fn room_utilization(&self, model: &EntityModel) -> BTreeMap<String, f64> {
        let week: usize = (0..model.days().len()).map(|d| model.periods_in_day(d)).sum();
        self.room_usage
            .iter()
            .map(|(room, &used)| {
                let share = if week == 0 { 0.0 } else { used as f64 / week as f64 };
                (room.clone(), share)
            })
            .collect()
    }
}
