//! Soft-quality penalty.
//!
//! `penalty = w_gap·gap + w_dist·distribution + w_work·workload`
//!
//! | Component | Definition |
//! |-----------|-----------|
//! | gap | Idle periods strictly between the first and last occupied period of each day, per group and per teacher, summed over the week |
//! | distribution | Per course: population variance of sessions per day around the uniform mean, summed over courses |
//! | workload | Population variance of weekly periods across all teachers |
//!
//! Lower is better. The refiner maximises `-penalty`.

use serde::{Deserialize, Serialize};

use crate::models::{EntityModel, Schedule};

/// Weights of the penalty components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyWeights {
    /// Weight of idle periods.
    pub gap: f64,
    /// Weight of uneven per-day course spread.
    pub distribution: f64,
    /// Weight of teacher load imbalance.
    pub workload: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            gap: 0.3,
            distribution: 0.3,
            workload: 0.4,
        }
    }
}

/// Penalty components and their weighted total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PenaltyBreakdown {
    /// Idle periods (groups + teachers).
    pub gap: f64,
    /// Summed per-course day-spread variance.
    pub distribution: f64,
    /// Teacher load variance.
    pub workload: f64,
    /// Weighted total.
    pub total: f64,
}

impl PenaltyBreakdown {
    /// Fitness to maximise.
    #[inline]
    pub fn fitness(&self) -> f64 {
        -self.total
    }
}

/// Index-based footprint of one session, as scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionShape {
    /// Group index.
    pub group: usize,
    /// Course index.
    pub course: usize,
    /// Teacher index.
    pub teacher: usize,
    /// Day index.
    pub day: usize,
    /// First period occupied.
    pub start: usize,
    /// Periods occupied.
    pub periods: usize,
}

/// Sizes of the scoring grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreDims {
    /// Number of groups.
    pub groups: usize,
    /// Number of courses.
    pub courses: usize,
    /// Number of teachers.
    pub teachers: usize,
    /// Days with timeslots.
    pub days: usize,
    /// Periods in the longest day.
    pub max_periods: usize,
}

impl ScoreDims {
    /// Grid sizes for a model.
    pub fn from_model(model: &EntityModel) -> Self {
        Self {
            groups: model.groups().len(),
            courses: model.courses().len(),
            teachers: model.teachers().len(),
            days: model.days().len(),
            max_periods: model.max_periods(),
        }
    }
}

/// Computes the penalty of a set of sessions.
pub fn penalty<I>(shapes: I, dims: ScoreDims, weights: &PenaltyWeights) -> PenaltyBreakdown
where
    I: IntoIterator<Item = SessionShape>,
{
    let row = dims.max_periods;
    let week = dims.days * row;
    let mut group_cells = vec![false; dims.groups * week];
    let mut teacher_cells = vec![false; dims.teachers * week];
    let mut course_days = vec![0u32; dims.courses * dims.days];
    let mut teacher_load = vec![0usize; dims.teachers];

    for s in shapes {
        for p in s.start..(s.start + s.periods).min(row) {
            let cell = s.day * row + p;
            group_cells[s.group * week + cell] = true;
            teacher_cells[s.teacher * week + cell] = true;
        }
        course_days[s.course * dims.days + s.day] += 1;
        teacher_load[s.teacher] += s.periods;
    }

    let gap = (idle_periods(&group_cells, row) + idle_periods(&teacher_cells, row)) as f64;

    let distribution: f64 = course_days
        .chunks(dims.days.max(1))
        .map(|counts| variance(counts.iter().map(|&c| c as f64)))
        .sum();

    let workload = variance(teacher_load.iter().map(|&l| l as f64));

    let total = weights.gap * gap + weights.distribution * distribution + weights.workload * workload;
    PenaltyBreakdown {
        gap,
        distribution,
        workload,
        total,
    }
}

/// Penalty of a schedule expressed with entity IDs.
///
/// Sessions referencing unknown entities are skipped.
pub fn schedule_penalty(
    model: &EntityModel,
    schedule: &Schedule,
    weights: &PenaltyWeights,
) -> PenaltyBreakdown {
    penalty(shapes_of(model, schedule), ScoreDims::from_model(model), weights)
}

/// Maps a schedule's sessions onto model indices.
pub fn shapes_of(model: &EntityModel, schedule: &Schedule) -> Vec<SessionShape> {
    schedule
        .sessions
        .iter()
        .filter_map(|s| {
            Some(SessionShape {
                group: model.group_position(s.group_id())?,
                course: model.course_position(s.course_id())?,
                teacher: model.teacher_position(&s.teacher_id)?,
                day: model.day_index(s.day)?,
                start: s.start_period,
                periods: s.periods,
            })
        })
        .collect()
}

/// Sum over all rows (entity-days) of unoccupied cells between the first
/// and last occupied cell.
fn idle_periods(cells: &[bool], row: usize) -> usize {
    if row == 0 {
        return 0;
    }
    cells
        .chunks(row)
        .map(|day| {
            let first = day.iter().position(|&b| b);
            let last = day.iter().rposition(|&b| b);
            match (first, last) {
                (Some(f), Some(l)) => day[f..=l].iter().filter(|&&b| !b).count(),
                _ => 0,
            }
        })
        .sum()
}

/// Population variance; 0 for an empty sequence.
fn variance(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let n = values.clone().count();
    if n == 0 {
        return 0.0;
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> ScoreDims {
        ScoreDims {
            groups: 1,
            courses: 2,
            teachers: 2,
            days: 2,
            max_periods: 4,
        }
    }

    fn shape(course: usize, teacher: usize, day: usize, start: usize, periods: usize) -> SessionShape {
        SessionShape {
            group: 0,
            course,
            teacher,
            day,
            start,
            periods,
        }
    }

    #[test]
    fn test_variance() {
        assert_eq!(variance([2.0, 2.0, 2.0].into_iter()), 0.0);
        assert!((variance([1.0, 3.0].into_iter()) - 1.0).abs() < 1e-12);
        assert_eq!(variance(std::iter::empty()), 0.0);
    }

    #[test]
    fn test_idle_periods() {
        // Day row: X . . X  → 2 idle
        let cells = [true, false, false, true, false, false, false, false];
        assert_eq!(idle_periods(&cells, 4), 2);
        // Single occupied cell → no gap
        assert_eq!(idle_periods(&[false, true, false, false], 4), 0);
    }

    #[test]
    fn test_gap_counts_groups_and_teachers() {
        // Group has P0 and P3 on day 0 (2 idle); T0 teaches P0, T1 teaches P3.
        let shapes = [shape(0, 0, 0, 0, 1), shape(1, 1, 0, 3, 1)];
        let p = penalty(shapes, dims(), &PenaltyWeights::default());
        assert_eq!(p.gap, 2.0);
        assert_eq!(p.workload, 0.0); // 1 period each
    }

    #[test]
    fn test_teacher_gap() {
        // Same teacher at P0 and P2: group gap 1, teacher gap 1
        let shapes = [shape(0, 0, 0, 0, 1), shape(1, 0, 0, 2, 1)];
        let p = penalty(shapes, dims(), &PenaltyWeights::default());
        assert_eq!(p.gap, 2.0);
        // Loads 2 and 0 → variance 1
        assert!((p.workload - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_multi_period_session_has_no_internal_gap() {
        let shapes = [shape(0, 0, 0, 1, 2), shape(1, 1, 0, 3, 1)];
        let p = penalty(shapes, dims(), &PenaltyWeights::default());
        assert_eq!(p.gap, 0.0);
    }

    #[test]
    fn test_distribution() {
        // Course 0 twice on day 0 → counts [2, 0] → variance 1
        let clustered = [shape(0, 0, 0, 0, 1), shape(0, 1, 0, 1, 1)];
        let spread = [shape(0, 0, 0, 0, 1), shape(0, 1, 1, 0, 1)];
        let w = PenaltyWeights::default();
        let a = penalty(clustered, dims(), &w);
        let b = penalty(spread, dims(), &w);
        assert!((a.distribution - 1.0).abs() < 1e-12);
        assert_eq!(b.distribution, 0.0);
        assert!(b.total < a.total);
    }

    #[test]
    fn test_weighted_total() {
        let shapes = [shape(0, 0, 0, 0, 1), shape(1, 0, 0, 2, 1)];
        let w = PenaltyWeights {
            gap: 1.0,
            distribution: 0.0,
            workload: 10.0,
        };
        let p = penalty(shapes, dims(), &w);
        assert!((p.total - (p.gap + 10.0 * p.workload)).abs() < 1e-12);
        assert_eq!(p.fitness(), -p.total);
    }

    #[test]
    fn test_empty_schedule() {
        let p = penalty(std::iter::empty(), dims(), &PenaltyWeights::default());
        assert_eq!(p, PenaltyBreakdown::default());
    }
}
