//! Candidate-index chromosome for timetables.
//!
//! # Encoding
//!
//! One gene per obligation (obligation order of the [`ProblemIndex`]).
//! Gene `i` is an index into obligation `i`'s candidate list, so every
//! decoded session already satisfies qualification, room policy,
//! contiguity and availability. Only the pairwise occupancy constraints
//! can be broken by recombination, and the operators repair those.

use serde::{Deserialize, Serialize};

use crate::cp::{Occupancy, ProblemIndex};
use crate::models::Schedule;
use crate::scoring::{penalty, PenaltyBreakdown, PenaltyWeights};

/// A complete timetable as one candidate index per obligation.
///
/// Higher fitness = better (`fitness = -penalty`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableChromosome {
    /// Candidate index per obligation.
    pub genes: Vec<usize>,
    /// Cached penalty; `None` until evaluated or after the genes change.
    pub penalty: Option<PenaltyBreakdown>,
}

impl TimetableChromosome {
    /// Wraps a gene vector (unevaluated).
    pub fn new(genes: Vec<usize>) -> Self {
        Self {
            genes,
            penalty: None,
        }
    }

    /// Number of genes.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Whether the chromosome has no genes.
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Fitness to maximise; `-inf` when unevaluated.
    pub fn fitness(&self) -> f64 {
        self.penalty
            .as_ref()
            .map_or(f64::NEG_INFINITY, PenaltyBreakdown::fitness)
    }

    /// Scores the chromosome and caches the result.
    pub fn evaluate(&mut self, index: &ProblemIndex<'_>, weights: &PenaltyWeights) -> f64 {
        let shapes = self
            .genes
            .iter()
            .enumerate()
            .map(|(o, &c)| index.shape(o, &index.domain(o).candidates[c]));
        let breakdown = penalty(shapes, index.score_dims(), weights);
        self.penalty = Some(breakdown);
        breakdown.fitness()
    }

    /// Whether the genes fit the index and no two sessions collide.
    pub fn is_consistent(&self, index: &ProblemIndex<'_>) -> bool {
        if self.genes.len() != index.len() {
            return false;
        }
        let mut occupancy = Occupancy::new(index);
        for (o, &c) in self.genes.iter().enumerate() {
            let Some(placement) = index.domain(o).candidates.get(c) else {
                return false;
            };
            if !occupancy.fits(index, o, placement) {
                return false;
            }
            occupancy.place(index, o, placement);
        }
        true
    }

    /// Occupancy of every session except `skip`. Assumes consistency.
    pub fn occupancy_without(&self, index: &ProblemIndex<'_>, skip: Option<usize>) -> Occupancy {
        let mut occupancy = Occupancy::new(index);
        for (o, &c) in self.genes.iter().enumerate() {
            if Some(o) != skip {
                occupancy.place(index, o, &index.domain(o).candidates[c]);
            }
        }
        occupancy
    }

    /// Decodes into a schedule.
    pub fn schedule(&self, index: &ProblemIndex<'_>) -> Schedule {
        index.schedule_from_choices(&self.genes)
    }
}
