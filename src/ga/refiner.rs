//! Generational genetic refinement of feasible timetables.
//!
//! # Loop
//!
//! 1. Population = seeds, then seed clones perturbed by feasible mutations
//! 2. Evaluate (rayon when `parallel_evaluation`)
//! 3. Next generation = elite + offspring of tournament-selected pairs,
//!    crossed with `crossover_probability`, mutated with
//!    `mutation_probability`
//! 4. Stop on generation count, stagnation, or the wall-clock budget
//!
//! All random draws happen on the calling thread, so the outcome depends
//! only on the seed, never on the thread count.

use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RefinerConfig;
use crate::cp::ProblemIndex;
use crate::error::RefinementIncomplete;
use crate::models::Schedule;
use crate::scoring::{PenaltyBreakdown, PenaltyWeights};

use super::chromosome::TimetableChromosome;
use super::operators::{tournament_select, GeneticOperators};

/// Why refinement stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// All configured generations ran.
    Generations,
    /// No improvement for `stagnation_limit` generations.
    Stagnation,
    /// Wall-clock budget exhausted.
    TimeLimit,
    /// Refinement disabled in the configuration.
    Disabled,
}

/// Result of a refinement run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementOutcome {
    /// Best chromosome seen.
    pub best: TimetableChromosome,
    /// Best chromosome decoded.
    pub schedule: Schedule,
    /// Penalty of the best chromosome.
    pub penalty: PenaltyBreakdown,
    /// Best fitness after initialisation and after each generation.
    pub history: Vec<f64>,
    /// Generations completed.
    pub generations_run: usize,
    /// Why the loop ended.
    pub stop_reason: StopReason,
    /// Set when the budget cut the run short.
    pub incomplete: Option<RefinementIncomplete>,
}

impl RefinementOutcome {
    /// Wraps an assignment that did not go through refinement.
    pub fn unrefined(
        index: &ProblemIndex<'_>,
        genes: Vec<usize>,
        weights: &PenaltyWeights,
        stop_reason: StopReason,
    ) -> Self {
        let mut best = TimetableChromosome::new(genes);
        let fitness = best.evaluate(index, weights);
        Self {
            schedule: best.schedule(index),
            penalty: best.penalty.unwrap_or_default(),
            best,
            history: vec![fitness],
            generations_run: 0,
            stop_reason,
            incomplete: None,
        }
    }
}

fn probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Genetic refiner over a [`ProblemIndex`].
///
/// # Example
/// ```
/// use u_timetable::config::{RefinerConfig, SolverConfig};
/// use u_timetable::cp::{BacktrackingSolver, ConstraintBuilder};
/// use u_timetable::ga::GeneticRefiner;
/// use u_timetable::models::*;
/// use u_timetable::scoring::PenaltyWeights;
///
/// let model = EntityModel::new(
///     vec![Course::theory("C1"), Course::theory("C2")],
///     vec![Teacher::new("T1").with_course("C1").with_course("C2")],
///     vec![Room::classroom("R1", 40)],
///     (0..4).map(|i| Timeslot::hourly(format!("MON{i}"), Weekday::Monday, 9 + i)).collect(),
///     vec![Group::new("G1").with_course("C1").with_course("C2")],
/// ).unwrap();
///
/// let index = ConstraintBuilder::new(&model).build().unwrap();
/// let seed = BacktrackingSolver::new(&index, SolverConfig::default()).solve().unwrap();
///
/// let refiner = GeneticRefiner::new(&index, RefinerConfig::default(), PenaltyWeights::default());
/// let outcome = refiner.run(&[seed.choices]).unwrap();
/// assert!(outcome.best.is_consistent(&index));
/// ```
pub struct GeneticRefiner<'a> {
    index: &'a ProblemIndex<'a>,
    config: RefinerConfig,
    weights: PenaltyWeights,
    operators: GeneticOperators,
}

impl<'a> GeneticRefiner<'a> {
    /// Creates a refiner.
    ///
    /// Probabilities outside `[0, 1]` are clamped and NaN counts as 0, so a
    /// config that skipped [`RefinerConfig::validate`] still runs.
    pub fn new(index: &'a ProblemIndex<'a>, mut config: RefinerConfig, weights: PenaltyWeights) -> Self {
        config.crossover_probability = probability(config.crossover_probability);
        config.mutation_probability = probability(config.mutation_probability);
        let operators = GeneticOperators {
            crossover_type: config.crossover,
            repair_attempts: config.repair_attempts,
        };
        Self {
            index,
            config,
            weights,
            operators,
        }
    }

    /// Runs with a `ChaCha8Rng` seeded from `config.seed`.
    ///
    /// Returns `None` when no seed is a consistent assignment of the index.
    pub fn run(&self, seeds: &[Vec<usize>]) -> Option<RefinementOutcome> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.run_with_rng(seeds, &mut rng)
    }

    /// Runs with a caller-provided random source.
    pub fn run_with_rng<R: Rng>(&self, seeds: &[Vec<usize>], rng: &mut R) -> Option<RefinementOutcome> {
        let started = Instant::now();
        let deadline = self.config.time_limit().map(|limit| started + limit);

        let mut population = self.initial_population(seeds, rng)?;
        self.evaluate(&mut population);
        let mut best = fittest(&population).clone();
        let mut history = vec![best.fitness()];

        info!(
            event = "refine_start",
            population = population.len(),
            generations = self.config.generations,
            initial_penalty = -best.fitness(),
        );

        let mut generations_run = 0;
        let mut stagnant = 0;
        let mut stop_reason = StopReason::Generations;

        for generation in 1..=self.config.generations {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                stop_reason = StopReason::TimeLimit;
                break;
            }

            population = self.next_generation(&population, &best, rng);
            self.evaluate(&mut population);
            generations_run = generation;

            let champion = fittest(&population);
            if champion.fitness() > best.fitness() {
                best = champion.clone();
                stagnant = 0;
            } else {
                stagnant += 1;
            }
            history.push(best.fitness());

            debug!(
                event = "generation",
                generation,
                best_penalty = -best.fitness(),
                stagnant,
            );

            if self.config.stagnation_limit.is_some_and(|limit| stagnant >= limit) {
                stop_reason = StopReason::Stagnation;
                break;
            }
        }

        let incomplete = (stop_reason == StopReason::TimeLimit).then(|| RefinementIncomplete {
            generations_run,
            generations_planned: self.config.generations,
            budget_ms: self.config.time_limit_ms.unwrap_or_default(),
        });
        if let Some(warning) = &incomplete {
            warn!(event = "refine_incomplete", %warning);
        }

        let penalty = best.penalty.unwrap_or_default();
        info!(
            event = "refine_complete",
            generations_run,
            stop_reason = ?stop_reason,
            best_penalty = penalty.total,
            elapsed_ms = started.elapsed().as_millis() as u64,
        );

        Some(RefinementOutcome {
            schedule: best.schedule(self.index),
            best,
            penalty,
            history,
            generations_run,
            stop_reason,
            incomplete,
        })
    }

    fn initial_population<R: Rng>(
        &self,
        seeds: &[Vec<usize>],
        rng: &mut R,
    ) -> Option<Vec<TimetableChromosome>> {
        let size = self.config.population_size.max(1);
        let seeds: Vec<TimetableChromosome> = seeds
            .iter()
            .map(|genes| TimetableChromosome::new(genes.clone()))
            .filter(|ch| ch.is_consistent(self.index))
            .take(size)
            .collect();
        if seeds.is_empty() {
            return None;
        }

        let mut population = seeds.clone();
        let mut next_seed = 0;
        while population.len() < size {
            let mut clone = seeds[next_seed % seeds.len()].clone();
            next_seed += 1;
            for _ in 0..self.config.initial_mutations {
                self.operators.mutate(&mut clone, self.index, rng);
            }
            population.push(clone);
        }
        Some(population)
    }

    fn next_generation<R: Rng>(
        &self,
        population: &[TimetableChromosome],
        elite: &TimetableChromosome,
        rng: &mut R,
    ) -> Vec<TimetableChromosome> {
        let size = population.len();
        let pool: Vec<&TimetableChromosome> = (0..size.saturating_sub(1))
            .map(|_| tournament_select(population, self.config.tournament_size, rng))
            .collect();

        let mut next = Vec::with_capacity(size);
        next.push(elite.clone());
        for pair in pool.chunks(2) {
            match pair {
                [a, b] => {
                    if rng.random_bool(self.config.crossover_probability) {
                        let (c1, c2) = self.operators.crossover(a, b, self.index, rng);
                        next.push(c1);
                        next.push(c2);
                    } else {
                        next.push((*a).clone());
                        next.push((*b).clone());
                    }
                }
                [a] => next.push((*a).clone()),
                _ => {}
            }
        }

        for child in next.iter_mut().skip(1) {
            if rng.random_bool(self.config.mutation_probability) {
                self.operators.mutate(child, self.index, rng);
            }
        }
        next
    }

    fn evaluate(&self, population: &mut [TimetableChromosome]) {
        let (index, weights) = (self.index, &self.weights);
        if self.config.parallel_evaluation {
            population
                .par_iter_mut()
                .filter(|ch| ch.penalty.is_none())
                .for_each(|ch| {
                    ch.evaluate(index, weights);
                });
        } else {
            for ch in population.iter_mut().filter(|ch| ch.penalty.is_none()) {
                ch.evaluate(index, weights);
            }
        }
    }
}

/// Fittest member; ties go to the earliest.
fn fittest(population: &[TimetableChromosome]) -> &TimetableChromosome {
    population
        .iter()
        .skip(1)
        .fold(&population[0], |best, ch| {
            if ch.fitness() > best.fitness() {
                ch
            } else {
                best
            }
        })
}
