//! Genetic operators for timetable chromosomes.
//!
//! Every operator preserves consistency: given consistent parents it
//! returns consistent offspring, repairing collisions by a bounded random
//! scan of alternative candidates.
//!
//! # Usage
//!
//! ```
//! use u_timetable::ga::operators::{CrossoverType, GeneticOperators};
//!
//! let ops = GeneticOperators::default();
//! assert_eq!(ops.crossover_type, CrossoverType::Uniform);
//! assert_eq!(ops.repair_attempts, 32);
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cp::{Occupancy, ProblemIndex};

use super::chromosome::TimetableChromosome;

/// Crossover strategy over obligation-indexed genes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverType {
    /// Each obligation inherited from either parent with probability 1/2.
    #[default]
    Uniform,
    /// Prefix from one parent, suffix from the other, at a random cut.
    OnePoint,
}

/// Runtime-selectable crossover plus repair and mutation settings.
#[derive(Debug, Clone)]
pub struct GeneticOperators {
    /// Crossover strategy.
    pub crossover_type: CrossoverType,
    /// Random alternatives tried when a session must move.
    pub repair_attempts: usize,
}

impl Default for GeneticOperators {
    fn default() -> Self {
        Self {
            crossover_type: CrossoverType::Uniform,
            repair_attempts: 32,
        }
    }
}

impl GeneticOperators {
    /// Crosses two consistent parents into two consistent children.
    ///
    /// Child 1 keeps `p1`'s genes outside the exchanged positions and
    /// inherits `p2`'s inside them; child 2 mirrors it. A child whose
    /// repair fails is replaced by a clone of its home parent.
    pub fn crossover<R: Rng>(
        &self,
        p1: &TimetableChromosome,
        p2: &TimetableChromosome,
        index: &ProblemIndex<'_>,
        rng: &mut R,
    ) -> (TimetableChromosome, TimetableChromosome) {
        let n = p1.len().min(p2.len());
        let exchange: Vec<bool> = match self.crossover_type {
            CrossoverType::Uniform => (0..n).map(|_| rng.random_bool(0.5)).collect(),
            CrossoverType::OnePoint => {
                if n < 2 {
                    return (p1.clone(), p2.clone());
                }
                let cut = rng.random_range(1..n);
                (0..n).map(|i| i >= cut).collect()
            }
        };

        let c1 = self
            .build_child(p1, p2, &exchange, index, rng)
            .map_or_else(|| p1.clone(), TimetableChromosome::new);
        let c2 = self
            .build_child(p2, p1, &exchange, index, rng)
            .map_or_else(|| p2.clone(), TimetableChromosome::new);
        (c1, c2)
    }

    /// Moves one random session to a different consistent candidate.
    ///
    /// Returns `false` (chromosome untouched) when no alternative was found
    /// within the repair budget.
    pub fn mutate<R: Rng>(
        &self,
        chromosome: &mut TimetableChromosome,
        index: &ProblemIndex<'_>,
        rng: &mut R,
    ) -> bool {
        if chromosome.is_empty() {
            return false;
        }
        let o = rng.random_range(0..chromosome.len());
        let current = chromosome.genes[o];
        if index.domain(o).candidates.len() < 2 {
            return false;
        }
        let occupancy = chromosome.occupancy_without(index, Some(o));
        match self.scan(o, Some(current), &occupancy, index, rng) {
            Some(c) => {
                chromosome.genes[o] = c;
                chromosome.penalty = None;
                true
            }
            None => false,
        }
    }

    /// Assembles `home`'s genes with `donor`'s at the exchanged positions.
    fn build_child<R: Rng>(
        &self,
        home: &TimetableChromosome,
        donor: &TimetableChromosome,
        exchange: &[bool],
        index: &ProblemIndex<'_>,
        rng: &mut R,
    ) -> Option<Vec<usize>> {
        let mut genes = home.genes.clone();
        let mut occupancy = Occupancy::new(index);
        for (o, &c) in home.genes.iter().enumerate() {
            if !exchange.get(o).copied().unwrap_or(false) {
                occupancy.place(index, o, &index.domain(o).candidates[c]);
            }
        }

        for (o, _) in exchange.iter().enumerate().filter(|&(_, &x)| x) {
            let candidates = &index.domain(o).candidates;
            let inherited = donor.genes[o];
            let chosen = if occupancy.fits(index, o, &candidates[inherited]) {
                inherited
            } else if let Some(c) = self.scan(o, None, &occupancy, index, rng) {
                c
            } else if occupancy.fits(index, o, &candidates[home.genes[o]]) {
                home.genes[o]
            } else {
                return None;
            };
            genes[o] = chosen;
            occupancy.place(index, o, &candidates[chosen]);
        }
        Some(genes)
    }

    /// Draws up to `repair_attempts` random candidates of `o` and returns
    /// the first that fits and differs from `exclude`.
    fn scan<R: Rng>(
        &self,
        o: usize,
        exclude: Option<usize>,
        occupancy: &Occupancy,
        index: &ProblemIndex<'_>,
        rng: &mut R,
    ) -> Option<usize> {
        let candidates = &index.domain(o).candidates;
        if candidates.is_empty() {
            return None;
        }
        for _ in 0..self.repair_attempts {
            let c = rng.random_range(0..candidates.len());
            if Some(c) != exclude && occupancy.fits(index, o, &candidates[c]) {
                return Some(c);
            }
        }
        None
    }
}

/// Tournament selection with replacement.
///
/// Draws `size` members uniformly and returns the fittest; ties go to the
/// earliest draw. `population` must be non-empty.
pub fn tournament_select<'p, R: Rng>(
    population: &'p [TimetableChromosome],
    size: usize,
    rng: &mut R,
) -> &'p TimetableChromosome {
    let mut best = &population[rng.random_range(0..population.len())];
    for _ in 1..size.max(1) {
        let challenger = &population[rng.random_range(0..population.len())];
        if challenger.fitness() > best.fitness() {
            best = challenger;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::ConstraintBuilder;
    use crate::models::{Course, EntityModel, Group, Room, Teacher, Timeslot, Weekday};
    use crate::scoring::PenaltyWeights;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// 2 groups × 3 courses, 2 teachers, 2 rooms, 2 days × 4 periods.
    fn model() -> EntityModel {
        let timeslots = [Weekday::Monday, Weekday::Tuesday]
            .iter()
            .flat_map(|&d| (0..4).map(move |i| Timeslot::hourly(format!("{d}{i}"), d, 9 + i)))
            .collect();
        EntityModel::new(
            vec![Course::theory("C1"), Course::theory("C2"), Course::theory("C3")],
            vec![
                Teacher::new("T1").with_course("C1").with_course("C2"),
                Teacher::new("T2").with_course("C2").with_course("C3"),
            ],
            vec![Room::classroom("R1", 40), Room::classroom("R2", 40)],
            timeslots,
            vec![
                Group::new("G1").with_course("C1").with_course("C2").with_course("C3"),
                Group::new("G2").with_course("C1").with_course("C2").with_course("C3"),
            ],
        )
        .unwrap()
    }

    /// A consistent chromosome built greedily in obligation order.
    fn greedy(index: &ProblemIndex<'_>, skip: usize) -> TimetableChromosome {
        let mut occ = Occupancy::new(index);
        let genes = (0..index.len())
            .map(|o| {
                let candidates = &index.domain(o).candidates;
                let c = (0..candidates.len())
                    .map(|i| (i + skip) % candidates.len())
                    .find(|&c| occ.fits(index, o, &candidates[c]))
                    .unwrap();
                occ.place(index, o, &candidates[c]);
                c
            })
            .collect();
        TimetableChromosome::new(genes)
    }

    #[test]
    fn test_uniform_crossover_keeps_consistency() {
        let model = model();
        let index = ConstraintBuilder::new(&model).build().unwrap();
        let p1 = greedy(&index, 0);
        let p2 = greedy(&index, 7);
        assert!(p1.is_consistent(&index) && p2.is_consistent(&index));

        let ops = GeneticOperators::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..50 {
            let (c1, c2) = ops.crossover(&p1, &p2, &index, &mut rng);
            assert!(c1.is_consistent(&index));
            assert!(c2.is_consistent(&index));
        }
    }

    #[test]
    fn test_one_point_crossover_keeps_prefix() {
        let model = model();
        let index = ConstraintBuilder::new(&model).build().unwrap();
        let p1 = greedy(&index, 0);
        let p2 = greedy(&index, 5);
        let ops = GeneticOperators {
            crossover_type: CrossoverType::OnePoint,
            ..GeneticOperators::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            let (c1, c2) = ops.crossover(&p1, &p2, &index, &mut rng);
            assert!(c1.is_consistent(&index));
            assert!(c2.is_consistent(&index));
            // Gene 0 is always before the cut
            assert_eq!(c1.genes[0], p1.genes[0]);
            assert_eq!(c2.genes[0], p2.genes[0]);
        }
    }

    #[test]
    fn test_crossover_of_identical_parents() {
        let model = model();
        let index = ConstraintBuilder::new(&model).build().unwrap();
        let p = greedy(&index, 3);
        let ops = GeneticOperators::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let (c1, c2) = ops.crossover(&p, &p, &index, &mut rng);
        assert_eq!(c1.genes, p.genes);
        assert_eq!(c2.genes, p.genes);
    }

    #[test]
    fn test_mutation_moves_one_session() {
        let model = model();
        let index = ConstraintBuilder::new(&model).build().unwrap();
        let ops = GeneticOperators::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let original = greedy(&index, 0);

        let mut mutated = 0;
        for _ in 0..20 {
            let mut ch = original.clone();
            ch.evaluate(&index, &PenaltyWeights::default());
            if ops.mutate(&mut ch, &index, &mut rng) {
                mutated += 1;
                let changed = ch
                    .genes
                    .iter()
                    .zip(&original.genes)
                    .filter(|(a, b)| a != b)
                    .count();
                assert_eq!(changed, 1);
                assert!(ch.penalty.is_none());
                assert!(ch.is_consistent(&index));
            }
        }
        assert!(mutated > 0);
    }

    #[test]
    fn test_mutation_without_alternatives() {
        let model = EntityModel::new(
            vec![Course::theory("C1")],
            vec![Teacher::new("T1").with_course("C1")],
            vec![Room::classroom("R1", 40)],
            vec![Timeslot::hourly("MON0", Weekday::Monday, 9)],
            vec![Group::new("G1").with_course("C1")],
        )
        .unwrap();
        let index = ConstraintBuilder::new(&model).build().unwrap();
        let mut ch = TimetableChromosome::new(vec![0]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(!GeneticOperators::default().mutate(&mut ch, &index, &mut rng));
        assert_eq!(ch.genes, vec![0]);
    }

    #[test]
    fn test_tournament_prefers_fitter() {
        let model = model();
        let index = ConstraintBuilder::new(&model).build().unwrap();
        let w = PenaltyWeights::default();
        let mut population: Vec<TimetableChromosome> =
            (0..3).map(|skip| greedy(&index, skip * 5)).collect();
        for ch in &mut population {
            ch.evaluate(&index, &w);
        }
        let best = population
            .iter()
            .map(TimetableChromosome::fitness)
            .fold(f64::NEG_INFINITY, f64::max);

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let winner = tournament_select(&population, 50, &mut rng);
        assert_eq!(winner.fitness(), best);

        // Size 1 is a uniform draw
        let any = tournament_select(&population, 1, &mut rng);
        assert!(population.iter().any(|p| p.genes == any.genes));
    }
}
