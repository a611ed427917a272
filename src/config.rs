//! Run configuration.
//!
//! Load from TOML to tune the search budgets, genetic parameters, penalty
//! weights and room policy without code changes. Every field has a
//! default, so an empty document is a valid configuration.
//!
//! # Examples
//!
//! ```
//! use u_timetable::config::TimetableConfig;
//!
//! let config = TimetableConfig::from_toml_str(r#"
//!     [solver]
//!     max_nodes = 50000
//!
//!     [refiner]
//!     population_size = 30
//!     generations = 25
//!     seed = 7
//!
//!     [weights]
//!     workload = 0.6
//! "#).unwrap();
//!
//! assert_eq!(config.solver.max_nodes, Some(50_000));
//! assert_eq!(config.refiner.population_size, 30);
//! assert!((config.weights.gap - 0.3).abs() < 1e-12);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cp::ObligationOrder;
use crate::ga::CrossoverType;
use crate::models::{RoomPolicy, SessionFrequency};
use crate::scoring::PenaltyWeights;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration of a timetabling run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimetableConfig {
    /// Feasibility search settings.
    pub solver: SolverConfig,
    /// Genetic refinement settings.
    pub refiner: RefinerConfig,
    /// Soft-penalty weights.
    pub weights: PenaltyWeights,
    /// Room types allowed per course type.
    pub room_policy: RoomPolicy,
    /// Weekly sessions per course type.
    pub frequency: SessionFrequency,
}

/// Feasibility search settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum search nodes (placements tried). `None` = unbounded.
    pub max_nodes: Option<u64>,
    /// Wall-clock budget (ms). `None` = unbounded.
    pub time_limit_ms: Option<u64>,
    /// Static obligation ordering.
    pub ordering: ObligationOrder,
    /// Reject placements that leave a related obligation without options.
    pub forward_checking: bool,
    /// Split the first decision across worker threads.
    pub parallel: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_nodes: Some(2_000_000),
            time_limit_ms: Some(60_000),
            ordering: ObligationOrder::MostConstrainedFirst,
            forward_checking: true,
            parallel: false,
        }
    }
}

impl SolverConfig {
    /// Wall-clock budget as a `Duration`.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }
}

/// Genetic refinement settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RefinerConfig {
    /// Run refinement at all. When off, the feasible seed is returned as is.
    pub enabled: bool,
    /// Candidates per generation.
    pub population_size: usize,
    /// Maximum generations.
    pub generations: usize,
    /// Probability of crossing a selected pair.
    pub crossover_probability: f64,
    /// Probability of mutating an offspring.
    pub mutation_probability: f64,
    /// Tournament size for selection.
    pub tournament_size: usize,
    /// Stop after this many generations without improvement. `None` = never.
    pub stagnation_limit: Option<usize>,
    /// Wall-clock budget (ms). `None` = unbounded.
    pub time_limit_ms: Option<u64>,
    /// Random seed.
    pub seed: u64,
    /// Alternative candidates tried when repairing or mutating one session.
    pub repair_attempts: usize,
    /// Mutations applied to seed clones when filling the first population.
    pub initial_mutations: usize,
    /// Crossover operator.
    pub crossover: CrossoverType,
    /// Score candidates on the rayon pool.
    pub parallel_evaluation: bool,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            population_size: 20,
            generations: 10,
            crossover_probability: 0.7,
            mutation_probability: 0.2,
            tournament_size: 3,
            stagnation_limit: Some(5),
            time_limit_ms: None,
            seed: 42,
            repair_attempts: 32,
            initial_mutations: 2,
            crossover: CrossoverType::Uniform,
            parallel_evaluation: true,
        }
    }
}

impl RefinerConfig {
    /// Wall-clock budget as a `Duration`.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    /// Checks population, tournament and probability ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::Invalid(format!(
                "refineself.population_size must be at least 2, got {}",
                self.population_size
            )));
        }
        if self.tournament_size == 0 {
            return Err(ConfigError::Invalid(
                "refineself.tournament_size must be at least 1".into(),
            ));
        }
        for (name, p) in [
            ("crossover_probability", self.crossover_probability),
            ("mutation_probability", self.mutation_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Invalid(format!(
                    "refiner.{name} must be within [0, 1], got {p}"
                )));
            }
        }
        Ok(())
    }
}

impl TimetableConfig {
    /// Creates a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file can't be read, contains invalid TOML,
    /// or fails [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the refiner's random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.refiner.seed = seed;
        self
    }

    /// Sets the solver's node budget.
    pub fn with_max_nodes(mut self, max_nodes: u64) -> Self {
        self.solver.max_nodes = Some(max_nodes);
        self
    }

    /// Sets population size and generation count.
    pub fn with_population(mut self, population_size: usize, generations: usize) -> Self {
        self.refiner.population_size = population_size;
        self.refiner.generations = generations;
        self
    }

    /// Sets the room policy.
    pub fn with_room_policy(mut self, policy: RoomPolicy) -> Self {
        self.room_policy = policy;
        self
    }

    /// Sets the weekly session frequency.
    pub fn with_frequency(mut self, frequency: SessionFrequency) -> Self {
        self.frequency = frequency;
        self
    }

    /// Enables or disables parallel feasibility search.
    pub fn with_parallel_solver(mut self, parallel: bool) -> Self {
        self.solver.parallel = parallel;
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.refiner.validate()?;
        let w = &self.weights;
        for (name, v) in [
            ("gap", w.gap),
            ("distribution", w.distribution),
            ("workload", w.workload),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "weights.{name} must be a non-negative number, got {v}"
                )));
            }
        }
        if self.solver.max_nodes == Some(0) {
            return Err(ConfigError::Invalid("solver.max_nodes must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseType, RoomType};

    #[test]
    fn test_defaults() {
        let c = TimetableConfig::default();
        assert_eq!(c.refiner.population_size, 20);
        assert_eq!(c.refiner.generations, 10);
        assert!((c.refiner.crossover_probability - 0.7).abs() < 1e-12);
        assert!((c.refiner.mutation_probability - 0.2).abs() < 1e-12);
        assert_eq!(c.refiner.tournament_size, 3);
        assert!((c.weights.workload - 0.4).abs() < 1e-12);
        assert_eq!(c.solver.ordering, ObligationOrder::MostConstrainedFirst);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let c = TimetableConfig::from_toml_str("").unwrap();
        assert_eq!(c, TimetableConfig::default());
    }

    #[test]
    fn test_toml_sections() {
        let c = TimetableConfig::from_toml_str(
            r#"
            [solver]
            ordering = "declaration"
            parallel = true
            time_limit_ms = 500

            [refiner]
            crossover = "one_point"
            stagnation_limit = 3

            [room_policy]
            practical = ["classroom", "lab"]

            [frequency]
            theory = 3
            lab = 2
            "#,
        )
        .unwrap();

        assert_eq!(c.solver.ordering, ObligationOrder::Declaration);
        assert!(c.solver.parallel);
        assert_eq!(c.solver.time_limit(), Some(Duration::from_millis(500)));
        assert_eq!(c.refiner.crossover, CrossoverType::OnePoint);
        assert_eq!(c.refiner.stagnation_limit, Some(3));
        assert!(c.room_policy.allows(CourseType::Practical, RoomType::Lab));
        assert!(c.room_policy.allows(CourseType::Lab, RoomType::Lab));
        assert_eq!(c.frequency.sessions_for(CourseType::Theory), 3);
        assert_eq!(c.frequency.sessions_for(CourseType::Project), 1);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = TimetableConfig::from_toml_str("[refiner]\nmutation_probability = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = TimetableConfig::from_toml_str("[refiner]\npopulation_size = 1").unwrap_err();
        assert!(err.to_string().contains("population_size"));

        let err = TimetableConfig::from_toml_str("[weights]\ngap = -1.0").unwrap_err();
        assert!(err.to_string().contains("weights.gap"));
    }

    #[test]
    fn test_parse_error() {
        let err = TimetableConfig::from_toml_str("[solver\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = TimetableConfig::load("/nonexistent/timetable.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_builders() {
        let c = TimetableConfig::new()
            .with_seed(9)
            .with_max_nodes(100)
            .with_population(8, 4)
            .with_parallel_solver(true);
        assert_eq!(c.refiner.seed, 9);
        assert_eq!(c.solver.max_nodes, Some(100));
        assert_eq!(c.refiner.population_size, 8);
        assert_eq!(c.refiner.generations, 4);
        assert!(c.solver.parallel);
    }
}
