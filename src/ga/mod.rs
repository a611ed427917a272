//! Genetic soft-quality refinement.
//!
//! Improves a feasible timetable against the weighted soft penalty of
//! [`scoring`](crate::scoring) without ever leaving the feasible region.
//!
//! # Encoding
//!
//! A chromosome holds one gene per obligation: the index of its chosen
//! candidate placement in the [`ProblemIndex`](crate::cp::ProblemIndex).
//! Static hard constraints hold by construction; crossover and mutation
//! repair the dynamic ones.
//!
//! # Submodules
//!
//! - [`operators`]: Crossover, mutation and tournament selection
//!
//! # Reference
//! - Colorni, Dorigo & Maniezzo (1998), "Metaheuristics for High School
//!   Timetabling"
//! - Burke, Elliman & Weare (1995), "A Hybrid Genetic Algorithm for Highly
//!   Constrained Timetabling Problems"

mod chromosome;
pub mod operators;
mod refiner;

pub use chromosome::TimetableChromosome;
pub use operators::{tournament_select, CrossoverType, GeneticOperators};
pub use refiner::{GeneticRefiner, RefinementOutcome, StopReason};
