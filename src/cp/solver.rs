//! Backtracking feasibility search.
//!
//! Chronological depth-first search over a static obligation order with
//! incremental occupancy, optional forward checking, and node / wall-clock
//! budgets. Returns the first consistent assignment found.
//!
//! # Algorithm
//!
//! 1. Any obligation with an empty candidate domain → infeasible at once
//! 2. Order obligations (most constrained first by default)
//! 3. For the obligation at the current depth, try its candidates in
//!    order; accept the first that fits the occupancy and, with forward
//!    checking, leaves every related unassigned obligation at least one
//!    fitting candidate
//! 4. No candidate left → undo the previous decision and resume it at its
//!    next candidate
//!
//! # Parallel Mode
//! The candidates of the first obligation become independent branches on
//! the rayon pool. The lowest-indexed successful branch wins and branches
//! after it are cancelled, so the result equals the sequential one
//! whenever neither run exhausts its budget.
//!
//! # Reference
//! - Haralick & Elliott (1980), "Increasing Tree Search Efficiency for
//!   Constraint Satisfaction Problems"
//! - Schaerf (1999), "A Survey of Automated Timetabling"

use std::cmp::Reverse;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SolverConfig;
use crate::error::{ConstraintClass, InfeasibilityError, SolverTimeoutError, TimetableError};
use crate::models::Schedule;

use super::builder::ProblemIndex;
use super::occupancy::{Conflict, Occupancy};

/// Deadline and cancellation are polled every this many nodes.
const CHECK_INTERVAL: u64 = 256;

/// Static ordering of obligations for the search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationOrder {
    /// Fewest candidates first; ties by longer duration, then declaration.
    #[default]
    MostConstrainedFirst,
    /// Obligation declaration order.
    Declaration,
}

/// Counters collected during search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Placements tried.
    pub nodes: u64,
    /// Decisions undone.
    pub backtracks: u64,
    /// Rejections on a busy or unavailable teacher.
    pub teacher_rejections: u64,
    /// Rejections on a busy room.
    pub room_rejections: u64,
    /// Rejections on a busy group period or a sibling day.
    pub timeslot_rejections: u64,
    /// Placements undone because a related obligation lost all options.
    pub forward_check_failures: u64,
}

impl SearchStats {
    fn record(&mut self, conflict: Conflict) {
        match conflict.class() {
            ConstraintClass::TeacherSupply => self.teacher_rejections += 1,
            ConstraintClass::RoomTypeSupply => self.room_rejections += 1,
            ConstraintClass::TimeslotSupply => self.timeslot_rejections += 1,
        }
    }

    /// Rejections counted against one constraint class.
    pub fn rejections(&self, class: ConstraintClass) -> u64 {
        match class {
            ConstraintClass::TeacherSupply => self.teacher_rejections,
            ConstraintClass::RoomTypeSupply => self.room_rejections,
            ConstraintClass::TimeslotSupply => self.timeslot_rejections,
        }
    }

    /// Class with the most rejections; `None` when nothing was rejected.
    ///
    /// Ties resolve teacher, room, timeslot.
    pub fn binding(&self) -> Option<ConstraintClass> {
        let mut binding = None;
        let mut most = 0;
        for class in [
            ConstraintClass::TeacherSupply,
            ConstraintClass::RoomTypeSupply,
            ConstraintClass::TimeslotSupply,
        ] {
            let n = self.rejections(class);
            if n > most {
                most = n;
                binding = Some(class);
            }
        }
        binding
    }

    fn merge(&mut self, other: &SearchStats) {
        self.nodes += other.nodes;
        self.backtracks += other.backtracks;
        self.teacher_rejections += other.teacher_rejections;
        self.room_rejections += other.room_rejections;
        self.timeslot_rejections += other.timeslot_rejections;
        self.forward_check_failures += other.forward_check_failures;
    }
}

/// A consistent assignment.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Candidate index chosen for each obligation, in obligation order.
    pub choices: Vec<usize>,
    /// Search statistics.
    pub stats: SearchStats,
    /// Wall-clock time spent (ms).
    pub elapsed_ms: u64,
}

impl Solution {
    /// Converts the choices into a schedule.
    pub fn schedule(&self, index: &ProblemIndex<'_>) -> Schedule {
        index.schedule_from_choices(&self.choices)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Found,
    Exhausted,
    OutOfBudget,
    Cancelled,
}

struct Budget<'b> {
    max_nodes: Option<u64>,
    deadline: Option<Instant>,
    shared_nodes: Option<&'b AtomicU64>,
    cancel: Option<(&'b AtomicUsize, usize)>,
}

impl Budget<'_> {
    fn exceeded(&self, local_nodes: u64) -> Option<Outcome> {
        let nodes = match self.shared_nodes {
            Some(counter) => counter.fetch_add(1, Ordering::Relaxed) + 1,
            None => local_nodes,
        };
        if self.max_nodes.is_some_and(|max| nodes > max) {
            return Some(Outcome::OutOfBudget);
        }
        if local_nodes % CHECK_INTERVAL == 0 {
            if self.deadline.is_some_and(|d| Instant::now() >= d) {
                return Some(Outcome::OutOfBudget);
            }
            if let Some((winner, branch)) = self.cancel {
                if winner.load(Ordering::Relaxed) < branch {
                    return Some(Outcome::Cancelled);
                }
            }
        }
        None
    }
}

struct SearchState {
    occupancy: Occupancy,
    assigned: Vec<Option<usize>>,
    stats: SearchStats,
    deepest: usize,
}

struct Run {
    outcome: Outcome,
    choices: Vec<usize>,
    stats: SearchStats,
    deepest: usize,
}

impl SearchState {
    fn new(index: &ProblemIndex<'_>) -> Self {
        Self {
            occupancy: Occupancy::new(index),
            assigned: vec![None; index.len()],
            stats: SearchStats::default(),
            deepest: 0,
        }
    }

    fn finish(self, outcome: Outcome) -> Run {
        let choices = if outcome == Outcome::Found {
            self.assigned.into_iter().flatten().collect()
        } else {
            Vec::new()
        };
        Run {
            outcome,
            choices,
            stats: self.stats,
            deepest: self.deepest,
        }
    }
}

/// Depth-first feasibility search.
///
/// # Example
/// ```
/// use u_timetable::config::SolverConfig;
/// use u_timetable::cp::{BacktrackingSolver, ConstraintBuilder};
/// use u_timetable::models::*;
///
/// let model = EntityModel::new(
///     vec![Course::theory("C1"), Course::theory("C2")],
///     vec![Teacher::new("T1").with_course("C1").with_course("C2")],
///     vec![Room::classroom("R1", 40)],
///     vec![
///         Timeslot::hourly("MON1", Weekday::Monday, 9),
///         Timeslot::hourly("MON2", Weekday::Monday, 10),
///     ],
///     vec![Group::new("G1").with_course("C1").with_course("C2")],
/// ).unwrap();
///
/// let index = ConstraintBuilder::new(&model).build().unwrap();
/// let solution = BacktrackingSolver::new(&index, SolverConfig::default()).solve().unwrap();
/// assert_eq!(solution.schedule(&index).session_count(), 2);
/// ```
pub struct BacktrackingSolver<'a> {
    index: &'a ProblemIndex<'a>,
    config: SolverConfig,
    /// Obligations sharing a group or a candidate teacher, per obligation.
    related: Vec<Vec<usize>>,
}

impl<'a> BacktrackingSolver<'a> {
    /// Creates a solver over a built problem.
    pub fn new(index: &'a ProblemIndex<'a>, config: SolverConfig) -> Self {
        let related = if config.forward_checking {
            related_obligations(index)
        } else {
            Vec::new()
        };
        Self {
            index,
            config,
            related,
        }
    }

    /// Searches for a consistent assignment.
    ///
    /// # Errors
    /// - [`TimetableError::Infeasible`] when the search space is exhausted
    ///   or an obligation has no candidate at all
    /// - [`TimetableError::Timeout`] when the node or time budget runs out
    pub fn solve(&self) -> Result<Solution, TimetableError> {
        let started = Instant::now();
        let total = self.index.len();
        info!(
            event = "solve_start",
            obligations = total,
            candidates = self.index.candidate_count(),
            ordering = ?self.config.ordering,
            forward_checking = self.config.forward_checking,
            parallel = self.config.parallel,
        );

        if let Some(domain) = self.index.domains().iter().find(|d| d.candidates.is_empty()) {
            warn!(
                event = "solve_infeasible",
                obligation = %domain.obligation.id,
                reason = "empty_domain",
            );
            return Err(InfeasibilityError {
                binding: Some(ConstraintClass::TeacherSupply),
                empty_domain: Some(domain.obligation.id.clone()),
                stats: SearchStats::default(),
            }
            .into());
        }

        let order = self.order();
        debug!(event = "search_order", first = ?order.first());
        let deadline = self.config.time_limit().map(|limit| started + limit);

        let run = if self.config.parallel && total > 1 {
            self.run_parallel(&order, deadline)
        } else {
            let mut state = SearchState::new(self.index);
            let budget = Budget {
                max_nodes: self.config.max_nodes,
                deadline,
                shared_nodes: None,
                cancel: None,
            };
            let outcome = self.search(&order, 0, &mut state, &budget);
            state.finish(outcome)
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match run.outcome {
            Outcome::Found => {
                info!(
                    event = "solve_complete",
                    nodes = run.stats.nodes,
                    backtracks = run.stats.backtracks,
                    elapsed_ms,
                );
                Ok(Solution {
                    choices: run.choices,
                    stats: run.stats,
                    elapsed_ms,
                })
            }
            Outcome::Exhausted => {
                let binding = run.stats.binding();
                warn!(
                    event = "solve_infeasible",
                    nodes = run.stats.nodes,
                    binding = ?binding,
                    elapsed_ms,
                );
                Err(InfeasibilityError {
                    binding,
                    empty_domain: None,
                    stats: run.stats,
                }
                .into())
            }
            Outcome::OutOfBudget | Outcome::Cancelled => {
                warn!(
                    event = "solve_timeout",
                    nodes = run.stats.nodes,
                    assigned = run.deepest,
                    total,
                    elapsed_ms,
                );
                Err(SolverTimeoutError {
                    stats: run.stats,
                    elapsed_ms,
                    assigned: run.deepest,
                    total,
                }
                .into())
            }
        }
    }

    fn order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.index.len()).collect();
        if self.config.ordering == ObligationOrder::MostConstrainedFirst {
            order.sort_by_key(|&o| {
                let d = self.index.domain(o);
                (d.candidates.len(), Reverse(d.obligation.duration), o)
            });
        }
        order
    }

    /// Searches `order[from..]` on top of the decisions already in `state`.
    fn search(
        &self,
        order: &[usize],
        from: usize,
        state: &mut SearchState,
        budget: &Budget<'_>,
    ) -> Outcome {
        let n = order.len();
        let mut cursor = vec![0usize; n];
        let mut depth = from;

        loop {
            if depth == n {
                return Outcome::Found;
            }
            let o = order[depth];
            let candidates = self.index.domain(o).candidates.len();

            let mut placed = false;
            while cursor[depth] < candidates {
                let c = cursor[depth];
                cursor[depth] += 1;
                state.stats.nodes += 1;
                if let Some(stop) = budget.exceeded(state.stats.nodes) {
                    return stop;
                }
                if self.try_place(o, c, state) {
                    placed = true;
                    break;
                }
            }

            if placed {
                depth += 1;
                state.deepest = state.deepest.max(depth);
                if depth < n {
                    cursor[depth] = 0;
                }
            } else {
                if depth == from {
                    return Outcome::Exhausted;
                }
                state.stats.backtracks += 1;
                depth -= 1;
                let prev = order[depth];
                if let Some(c) = state.assigned[prev].take() {
                    let placement = &self.index.domain(prev).candidates[c];
                    state.occupancy.remove(self.index, prev, placement);
                }
            }
        }
    }

    /// Places candidate `c` of obligation `o` if it is consistent.
    fn try_place(&self, o: usize, c: usize, state: &mut SearchState) -> bool {
        let placement = &self.index.domain(o).candidates[c];
        if let Err(conflict) = state.occupancy.check(self.index, o, placement) {
            state.stats.record(conflict);
            return false;
        }
        state.occupancy.place(self.index, o, placement);

        if self.config.forward_checking {
            let starved = self.related[o]
                .iter()
                .copied()
                .find(|&r| state.assigned[r].is_none() && !self.has_support(r, &state.occupancy));
            if let Some(r) = starved {
                // Blame the constraints that emptied the related domain
                for p in &self.index.domain(r).candidates {
                    if let Err(conflict) = state.occupancy.check(self.index, r, p) {
                        state.stats.record(conflict);
                    }
                }
                state.occupancy.remove(self.index, o, placement);
                state.stats.forward_check_failures += 1;
                return false;
            }
        }

        state.assigned[o] = Some(c);
        true
    }

    fn has_support(&self, o: usize, occupancy: &Occupancy) -> bool {
        self.index
            .domain(o)
            .candidates
            .iter()
            .any(|p| occupancy.fits(self.index, o, p))
    }

    fn run_parallel(&self, order: &[usize], deadline: Option<Instant>) -> Run {
        let root = order[0];
        let branches = self.index.domain(root).candidates.len();
        let winner = AtomicUsize::new(usize::MAX);
        let nodes = AtomicU64::new(0);

        let runs: Vec<Run> = (0..branches)
            .into_par_iter()
            .map(|c| {
                let mut state = SearchState::new(self.index);
                if winner.load(Ordering::Relaxed) < c {
                    return state.finish(Outcome::Cancelled);
                }
                let budget = Budget {
                    max_nodes: self.config.max_nodes,
                    deadline,
                    shared_nodes: Some(&nodes),
                    cancel: Some((&winner, c)),
                };
                state.stats.nodes += 1;
                if let Some(stop) = budget.exceeded(state.stats.nodes) {
                    return state.finish(stop);
                }
                if !self.try_place(root, c, &mut state) {
                    return state.finish(Outcome::Exhausted);
                }
                state.deepest = 1;
                let outcome = self.search(order, 1, &mut state, &budget);
                if outcome == Outcome::Found {
                    winner.fetch_min(c, Ordering::Relaxed);
                }
                state.finish(outcome)
            })
            .collect();

        let mut stats = SearchStats::default();
        let mut deepest = 0;
        for run in &runs {
            stats.merge(&run.stats);
            deepest = deepest.max(run.deepest);
        }
        let budget_hit = runs.iter().any(|r| r.outcome == Outcome::OutOfBudget);

        match runs.into_iter().find(|r| r.outcome == Outcome::Found) {
            Some(found) => Run {
                outcome: Outcome::Found,
                choices: found.choices,
                stats,
                deepest,
            },
            None => Run {
                outcome: if budget_hit {
                    Outcome::OutOfBudget
                } else {
                    Outcome::Exhausted
                },
                choices: Vec::new(),
                stats,
                deepest,
            },
        }
    }
}

/// Obligations that can interfere through a group or a teacher.
fn related_obligations(index: &ProblemIndex<'_>) -> Vec<Vec<usize>> {
    let model = index.model();
    let mut by_group = vec![Vec::new(); model.groups().len()];
    let mut by_teacher = vec![Vec::new(); model.teachers().len()];
    for (o, domain) in index.domains().iter().enumerate() {
        by_group[domain.group].push(o);
        for &t in index.qualified_teachers(domain.course) {
            by_teacher[t].push(o);
        }
    }

    index
        .domains()
        .iter()
        .enumerate()
        .map(|(o, domain)| {
            let mut related: Vec<usize> = by_group[domain.group]
                .iter()
                .chain(
                    index
                        .qualified_teachers(domain.course)
                        .iter()
                        .flat_map(|&t| by_teacher[t].iter()),
                )
                .copied()
                .filter(|&r| r != o)
                .collect();
            related.sort_unstable();
            related.dedup();
            related
        })
        .collect()
}
