//! Iteration / Results Store (§3, §4.5 item 6): per-iteration records
//! consulted by the termination checks and reporting. Append-only from the
//! single task thread (§5).

use serde::{Deserialize, Serialize};

use crate::status::{MipStatus, TerminationReason};

/// The index and signed value of the most-violated nonlinear constraint at a
/// point (§3, "max-deviation"). `constraint_index` is `None` when the
/// problem has no nonlinear constraints, in which case `value` is `-inf`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MaxDeviation {
    pub constraint_index: Option<usize>,
    pub value: f64,
}

impl MaxDeviation {
    pub fn none() -> Self {
        Self { constraint_index: None, value: f64::NEG_INFINITY }
    }

    pub fn is_feasible(&self, tolerance: f64) -> bool {
        self.value <= tolerance
    }
}

/// A point produced somewhere in the pipeline, with enough context to be
/// reused by primal bounding, reporting, and trace replay (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionPoint {
    pub x: Vec<f64>,
    pub objective_value: f64,
    pub max_deviation: MaxDeviation,
    pub iteration_found: u64,
}

/// Sealed per-iteration record (§3). Sealed after the iteration's final task
/// runs; nothing mutates it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Iteration {
    pub iteration_number: u64,
    pub mip_status: Option<MipStatus>,
    pub solution_pool: Vec<SolutionPoint>,
    pub hyperplanes_added: Vec<usize>,
    pub cumulative_hyperplane_count: usize,
    pub dual_bound: f64,
    pub primal_bound: f64,
}

impl Iteration {
    pub fn new(iteration_number: u64, cumulative_hyperplane_count: usize) -> Self {
        Self {
            iteration_number,
            mip_status: None,
            solution_pool: Vec::new(),
            hyperplanes_added: Vec::new(),
            cumulative_hyperplane_count,
            dual_bound: f64::NEG_INFINITY,
            primal_bound: f64::INFINITY,
        }
    }

    pub fn gap(&self) -> f64 {
        self.primal_bound - self.dual_bound
    }

    pub fn relative_gap(&self, delta: f64) -> f64 {
        self.gap() / self.primal_bound.abs().max(delta)
    }

    /// The largest `max_deviation` across the solution pool, or `-inf` if the
    /// pool is empty (matching [`MaxDeviation::none`]).
    pub fn worst_max_deviation(&self) -> f64 {
        self.solution_pool
            .iter()
            .map(|s| s.max_deviation.value)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Append-only record of a solve: every sealed [`Iteration`], the best bounds
/// found, and the reason the run finalized (§3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Results {
    pub iterations: Vec<Iteration>,
    pub best_primal_x: Option<Vec<f64>>,
    pub best_primal_value: f64,
    pub best_dual_value: f64,
    pub termination_reason: Option<TerminationReason>,
}

impl Results {
    pub fn new() -> Self {
        Self {
            iterations: Vec::new(),
            best_primal_x: None,
            best_primal_value: f64::INFINITY,
            best_dual_value: f64::NEG_INFINITY,
            termination_reason: None,
        }
    }

    /// Seals `iteration` into the log, updating the running best bounds.
    /// Dual bound is monotone non-decreasing and primal bound monotone
    /// non-increasing by construction (§8 invariant): callers must only ever
    /// pass in bounds that already respect this, which the tasks that build
    /// `Iteration` values are responsible for.
    pub fn push_iteration(&mut self, iteration: Iteration, primal_x: Option<Vec<f64>>) {
        if iteration.primal_bound < self.best_primal_value {
            self.best_primal_value = iteration.primal_bound;
            self.best_primal_x = primal_x;
        }
        if iteration.dual_bound > self.best_dual_value {
            self.best_dual_value = iteration.dual_bound;
        }
        self.iterations.push(iteration);
    }

    pub fn last_iteration(&self) -> Option<&Iteration> {
        self.iterations.last()
    }

    /// Finalizes the run. Fails if called twice (§8: "terminal iteration sets
    /// exactly one termination reason").
    pub fn finalize(&mut self, reason: TerminationReason) -> Result<(), TerminationReason> {
        if self.termination_reason.is_some() {
            return Err(reason);
        }
        self.termination_reason = Some(reason);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_can_only_be_called_once() {
        let mut results = Results::new();
        assert!(results.finalize(TerminationReason::AbsoluteGap).is_ok());
        assert!(results.finalize(TerminationReason::IterationLimit).is_err());
        assert_eq!(results.termination_reason, Some(TerminationReason::AbsoluteGap));
    }

    #[test]
    fn push_iteration_tracks_best_bounds_monotonically() {
        let mut results = Results::new();
        let mut first = Iteration::new(1, 0);
        first.dual_bound = 1.0;
        first.primal_bound = 10.0;
        results.push_iteration(first, Some(vec![1.0]));

        let mut second = Iteration::new(2, 0);
        second.dual_bound = 3.0;
        second.primal_bound = 5.0;
        results.push_iteration(second, Some(vec![2.0]));

        assert_eq!(results.best_dual_value, 3.0);
        assert_eq!(results.best_primal_value, 5.0);
        assert_eq!(results.best_primal_x, Some(vec![2.0]));
    }
}
