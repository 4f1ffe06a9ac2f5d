//! Primal Bounding, fixed-integer NLP (§4.6): for each new integer
//! assignment surfacing in the MIP solution pool, fix discretes and
//! re-solve the continuous relaxation; register an improving feasible point
//! as a primal candidate, or cut the assignment out if it fails.

use std::collections::{HashMap, VecDeque};

use crate::adapters::nlp::NlpSolver;
use crate::error::EshResult;
use crate::problem::Problem;
use crate::reformulate::ReformulatedProblem;
use crate::settings::Settings;
use crate::status::NlpStatus;

/// Why a [`PrimalCandidate`] was queued (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimalCandidateSource {
    FirstSolution,
    FeasibleSolution,
    InfeasibleSolution,
    SmallestDeviation,
    NewDualBound,
}

#[derive(Debug, Clone)]
pub struct PrimalCandidate {
    pub x: Vec<f64>,
    pub source: PrimalCandidateSource,
}

/// Remembers previously NLP-tested integer projections, keyed by the
/// rounded discrete vector (§4.6).
///
/// Deliberately preserves a one-off quirk rather than fixing it silently
/// (§9 Open Question (b)): a projection is only treated as a duplicate
/// starting from its *third* appearance, because the original source's
/// inner filtering loop still allowed an insert when exactly one prior
/// point matched. The second occurrence of a given projection is re-tested;
/// only the third onward is skipped.
#[derive(Debug, Default)]
pub struct TestedPointMemory {
    seen_counts: HashMap<Vec<i64>, u32>,
}

impl TestedPointMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `key` should be NLP-tested this time.
    pub fn should_test(&mut self, key: Vec<i64>) -> bool {
        let count = self.seen_counts.entry(key).or_insert(0);
        *count += 1;
        *count <= 2
    }
}

/// Success multiplies the window by a shrink factor (floored at the
/// configured original); failure multiplies by a growth factor (ceiled at
/// `frequency_ceiling_factor` times the original), §4.6.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveCadence {
    pub iteration_frequency: f64,
    pub time_frequency_secs: f64,
    base_iteration: f64,
    base_time: f64,
}

impl AdaptiveCadence {
    pub fn new(settings: &Settings) -> Self {
        Self {
            iteration_frequency: settings.primal_bounding_iteration_frequency as f64,
            time_frequency_secs: settings.primal_bounding_time_frequency_secs,
            base_iteration: settings.primal_bounding_iteration_frequency as f64,
            base_time: settings.primal_bounding_time_frequency_secs,
        }
    }

    pub fn on_success(&mut self, settings: &Settings) {
        self.iteration_frequency = (self.iteration_frequency * settings.primal_bounding_success_iteration_factor).max(self.base_iteration);
        self.time_frequency_secs = (self.time_frequency_secs * settings.primal_bounding_success_time_factor).max(self.base_time);
    }

    pub fn on_failure(&mut self, settings: &Settings) {
        let ceiling_iter = self.base_iteration * settings.primal_bounding_frequency_ceiling_factor;
        let ceiling_time = self.base_time * settings.primal_bounding_frequency_ceiling_factor;
        self.iteration_frequency = (self.iteration_frequency * settings.primal_bounding_failure_iteration_factor).min(ceiling_iter);
        self.time_frequency_secs = (self.time_frequency_secs * settings.primal_bounding_failure_time_factor).min(ceiling_time);
    }
}

/// RAII guard pairing an NLP fix with its unfix on every return path (§5).
struct FixGuard<'a, S: NlpSolver> {
    solver: &'a mut S,
    indices: Vec<usize>,
}

impl<S: NlpSolver> Drop for FixGuard<'_, S> {
    fn drop(&mut self) {
        self.solver.unfix_variables(&self.indices);
    }
}

/// Outcome of processing one candidate through the fixed-integer NLP
/// heuristic (§4.6, steps 3-4).
#[derive(Debug, Clone)]
pub enum PrimalOutcome {
    /// Improved or matched the incumbent: `(x, objective_value)`.
    Improved(Vec<f64>, f64),
    /// NLP infeasible or violated the original problem: the point to cut,
    /// and a binary no-good cut if the discrete set is pure binary.
    NeedsCut { x: Vec<f64>, binary_no_good: Option<(Vec<usize>, Vec<usize>)> },
    /// Already tested (beyond the preserved duplicate allowance) or not a
    /// new projection worth solving.
    Skipped,
}

pub struct PrimalBounder {
    pub tested: TestedPointMemory,
    pub cadence: AdaptiveCadence,
    pub queue: VecDeque<PrimalCandidate>,
}

impl PrimalBounder {
    pub fn new(settings: &Settings) -> Self {
        Self {
            tested: TestedPointMemory::new(),
            cadence: AdaptiveCadence::new(settings),
            queue: VecDeque::new(),
        }
    }

    /// Runs one fixed-integer NLP solve for the candidate `x` (§4.6).
    pub fn process_candidate<S: NlpSolver>(
        &mut self,
        problem: &Problem,
        reformulated: &ReformulatedProblem,
        nlp: &mut S,
        x: &[f64],
        incumbent: f64,
        settings: &Settings,
    ) -> EshResult<PrimalOutcome> {
        let discrete_indices: Vec<usize> = problem.variables().iter().filter(|v| v.kind().is_discrete()).map(|v| v.index()).collect();
        let rounded: Vec<f64> = discrete_indices.iter().map(|&i| x[i].round()).collect();
        // The tested-point memory is keyed on the discrete projection; a continuous-only
        // problem has no discrete projection to dedup on (every point would collapse to
        // the same empty key), so every candidate there is tested rather than skipped
        // after its second occurrence.
        if !discrete_indices.is_empty() {
            let key: Vec<i64> = rounded.iter().map(|&v| v as i64).collect();
            if !self.tested.should_test(key) {
                return Ok(PrimalOutcome::Skipped);
            }
        }

        nlp.set_problem(reformulated);
        nlp.set_starting_point(&(0..x.len()).collect::<Vec<_>>(), x);
        {
            let mut guard = FixGuard { solver: nlp, indices: discrete_indices.clone() };
            guard.solver.fix_variables(&discrete_indices, &rounded);
            let status = guard.solver.solve()?;

            if status.has_solution() {
                let x_star = guard.solver.solution();
                let value = reformulated.objective_value(&x_star);
                let x_original = reformulated.mapper.to_original(&x_star);
                let feasible = problem.max_deviation(&x_original).map(|(_, v)| v <= settings.primal_bounding_feasibility_tolerance).unwrap_or(true);
                if feasible {
                    self.cadence.on_success(settings);
                    if value <= incumbent {
                        return Ok(PrimalOutcome::Improved(x_star, value));
                    }
                    return Ok(PrimalOutcome::Skipped);
                }
                self.cadence.on_failure(settings);
                let binary_no_good = binary_no_good_cut(problem, &discrete_indices, &rounded);
                return Ok(PrimalOutcome::NeedsCut { x: x_star, binary_no_good });
            }

            self.cadence.on_failure(settings);
            let x_star = guard.solver.solution();
            let binary_no_good = binary_no_good_cut(problem, &discrete_indices, &rounded);
            match status {
                NlpStatus::Infeasible | NlpStatus::Error | NlpStatus::Limit => Ok(PrimalOutcome::NeedsCut { x: x_star, binary_no_good }),
                NlpStatus::Optimal | NlpStatus::Feasible => unreachable!("has_solution already handled"),
            }
        }
    }
}

fn binary_no_good_cut(problem: &Problem, discrete_indices: &[usize], rounded: &[f64]) -> Option<(Vec<usize>, Vec<usize>)> {
    use crate::problem::VariableKind;
    let all_binary = discrete_indices.iter().all(|&i| problem.variables()[i].kind() == VariableKind::Binary);
    if !all_binary {
        return None;
    }
    let mut ones = Vec::new();
    let mut zeros = Vec::new();
    for (&i, &v) in discrete_indices.iter().zip(rounded) {
        if v > 0.5 {
            ones.push(i);
        } else {
            zeros.push(i);
        }
    }
    Some((ones, zeros))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tested_point_memory_allows_one_accidental_retest() {
        let mut mem = TestedPointMemory::new();
        let key = vec![1, 2];
        assert!(mem.should_test(key.clone()));
        assert!(mem.should_test(key.clone()));
        assert!(!mem.should_test(key));
    }

    #[test]
    fn adaptive_cadence_shrinks_on_success_and_floors_at_base() {
        let settings = Settings::default();
        let mut cadence = AdaptiveCadence::new(&settings);
        for _ in 0..1000 {
            cadence.on_success(&settings);
        }
        assert!(cadence.iteration_frequency >= settings.primal_bounding_iteration_frequency as f64 - 1e-9);
    }

    #[test]
    fn adaptive_cadence_grows_on_failure_and_ceils() {
        let settings = Settings::default();
        let mut cadence = AdaptiveCadence::new(&settings);
        for _ in 0..1000 {
            cadence.on_failure(&settings);
        }
        let ceiling = settings.primal_bounding_iteration_frequency as f64 * settings.primal_bounding_frequency_ceiling_factor;
        assert!(cadence.iteration_frequency <= ceiling + 1e-6);
    }
}
