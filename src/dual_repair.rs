//! Dual Repair, fixed-integer LP/QP (§4.7): when the MIP keeps returning the
//! same integer assignment and the max violation stays high, fix discretes
//! and repeatedly re-solve the continuous relaxation, densifying cuts,
//! until progress stalls or the objective overtakes the primal bound.

use crate::adapters::nlp::NlpSolver;
use crate::error::EshResult;
use crate::hyperplane::{HyperplaneEngine, HyperplaneOrigin};
use crate::problem::Problem;
use crate::reformulate::ReformulatedProblem;
use crate::rootsearch;
use crate::settings::Settings;

/// Tracks the last few MIP integer assignments to detect the "stalled"
/// condition that triggers dual repair (§4.7: "last three iterations all
/// yielded the same integer assignment").
#[derive(Debug, Default)]
pub struct RepeatDetector {
    history: Vec<Vec<i64>>,
}

impl RepeatDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, discrete_indices: &[usize], x: &[f64], repeats_required: u32) -> bool {
        let key: Vec<i64> = discrete_indices.iter().map(|&i| x[i].round() as i64).collect();
        self.history.push(key);
        let window = repeats_required as usize;
        if self.history.len() > window {
            self.history.remove(0);
        }
        self.history.len() == window && self.history.windows(2).all(|w| w[0] == w[1])
    }
}

/// Result of one dual-repair run: the densifying hyperplanes generated and
/// whether it stopped because the LP objective overtook the primal bound.
#[derive(Debug, Default)]
pub struct DualRepairResult {
    pub hyperplanes_generated: Vec<usize>,
    pub iterations_run: u32,
}

/// Fixes `discrete_indices` to `assignment`, then repeatedly re-solves the
/// continuous relaxation, generating a hyperplane at (or near, via
/// rootsearch, when an interior point is available) each solution, until one
/// of the stopping conditions in §4.7 is met. Unfixes on every return path.
pub fn repair<S: NlpSolver>(
    problem: &Problem,
    reformulated: &ReformulatedProblem,
    nlp: &mut S,
    engine: &mut HyperplaneEngine,
    discrete_indices: &[usize],
    assignment: &[f64],
    interior_point: Option<&[f64]>,
    primal_bound: f64,
    settings: &Settings,
) -> EshResult<DualRepairResult> {
    nlp.set_problem(reformulated);
    let mut unfix_guard = scopeguard(nlp, discrete_indices.to_vec());
    unfix_guard.solver.fix_variables(discrete_indices, assignment);

    let mut result = DualRepairResult::default();
    let mut obj_ref = f64::INFINITY;
    let mut stagnant_steps = 0u32;

    for _ in 0..settings.fixed_integer_max_iterations {
        let status = unfix_guard.solver.solve()?;
        if !status.has_solution() {
            break;
        }
        result.iterations_run += 1;
        let x_reform = unfix_guard.solver.solution();
        let objective = reformulated.objective_value(&x_reform);
        let x_original = reformulated.mapper.to_original(&x_reform);

        if objective > primal_bound {
            break;
        }

        let max_dev = problem.max_deviation(&x_original);
        match max_dev {
            Some((constraint_index, deviation)) if deviation > settings.constraint_tolerance => {
                let cut_index = if let Some(p_int) = interior_point {
                    match rootsearch::search(
                        problem,
                        p_int,
                        &x_original,
                        &[constraint_index],
                        settings.rootsearch_lambda_tolerance,
                        settings.rootsearch_constraint_tolerance,
                        settings.rootsearch_max_iterations,
                    ) {
                        Ok(bracket) => engine.generate(
                            problem,
                            constraint_index,
                            &bracket.p_exterior,
                            HyperplaneOrigin::LpFixedIntegers,
                            settings.hyperplane_point_quantization,
                        )?,
                        Err(_) => engine.generate(
                            problem,
                            constraint_index,
                            &x_original,
                            HyperplaneOrigin::LpFixedIntegers,
                            settings.hyperplane_point_quantization,
                        )?,
                    }
                } else {
                    engine.generate(problem, constraint_index, &x_original, HyperplaneOrigin::LpFixedIntegers, settings.hyperplane_point_quantization)?
                };
                if let Some(idx) = cut_index {
                    result.hyperplanes_generated.push(idx);
                }
            }
            _ => break,
        }

        if (objective - obj_ref).abs() <= settings.fixed_integer_objective_tolerance {
            stagnant_steps += 1;
            if stagnant_steps >= settings.fixed_integer_stagnation_limit {
                break;
            }
        } else {
            stagnant_steps = 0;
            obj_ref = objective;
        }

        if problem.max_deviation(&x_original).map(|(_, v)| v <= settings.constraint_tolerance).unwrap_or(true) {
            break;
        }
    }

    Ok(result)
}

/// A thin RAII adapter analogous to [`crate::primal::FixGuard`], kept
/// module-private-free so `repair` can hand back the borrowed solver.
struct UnfixOnDrop<'a, S: NlpSolver> {
    solver: &'a mut S,
    indices: Vec<usize>,
}

impl<S: NlpSolver> Drop for UnfixOnDrop<'_, S> {
    fn drop(&mut self) {
        self.solver.unfix_variables(&self.indices);
    }
}

fn scopeguard<S: NlpSolver>(solver: &mut S, indices: Vec<usize>) -> UnfixOnDrop<'_, S> {
    UnfixOnDrop { solver, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_detector_fires_after_three_identical_assignments() {
        let mut detector = RepeatDetector::new();
        assert!(!detector.observe(&[0], &[1.0], 3));
        assert!(!detector.observe(&[0], &[1.0], 3));
        assert!(detector.observe(&[0], &[1.0], 3));
    }

    #[test]
    fn repeat_detector_resets_on_a_different_assignment() {
        let mut detector = RepeatDetector::new();
        detector.observe(&[0], &[1.0], 3);
        detector.observe(&[0], &[1.0], 3);
        assert!(!detector.observe(&[0], &[2.0], 3));
    }
}
