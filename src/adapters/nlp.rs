//! NLP Solver Adapter (§6): abstract interface to a continuous NLP solver
//! used for primal candidate refinement with discrete variables fixed, and
//! by the dual repair loop's fixed-integer continuous re-solves.

use enum_dispatch::enum_dispatch;

use crate::error::{EshError, EshResult};
use crate::problem::NonlinearConstraint;
use crate::reformulate::ReformulatedProblem;
use crate::status::NlpStatus;

/// Abstract operations the core consumes from an NLP solver (§6).
#[enum_dispatch]
pub trait NlpSolver {
    fn set_problem(&mut self, reformulated: &ReformulatedProblem);

    fn set_starting_point(&mut self, indices: &[usize], values: &[f64]);

    fn fix_variables(&mut self, indices: &[usize], values: &[f64]);

    fn unfix_variables(&mut self, indices: &[usize]);

    fn solve(&mut self) -> EshResult<NlpStatus>;

    fn solution(&self) -> Vec<f64>;

    fn objective_value(&self) -> f64;

    fn variable_lower_bounds(&self) -> Vec<f64>;

    fn variable_upper_bounds(&self) -> Vec<f64>;
}

/// A box-constrained penalty/gradient NLP solver: minimizes the linear
/// objective plus a quadratic penalty on nonlinear/quadratic/linear
/// constraint violation, by projected gradient descent. Exact enough to
/// drive the fixed-integer re-solves this engine needs without an external
/// solver license.
pub struct NativeNlp {
    n_vars: usize,
    lower: Vec<f64>,
    upper: Vec<f64>,
    original_lower: Vec<f64>,
    original_upper: Vec<f64>,
    linear_objective: Vec<(usize, f64)>,
    objective_constant: f64,
    linear_constraints: Vec<(Vec<(usize, f64)>, f64, f64)>,
    nonlinear_indices: Vec<usize>,
    nonlinear_constraints: Vec<NonlinearConstraint>,
    start: Vec<f64>,
    solution: Vec<f64>,
    objective_value: f64,
    penalty: f64,
}

impl NativeNlp {
    pub fn new() -> Self {
        Self {
            n_vars: 0,
            lower: Vec::new(),
            upper: Vec::new(),
            original_lower: Vec::new(),
            original_upper: Vec::new(),
            linear_objective: Vec::new(),
            objective_constant: 0.0,
            linear_constraints: Vec::new(),
            nonlinear_indices: Vec::new(),
            nonlinear_constraints: Vec::new(),
            start: Vec::new(),
            solution: Vec::new(),
            objective_value: f64::INFINITY,
            penalty: 1e3,
        }
    }
}

impl Default for NativeNlp {
    fn default() -> Self {
        Self::new()
    }
}

impl NlpSolver for NativeNlp {
    fn set_problem(&mut self, reformulated: &ReformulatedProblem) {
        self.n_vars = reformulated.n_vars;
        self.lower = reformulated.variable_bounds.iter().map(|&(lo, _)| lo).collect();
        self.upper = reformulated.variable_bounds.iter().map(|&(_, hi)| hi).collect();
        self.original_lower = self.lower.clone();
        self.original_upper = self.upper.clone();
        self.linear_objective = reformulated.linear_objective.clone();
        self.objective_constant = reformulated.objective_constant;
        self.linear_constraints = reformulated
            .linear_constraints
            .iter()
            .map(|c| (c.coefficients.clone(), c.lower, c.upper))
            .collect();
        self.nonlinear_constraints = reformulated.nonlinear_constraints.clone();
        self.nonlinear_indices = (0..self.nonlinear_constraints.len()).collect();
        self.start = self
            .lower
            .iter()
            .zip(&self.upper)
            .map(|(&lo, &hi)| if lo.is_finite() && hi.is_finite() { 0.5 * (lo + hi) } else { 0.0 })
            .collect();
    }

    fn set_starting_point(&mut self, indices: &[usize], values: &[f64]) {
        for (&i, &v) in indices.iter().zip(values) {
            self.start[i] = v;
        }
    }

    fn fix_variables(&mut self, indices: &[usize], values: &[f64]) {
        for (&i, &v) in indices.iter().zip(values) {
            self.lower[i] = v;
            self.upper[i] = v;
            self.start[i] = v;
        }
    }

    fn unfix_variables(&mut self, indices: &[usize]) {
        for &i in indices {
            self.lower[i] = self.original_lower[i];
            self.upper[i] = self.original_upper[i];
        }
    }

    fn solve(&mut self) -> EshResult<NlpStatus> {
        if self.n_vars == 0 {
            return Err(EshError::modeling("NLP adapter has no problem set"));
        }
        let mut x = self.start.clone();
        let mut step = 1.0;
        let objective = |x: &[f64],
                         lin: &[(usize, f64)],
                         constant: f64,
                         lc: &[(Vec<(usize, f64)>, f64, f64)],
                         nlc: &[NonlinearConstraint],
                         nl_indices: &[usize],
                         penalty: f64|
         -> f64 {
            let base: f64 = lin.iter().map(|&(i, c)| c * x[i]).sum::<f64>() + constant;
            let linear_violation: f64 = lc
                .iter()
                .map(|(row, lo, hi)| {
                    let v: f64 = row.iter().map(|&(i, c)| c * x[i]).sum();
                    (lo - v).max(0.0).powi(2) + (v - hi).max(0.0).powi(2)
                })
                .sum();
            let nonlinear_violation: f64 = nl_indices.iter().map(|&i| nlc[i].value(x).max(0.0).powi(2)).sum();
            base + penalty * (linear_violation + nonlinear_violation)
        };
        let gradient = |x: &[f64],
                        lin: &[(usize, f64)],
                        lc: &[(Vec<(usize, f64)>, f64, f64)],
                        nlc: &[NonlinearConstraint],
                        nl_indices: &[usize],
                        penalty: f64,
                        n: usize|
         -> Vec<f64> {
            let mut g = vec![0.0; n];
            for &(i, c) in lin {
                g[i] += c;
            }
            for (row, lo, hi) in lc {
                let v: f64 = row.iter().map(|&(i, c)| c * x[i]).sum();
                let below = (lo - v).max(0.0);
                let above = (v - hi).max(0.0);
                let dv = -2.0 * below + 2.0 * above;
                if dv != 0.0 {
                    for &(i, c) in row {
                        g[i] += penalty * dv * c;
                    }
                }
            }
            for &i in nl_indices {
                let v = nlc[i].value(x).max(0.0);
                if v > 0.0 {
                    for (j, gj) in nlc[i].gradient(x).into_iter().enumerate() {
                        g[j] += penalty * 2.0 * v * gj;
                    }
                }
            }
            g
        };

        let mut value = objective(
            &x,
            &self.linear_objective,
            self.objective_constant,
            &self.linear_constraints,
            &self.nonlinear_constraints,
            &self.nonlinear_indices,
            self.penalty,
        );
        for _ in 0..500 {
            let g = gradient(
                &x,
                &self.linear_objective,
                &self.linear_constraints,
                &self.nonlinear_constraints,
                &self.nonlinear_indices,
                self.penalty,
                self.n_vars,
            );
            let norm: f64 = g.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm < 1e-10 {
                break;
            }
            let mut candidate: Vec<f64> = x
                .iter()
                .zip(&g)
                .map(|(&xi, &gi)| xi - step * gi / norm)
                .collect();
            for (xi, (&lo, &hi)) in candidate.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
                *xi = xi.clamp(lo, hi);
            }
            let candidate_value = objective(
                &candidate,
                &self.linear_objective,
                self.objective_constant,
                &self.linear_constraints,
                &self.nonlinear_constraints,
                &self.nonlinear_indices,
                self.penalty,
            );
            if candidate_value < value {
                x = candidate;
                value = candidate_value;
                step *= 1.2;
            } else {
                step *= 0.5;
                if step < 1e-10 {
                    break;
                }
            }
        }

        self.solution = x;
        self.objective_value = self.linear_objective.iter().map(|&(i, c)| c * self.solution[i]).sum::<f64>() + self.objective_constant;

        let feasible = self
            .linear_constraints
            .iter()
            .all(|(row, lo, hi)| {
                let v: f64 = row.iter().map(|&(i, c)| c * self.solution[i]).sum();
                v >= lo - 1e-5 && v <= hi + 1e-5
            })
            && self.nonlinear_indices.iter().all(|&i| self.nonlinear_constraints[i].value(&self.solution) <= 1e-5);
        Ok(if feasible { NlpStatus::Optimal } else { NlpStatus::Infeasible })
    }

    fn solution(&self) -> Vec<f64> {
        self.solution.clone()
    }

    fn objective_value(&self) -> f64 {
        self.objective_value
    }

    fn variable_lower_bounds(&self) -> Vec<f64> {
        self.lower.clone()
    }

    fn variable_upper_bounds(&self) -> Vec<f64> {
        self.upper.clone()
    }
}

/// Thin boundary around an external NLP solver (§1 scope: not reimplemented).
pub struct ExternalNlp {
    pub solver_name: &'static str,
}

impl ExternalNlp {
    pub fn new(solver_name: &'static str) -> Self {
        Self { solver_name }
    }
}

impl NlpSolver for ExternalNlp {
    fn set_problem(&mut self, _reformulated: &ReformulatedProblem) {}
    fn set_starting_point(&mut self, _indices: &[usize], _values: &[f64]) {}
    fn fix_variables(&mut self, _indices: &[usize], _values: &[f64]) {}
    fn unfix_variables(&mut self, _indices: &[usize]) {}
    fn solve(&mut self) -> EshResult<NlpStatus> {
        Err(EshError::solver(format!("external NLP solver '{}' is not available in this build", self.solver_name)))
    }
    fn solution(&self) -> Vec<f64> {
        Vec::new()
    }
    fn objective_value(&self) -> f64 {
        f64::NAN
    }
    fn variable_lower_bounds(&self) -> Vec<f64> {
        Vec::new()
    }
    fn variable_upper_bounds(&self) -> Vec<f64> {
        Vec::new()
    }
}

/// Which NLP adapter variant a run is configured to use.
#[enum_dispatch(NlpSolver)]
pub enum NlpHandle {
    Native(NativeNlp),
    Ipopt(ExternalNlp),
    Gams(ExternalNlp),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Objective, Problem, Sense, VariableKind};
    use crate::reformulate::reformulate;

    #[test]
    fn solves_a_simple_bounded_linear_program() {
        let mut p = Problem::new();
        p.add_variable("x", VariableKind::Real, 0.0, 10.0).unwrap();
        p.add_variable("y", VariableKind::Real, 0.0, 10.0).unwrap();
        p.set_objective(Sense::Min, Objective::Linear { coefficients: vec![(0, 1.0), (1, 1.0)], constant: 0.0 });
        p.add_linear_constraint(vec![(0, 1.0), (1, 1.0)], 3.0, f64::INFINITY).unwrap();
        let reformulated = reformulate(&p);

        let mut nlp = NativeNlp::new();
        nlp.set_problem(&reformulated);
        let status = nlp.solve().unwrap();
        assert_eq!(status, NlpStatus::Optimal);
        assert!((nlp.objective_value() - 3.0).abs() < 1e-2);
    }

    #[test]
    fn fixing_variables_pins_them_at_the_requested_value() {
        let mut p = Problem::new();
        p.add_variable("x", VariableKind::Real, 0.0, 10.0).unwrap();
        p.set_objective(Sense::Min, Objective::Linear { coefficients: vec![(0, 1.0)], constant: 0.0 });
        let reformulated = reformulate(&p);
        let mut nlp = NativeNlp::new();
        nlp.set_problem(&reformulated);
        nlp.fix_variables(&[0], &[7.0]);
        nlp.solve().unwrap();
        assert!((nlp.solution()[0] - 7.0).abs() < 1e-6);
    }
}
