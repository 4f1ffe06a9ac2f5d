//! [`Problem`]: the original-space problem description (§3). Constraints
//! are partitioned by term kind; an instance always has exactly one
//! objective (enforced structurally: a single field, not a list).

use crate::error::{EshError, EshResult};
use crate::expression::ExprHandle;
use crate::problem::constraint::{Curvature, LinearConstraint, NonlinearConstraint, QuadraticConstraint};
use crate::problem::objective::{Objective, Sense, SparseRow};
use crate::problem::variable::{Variable, VariableKind};

pub struct Problem {
    variables: Vec<Variable>,
    sense: Sense,
    objective: Objective,
    linear_constraints: Vec<LinearConstraint>,
    quadratic_constraints: Vec<QuadraticConstraint>,
    nonlinear_constraints: Vec<NonlinearConstraint>,
}

impl Problem {
    /// Creates an empty problem with a zero linear objective (minimization).
    /// Call [`Self::set_objective`] to replace it.
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            sense: Sense::Min,
            objective: Objective::Linear { coefficients: Vec::new(), constant: 0.0 },
            linear_constraints: Vec::new(),
            quadratic_constraints: Vec::new(),
            nonlinear_constraints: Vec::new(),
        }
    }

    pub fn add_variable(&mut self, name: impl Into<String>, kind: VariableKind, lower: f64, upper: f64) -> EshResult<usize> {
        let index = self.variables.len();
        let var = Variable::new(index, name, kind, lower, upper)?;
        self.variables.push(var);
        Ok(index)
    }

    pub fn set_objective(&mut self, sense: Sense, objective: Objective) {
        self.sense = sense;
        self.objective = objective;
    }

    pub fn add_linear_constraint(&mut self, coefficients: SparseRow, lower: f64, upper: f64) -> EshResult<usize> {
        if lower > upper {
            return Err(EshError::modeling(format!("linear constraint has lower {lower} > upper {upper}")));
        }
        self.validate_indices(coefficients.iter().map(|&(i, _)| i))?;
        let index = self.linear_constraints.len();
        self.linear_constraints.push(LinearConstraint { coefficients, lower, upper });
        Ok(index)
    }

    pub fn add_quadratic_constraint(
        &mut self,
        linear: SparseRow,
        quadratic: Vec<(usize, usize, f64)>,
        lower: f64,
        upper: f64,
    ) -> EshResult<usize> {
        if lower > upper {
            return Err(EshError::modeling(format!("quadratic constraint has lower {lower} > upper {upper}")));
        }
        self.validate_indices(linear.iter().map(|&(i, _)| i))?;
        self.validate_indices(quadratic.iter().flat_map(|&(i, j, _)| [i, j]))?;
        let index = self.quadratic_constraints.len();
        self.quadratic_constraints.push(QuadraticConstraint { linear, quadratic, lower, upper });
        Ok(index)
    }

    /// Adds a nonlinear constraint. Its curvature tag starts `Indeterminate`
    /// and is filled in by [`crate::reformulate::reformulate`] (§3: "each
    /// constraint has a curvature tag computed by the Reformulator").
    pub fn add_nonlinear_constraint(&mut self, expr: ExprHandle, lower: f64, upper: f64) -> EshResult<usize> {
        if lower > upper {
            return Err(EshError::modeling(format!("nonlinear constraint has lower {lower} > upper {upper}")));
        }
        if expr.n_vars() != self.variables.len() {
            return Err(EshError::modeling(format!(
                "nonlinear constraint expects {} variables, problem has {}",
                expr.n_vars(),
                self.variables.len()
            )));
        }
        let index = self.nonlinear_constraints.len();
        self.nonlinear_constraints.push(NonlinearConstraint {
            expr,
            lower,
            upper,
            curvature: Curvature::Indeterminate,
        });
        Ok(index)
    }

    fn validate_indices(&self, indices: impl Iterator<Item = usize>) -> EshResult<()> {
        for i in indices {
            if i >= self.variables.len() {
                return Err(EshError::modeling(format!("variable index {i} out of range")));
            }
        }
        Ok(())
    }

    pub fn n_vars(&self) -> usize {
        self.variables.len()
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable_mut(&mut self, index: usize) -> Option<&mut Variable> {
        self.variables.get_mut(index)
    }

    pub fn variable_bounds(&self) -> Vec<(f64, f64)> {
        self.variables.iter().map(|v| (v.lower(), v.upper())).collect()
    }

    pub fn linear_constraints(&self) -> &[LinearConstraint] {
        &self.linear_constraints
    }

    pub fn quadratic_constraints(&self) -> &[QuadraticConstraint] {
        &self.quadratic_constraints
    }

    pub fn nonlinear_constraints(&self) -> &[NonlinearConstraint] {
        &self.nonlinear_constraints
    }

    pub fn nonlinear_constraints_mut(&mut self) -> &mut [NonlinearConstraint] {
        &mut self.nonlinear_constraints
    }

    pub fn has_discrete_variables(&self) -> bool {
        self.variables.iter().any(|v| v.kind().is_discrete())
    }

    /// The single most-violated nonlinear constraint at `x`: its index and
    /// signed value (§3, "max-deviation"). `None` if there are no nonlinear
    /// constraints.
    pub fn max_deviation(&self, x: &[f64]) -> Option<(usize, f64)> {
        self.nonlinear_constraints
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.value(x) - c.upper))
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Whether `x` is strictly interior (all nonlinear constraints satisfied
    /// with strictly negative slack after one-sided normalization).
    pub fn is_strictly_interior(&self, x: &[f64]) -> bool {
        match self.max_deviation(x) {
            Some((_, v)) => v < 0.0,
            None => true,
        }
    }

    /// Every nonlinear constraint violated at `x` beyond `tolerance`, each
    /// with its index and signed deviation (§3's per-constraint tie-break
    /// mode, as opposed to `max_deviation`'s arg-max aggregate).
    pub fn all_violations(&self, x: &[f64], tolerance: f64) -> Vec<(usize, f64)> {
        self.nonlinear_constraints
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.value(x) - c.upper))
            .filter(|&(_, v)| v > tolerance)
            .collect()
    }
}

impl Default for Problem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_bounds() {
        let mut p = Problem::new();
        let err = p.add_variable("x", VariableKind::Real, 5.0, 0.0);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_out_of_range_constraint_indices() {
        let mut p = Problem::new();
        p.add_variable("x", VariableKind::Real, 0.0, 1.0).unwrap();
        let err = p.add_linear_constraint(vec![(3, 1.0)], 0.0, 1.0);
        assert!(err.is_err());
    }
}
