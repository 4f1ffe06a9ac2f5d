//! [`ReformulatedProblem`]: the canonical form the rest of the engine
//! operates on (§3). Guarantees: the objective is a free linear variable
//! bounded above by the original objective via an epigraph constraint (if
//! the original objective was nonlinear or quadratic); every nonlinear
//! constraint is normalized to `f(x) <= 0`; convex ones are flagged eligible
//! for supporting-hyperplane cuts.

use crate::problem::{LinearConstraint, NonlinearConstraint, QuadraticConstraint, SparseRow};

/// Bidirectional mapping between original-space points and reformulated-space
/// points (§4.1). Injective; the inverse is well-defined on the range, i.e.
/// on points that actually came from [`PointMapper::to_reformulated`].
#[derive(Debug, Clone, Copy)]
pub struct PointMapper {
    original_n_vars: usize,
    epigraph_var: Option<usize>,
}

impl PointMapper {
    pub fn new(original_n_vars: usize, epigraph_var: Option<usize>) -> Self {
        Self { original_n_vars, epigraph_var }
    }

    /// `x_original -> x_reformulated`. Appends a placeholder for the
    /// epigraph variable (the caller fills its value in) when the objective
    /// was lifted.
    pub fn to_reformulated(&self, x_original: &[f64], epigraph_value: f64) -> Vec<f64> {
        let mut x = x_original.to_vec();
        if self.epigraph_var.is_some() {
            x.push(epigraph_value);
        }
        x
    }

    /// `x_reformulated -> x_original`, dropping the lifted epigraph
    /// coordinate if present.
    pub fn to_original(&self, x_reformulated: &[f64]) -> Vec<f64> {
        x_reformulated[..self.original_n_vars].to_vec()
    }

    pub fn epigraph_var(&self) -> Option<usize> {
        self.epigraph_var
    }
}

/// The reformulated problem: always a minimization over a linear objective
/// (Open Question (a) resolved by normalizing sign here, see `DESIGN.md`),
/// with constraints partitioned exactly as in the original `Problem` plus,
/// when the objective required lifting, one extra nonlinear constraint
/// encoding the epigraph.
pub struct ReformulatedProblem {
    pub n_vars: usize,
    pub variable_bounds: Vec<(f64, f64)>,
    pub linear_objective: SparseRow,
    pub objective_constant: f64,
    pub mapper: PointMapper,
    pub linear_constraints: Vec<LinearConstraint>,
    pub quadratic_constraints: Vec<QuadraticConstraint>,
    pub nonlinear_constraints: Vec<NonlinearConstraint>,
    /// `true` if the original objective's sense was `Max`, meaning every
    /// value fed back in a report must be negated once to undo the internal
    /// minimization convention (Open Question (a)).
    pub objective_was_maximized: bool,
}

impl ReformulatedProblem {
    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.linear_objective.iter().map(|&(i, c)| c * x[i]).sum::<f64>() + self.objective_constant
    }

    /// Undoes the internal minimization convention for reporting (§9 Open
    /// Question (a)).
    pub fn to_reported_objective(&self, internal_value: f64) -> f64 {
        if self.objective_was_maximized { -internal_value } else { internal_value }
    }
}
