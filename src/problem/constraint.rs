//! Constraints, partitioned by the kind of term they carry (§3): linear
//! (`L <= a.x <= U`), quadratic (`L <= x.Q.x + a.x <= U`), nonlinear
//! (`L <= f(x) <= U`). Each nonlinear constraint carries a curvature tag
//! computed by the Reformulator.

use crate::expression::ExprHandle;
use crate::problem::objective::SparseRow;

/// Curvature classification of a nonlinear term, computed by the Reformulator
/// (§4.1) from interval arithmetic and factorable-function composition
/// rules. `Indeterminate` is not fatal: the constraint stays in the
/// nonlinear set but is cut without a correctness guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curvature {
    Linear,
    Convex,
    Concave,
    Indeterminate,
}

impl Curvature {
    /// Whether a constraint of the form `f(x) <= 0` with this curvature is
    /// eligible for supporting-hyperplane cuts (convex, or linear which is
    /// trivially convex).
    pub fn is_cuttable(self) -> bool {
        matches!(self, Curvature::Convex | Curvature::Linear)
    }

    /// Curvature of `-f(x)` given the curvature of `f(x)`.
    pub fn flip(self) -> Curvature {
        match self {
            Curvature::Convex => Curvature::Concave,
            Curvature::Concave => Curvature::Convex,
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub coefficients: SparseRow,
    pub lower: f64,
    pub upper: f64,
}

impl LinearConstraint {
    pub fn value(&self, x: &[f64]) -> f64 {
        self.coefficients.iter().map(|&(i, c)| c * x[i]).sum()
    }
}

#[derive(Debug, Clone)]
pub struct QuadraticConstraint {
    pub linear: SparseRow,
    pub quadratic: Vec<(usize, usize, f64)>,
    pub lower: f64,
    pub upper: f64,
}

impl QuadraticConstraint {
    pub fn value(&self, x: &[f64]) -> f64 {
        let lin: f64 = self.linear.iter().map(|&(i, c)| c * x[i]).sum();
        let quad: f64 = self
            .quadratic
            .iter()
            .map(|&(i, j, q)| if i == j { q * x[i] * x[j] } else { q * x[i] * x[j] * 2.0 })
            .sum();
        lin + quad
    }
}

#[derive(Clone)]
pub struct NonlinearConstraint {
    pub expr: ExprHandle,
    pub lower: f64,
    pub upper: f64,
    pub curvature: Curvature,
}

impl std::fmt::Debug for NonlinearConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonlinearConstraint")
            .field("lower", &self.lower)
            .field("upper", &self.upper)
            .field("curvature", &self.curvature)
            .finish_non_exhaustive()
    }
}

impl NonlinearConstraint {
    pub fn value(&self, x: &[f64]) -> f64 {
        self.expr.value(x)
    }

    pub fn gradient(&self, x: &[f64]) -> Vec<f64> {
        self.expr.gradient(x)
    }
}
