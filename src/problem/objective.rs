//! The problem's objective: linear, quadratic, or nonlinear, §3.

use serde::{Deserialize, Serialize};

use crate::expression::ExprHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    Min,
    Max,
}

/// Sparse linear coefficients over variable indices.
pub type SparseRow = Vec<(usize, f64)>;

#[derive(Clone)]
pub enum Objective {
    Linear {
        coefficients: SparseRow,
        constant: f64,
    },
    Quadratic {
        linear: SparseRow,
        /// Upper-triangular `(i, j, q_ij)` with `i <= j`, representing
        /// `x^T Q x` with `Q` symmetric (`q_ij` contributes to both `Q[i][j]`
        /// and `Q[j][i]` when `i != j`).
        quadratic: Vec<(usize, usize, f64)>,
        constant: f64,
    },
    Nonlinear {
        expr: ExprHandle,
    },
}

impl Objective {
    pub fn is_nonlinear(&self) -> bool {
        matches!(self, Objective::Nonlinear { .. })
    }

    pub fn value(&self, x: &[f64]) -> f64 {
        match self {
            Objective::Linear { coefficients, constant } => {
                coefficients.iter().map(|&(i, c)| c * x[i]).sum::<f64>() + constant
            }
            Objective::Quadratic { linear, quadratic, constant } => {
                let lin: f64 = linear.iter().map(|&(i, c)| c * x[i]).sum();
                let quad: f64 = quadratic
                    .iter()
                    .map(|&(i, j, q)| if i == j { q * x[i] * x[j] } else { q * x[i] * x[j] * 2.0 })
                    .sum();
                lin + quad + constant
            }
            Objective::Nonlinear { expr } => expr.value(x),
        }
    }
}

impl std::fmt::Debug for Objective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Objective::Linear { coefficients, constant } => f
                .debug_struct("Linear")
                .field("coefficients", coefficients)
                .field("constant", constant)
                .finish(),
            Objective::Quadratic { linear, quadratic, constant } => f
                .debug_struct("Quadratic")
                .field("linear", linear)
                .field("quadratic", quadratic)
                .field("constant", constant)
                .finish(),
            Objective::Nonlinear { .. } => f.debug_struct("Nonlinear").finish_non_exhaustive(),
        }
    }
}
