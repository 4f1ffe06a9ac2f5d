//! Reformulator (§4.1): rewrites an original-space [`Problem`] into the
//! canonical [`ReformulatedProblem`] the rest of the engine consumes.
//!
//! Three things happen here: nonlinear constraints are classified by
//! curvature (interval arithmetic + factorable-function composition rules,
//! delegated to [`crate::expression::ExpressionEvaluator::curvature_hint`])
//! and normalized to the one-sided form `f(x) <= 0`; a nonlinear or quadratic
//! objective is lifted into a free epigraph variable bounded above by the
//! original objective; and the MIP adapter's lack of native quadratic
//! support is papered over by folding quadratic terms into the same
//! nonlinear machinery (Design Notes §9, "optionally converts quadratic
//! forms into nonlinear").

pub mod reformulated;

pub use reformulated::{PointMapper, ReformulatedProblem};

use crate::expression::{AffineTransformedExpr, ExprHandle, ExpressionEvaluator, QuadraticForm};
use crate::problem::{Curvature, NonlinearConstraint, Objective, Problem, Sense};

/// `QuadraticConstraint`s have no dedicated MIP-adapter representation either
/// (same gap as the objective, Design Notes §9), so they are folded into the
/// nonlinear set here via [`QuadraticForm`] rather than passed through
/// `ReformulatedProblem::quadratic_constraints`, which stays empty.

/// Pads/extends a base expression with a trailing epigraph coordinate `mu`
/// and encodes `sign * inner(x) - mu <= 0`.
#[derive(Clone)]
struct EpigraphExpr {
    inner: ExprHandle,
    sign: f64,
    mu_index: usize,
    total_vars: usize,
}

impl ExpressionEvaluator for EpigraphExpr {
    fn value(&self, x: &[f64]) -> f64 {
        self.sign * self.inner.value(&x[..self.inner.n_vars()]) - x[self.mu_index]
    }

    fn gradient(&self, x: &[f64]) -> Vec<f64> {
        let mut g = vec![0.0; self.total_vars];
        for (i, gi) in self.inner.gradient(&x[..self.inner.n_vars()]).into_iter().enumerate() {
            g[i] = self.sign * gi;
        }
        g[self.mu_index] = -1.0;
        g
    }

    fn interval_range(&self, bounds: &[(f64, f64)]) -> (f64, f64) {
        let (ilo, ihi) = self.inner.interval_range(&bounds[..self.inner.n_vars()]);
        let (slo, shi) = if self.sign >= 0.0 { (self.sign * ilo, self.sign * ihi) } else { (self.sign * ihi, self.sign * ilo) };
        let (mu_lo, mu_hi) = bounds[self.mu_index];
        (slo - mu_hi, shi - mu_lo)
    }

    fn curvature_hint(&self, bounds: &[(f64, f64)]) -> Option<Curvature> {
        let inner = self.inner.curvature_hint(&bounds[..self.inner.n_vars()])?;
        Some(if self.sign >= 0.0 { inner } else { inner.flip() })
    }

    fn n_vars(&self) -> usize {
        self.total_vars
    }
}

/// Classifies and normalizes every nonlinear constraint, lifts the objective
/// if needed, and returns the canonical [`ReformulatedProblem`] plus point
/// mapper. Indeterminate curvature is not fatal (§4.1): such constraints
/// stay in the nonlinear set but are not flagged cuttable.
pub fn reformulate(problem: &Problem) -> ReformulatedProblem {
    let n_vars0 = problem.n_vars();
    let mut variable_bounds = problem.variable_bounds();

    let mut nonlinear_constraints = Vec::new();
    for c in problem.nonlinear_constraints() {
        normalize_two_sided(&c.expr, c.lower, c.upper, &variable_bounds, &mut nonlinear_constraints);
    }
    for c in problem.quadratic_constraints() {
        let expr = QuadraticForm::new(n_vars0, c.linear.clone(), c.quadratic.clone(), 0.0);
        normalize_two_sided(&expr, c.lower, c.upper, &variable_bounds, &mut nonlinear_constraints);
    }

    let (linear_objective, objective_constant, objective_was_maximized, epigraph_var) = match problem.objective() {
        Objective::Linear { coefficients, constant } => {
            let maximized = matches!(problem.sense(), Sense::Max);
            let sign = if maximized { -1.0 } else { 1.0 };
            let coeffs = coefficients.iter().map(|&(i, c)| (i, sign * c)).collect();
            (coeffs, sign * constant, maximized, None)
        }
        Objective::Quadratic { linear, quadratic, constant } => {
            let maximized = matches!(problem.sense(), Sense::Max);
            let sign = if maximized { -1.0 } else { 1.0 };
            let mu_index = n_vars0;
            variable_bounds.push((f64::NEG_INFINITY, f64::INFINITY));
            let inner = QuadraticForm::new(n_vars0, linear.clone(), quadratic.clone(), *constant);
            let curvature = inner
                .curvature_hint(&variable_bounds[..n_vars0])
                .map(|c| if sign >= 0.0 { c } else { c.flip() })
                .unwrap_or(Curvature::Indeterminate);
            let epigraph = EpigraphExpr { inner, sign, mu_index, total_vars: n_vars0 + 1 };
            nonlinear_constraints.push(NonlinearConstraint {
                expr: Box::new(epigraph),
                lower: f64::NEG_INFINITY,
                upper: 0.0,
                curvature,
            });
            (vec![(mu_index, 1.0)], 0.0, maximized, Some(mu_index))
        }
        Objective::Nonlinear { expr } => {
            let maximized = matches!(problem.sense(), Sense::Max);
            let sign = if maximized { -1.0 } else { 1.0 };
            let mu_index = n_vars0;
            variable_bounds.push((f64::NEG_INFINITY, f64::INFINITY));
            let curvature = expr
                .curvature_hint(&variable_bounds[..n_vars0])
                .map(|c| if sign >= 0.0 { c } else { c.flip() })
                .unwrap_or(Curvature::Indeterminate);
            let epigraph = EpigraphExpr { inner: expr.clone(), sign, mu_index, total_vars: n_vars0 + 1 };
            nonlinear_constraints.push(NonlinearConstraint {
                expr: Box::new(epigraph),
                lower: f64::NEG_INFINITY,
                upper: 0.0,
                curvature,
            });
            (vec![(mu_index, 1.0)], 0.0, maximized, Some(mu_index))
        }
    };

    let n_vars = variable_bounds.len();
    ReformulatedProblem {
        n_vars,
        variable_bounds,
        linear_objective,
        objective_constant,
        mapper: PointMapper::new(n_vars0, epigraph_var),
        linear_constraints: problem.linear_constraints().to_vec(),
        quadratic_constraints: Vec::new(),
        nonlinear_constraints,
        objective_was_maximized,
    }
}

fn normalize_two_sided(
    expr: &ExprHandle,
    lower: f64,
    upper: f64,
    variable_bounds: &[(f64, f64)],
    out: &mut Vec<NonlinearConstraint>,
) {
    let base_hint = expr.curvature_hint(&variable_bounds[..expr.n_vars()]);
    if upper.is_finite() {
        let curvature = base_hint.unwrap_or(Curvature::Indeterminate);
        out.push(NonlinearConstraint {
            expr: AffineTransformedExpr::new(expr.clone(), 1.0, -upper),
            lower: f64::NEG_INFINITY,
            upper: 0.0,
            curvature,
        });
    }
    if lower.is_finite() {
        let curvature = base_hint.map(|c| c.flip()).unwrap_or(Curvature::Indeterminate);
        out.push(NonlinearConstraint {
            expr: AffineTransformedExpr::new(expr.clone(), -1.0, lower),
            lower: f64::NEG_INFINITY,
            upper: 0.0,
            curvature,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expr;
    use crate::problem::VariableKind;

    #[test]
    fn linear_minimization_objective_is_unchanged() {
        let mut p = Problem::new();
        p.add_variable("x", VariableKind::Real, 0.0, 10.0).unwrap();
        p.set_objective(Sense::Min, Objective::Linear { coefficients: vec![(0, 1.0)], constant: 0.0 });
        let reformulated = reformulate(&p);
        assert_eq!(reformulated.n_vars, 1);
        assert!(!reformulated.objective_was_maximized);
        assert_eq!(reformulated.linear_objective, vec![(0, 1.0)]);
    }

    #[test]
    fn maximization_is_negated_internally() {
        let mut p = Problem::new();
        p.add_variable("x", VariableKind::Real, 0.0, 10.0).unwrap();
        p.set_objective(Sense::Max, Objective::Linear { coefficients: vec![(0, 1.0)], constant: 0.0 });
        let reformulated = reformulate(&p);
        assert!(reformulated.objective_was_maximized);
        assert_eq!(reformulated.linear_objective, vec![(0, -1.0)]);
        assert_eq!(reformulated.to_reported_objective(-5.0), 5.0);
    }

    #[test]
    fn nonlinear_objective_is_lifted_into_epigraph() {
        let mut p = Problem::new();
        p.add_variable("x", VariableKind::Real, -10.0, 10.0).unwrap();
        let expr = Expr::Pow(Box::new(Expr::Var(0)), 2).into_handle(1);
        p.set_objective(Sense::Min, Objective::Nonlinear { expr });
        let reformulated = reformulate(&p);
        assert_eq!(reformulated.n_vars, 2);
        assert_eq!(reformulated.linear_objective, vec![(1, 1.0)]);
        assert_eq!(reformulated.nonlinear_constraints.len(), 1);
        assert_eq!(reformulated.nonlinear_constraints[0].curvature, Curvature::Convex);
    }

    #[test]
    fn two_sided_nonlinear_constraint_produces_two_one_sided_constraints() {
        let mut p = Problem::new();
        p.add_variable("x", VariableKind::Real, -10.0, 10.0).unwrap();
        let expr = Expr::Var(0).into_handle(1);
        p.add_nonlinear_constraint(expr, -1.0, 1.0).unwrap();
        let reformulated = reformulate(&p);
        assert_eq!(reformulated.nonlinear_constraints.len(), 2);
        for c in &reformulated.nonlinear_constraints {
            assert_eq!(c.upper, 0.0);
        }
    }

    #[test]
    fn quadratic_constraint_is_folded_into_the_nonlinear_set() {
        let mut p = Problem::new();
        p.add_variable("x", VariableKind::Real, -10.0, 10.0).unwrap();
        p.add_quadratic_constraint(vec![], vec![(0, 0, 1.0)], f64::NEG_INFINITY, 4.0).unwrap();
        let reformulated = reformulate(&p);
        assert_eq!(reformulated.nonlinear_constraints.len(), 1);
        assert!(reformulated.quadratic_constraints.is_empty());
    }

    #[test]
    fn point_mapper_round_trips_through_epigraph_coordinate() {
        let mapper = PointMapper::new(2, Some(2));
        let reformulated = mapper.to_reformulated(&[1.0, 2.0], 5.0);
        assert_eq!(reformulated, vec![1.0, 2.0, 5.0]);
        assert_eq!(mapper.to_original(&reformulated), vec![1.0, 2.0]);
    }
}
