//! Rootsearch (§4.2): bisection between a strictly interior point and an
//! exterior point, producing a bracket tight enough to generate a
//! supporting hyperplane near the feasible boundary.

use crate::error::{EshError, EshResult};
use crate::problem::Problem;

/// Result of a successful rootsearch: the interior/exterior bracket and,
/// when the search was over the full nonlinear constraint set, which
/// constraint attained the max-violation at `p_ext`.
#[derive(Debug, Clone)]
pub struct RootsearchBracket {
    pub p_interior: Vec<f64>,
    pub p_exterior: Vec<f64>,
    pub active_constraint: usize,
}

fn max_violation(problem: &Problem, constraints: &[usize], x: &[f64]) -> (usize, f64) {
    constraints
        .iter()
        .map(|&i| (i, problem.nonlinear_constraints()[i].value(x) - problem.nonlinear_constraints()[i].upper))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .expect("rootsearch constraint set must not be empty")
}

fn interpolate(p_int: &[f64], p_ext: &[f64], lambda: f64) -> Vec<f64> {
    p_int.iter().zip(p_ext).map(|(&a, &b)| (1.0 - lambda) * a + lambda * b).collect()
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

/// Bisects `[p_int, p_ext]` against the aggregate (or singleton)
/// `constraints` set of nonlinear-constraint indices in `problem` (§4.2).
///
/// Preconditions, checked up front: `p_int` must be strictly interior for
/// every constraint in `constraints`; `p_ext` must violate at least one.
pub fn search(
    problem: &Problem,
    p_int: &[f64],
    p_ext: &[f64],
    constraints: &[usize],
    lambda_tolerance: f64,
    constraint_tolerance: f64,
    max_iterations: u32,
) -> EshResult<RootsearchBracket> {
    if constraints.is_empty() {
        return Err(EshError::modeling("rootsearch requires a non-empty constraint set"));
    }
    let (_, interior_violation) = max_violation(problem, constraints, p_int);
    if interior_violation >= 0.0 {
        return Err(EshError::numerical("RootsearchInvalidInterior: p_int is not strictly interior"));
    }
    let (_, exterior_violation) = max_violation(problem, constraints, p_ext);
    if exterior_violation <= 0.0 {
        return Err(EshError::numerical("RootsearchNoViolation: p_ext violates no constraint in the set"));
    }

    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    let full_distance = distance(p_int, p_ext);
    let (mut active_constraint, _) = max_violation(problem, constraints, p_ext);

    for _ in 0..max_iterations {
        let mid = 0.5 * (lo + hi);
        let x_mid = interpolate(p_int, p_ext, mid);
        let (active, g_mid) = max_violation(problem, constraints, &x_mid);
        if g_mid <= 0.0 {
            lo = mid;
        } else {
            hi = mid;
            active_constraint = active;
        }
        let width = (hi - lo) * full_distance;
        if width <= lambda_tolerance * full_distance || g_mid.abs() <= constraint_tolerance {
            break;
        }
    }

    Ok(RootsearchBracket {
        p_interior: interpolate(p_int, p_ext, lo),
        p_exterior: interpolate(p_int, p_ext, hi),
        active_constraint,
    })
}

/// The scalar-objective form used for epigraph/objective-lift cuts (§4.2,
/// "second form ... analogous with a scalar evaluator"). `evaluate` maps
/// `lambda -> g(x(lambda)) - objective_ub`, already one-sided.
pub fn search_scalar(
    p_int: &[f64],
    p_ext: &[f64],
    evaluate: impl Fn(&[f64]) -> f64,
    lambda_tolerance: f64,
    constraint_tolerance: f64,
    max_iterations: u32,
) -> EshResult<RootsearchBracket> {
    let interior_violation = evaluate(p_int);
    if interior_violation >= 0.0 {
        return Err(EshError::numerical("RootsearchInvalidInterior: p_int is not strictly interior"));
    }
    let exterior_violation = evaluate(p_ext);
    if exterior_violation <= 0.0 {
        return Err(EshError::numerical("RootsearchNoViolation: p_ext violates no constraint in the set"));
    }

    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    let full_distance = distance(p_int, p_ext);

    for _ in 0..max_iterations {
        let mid = 0.5 * (lo + hi);
        let x_mid = interpolate(p_int, p_ext, mid);
        let g_mid = evaluate(&x_mid);
        if g_mid <= 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        let width = (hi - lo) * full_distance;
        if width <= lambda_tolerance * full_distance || g_mid.abs() <= constraint_tolerance {
            break;
        }
    }

    Ok(RootsearchBracket {
        p_interior: interpolate(p_int, p_ext, lo),
        p_exterior: interpolate(p_int, p_ext, hi),
        active_constraint: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expr;
    use crate::problem::VariableKind;

    fn circle_problem() -> Problem {
        let mut p = Problem::new();
        p.add_variable("x", VariableKind::Real, -10.0, 10.0).unwrap();
        p.add_variable("y", VariableKind::Real, -10.0, 10.0).unwrap();
        let expr = Expr::Add(
            Box::new(Expr::Pow(Box::new(Expr::Var(0)), 2)),
            Box::new(Expr::Pow(Box::new(Expr::Var(1)), 2)),
        );
        p.add_nonlinear_constraint(expr.into_handle(2), f64::NEG_INFINITY, 1.0).unwrap();
        p
    }

    #[test]
    fn finds_bracket_straddling_the_unit_circle() {
        let problem = circle_problem();
        let bracket = search(&problem, &[0.0, 0.0], &[2.0, 0.0], &[0], 1e-8, 1e-8, 100).unwrap();
        let interior_val = problem.nonlinear_constraints()[0].value(&bracket.p_interior);
        let exterior_val = problem.nonlinear_constraints()[0].value(&bracket.p_exterior);
        assert!(interior_val <= 1.0 + 1e-6);
        assert!(exterior_val >= 1.0 - 1e-6);
    }

    #[test]
    fn rejects_non_interior_p_int() {
        let problem = circle_problem();
        let err = search(&problem, &[5.0, 0.0], &[2.0, 0.0], &[0], 1e-8, 1e-8, 100);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_non_violating_p_ext() {
        let problem = circle_problem();
        let err = search(&problem, &[0.0, 0.0], &[0.1, 0.0], &[0], 1e-8, 1e-8, 100);
        assert!(err.is_err());
    }
}
