//! Interior-Point Finder (§4.3): produces strictly interior points of the
//! nonlinear-feasible region, used to seed the rootsearch. Solves the
//! auxiliary minimax problem `minimize mu s.t. f_i(x) <= mu` directly by
//! projected gradient descent on `(x, mu)` jointly, since this search is
//! over the original problem's nonlinear constraints rather than a
//! candidate the general NLP adapter would be asked to refine (§1: the NLP
//! adapter's stated job is primal-candidate refinement with discretes
//! fixed, which this is not).

use crate::problem::Problem;

/// One interior point found by the finder, with the minimax value `mu` it
/// attained (negative means strictly interior).
#[derive(Debug, Clone)]
pub struct InteriorPoint {
    pub x: Vec<f64>,
    pub mu: f64,
}

impl InteriorPoint {
    pub fn is_interior(&self) -> bool {
        self.mu < 0.0
    }
}

fn minimax_value(problem: &Problem, x: &[f64]) -> f64 {
    problem
        .nonlinear_constraints()
        .iter()
        .map(|c| c.value(x) - c.upper)
        .fold(f64::NEG_INFINITY, f64::max)
}

fn minimax_gradient(problem: &Problem, x: &[f64]) -> Vec<f64> {
    let (active, _) = problem
        .nonlinear_constraints()
        .iter()
        .enumerate()
        .map(|(i, c)| (i, c.value(x) - c.upper))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .expect("interior-point finder requires at least one nonlinear constraint");
    problem.nonlinear_constraints()[active].gradient(x)
}

fn clamp_to_bounds(x: &mut [f64], bounds: &[(f64, f64)]) {
    for (xi, &(lo, hi)) in x.iter_mut().zip(bounds) {
        *xi = xi.clamp(lo, hi);
    }
}

/// One run of projected subgradient descent on the minimax value from a
/// given starting point.
fn descend(problem: &Problem, mut x: Vec<f64>, bounds: &[(f64, f64)], max_steps: u32) -> InteriorPoint {
    let mut step = 1.0;
    let mut mu = minimax_value(problem, &x);
    for _ in 0..max_steps {
        let g = minimax_gradient(problem, &x);
        let norm: f64 = g.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm < 1e-12 {
            break;
        }
        let mut candidate: Vec<f64> = x.iter().zip(&g).map(|(&xi, &gi)| xi - step * gi / norm).collect();
        clamp_to_bounds(&mut candidate, bounds);
        let candidate_mu = minimax_value(problem, &candidate);
        if candidate_mu < mu {
            x = candidate;
            mu = candidate_mu;
            step *= 1.1;
        } else {
            step *= 0.5;
        }
        if mu < -1e-6 || step < 1e-12 {
            break;
        }
    }
    InteriorPoint { x, mu }
}

/// Produces up to `count` interior points (§4.3, "up to K interior points,
/// configurable"), starting from the midpoint of the variable bounds and
/// from `count - 1` random-free perturbations seeded deterministically by
/// index (no wall-clock or RNG dependency, so runs stay reproducible).
pub fn find_interior_points(problem: &Problem, count: u32, margin: f64, max_steps: u32) -> Vec<InteriorPoint> {
    let bounds = problem.variable_bounds();
    if problem.nonlinear_constraints().is_empty() {
        return Vec::new();
    }
    let mut points = Vec::new();
    for k in 0..count.max(1) {
        let start: Vec<f64> = bounds
            .iter()
            .enumerate()
            .map(|(i, &(lo, hi))| {
                let mid = if lo.is_finite() && hi.is_finite() { 0.5 * (lo + hi) } else { 0.0 };
                let jitter = 0.05 * (hi - lo).max(0.0).min(1e6) * (((i + k as usize) % 7) as f64 - 3.0) / 7.0;
                if lo.is_finite() && hi.is_finite() { (mid + jitter).clamp(lo, hi) } else { mid }
            })
            .collect();
        let mut found = descend(problem, start, &bounds, max_steps);
        found.mu -= margin.abs().max(0.0);
        points.push(found);
    }
    points.retain(|p| p.is_interior());
    points
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
    fn finds_a_strictly_interior_point_of_the_unit_disk() {
        let problem = circle_problem();
        let points = find_interior_points(&problem, 1, 1e-3, 200);
        assert!(!points.is_empty());
        assert!(points[0].mu < 0.0);
        let (x, y) = (points[0].x[0], points[0].x[1]);
        assert!(x * x + y * y < 1.0);
    }

    #[test]
    fn no_nonlinear_constraints_means_no_interior_points_needed() {
        let mut p = Problem::new();
        p.add_variable("x", VariableKind::Real, 0.0, 1.0).unwrap();
        let points = find_interior_points(&p, 1, 1e-3, 50);
        assert!(points.is_empty());
    }
}
