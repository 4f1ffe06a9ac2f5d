//! Hyperplane Engine (§4.4): turns a `(constraint, external point)` pair into
//! a valid linear cut, deduplicates within an iteration, and tracks
//! provenance. Cuts are installed into the MIP adapter by the task that owns
//! the current iteration; this module only builds and pools them.

use std::collections::HashSet;

use crate::error::{EshError, EshResult};
use crate::problem::Problem;

/// Why a hyperplane was generated, carried for trace/replay (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum HyperplaneOrigin {
    MipSolution,
    Linesearch,
    InteriorExteriorRootsearch,
    NlpInfeasible,
    ObjectiveLift,
    LpFixedIntegers,
}

/// A supporting hyperplane: the half-space `g . x <= -c` where `c = f(x*) - g.x*`.
/// Never mutated after construction (§3 lifecycle).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Hyperplane {
    /// Index into the reformulated problem's nonlinear constraints, or `None`
    /// for the epigraph (objective-lift) cut.
    pub source_constraint: Option<usize>,
    pub generating_point: Vec<f64>,
    pub gradient: Vec<f64>,
    pub constant: f64,
    pub origin: HyperplaneOrigin,
}

impl Hyperplane {
    /// Builds the cut from a constraint index, evaluation point, and the
    /// constraint's own value/gradient at that point.
    pub fn from_constraint(
        source_constraint: usize,
        x_star: &[f64],
        value: f64,
        gradient: Vec<f64>,
        origin: HyperplaneOrigin,
    ) -> Self {
        let g_dot_x: f64 = gradient.iter().zip(x_star).map(|(g, x)| g * x).sum();
        let constant = value - g_dot_x;
        Self {
            source_constraint: Some(source_constraint),
            generating_point: x_star.to_vec(),
            gradient,
            constant,
            origin,
        }
    }

    /// Builds the epigraph cut `mu >= linearization` for a lifted nonlinear
    /// objective, represented with the auxiliary variable's coefficient
    /// folded into `gradient` by the caller (§4.4, "handled symmetrically").
    pub fn from_objective_lift(x_star: &[f64], value: f64, gradient: Vec<f64>) -> Self {
        let g_dot_x: f64 = gradient.iter().zip(x_star).map(|(g, x)| g * x).sum();
        let constant = value - g_dot_x;
        Self {
            source_constraint: None,
            generating_point: x_star.to_vec(),
            gradient,
            constant,
            origin: HyperplaneOrigin::ObjectiveLift,
        }
    }

    /// Evaluates the half-space's left-hand side `g . x` at `x`; the cut is
    /// satisfied when this is `<= -constant`.
    pub fn lhs(&self, x: &[f64]) -> f64 {
        self.gradient.iter().zip(x).map(|(g, xi)| g * xi).sum()
    }

    pub fn is_satisfied(&self, x: &[f64], tolerance: f64) -> bool {
        self.lhs(x) <= -self.constant + tolerance
    }

    fn dedup_key(&self, quantization: f64) -> (Option<usize>, Vec<i64>) {
        let quantized = self
            .generating_point
            .iter()
            .map(|&v| (v / quantization).round() as i64)
            .collect();
        (self.source_constraint, quantized)
    }
}

/// Owns the canonical hyperplane pool across the whole run and the
/// within-iteration dedup set (§3 ownership, §4.4 dedup-by-quantized-point).
#[derive(Default)]
pub struct HyperplaneEngine {
    pool: Vec<Hyperplane>,
    seen_this_iteration: HashSet<(Option<usize>, Vec<i64>)>,
}

impl HyperplaneEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_iteration(&mut self) {
        self.seen_this_iteration.clear();
    }

    /// Generates the cut for `constraint_index` at `x_star`, returning `None`
    /// if an equivalent cut (same constraint, quantized point) was already
    /// added this iteration.
    pub fn generate(
        &mut self,
        problem: &Problem,
        constraint_index: usize,
        x_star: &[f64],
        origin: HyperplaneOrigin,
        quantization: f64,
    ) -> EshResult<Option<usize>> {
        let constraint = problem
            .nonlinear_constraints()
            .get(constraint_index)
            .ok_or_else(|| EshError::modeling(format!("no nonlinear constraint at index {constraint_index}")))?;
        let value = constraint.value(x_star);
        if !value.is_finite() {
            return Err(EshError::numerical(format!(
                "constraint {constraint_index} evaluated to non-finite value at generating point"
            )));
        }
        let gradient = constraint.gradient(x_star);
        if gradient.iter().any(|g| !g.is_finite()) {
            return Err(EshError::numerical(format!("constraint {constraint_index} gradient contains NaN/inf")));
        }
        let hyperplane = Hyperplane::from_constraint(constraint_index, x_star, value, gradient, origin);
        self.insert_if_new(hyperplane, quantization)
    }

    pub fn generate_objective_lift(&mut self, x_star: &[f64], value: f64, gradient: Vec<f64>, quantization: f64) -> EshResult<Option<usize>> {
        if !value.is_finite() || gradient.iter().any(|g| !g.is_finite()) {
            return Err(EshError::numerical("objective-lift linearization produced non-finite data"));
        }
        let hyperplane = Hyperplane::from_objective_lift(x_star, value, gradient);
        self.insert_if_new(hyperplane, quantization)
    }

    fn insert_if_new(&mut self, hyperplane: Hyperplane, quantization: f64) -> EshResult<Option<usize>> {
        let key = hyperplane.dedup_key(quantization);
        if !self.seen_this_iteration.insert(key) {
            return Ok(None);
        }
        let index = self.pool.len();
        self.pool.push(hyperplane);
        Ok(Some(index))
    }

    pub fn get(&self, index: usize) -> Option<&Hyperplane> {
        self.pool.get(index)
    }

    pub fn pool(&self) -> &[Hyperplane] {
        &self.pool
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
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
    fn generated_cut_is_valid_at_generating_point() {
        let problem = circle_problem();
        let mut engine = HyperplaneEngine::new();
        engine.begin_iteration();
        let idx = engine
            .generate(&problem, 0, &[1.0, 0.0], HyperplaneOrigin::MipSolution, 1e-6)
            .unwrap()
            .unwrap();
        let h = engine.get(idx).unwrap();
        let lhs = h.lhs(&[1.0, 0.0]);
        assert!((lhs + h.constant).abs() < 1e-9);
    }

    #[test]
    fn duplicate_point_within_iteration_is_deduplicated() {
        let problem = circle_problem();
        let mut engine = HyperplaneEngine::new();
        engine.begin_iteration();
        let first = engine.generate(&problem, 0, &[1.0, 0.0], HyperplaneOrigin::MipSolution, 1e-6).unwrap();
        let second = engine.generate(&problem, 0, &[1.0, 0.0], HyperplaneOrigin::MipSolution, 1e-6).unwrap();
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn new_iteration_resets_dedup_set() {
        let problem = circle_problem();
        let mut engine = HyperplaneEngine::new();
        engine.begin_iteration();
        engine.generate(&problem, 0, &[1.0, 0.0], HyperplaneOrigin::MipSolution, 1e-6).unwrap();
        engine.begin_iteration();
        let second = engine.generate(&problem, 0, &[1.0, 0.0], HyperplaneOrigin::MipSolution, 1e-6).unwrap();
        assert!(second.is_some());
        assert_eq!(engine.len(), 2);
    }
}
