//! Benchmarks for the hot paths exercised on every iteration: reformulation
//! (once per solve), rootsearch and hyperplane construction (once per cut),
//! and a full small-instance solve.

use eshmip::hyperplane::{Hyperplane, HyperplaneOrigin};
use eshmip::problem::{Objective, Problem, Sense, VariableKind};
use eshmip::reformulate;
use eshmip::rootsearch;
use eshmip::settings::Settings;
use eshmip::solver::solve;

fn unit_ball_minlp(n: usize) -> Problem {
    let mut p = Problem::new();
    let vars: Vec<usize> = (0..n).map(|i| p.add_variable(format!("x{i}"), VariableKind::Real, -2.0, 2.0).unwrap()).collect();
    p.set_objective(
        Sense::Min,
        Objective::Linear { coefficients: vec![(vars[0], 1.0)], constant: 0.0 },
    );
    let expr = eshmip::expression::Expr::Add(
        Box::new(eshmip::expression::Expr::Pow(Box::new(eshmip::expression::Expr::Var(vars[0])), 2)),
        Box::new(eshmip::expression::Expr::Pow(Box::new(eshmip::expression::Expr::Var(vars[1 % n])), 2)),
    );
    p.add_nonlinear_constraint(expr.into_handle(n), f64::NEG_INFINITY, 1.0).unwrap();
    p
}

fn small_milp() -> Problem {
    let mut p = Problem::new();
    let x = p.add_variable("x", VariableKind::Integer, 0.0, 20.0).unwrap();
    let y = p.add_variable("y", VariableKind::Integer, 0.0, 20.0).unwrap();
    p.set_objective(Sense::Min, Objective::Linear { coefficients: vec![(x, 2.0), (y, 3.0)], constant: 0.0 });
    p.add_linear_constraint(vec![(x, 1.0), (y, 1.0)], 7.0, f64::INFINITY).unwrap();
    p
}

#[divan::bench]
fn reformulate_unit_ball() -> reformulate::ReformulatedProblem {
    let problem = unit_ball_minlp(4);
    reformulate::reformulate(&problem)
}

#[divan::bench]
fn rootsearch_bisection() -> rootsearch::RootsearchBracket {
    let problem = unit_ball_minlp(2);
    let p_int = vec![0.0, 0.0];
    let p_ext = vec![1.5, 1.5];
    rootsearch::search(&problem, &p_int, &p_ext, &[0], 1e-7, 1e-7, 60).unwrap()
}

#[divan::bench]
fn hyperplane_from_constraint() -> Hyperplane {
    let x_star = vec![0.7, 0.7];
    let gradient = vec![1.4, 1.4];
    Hyperplane::from_constraint(0, &x_star, 0.98, gradient, HyperplaneOrigin::InteriorExteriorRootsearch)
}

#[divan::bench]
fn solve_small_milp() {
    let problem = small_milp();
    let mut settings = Settings::default();
    settings.iteration_limit = 30;
    solve(problem, settings).unwrap();
}

fn main() {
    divan::main();
}
