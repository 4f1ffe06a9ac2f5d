//! Settings-driven adapter selection (Design Notes §9, "Polymorphism over
//! solvers"): an external `MipSolverKind`/`NlpSolverKind` without a licensed
//! solver configured fails at the first solve rather than silently
//! succeeding with `Native` semantics.

use eshmip::problem::{Objective, Problem, Sense, VariableKind};
use eshmip::settings::{MipSolverKind, Settings};
use eshmip::solve;
use rstest::rstest;

fn trivial_milp() -> Problem {
    let mut p = Problem::new();
    let x = p.add_variable("x", VariableKind::Integer, 0.0, 5.0).unwrap();
    p.set_objective(Sense::Min, Objective::Linear { coefficients: vec![(x, 1.0)], constant: 0.0 });
    p.add_linear_constraint(vec![(x, 1.0)], 1.0, f64::INFINITY).unwrap();
    p
}

#[rstest]
#[case(MipSolverKind::Cbc)]
#[case(MipSolverKind::Gurobi)]
#[case(MipSolverKind::Cplex)]
fn unlicensed_external_mip_solver_fails_on_first_solve(#[case] kind: MipSolverKind) {
    let mut settings = Settings::default();
    settings.mip_solver = kind;

    let err = solve(trivial_milp(), settings).expect_err("no licensed solver is bundled");
    assert!(!err.is_recoverable());
}

#[test]
fn native_mip_solver_solves_the_same_trivial_instance() {
    let results = solve(trivial_milp(), Settings::default()).unwrap();
    assert!((results.best_primal_value - 1.0).abs() < 1e-6);
}
