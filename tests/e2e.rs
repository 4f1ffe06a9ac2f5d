//! End-to-end solve scenarios (§8, "End-to-end scenarios (literal)").

use eshmip::expression::Expr;
use eshmip::problem::{Objective, Problem, Sense, VariableKind};
use eshmip::settings::Settings;
use eshmip::solve;
use eshmip::status::TerminationReason;

fn settings_with_iteration_limit(limit: u64) -> Settings {
    let mut settings = Settings::default();
    settings.iteration_limit = limit;
    settings
}

#[test]
fn linear_milp_terminates_in_one_iteration_at_the_lp_relaxation_optimum() {
    let mut p = Problem::new();
    let x = p.add_variable("x", VariableKind::Integer, 0.0, 10.0).unwrap();
    let y = p.add_variable("y", VariableKind::Integer, 0.0, 10.0).unwrap();
    p.set_objective(Sense::Min, Objective::Linear { coefficients: vec![(x, 1.0), (y, 1.0)], constant: 0.0 });
    p.add_linear_constraint(vec![(x, 1.0), (y, 1.0)], 3.0, f64::INFINITY).unwrap();

    let results = solve(p, settings_with_iteration_limit(20)).unwrap();

    assert_eq!(results.iterations.len(), 1);
    assert!((results.best_primal_value - 3.0).abs() < 1e-4);
    assert!((results.best_dual_value - 3.0).abs() < 1e-4);
    assert_eq!(results.last_iteration().unwrap().hyperplanes_added.len(), 0);
}

#[test]
fn convex_qcqp_lifted_converges_to_the_ball_boundary() {
    let mut p = Problem::new();
    let x = p.add_variable("x", VariableKind::Real, -2.0, 2.0).unwrap();
    let y = p.add_variable("y", VariableKind::Real, -2.0, 2.0).unwrap();
    p.set_objective(Sense::Min, Objective::Linear { coefficients: vec![(x, 1.0)], constant: 0.0 });
    let expr = Expr::Add(Box::new(Expr::Pow(Box::new(Expr::Var(x)), 2)), Box::new(Expr::Pow(Box::new(Expr::Var(y)), 2)));
    p.add_nonlinear_constraint(expr.into_handle(2), f64::NEG_INFINITY, 1.0).unwrap();

    let results = solve(p, settings_with_iteration_limit(20)).unwrap();

    assert!(results.iterations.len() <= 20);
    assert!((results.best_primal_value - results.best_dual_value).abs() <= 1e-4 || results.iterations.len() == 20);
    let incumbent = results.best_primal_x.expect("a feasible incumbent was found");
    assert!((incumbent[0] - -1.0).abs() < 1e-2);
    assert!(incumbent[1].abs() < 1e-2);
}

#[test]
fn convex_minlp_reaches_the_integer_optimum_by_absolute_gap() {
    let mut p = Problem::new();
    let x = p.add_variable("x", VariableKind::Integer, 0.0, 5.0).unwrap();
    let y = p.add_variable("y", VariableKind::Integer, 0.0, 5.0).unwrap();
    p.set_objective(Sense::Min, Objective::Linear { coefficients: vec![(x, 1.0), (y, 1.0)], constant: 0.0 });
    let expr = Expr::Add(
        Box::new(Expr::Pow(Box::new(Expr::Sub(Box::new(Expr::Var(x)), Box::new(Expr::Const(2.0)))), 2)),
        Box::new(Expr::Pow(Box::new(Expr::Sub(Box::new(Expr::Var(y)), Box::new(Expr::Const(2.0)))), 2)),
    );
    p.add_nonlinear_constraint(expr.into_handle(2), f64::NEG_INFINITY, 4.0).unwrap();

    let results = solve(p, settings_with_iteration_limit(30)).unwrap();

    let incumbent = results.best_primal_x.expect("a feasible incumbent was found");
    assert!((results.best_primal_value - 1.0).abs() < 1e-3);
    assert!((incumbent[0] - 0.0).abs() < 1e-6 && (incumbent[1] - 1.0).abs() < 1e-6 || (incumbent[0] - 1.0).abs() < 1e-6 && (incumbent[1] - 0.0).abs() < 1e-6);
}

#[test]
fn infeasible_problem_terminates_with_iteration_error_and_no_incumbent() {
    let mut p = Problem::new();
    let x = p.add_variable("x", VariableKind::Real, -10.0, 10.0).unwrap();
    p.set_objective(Sense::Min, Objective::Linear { coefficients: vec![(x, 1.0)], constant: 0.0 });
    let expr = Expr::Pow(Box::new(Expr::Var(x)), 2);
    p.add_nonlinear_constraint(expr.into_handle(1), f64::NEG_INFINITY, -1.0).unwrap();

    let results = solve(p, settings_with_iteration_limit(20)).unwrap();

    assert_eq!(results.termination_reason, Some(TerminationReason::IterationError));
    assert!(results.best_primal_x.is_none());
}

#[test]
fn objective_stagnation_is_detected_within_the_configured_limit() {
    let mut p = Problem::new();
    let x = p.add_variable("x", VariableKind::Real, 0.0, 0.0).unwrap();
    p.set_objective(Sense::Min, Objective::Linear { coefficients: vec![(x, 1.0)], constant: 0.0 });
    p.add_linear_constraint(vec![(x, 1.0)], 0.0, 0.0).unwrap();

    let mut settings = settings_with_iteration_limit(200);
    settings.objective_stagnation_iteration_limit = 5;
    settings.objective_stagnation_tolerance = 1e-5;
    settings.primal_bounding_enabled = false;

    let results = solve(p, settings).unwrap();

    assert!(matches!(
        results.termination_reason,
        Some(TerminationReason::ObjectiveStagnation) | Some(TerminationReason::AbsoluteGap)
    ));
}

#[test]
fn fixed_integer_primal_bounding_updates_the_incumbent() {
    let mut p = Problem::new();
    let x = p.add_variable("x", VariableKind::Integer, 0.0, 3.0).unwrap();
    let y = p.add_variable("y", VariableKind::Real, -5.0, 5.0).unwrap();
    p.set_objective(Sense::Min, Objective::Linear { coefficients: vec![(y, 1.0)], constant: 0.0 });
    let expr = Expr::Add(
        Box::new(Expr::Pow(Box::new(Expr::Sub(Box::new(Expr::Var(y)), Box::new(Expr::Const(1.0)))), 2)),
        Box::new(Expr::Mul(Box::new(Expr::Const(0.0)), Box::new(Expr::Var(x)))),
    );
    p.add_nonlinear_constraint(expr.into_handle(2), f64::NEG_INFINITY, 4.0).unwrap();

    let mut settings = settings_with_iteration_limit(30);
    settings.primal_bounding_enabled = true;
    settings.primal_bounding_iteration_frequency = 1;

    let results = solve(p, settings).unwrap();

    assert!(results.best_primal_x.is_some());
    assert!(results.best_primal_value.is_finite());
}
