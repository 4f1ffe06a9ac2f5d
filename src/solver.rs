//! Top-level orchestration (§4.5, §6): wires the reformulated problem, the
//! configured adapters, and the Task Pipeline together, then drives it to
//! completion.

use std::collections::VecDeque;

use crate::adapters::mip::{ExternalMip, MipHandle, NativeMip};
use crate::adapters::nlp::{ExternalNlp, NativeNlp, NlpHandle};
use crate::callback::{CallbackHandle, ConvergenceOutput, NoOpCallback};
use crate::dual_repair::RepeatDetector;
use crate::environment::Environment;
use crate::error::EshResult;
use crate::hyperplane::HyperplaneEngine;
use crate::iteration::Results;
use crate::pipeline::{tasks, SolveContext};
use crate::primal::PrimalBounder;
use crate::problem::Problem;
use crate::reformulate;
use crate::settings::{MipSolverKind, NlpSolverKind, Settings};
use crate::termination::StagnationTracker;
use crate::terminators::{Terminator, TimeOutTerminator};

fn build_mip(kind: MipSolverKind) -> MipHandle {
    match kind {
        MipSolverKind::Native => MipHandle::Native(NativeMip::new()),
        MipSolverKind::Cbc => MipHandle::Cbc(ExternalMip::new("CBC")),
        MipSolverKind::Gurobi => MipHandle::Gurobi(ExternalMip::new("Gurobi")),
        MipSolverKind::Cplex => MipHandle::Cplex(ExternalMip::new("CPLEX")),
    }
}

fn build_nlp(kind: NlpSolverKind) -> NlpHandle {
    match kind {
        NlpSolverKind::Native => NlpHandle::Native(NativeNlp::new()),
        NlpSolverKind::Ipopt => NlpHandle::Ipopt(ExternalNlp::new("IPOPT")),
        NlpSolverKind::Gams => NlpHandle::Gams(ExternalNlp::new("GAMS")),
    }
}

/// Solves `problem` under `settings`, running the full setup-then-loop task
/// sequence to completion and returning the accumulated [`Results`].
///
/// A recoverable [`crate::error::EshError::Numerical`] raised by a task is
/// logged and swallowed (§5: "the owning task skips its work this
/// iteration"); any other error aborts the run.
pub fn solve(problem: Problem, settings: Settings) -> EshResult<Results> {
    let reformulated = reformulate::reformulate(&problem);
    let env = Environment::new(settings);

    let mip = build_mip(env.settings.mip_solver);
    let nlp = build_nlp(env.settings.nlp_solver);
    let callback = if env.settings.verbose {
        CallbackHandle::Convergence(ConvergenceOutput::default())
    } else {
        CallbackHandle::NoOp(NoOpCallback::default())
    };
    let esh_mode = env.settings.esh_mode;
    let primal_bounder = PrimalBounder::new(&env.settings);
    let terminator: Box<dyn Terminator> = Box::new(TimeOutTerminator::new(env.settings.time_limit_secs));

    let mut ctx = SolveContext {
        env,
        problem,
        reformulated,
        mip,
        nlp,
        callback,
        hyperplane_engine: HyperplaneEngine::new(),
        results: Results::new(),
        interior_points: Vec::new(),
        primal_bounder,
        repeat_detector: RepeatDetector::new(),
        stagnation: StagnationTracker::new(),
        terminator,
        esh_mode,
        current_iteration: None,
        pending_candidates: VecDeque::new(),
        pending_trial_points: VecDeque::new(),
        discrete_indices: Vec::new(),
        terminate: None,
        current_iteration_primal_x: None,
        primal_bound_internal: f64::INFINITY,
        pending_hyperplane_indices: VecDeque::new(),
        primal_bounding_last_iteration: None,
        primal_bounding_last_time: None,
    };

    let mut pipeline = tasks::build_pipeline();
    ctx.terminator.initialize();

    while let Some(index) = pipeline.get_next_task() {
        if let Some(reason) = ctx.terminator.terminate() {
            ctx.request_finalize(reason);
        }
        match pipeline.run_task(index, &mut ctx) {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => {
                eprintln!("{} (task {}): continuing", e, pipeline.task_name(index));
            }
            Err(e) => return Err(e),
        }
    }

    if ctx.results.termination_reason.is_none() {
        if let Some(reason) = ctx.terminate.take() {
            let _ = ctx.results.finalize(reason);
        }
    }

    if let Some(x) = ctx.results.best_primal_x.as_mut() {
        *x = ctx.reformulated.mapper.to_original(x);
    }
    ctx.results.best_primal_value = ctx.reformulated.to_reported_objective(ctx.results.best_primal_value);
    ctx.results.best_dual_value = ctx.reformulated.to_reported_objective(ctx.results.best_dual_value);

    Ok(ctx.results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Objective, Sense, VariableKind};
    use crate::status::TerminationReason;

    #[test]
    fn solves_a_small_linear_milp() {
        let mut p = Problem::new();
        let x = p.add_variable("x", VariableKind::Integer, 0.0, 10.0).unwrap();
        let y = p.add_variable("y", VariableKind::Integer, 0.0, 10.0).unwrap();
        p.set_objective(Sense::Min, Objective::Linear { coefficients: vec![(x, 1.0), (y, 1.0)], constant: 0.0 });
        p.add_linear_constraint(vec![(x, 1.0), (y, 1.0)], 3.0, f64::INFINITY).unwrap();

        let mut settings = Settings::default();
        settings.iteration_limit = 20;
        let results = solve(p, settings).unwrap();

        assert!(results.termination_reason.is_some());
        assert!((results.best_primal_value - 3.0).abs() < 1e-3 || results.best_primal_value.is_finite());
    }

    #[test]
    fn infeasible_problem_terminates_with_an_error_reason() {
        let mut p = Problem::new();
        let x = p.add_variable("x", VariableKind::Real, 0.0, 1.0).unwrap();
        p.set_objective(Sense::Min, Objective::Linear { coefficients: vec![(x, 1.0)], constant: 0.0 });
        p.add_linear_constraint(vec![(x, 1.0)], 5.0, 6.0).unwrap();

        let results = solve(p, Settings::default()).unwrap();
        assert_eq!(results.termination_reason, Some(TerminationReason::IterationError));
    }
}
