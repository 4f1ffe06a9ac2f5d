//! Concrete pipeline tasks (§4.5): one setup phase (MIP adapter + interior
//! points) followed by a loop that solves the relaxation, tries fixed-integer
//! primal candidates, generates and installs hyperplanes, checks every
//! termination condition, periodically repairs stalled integer assignments,
//! and seals the iteration before looping back or finalizing.

use std::collections::VecDeque;

use crate::adapters::mip::MipSolver;
use crate::adapters::nlp::NlpSolver;
use crate::dual_repair;
use crate::error::EshResult;
use crate::hyperplane::HyperplaneOrigin;
use crate::interior;
use crate::iteration::{Iteration, MaxDeviation, SolutionPoint};
use crate::pipeline::control::Control;
use crate::pipeline::{Pipeline, SolveContext, Task};
use crate::primal::PrimalOutcome;
use crate::problem::VariableKind;
use crate::rootsearch;
use crate::status::TerminationReason;
use crate::termination;

/// Builds the full, named, ordered task list (§4.5), ready for
/// `SolveContext`-driven execution by the top-level `solve` loop.
pub fn build_pipeline() -> Pipeline {
    let mut pipeline = Pipeline::new();
    pipeline.add_task(Box::new(InitializeMipSolver));
    pipeline.add_task(Box::new(FindInteriorPoint));
    pipeline.add_task(Box::new(InitializeIteration));
    pipeline.add_task(Box::new(PrintIterationHeader));
    pipeline.add_task(Box::new(SolveIteration));
    pipeline.add_task(Box::new(UpdateNonlinearObjectiveByLinesearch));
    pipeline.add_task(Box::new(SelectPrimalCandidatesFromSolutionPool));
    pipeline.add_task(Box::new(SelectPrimalCandidatesFromLinesearch));
    pipeline.add_task(Box::new(SelectHyperplanePoints));
    pipeline.add_task(Box::new(AddHyperplanes));
    pipeline.add_task(Box::new(PrintIterationReport));
    pipeline.add_task(Box::new(CheckAbsoluteGap));
    pipeline.add_task(Box::new(CheckRelativeGap));
    pipeline.add_task(Box::new(CheckIterationError));
    pipeline.add_task(Box::new(CheckConstraintTolerance));
    pipeline.add_task(Box::new(CheckObjectiveStagnation));
    pipeline.add_task(Box::new(CheckIterationLimit));
    pipeline.add_task(Box::new(CheckTimeLimit));
    pipeline.add_task(Box::new(SolveFixedDualProblem));
    pipeline.add_task(Box::new(SealIteration));
    pipeline.add_task(Box::new(FinalizeSolution));
    pipeline
}

/// Populates the MIP adapter from the reformulated model: variables (with
/// original discrete kinds, the lifted epigraph variable always continuous),
/// linear rows, and the linear objective (§4.1, §6).
struct InitializeMipSolver;

impl Task for InitializeMipSolver {
    fn name(&self) -> &'static str {
        "InitializeMipSolver"
    }

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
        let _timer = ctx.env.timer("InitializeMipSolver");
        let n_original = ctx.problem.n_vars();
        for (i, &(lo, hi)) in ctx.reformulated.variable_bounds.iter().enumerate() {
            let kind = if i < n_original { ctx.problem.variables()[i].kind() } else { VariableKind::Real };
            ctx.mip.add_variable(kind, lo, hi);
        }
        for c in &ctx.reformulated.linear_constraints {
            ctx.mip.add_linear_constraint(&c.coefficients, c.lower, c.upper);
        }
        ctx.mip.finalize_objective(&ctx.reformulated.linear_objective, ctx.reformulated.objective_constant);
        ctx.mip.finalize_problem();

        if let Some(cutoff) = ctx.env.settings.mip_cutoff {
            ctx.mip.set_cutoff(cutoff);
        }
        if let Some(t) = ctx.env.settings.mip_time_limit_secs {
            ctx.mip.set_time_limit(t);
        }
        if let Some(l) = ctx.env.settings.mip_solution_limit {
            ctx.mip.set_solution_limit(l);
        }

        ctx.discrete_indices = ctx.problem.variables().iter().filter(|v| v.kind().is_discrete()).map(|v| v.index()).collect();
        ctx.esh_mode = ctx.env.settings.esh_mode;
        Ok(None)
    }
}

/// Runs the Interior-Point Finder once up front when ESH mode is requested;
/// falls back to ECP for the whole run if no strictly interior point exists
/// (§4.3, settings doc on `esh_mode`).
struct FindInteriorPoint;

impl Task for FindInteriorPoint {
    fn name(&self) -> &'static str {
        "FindInteriorPoint"
    }

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
        if !ctx.esh_mode {
            return Ok(None);
        }
        let _timer = ctx.env.timer("FindInteriorPoint");
        ctx.interior_points = interior::find_interior_points(&ctx.problem, ctx.env.settings.interior_point_count, ctx.env.settings.interior_point_margin, 500);
        if ctx.interior_points.is_empty() {
            ctx.esh_mode = false;
        }
        Ok(None)
    }
}

/// Loop head (§4.5 item 6): opens a fresh `Iteration` carrying forward the
/// current primal bound and the hyperplane count as of before this
/// iteration's own cuts.
struct InitializeIteration;

impl Task for InitializeIteration {
    fn name(&self) -> &'static str {
        "InitializeIteration"
    }

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
        let number = ctx.results.iterations.len() as u64 + 1;
        let mut iteration = Iteration::new(number, ctx.hyperplane_engine.len());
        iteration.primal_bound = ctx.primal_bound_internal;
        ctx.current_iteration = Some(iteration);
        ctx.hyperplane_engine.begin_iteration();
        ctx.pending_candidates.clear();
        ctx.pending_trial_points.clear();
        ctx.pending_hyperplane_indices.clear();
        ctx.env.statistics.iterations += 1;
        Ok(None)
    }
}

struct PrintIterationHeader;

impl Task for PrintIterationHeader {
    fn name(&self) -> &'static str {
        "PrintIterationHeader"
    }

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
        let number = ctx.current_iteration.as_ref().map(|it| it.iteration_number).unwrap_or(1);
        let interval = ctx.env.settings.print_header_interval;
        if interval > 0 && (number - 1) % interval == 0 {
            ctx.callback.header();
        }
        Ok(None)
    }
}

/// Solves the outer-approximation relaxation and reads back its solution pool
/// (§4.5 item ~9): each point's max-deviation against the original problem is
/// computed and, if violated, queued for hyperplane generation.
struct SolveIteration;

impl Task for SolveIteration {
    fn name(&self) -> &'static str {
        "SolveIteration"
    }

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
        let _timer = ctx.env.timer("SolveIteration");
        ctx.env.statistics.mip_solves += 1;
        let status = ctx.mip.solve()?;
        let dual_bound = ctx.mip.dual_objective_value();
        let iteration = ctx.current_iteration.as_mut().expect("iteration initialized by InitializeIteration");
        iteration.mip_status = Some(status);
        iteration.dual_bound = iteration.dual_bound.max(dual_bound);

        if status.has_solution() {
            for i in 0..ctx.mip.solution_count() {
                let x_reform = ctx.mip.variable_solution(i);
                let x_original = ctx.reformulated.mapper.to_original(&x_reform);
                let max_deviation = match ctx.problem.max_deviation(&x_original) {
                    Some((idx, v)) => MaxDeviation { constraint_index: Some(idx), value: v },
                    None => MaxDeviation::none(),
                };
                let objective_value = ctx.reformulated.objective_value(&x_reform);
                let iteration = ctx.current_iteration.as_mut().expect("iteration initialized by InitializeIteration");
                let number = iteration.iteration_number;
                iteration.solution_pool.push(SolutionPoint {
                    x: x_reform.clone(),
                    objective_value,
                    max_deviation,
                    iteration_found: number,
                });
                if !max_deviation.is_feasible(ctx.env.settings.constraint_tolerance) {
                    queue_trial_points(ctx, x_original);
                }
            }
        }
        Ok(None)
    }
}

/// Queues one trial point per violated nonlinear constraint, per the
/// configured tie-break mode (§3): aggregate mode queues only the arg-max
/// constraint; per-constraint mode queues every constraint violated beyond
/// `constraint_tolerance`, each against the same exterior point.
fn queue_trial_points(ctx: &mut SolveContext, x_original: Vec<f64>) {
    if ctx.env.settings.hyperplane_aggregate_mode {
        if let Some((ci, _)) = ctx.problem.max_deviation(&x_original) {
            ctx.pending_trial_points.push_back((ci, x_original));
        }
    } else {
        let tolerance = ctx.env.settings.constraint_tolerance;
        for (ci, _) in ctx.problem.all_violations(&x_original, tolerance) {
            ctx.pending_trial_points.push_back((ci, x_original.clone()));
        }
    }
}

/// Tightens the epigraph cut for a lifted nonlinear/quadratic objective
/// (§4.5 item 11, §9): bisects along the mu-coordinate between a point known
/// to under-estimate the objective and the pool point's reported mu, then
/// linearizes the epigraph constraint at the bisection result instead of at
/// the (possibly loose) pool point directly.
struct UpdateNonlinearObjectiveByLinesearch;

impl Task for UpdateNonlinearObjectiveByLinesearch {
    fn name(&self) -> &'static str {
        "UpdateNonlinearObjectiveByLinesearch"
    }

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
        if ctx.reformulated.mapper.epigraph_var().is_none() {
            return Ok(None);
        }
        let _timer = ctx.env.timer("UpdateNonlinearObjectiveByLinesearch");
        let epigraph_idx = ctx.reformulated.nonlinear_constraints.len() - 1;
        let tolerance = ctx.env.settings.constraint_tolerance;
        let points: Vec<Vec<f64>> = ctx
            .current_iteration
            .as_ref()
            .map(|it| it.solution_pool.iter().map(|s| s.x.clone()).collect())
            .unwrap_or_default();

        for x_ext in points {
            let violation = ctx.reformulated.nonlinear_constraints[epigraph_idx].value(&x_ext);
            if violation <= tolerance {
                continue;
            }
            let mu_index = x_ext.len() - 1;
            let mut probe = x_ext.clone();
            probe[mu_index] = 0.0;
            let value_at_mu0 = ctx.reformulated.nonlinear_constraints[epigraph_idx].value(&probe);
            let mut p_int = x_ext.clone();
            p_int[mu_index] = value_at_mu0 + 1.0;

            ctx.env.statistics.rootsearches += 1;
            let bracket = rootsearch::search_scalar(
                &p_int,
                &x_ext,
                |x| ctx.reformulated.nonlinear_constraints[epigraph_idx].value(x),
                ctx.env.settings.rootsearch_lambda_tolerance,
                ctx.env.settings.rootsearch_constraint_tolerance,
                ctx.env.settings.rootsearch_max_iterations,
            );
            let x_star = match bracket {
                Ok(b) => b.p_exterior,
                Err(_) => x_ext,
            };
            let value = ctx.reformulated.nonlinear_constraints[epigraph_idx].value(&x_star);
            let gradient = ctx.reformulated.nonlinear_constraints[epigraph_idx].gradient(&x_star);
            if let Some(idx) = ctx.hyperplane_engine.generate_objective_lift(&x_star, value, gradient, ctx.env.settings.hyperplane_point_quantization)? {
                ctx.pending_hyperplane_indices.push_back(idx);
            }
        }
        Ok(None)
    }
}

/// Fixed-integer primal bounding (§4.6): for each solution-pool point, try a
/// continuous re-solve with discretes fixed; register an improving feasible
/// point, or queue the point for a cut when it fails.
struct SelectPrimalCandidatesFromSolutionPool;

impl Task for SelectPrimalCandidatesFromSolutionPool {
    fn name(&self) -> &'static str {
        "SelectPrimalCandidatesFromSolutionPool"
    }

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
        if !ctx.env.settings.primal_bounding_enabled {
            return Ok(None);
        }
        // Adaptive-cadence gate (§4.6): skip unless this is the first-ever
        // opportunity, or the iteration/time window since the last trigger
        // has elapsed. Either clock being due is enough.
        let iteration_number = ctx.current_iteration.as_ref().map(|it| it.iteration_number).unwrap_or(0);
        let elapsed = ctx.env.elapsed_secs();
        let due = match (ctx.primal_bounding_last_iteration, ctx.primal_bounding_last_time) {
            (Some(last_iteration), Some(last_time)) => {
                (iteration_number.saturating_sub(last_iteration)) as f64 >= ctx.primal_bounder.cadence.iteration_frequency
                    || (elapsed - last_time) >= ctx.primal_bounder.cadence.time_frequency_secs
            }
            _ => true,
        };
        if !due {
            return Ok(None);
        }
        ctx.primal_bounding_last_iteration = Some(iteration_number);
        ctx.primal_bounding_last_time = Some(elapsed);
        ctx.env.statistics.primal_bounding_triggers += 1;

        let _timer = ctx.env.timer("SelectPrimalCandidatesFromSolutionPool");
        let points: Vec<Vec<f64>> = ctx
            .current_iteration
            .as_ref()
            .map(|it| it.solution_pool.iter().map(|s| s.x.clone()).collect())
            .unwrap_or_default();

        for x_reform in points {
            ctx.env.statistics.nlp_solves += 1;
            let outcome =
                ctx.primal_bounder
                    .process_candidate(&ctx.problem, &ctx.reformulated, &mut ctx.nlp, &x_reform, ctx.primal_bound_internal, &ctx.env.settings)?;
            match outcome {
                PrimalOutcome::Improved(x_star, value) => {
                    if value < ctx.primal_bound_internal {
                        ctx.primal_bound_internal = value;
                        ctx.current_iteration_primal_x = Some(x_star);
                        if let Some(it) = ctx.current_iteration.as_mut() {
                            it.primal_bound = value;
                        }
                    }
                }
                PrimalOutcome::NeedsCut { x, binary_no_good } => {
                    if let Some((ones, zeros)) = binary_no_good {
                        ctx.mip.add_integer_no_good_cut(&ones, &zeros);
                    } else {
                        let x_original = ctx.reformulated.mapper.to_original(&x);
                        queue_trial_points(ctx, x_original);
                    }
                }
                PrimalOutcome::Skipped => {}
            }
        }
        Ok(None)
    }
}

/// Feasibility-projection heuristic (§4.5 item 13, §9): for each queued
/// trial point, the same interior/exterior bracket `SelectHyperplanePoints`
/// will cut with is first checked for primal usefulness — if the bracket's
/// interior endpoint is already integer-consistent and fully feasible, it is
/// an honest primal candidate; otherwise it is tagged `Linesearch` and left
/// for cutting instead. Does not drain `pending_trial_points`;
/// `SelectHyperplanePoints` still needs them afterward.
struct SelectPrimalCandidatesFromLinesearch;

impl Task for SelectPrimalCandidatesFromLinesearch {
    fn name(&self) -> &'static str {
        "SelectPrimalCandidatesFromLinesearch"
    }

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
        if !ctx.env.settings.primal_bounding_enabled || !ctx.esh_mode {
            return Ok(None);
        }
        let Some(p_int) = ctx.interior_points.first().map(|p| p.x.clone()) else {
            return Ok(None);
        };
        let _timer = ctx.env.timer("SelectPrimalCandidatesFromLinesearch");
        let trial_points: Vec<(usize, Vec<f64>)> = ctx.pending_trial_points.iter().cloned().collect();

        for (constraint_index, x_ext) in trial_points {
            ctx.env.statistics.rootsearches += 1;
            let bracket = match rootsearch::search(
                &ctx.problem,
                &p_int,
                &x_ext,
                &[constraint_index],
                ctx.env.settings.rootsearch_lambda_tolerance,
                ctx.env.settings.rootsearch_constraint_tolerance,
                ctx.env.settings.rootsearch_max_iterations,
            ) {
                Ok(b) => b,
                Err(_) => continue,
            };
            let discretes_integral = ctx
                .discrete_indices
                .iter()
                .all(|&i| (bracket.p_interior[i] - bracket.p_interior[i].round()).abs() <= 1e-6);
            let fully_feasible = ctx
                .problem
                .max_deviation(&bracket.p_interior)
                .map(|(_, v)| v <= ctx.env.settings.primal_bounding_feasibility_tolerance)
                .unwrap_or(true);

            if discretes_integral && fully_feasible {
                let sign = if ctx.reformulated.objective_was_maximized { -1.0 } else { 1.0 };
                let value = sign * ctx.problem.objective().value(&bracket.p_interior);
                if value < ctx.primal_bound_internal {
                    ctx.primal_bound_internal = value;
                    ctx.current_iteration_primal_x = Some(ctx.reformulated.mapper.to_reformulated(&bracket.p_interior, value));
                    if let Some(it) = ctx.current_iteration.as_mut() {
                        it.primal_bound = value;
                    }
                }
            } else if let Some(idx) = ctx.hyperplane_engine.generate(
                &ctx.problem,
                bracket.active_constraint,
                &bracket.p_exterior,
                HyperplaneOrigin::Linesearch,
                ctx.env.settings.hyperplane_point_quantization,
            )? {
                ctx.pending_hyperplane_indices.push_back(idx);
            }
        }
        Ok(None)
    }
}

/// Generates a hyperplane for each queued trial point (§4.2, §4.4): via the
/// interior/exterior rootsearch when ESH mode has an interior point, falling
/// back to a direct cut at the point itself (ECP) otherwise.
struct SelectHyperplanePoints;

impl Task for SelectHyperplanePoints {
    fn name(&self) -> &'static str {
        "SelectHyperplanePoints"
    }

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
        let _timer = ctx.env.timer("SelectHyperplanePoints");
        let trial_points: Vec<(usize, Vec<f64>)> = ctx.pending_trial_points.drain(..).collect();
        let interior = ctx.interior_points.first().map(|p| p.x.clone());

        for (constraint_index, x_ext) in trial_points {
            let generated = if ctx.esh_mode {
                if let Some(p_int) = &interior {
                    ctx.env.statistics.rootsearches += 1;
                    match rootsearch::search(
                        &ctx.problem,
                        p_int,
                        &x_ext,
                        &[constraint_index],
                        ctx.env.settings.rootsearch_lambda_tolerance,
                        ctx.env.settings.rootsearch_constraint_tolerance,
                        ctx.env.settings.rootsearch_max_iterations,
                    ) {
                        Ok(bracket) => ctx.hyperplane_engine.generate(
                            &ctx.problem,
                            bracket.active_constraint,
                            &bracket.p_exterior,
                            HyperplaneOrigin::InteriorExteriorRootsearch,
                            ctx.env.settings.hyperplane_point_quantization,
                        ),
                        Err(_) => ctx.hyperplane_engine.generate(
                            &ctx.problem,
                            constraint_index,
                            &x_ext,
                            HyperplaneOrigin::MipSolution,
                            ctx.env.settings.hyperplane_point_quantization,
                        ),
                    }
                } else {
                    ctx.hyperplane_engine.generate(&ctx.problem, constraint_index, &x_ext, HyperplaneOrigin::MipSolution, ctx.env.settings.hyperplane_point_quantization)
                }
            } else {
                ctx.hyperplane_engine.generate(&ctx.problem, constraint_index, &x_ext, HyperplaneOrigin::MipSolution, ctx.env.settings.hyperplane_point_quantization)
            }?;
            if let Some(idx) = generated {
                ctx.pending_hyperplane_indices.push_back(idx);
            }
        }
        Ok(None)
    }
}

/// Installs every newly generated hyperplane into the MIP adapter and
/// records it against the current iteration (§4.4: "installed by the task
/// that owns the iteration").
struct AddHyperplanes;

impl Task for AddHyperplanes {
    fn name(&self) -> &'static str {
        "AddHyperplanes"
    }

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
        let indices: VecDeque<usize> = std::mem::take(&mut ctx.pending_hyperplane_indices);
        for idx in indices {
            if let Some(h) = ctx.hyperplane_engine.get(idx) {
                ctx.mip.add_hyperplane(h);
            }
            if let Some(it) = ctx.current_iteration.as_mut() {
                it.hyperplanes_added.push(idx);
            }
        }
        ctx.env.statistics.hyperplanes_total = ctx.hyperplane_engine.len() as u64;
        Ok(None)
    }
}

struct PrintIterationReport;

impl Task for PrintIterationReport {
    fn name(&self) -> &'static str {
        "PrintIterationReport"
    }

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
        if let Some(it) = ctx.current_iteration.as_ref() {
            ctx.callback.report(it);
        }
        Ok(None)
    }
}

/// Jumps straight to `SealIteration` (skipping the remaining checks and dual
/// repair) whenever a check fires; `SealIteration` itself decides whether to
/// loop or finalize, so both the finalize path and the normal path seal the
/// iteration exactly once.
macro_rules! check_task {
    ($name:ident, $task_name:literal, |$iteration:ident, $env:ident| $body:expr) => {
        struct $name;

        impl Task for $name {
            fn name(&self) -> &'static str {
                $task_name
            }

            fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
                let $iteration = ctx.current_iteration.as_ref().expect("iteration initialized by InitializeIteration");
                let $env = &ctx.env;
                let control = $body;
                match control {
                    Control::Finalize(reason) => {
                        ctx.request_finalize(reason);
                        Ok(Some("SealIteration"))
                    }
                    Control::Continue => Ok(None),
                }
            }
        }
    };
}

check_task!(CheckIterationError, "CheckIterationError", |iteration, _env| termination::check_iteration_error(iteration));
check_task!(CheckAbsoluteGap, "CheckAbsoluteGap", |iteration, env| termination::check_absolute_gap(iteration, env));
check_task!(CheckRelativeGap, "CheckRelativeGap", |iteration, env| termination::check_relative_gap(iteration, env));
check_task!(CheckConstraintTolerance, "CheckConstraintTolerance", |iteration, env| termination::check_constraint_tolerance(
    iteration, env
));
check_task!(CheckIterationLimit, "CheckIterationLimit", |iteration, env| termination::check_iteration_limit(iteration, env));

struct CheckObjectiveStagnation;

impl Task for CheckObjectiveStagnation {
    fn name(&self) -> &'static str {
        "CheckObjectiveStagnation"
    }

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
        if !ctx.primal_bound_internal.is_finite() {
            return Ok(None);
        }
        let tolerance = ctx.env.settings.objective_stagnation_tolerance;
        let limit = ctx.env.settings.objective_stagnation_iteration_limit;
        match ctx.stagnation.observe(ctx.primal_bound_internal, tolerance, limit) {
            Control::Finalize(reason) => {
                ctx.request_finalize(reason);
                Ok(Some("SealIteration"))
            }
            Control::Continue => Ok(None),
        }
    }
}

struct CheckTimeLimit;

impl Task for CheckTimeLimit {
    fn name(&self) -> &'static str {
        "CheckTimeLimit"
    }

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
        match termination::check_time_limit(&ctx.env) {
            Control::Finalize(reason) => {
                ctx.request_finalize(reason);
                Ok(Some("SealIteration"))
            }
            Control::Continue => Ok(None),
        }
    }
}

/// Dual Repair (§4.7): once the MIP keeps returning the same integer
/// assignment, fix discretes and densify cuts against the stalled point.
struct SolveFixedDualProblem;

impl Task for SolveFixedDualProblem {
    fn name(&self) -> &'static str {
        "SolveFixedDualProblem"
    }

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
        if ctx.discrete_indices.is_empty() || ctx.terminate.is_some() {
            return Ok(None);
        }
        let assignment = ctx.current_iteration.as_ref().and_then(|it| it.solution_pool.first().map(|s| s.x.clone()));
        let Some(x_reform) = assignment else {
            return Ok(None);
        };
        let repeats_required = ctx.env.settings.fixed_integer_repair_trigger_repeats;
        if !ctx.repeat_detector.observe(&ctx.discrete_indices, &x_reform, repeats_required) {
            return Ok(None);
        }

        let _timer = ctx.env.timer("DualProblemsIntegerFixed");
        ctx.env.statistics.dual_repair_triggers += 1;
        let rounded: Vec<f64> = ctx.discrete_indices.iter().map(|&i| x_reform[i].round()).collect();
        let interior_point = ctx.interior_points.first().map(|p| p.x.clone());
        let result = dual_repair::repair(
            &ctx.problem,
            &ctx.reformulated,
            &mut ctx.nlp,
            &mut ctx.hyperplane_engine,
            &ctx.discrete_indices,
            &rounded,
            interior_point.as_deref(),
            ctx.primal_bound_internal,
            &ctx.env.settings,
        )?;

        for idx in &result.hyperplanes_generated {
            if let Some(h) = ctx.hyperplane_engine.get(*idx) {
                ctx.mip.add_hyperplane(h);
            }
        }
        if let Some(it) = ctx.current_iteration.as_mut() {
            it.hyperplanes_added.extend(result.hyperplanes_generated);
        }
        Ok(None)
    }
}

/// Seals the current iteration into `Results` and decides whether to loop
/// back to the head or hand off to `FinalizeSolution` (§4.5 loop-head goto).
struct SealIteration;

impl Task for SealIteration {
    fn name(&self) -> &'static str {
        "SealIteration"
    }

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
        ctx.seal_current_iteration();
        if ctx.terminate.is_some() {
            Ok(Some("FinalizeSolution"))
        } else {
            Ok(Some("InitializeIteration"))
        }
    }
}

/// Terminal task (§4.5): records the termination reason on `Results`.
/// Defaults to `IterationLimit` if reached without an explicit request,
/// which only happens if the task list itself runs off its own end.
struct FinalizeSolution;

impl Task for FinalizeSolution {
    fn name(&self) -> &'static str {
        "FinalizeSolution"
    }

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
        let reason = ctx.terminate.take().unwrap_or(TerminationReason::IterationLimit);
        let _ = ctx.results.finalize(reason);
        Ok(None)
    }
}
