//! Termination Monitor (§4.8): each check reads the current [`Iteration`]
//! and returns [`Control::Continue`] or [`Control::Finalize`]. The owning
//! `CheckX` task (§4.5) calls `setNextTask("FinalizeSolution")` only on the
//! latter.

use crate::environment::Environment;
use crate::iteration::Iteration;
use crate::pipeline::control::Control;
use crate::status::{MipStatus, TerminationReason};

pub fn check_absolute_gap(iteration: &Iteration, env: &Environment) -> Control {
    if iteration.gap() <= env.settings.absolute_gap_tolerance {
        Control::Finalize(TerminationReason::AbsoluteGap)
    } else {
        Control::Continue
    }
}

pub fn check_relative_gap(iteration: &Iteration, env: &Environment) -> Control {
    if iteration.relative_gap(1e-10) <= env.settings.relative_gap_tolerance {
        Control::Finalize(TerminationReason::RelativeGap)
    } else {
        Control::Continue
    }
}

/// §7: MIP status in {infeasible, unbounded, error} and unrecoverable.
pub fn check_iteration_error(iteration: &Iteration) -> Control {
    match iteration.mip_status {
        Some(status) if status.is_error() => Control::Finalize(TerminationReason::IterationError),
        _ => Control::Continue,
    }
}

pub fn check_constraint_tolerance(iteration: &Iteration, env: &Environment) -> Control {
    let mip_optimal = matches!(iteration.mip_status, Some(MipStatus::Optimal));
    if mip_optimal && iteration.worst_max_deviation() <= env.settings.constraint_tolerance {
        Control::Finalize(TerminationReason::ConstraintTolerance)
    } else {
        Control::Continue
    }
}

/// Tracks the objective stagnation run across iterations (§4.8): `obj_ref`
/// is the objective at the last significant update, reset whenever the
/// primal bound improves by more than the tolerance.
#[derive(Debug, Clone, Copy)]
pub struct StagnationTracker {
    obj_ref: f64,
    consecutive_qualifying: u32,
}

impl StagnationTracker {
    pub fn new() -> Self {
        Self { obj_ref: f64::INFINITY, consecutive_qualifying: 0 }
    }

    pub fn observe(&mut self, current_objective: f64, tolerance: f64, limit: u32) -> Control {
        if (current_objective - self.obj_ref).abs() <= tolerance {
            self.consecutive_qualifying += 1;
        } else {
            self.consecutive_qualifying = 0;
            self.obj_ref = current_objective;
        }
        if self.consecutive_qualifying >= limit {
            Control::Finalize(TerminationReason::ObjectiveStagnation)
        } else {
            Control::Continue
        }
    }
}

impl Default for StagnationTracker {
    fn default() -> Self {
        Self::new()
    }
}

pub fn check_iteration_limit(iteration: &Iteration, env: &Environment) -> Control {
    if iteration.iteration_number >= env.settings.iteration_limit {
        Control::Finalize(TerminationReason::IterationLimit)
    } else {
        Control::Continue
    }
}

pub fn check_time_limit(env: &Environment) -> Control {
    if env.time_remaining_secs() <= 0.0 {
        Control::Finalize(TerminationReason::TimeLimit)
    } else {
        Control::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn iteration_with(dual: f64, primal: f64, mip_status: Option<MipStatus>) -> Iteration {
        let mut it = Iteration::new(1, 0);
        it.dual_bound = dual;
        it.primal_bound = primal;
        it.mip_status = mip_status;
        it
    }

    #[test]
    fn absolute_gap_finalizes_when_bounds_converge() {
        let env = Environment::new(Settings::default());
        let it = iteration_with(3.0, 3.0, Some(MipStatus::Optimal));
        assert_eq!(check_absolute_gap(&it, &env), Control::Finalize(TerminationReason::AbsoluteGap));
    }

    #[test]
    fn iteration_error_on_infeasible_status() {
        let it = iteration_with(0.0, 0.0, Some(MipStatus::Infeasible));
        assert_eq!(check_iteration_error(&it), Control::Finalize(TerminationReason::IterationError));
    }

    #[test]
    fn stagnation_fires_after_consecutive_qualifying_iterations() {
        let mut tracker = StagnationTracker::new();
        assert_eq!(tracker.observe(5.0, 1e-5, 2), Control::Continue);
        assert_eq!(tracker.observe(5.0, 1e-5, 2), Control::Finalize(TerminationReason::ObjectiveStagnation));
    }

    #[test]
    fn stagnation_resets_on_significant_improvement() {
        let mut tracker = StagnationTracker::new();
        tracker.observe(5.0, 1e-5, 2);
        assert_eq!(tracker.observe(1.0, 1e-5, 2), Control::Continue);
    }
}
