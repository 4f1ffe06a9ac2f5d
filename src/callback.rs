//! Iteration reporting hooks, carried over from the teacher's `callback.rs`:
//! a `Callback` trait invoked once per outer iteration, with a no-op variant
//! and a table-printing variant. `PrintIterationHeader`/`PrintIterationReport`
//! (§4.5) call into whichever variant the settings select.

use enum_dispatch::enum_dispatch;

use crate::iteration::Iteration;

/// Hook invoked once per outer iteration for logging/monitoring.
#[enum_dispatch]
pub trait Callback {
    fn header(&mut self);

    fn report(&mut self, iteration: &Iteration);
}

/// A callback that does nothing. Use when no per-iteration output is needed
/// (e.g. embedding the solver in another program).
#[derive(Default)]
pub struct NoOpCallback {}

impl Callback for NoOpCallback {
    fn header(&mut self) {}

    fn report(&mut self, _iteration: &Iteration) {}
}

/// Prints a convergence table to stdout, one row per iteration.
#[derive(Default)]
pub struct ConvergenceOutput {}

impl Callback for ConvergenceOutput {
    fn header(&mut self) {
        println!(
            "| {:>4} | {:>8} | {:>13} | {:>13} | {:>10} | {:>8} |",
            "Iter", "MIP", "Dual bound", "Primal bound", "Max viol.", "Cuts"
        );
    }

    fn report(&mut self, iteration: &Iteration) {
        println!(
            "| {:>4} | {:>8?} | {:>13.6e} | {:>13.6e} | {:>10.3e} | {:>8} |",
            iteration.iteration_number,
            iteration.mip_status,
            iteration.dual_bound,
            iteration.primal_bound,
            iteration
                .solution_pool
                .iter()
                .map(|s| s.max_deviation.value)
                .fold(f64::NEG_INFINITY, f64::max),
            iteration.hyperplanes_added.len(),
        );
    }
}

/// Which callback variant a run is configured to use.
#[enum_dispatch(Callback)]
pub enum CallbackHandle {
    NoOp(NoOpCallback),
    Convergence(ConvergenceOutput),
}
