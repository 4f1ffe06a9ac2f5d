//! The [`Environment`]: a single value bundling settings and run statistics,
//! threaded by reference through every component. Replaces the original
//! implementation's process-wide singletons (settings, process info, results,
//! output) per Design Notes §9 — it is created at solver start and dropped at
//! solver stop, and no mutable global state survives it.

use std::time::Instant;

use crate::settings::Settings;

/// Running statistics accumulated over a solve, read by reporting tasks and
/// by adaptive cadence in the primal-bounding subsystem.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub iterations: u64,
    pub hyperplanes_total: u64,
    pub mip_solves: u64,
    pub nlp_solves: u64,
    pub rootsearches: u64,
    pub primal_bounding_triggers: u64,
    pub dual_repair_triggers: u64,
    /// Wall-clock time spent inside each named timer region, keyed by region
    /// name (e.g. `"DualProblemsIntegerFixed"`). Populated by [`TimerGuard`].
    pub timer_totals_secs: std::collections::HashMap<String, f64>,
}

/// RAII guard recording elapsed wall-clock time into a [`Statistics`] timer
/// bucket on every exit path, including early returns via `?` (§5, "Scoped
/// acquisition").
pub struct TimerGuard<'a> {
    name: &'static str,
    start: Instant,
    stats: &'a mut Statistics,
}

impl<'a> TimerGuard<'a> {
    pub fn new(name: &'static str, stats: &'a mut Statistics) -> Self {
        Self {
            name,
            start: Instant::now(),
            stats,
        }
    }
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed().as_secs_f64();
        *self
            .stats
            .timer_totals_secs
            .entry(self.name.to_string())
            .or_insert(0.0) += elapsed;
    }
}

/// The solver's environment: settings plus run statistics, plus the overall
/// deadline derived from `settings.time_limit_secs` at construction time.
pub struct Environment {
    pub settings: Settings,
    pub statistics: Statistics,
    start_time: Instant,
}

impl Environment {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            statistics: Statistics::default(),
            start_time: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    pub fn time_remaining_secs(&self) -> f64 {
        (self.settings.time_limit_secs - self.elapsed_secs()).max(0.0)
    }

    pub fn timer(&mut self, name: &'static str) -> TimerGuard<'_> {
        TimerGuard::new(name, &mut self.statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_guard_records_on_every_exit_path() {
        let mut env = Environment::new(Settings::default());
        {
            let _g = env.timer("region");
        }
        assert!(env.statistics.timer_totals_secs.contains_key("region"));

        fn fallible(env: &mut Environment) -> Result<(), ()> {
            let _g = env.timer("region");
            Err(())
        }
        let _ = fallible(&mut env);
        assert_eq!(env.statistics.timer_totals_secs.len(), 1);
    }
}
