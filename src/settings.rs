//! Solver settings.
//!
//! The teacher crate generates its options structs with an `explicit_options`
//! proc-macro backed by a global registry. That macro facade lives in a
//! workspace member whose source was not available to grow this crate from,
//! so `Settings` is instead a plain `serde`-round-trippable struct in the
//! idiom the rest of this corpus reaches for when no such macro is at hand.
//! See `DESIGN.md` for the dependency-drop note.

use serde::{Deserialize, Serialize};

/// Which [`crate::adapters::mip::MipHandle`] variant to construct (Design
/// Notes §9: adapter variants are selected at construction from a settings
/// enum). The external variants require a licensed solver this crate does
/// not ship; selecting one without it configured fails at the first solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MipSolverKind {
    #[default]
    Native,
    Cbc,
    Gurobi,
    Cplex,
}

/// Which [`crate::adapters::nlp::NlpHandle`] variant to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NlpSolverKind {
    #[default]
    Native,
    Ipopt,
    Gams,
}

/// Top-level solver settings, loaded from an options file (§6) or defaulted.
///
/// Read-mostly: the primal-bounding subsystem is the sole writer of the two
/// `primal_bounding_*_frequency` fields once a run starts (adaptive cadence,
/// §4.6), which is sound because it is also the sole reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // --- Termination Monitor ---
    pub absolute_gap_tolerance: f64,
    pub relative_gap_tolerance: f64,
    pub constraint_tolerance: f64,
    pub objective_stagnation_tolerance: f64,
    pub objective_stagnation_iteration_limit: u32,
    pub iteration_limit: u64,
    pub time_limit_secs: f64,

    // --- Rootsearch ---
    pub rootsearch_lambda_tolerance: f64,
    pub rootsearch_constraint_tolerance: f64,
    pub rootsearch_max_iterations: u32,

    // --- Hyperplane engine ---
    pub hyperplane_aggregate_mode: bool,
    pub hyperplane_point_quantization: f64,

    // --- Interior point finder ---
    pub interior_point_count: u32,
    pub interior_point_margin: f64,

    // --- Primal bounding (fixed-integer NLP, §4.6) ---
    pub primal_bounding_enabled: bool,
    pub primal_bounding_iteration_frequency: u64,
    pub primal_bounding_time_frequency_secs: f64,
    pub primal_bounding_feasibility_tolerance: f64,
    pub primal_bounding_success_iteration_factor: f64,
    pub primal_bounding_success_time_factor: f64,
    pub primal_bounding_failure_iteration_factor: f64,
    pub primal_bounding_failure_time_factor: f64,
    pub primal_bounding_frequency_ceiling_factor: f64,

    // --- Dual repair (fixed-integer LP/QP, §4.7) ---
    pub fixed_integer_repair_trigger_repeats: u32,
    pub fixed_integer_max_iterations: u32,
    pub fixed_integer_objective_tolerance: f64,
    pub fixed_integer_stagnation_limit: u32,

    // --- Reporting ---
    pub print_header_interval: u64,

    // --- MIP adapter controls ---
    pub mip_cutoff: Option<f64>,
    pub mip_time_limit_secs: Option<f64>,
    pub mip_solution_limit: Option<u64>,
    pub mip_threads: u32,
    pub mip_solver: MipSolverKind,
    pub nlp_solver: NlpSolverKind,

    /// When `false`, use the raw exterior point for cuts (ECP) instead of the
    /// interior/exterior rootsearch (ESH). Automatically forced to `false` if
    /// the Interior-Point Finder cannot find a strictly interior point.
    pub esh_mode: bool,

    /// Print a convergence table to stdout once per iteration. Disabled by
    /// default so the engine is silent when embedded in another program.
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            absolute_gap_tolerance: 1e-5,
            relative_gap_tolerance: 1e-4,
            constraint_tolerance: 1e-5,
            objective_stagnation_tolerance: 1e-5,
            objective_stagnation_iteration_limit: 10,
            iteration_limit: 1_000,
            time_limit_secs: 900.0,

            rootsearch_lambda_tolerance: 1e-8,
            rootsearch_constraint_tolerance: 1e-8,
            rootsearch_max_iterations: 100,

            hyperplane_aggregate_mode: false,
            hyperplane_point_quantization: 1e-6,

            interior_point_count: 1,
            interior_point_margin: 1e-3,

            primal_bounding_enabled: true,
            primal_bounding_iteration_frequency: 10,
            primal_bounding_time_frequency_secs: 5.0,
            primal_bounding_feasibility_tolerance: 1e-5,
            primal_bounding_success_iteration_factor: 0.98,
            primal_bounding_success_time_factor: 0.9,
            primal_bounding_failure_iteration_factor: 1.02,
            primal_bounding_failure_time_factor: 1.1,
            primal_bounding_frequency_ceiling_factor: 10.0,

            fixed_integer_repair_trigger_repeats: 3,
            fixed_integer_max_iterations: 20,
            fixed_integer_objective_tolerance: 1e-6,
            fixed_integer_stagnation_limit: 10,

            print_header_interval: 50,

            mip_cutoff: None,
            mip_time_limit_secs: None,
            mip_solution_limit: None,
            mip_threads: 1,
            mip_solver: MipSolverKind::Native,
            nlp_solver: NlpSolverKind::Native,

            esh_mode: true,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).expect("serialize");
        let back: Settings = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.absolute_gap_tolerance, settings.absolute_gap_tolerance);
        assert_eq!(back.iteration_limit, settings.iteration_limit);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let back: Settings = serde_json::from_str("{\"iteration_limit\": 5}").expect("deserialize");
        assert_eq!(back.iteration_limit, 5);
        assert_eq!(back.absolute_gap_tolerance, Settings::default().absolute_gap_tolerance);
    }
}
