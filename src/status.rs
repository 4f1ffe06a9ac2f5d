//! Status codes shared across the engine: adapter statuses and termination
//! reasons. Mirrors the teacher's top-level `Status` enum in spirit (a small
//! `Copy` enum threaded through solver state), split into the several
//! statuses this engine actually needs to distinguish.

use serde::{Deserialize, Serialize};

/// Status returned by a [`crate::adapters::mip::MipSolver::solve`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MipStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unbounded,
    SolutionLimit,
    TimeLimit,
    NodeLimit,
    Error,
}

impl MipStatus {
    pub fn has_solution(self) -> bool {
        matches!(self, MipStatus::Optimal | MipStatus::Feasible | MipStatus::SolutionLimit)
    }

    pub fn is_error(self) -> bool {
        matches!(self, MipStatus::Infeasible | MipStatus::Unbounded | MipStatus::Error)
    }
}

/// Status returned by a [`crate::adapters::nlp::NlpSolver::solve`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NlpStatus {
    Optimal,
    Feasible,
    Infeasible,
    Error,
    Limit,
}

impl NlpStatus {
    pub fn has_solution(self) -> bool {
        matches!(self, NlpStatus::Optimal | NlpStatus::Feasible)
    }
}

/// Why the outer loop finalized. Exactly one is ever set on a run's
/// [`crate::iteration::Results`] (§8, "terminal iteration invariant").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    AbsoluteGap,
    RelativeGap,
    ConstraintTolerance,
    ObjectiveStagnation,
    IterationLimit,
    TimeLimit,
    IterationError,
    Interrupted,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TerminationReason::AbsoluteGap => "absolute gap tolerance met",
            TerminationReason::RelativeGap => "relative gap tolerance met",
            TerminationReason::ConstraintTolerance => "constraint tolerance met",
            TerminationReason::ObjectiveStagnation => "objective stagnation",
            TerminationReason::IterationLimit => "iteration limit reached",
            TerminationReason::TimeLimit => "time limit reached",
            TerminationReason::IterationError => "unrecoverable iteration error",
            TerminationReason::Interrupted => "interrupted",
        };
        write!(f, "{s}")
    }
}
