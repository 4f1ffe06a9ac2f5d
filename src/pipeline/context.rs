//! [`SolveContext`]: everything a pipeline task borrows. Tasks are
//! parameterized by a borrow of this value rather than co-owning it with the
//! problem and process info, breaking the original source's Task <->
//! ProcessInfo <-> Problem reference cycle (Design Notes §9).

use std::collections::VecDeque;

use crate::adapters::mip::{MipHandle, MipSolver};
use crate::adapters::nlp::NlpHandle;
use crate::callback::CallbackHandle;
use crate::dual_repair::RepeatDetector;
use crate::environment::Environment;
use crate::hyperplane::HyperplaneEngine;
use crate::interior::InteriorPoint;
use crate::iteration::{Iteration, Results};
use crate::primal::{PrimalBounder, PrimalCandidate};
use crate::problem::Problem;
use crate::reformulate::ReformulatedProblem;
use crate::status::TerminationReason;
use crate::termination::StagnationTracker;
use crate::terminators::Terminator;

pub struct SolveContext {
    pub env: Environment,
    pub problem: Problem,
    pub reformulated: ReformulatedProblem,
    pub mip: MipHandle,
    pub nlp: NlpHandle,
    pub callback: CallbackHandle,
    pub hyperplane_engine: HyperplaneEngine,
    pub results: Results,
    pub interior_points: Vec<InteriorPoint>,
    pub primal_bounder: PrimalBounder,
    pub repeat_detector: RepeatDetector,
    pub stagnation: StagnationTracker,
    pub terminator: Box<dyn Terminator>,
    pub esh_mode: bool,
    pub current_iteration: Option<Iteration>,
    pub pending_candidates: VecDeque<PrimalCandidate>,
    /// Trial points carried from `SolveIteration` into `SelectHyperplanePoints`
    /// (one per violated nonlinear constraint encountered in the pool).
    pub pending_trial_points: VecDeque<(usize, Vec<f64>)>,
    pub discrete_indices: Vec<usize>,
    pub terminate: Option<TerminationReason>,
    /// The `x` (reformulated space) achieving `current_iteration`'s primal
    /// bound, if this iteration improved it. Set by whichever task updates
    /// the primal bound; consumed when the iteration is sealed.
    pub current_iteration_primal_x: Option<Vec<f64>>,
    /// Best primal objective found so far, in the reformulated problem's
    /// internal minimization convention (Open Question (a); undone once via
    /// `ReformulatedProblem::to_reported_objective` when results are reported).
    pub primal_bound_internal: f64,
    /// Hyperplane-pool indices generated this iteration but not yet installed
    /// into the MIP adapter (drained by `AddHyperplanes`).
    pub pending_hyperplane_indices: VecDeque<usize>,
    /// Iteration number / elapsed time at which primal bounding last ran,
    /// for `AdaptiveCadence` gating. `None` means it has never run yet, which
    /// always clears the gate so the first opportunity is always taken.
    pub primal_bounding_last_iteration: Option<u64>,
    pub primal_bounding_last_time: Option<f64>,
}

impl SolveContext {
    pub fn seal_current_iteration(&mut self) {
        if let Some(iteration) = self.current_iteration.take() {
            let primal_x = self.current_iteration_primal_x.take();
            self.results.push_iteration(iteration, primal_x);
        }
    }

    pub fn request_finalize(&mut self, reason: TerminationReason) {
        if self.terminate.is_none() {
            self.terminate = Some(reason);
        }
    }
}
