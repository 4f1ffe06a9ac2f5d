//! Error kinds for the outer-approximation engine.
//!
//! Mirrors the shape of [`crate::linalg`]-style errors in the teacher crate this
//! workspace was grown from (`derive_more::{Display, Error}` enums), plus
//! `problemo::Problem` for ad hoc, stringly-described invariant violations at
//! the seams where a one-off message is clearer than a new variant.

use derive_more::{Display, Error};
use problemo::Problem;

/// The five error kinds from the error-handling design: input, modeling,
/// solver, numerical, and resource errors. Recoverable kinds (`Numerical`) are
/// caught at the task boundary and logged; the rest set a termination reason.
#[derive(Debug, Display, Error)]
pub enum EshError {
    /// Problem file could not be parsed, or an unknown setting was supplied.
    #[display("input error: {_0}")]
    Input(#[error(not(source))] String),

    /// A referenced variable/constraint was not found, or an unsupported
    /// operation was requested (e.g. a quadratic term on a linear-only MIP
    /// adapter).
    #[display("modeling error: {_0}")]
    Modeling(#[error(not(source))] String),

    /// The MIP or NLP adapter returned an error status.
    #[display("solver error: {_0}")]
    Solver(#[error(not(source))] String),

    /// A numerical routine (rootsearch, gradient evaluation, ...) could not
    /// proceed. Recoverable: the owning task skips its work this iteration.
    #[display("numerical error: {_0}")]
    Numerical(#[error(not(source))] String),

    /// A resource limit (time, iterations, nodes) was hit. Propagated to the
    /// Termination Monitor, which finalizes cleanly rather than treating this
    /// as a failure.
    #[display("resource limit: {_0}")]
    Resource(#[error(not(source))] String),
}

impl EshError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn modeling(msg: impl Into<String>) -> Self {
        Self::Modeling(msg.into())
    }

    pub fn solver(msg: impl Into<String>) -> Self {
        Self::Solver(msg.into())
    }

    pub fn numerical(msg: impl Into<String>) -> Self {
        Self::Numerical(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Recoverable errors are the ones a task is allowed to swallow (logged,
    /// then the pipeline continues normally).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EshError::Numerical(_))
    }
}

impl From<Problem> for EshError {
    fn from(p: Problem) -> Self {
        EshError::Numerical(p.to_string())
    }
}

pub type EshResult<T> = Result<T, EshError>;
