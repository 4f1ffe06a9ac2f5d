//! The original-space problem description (§3): variables, objective,
//! and constraints partitioned by term kind.

pub mod constraint;
pub mod model;
pub mod objective;
pub mod variable;

pub use constraint::{Curvature, LinearConstraint, NonlinearConstraint, QuadraticConstraint};
pub use model::Problem;
pub use objective::{Objective, Sense, SparseRow};
pub use variable::{Variable, VariableKind};
