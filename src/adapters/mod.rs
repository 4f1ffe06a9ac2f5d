//! MIP and NLP solver adapters (§6): capability interfaces over external
//! branch-and-cut and continuous solvers, replacing the original
//! implementation's inheritance hierarchies per Design Notes §9. Variants
//! are dispatched via `enum_dispatch` rather than `dyn` trait objects since
//! the concrete set is fixed at settings-parse time.

pub mod mip;
pub mod nlp;

pub use mip::{MipHandle, MipSolver, NativeMip};
pub use nlp::{NativeNlp, NlpHandle, NlpSolver};
