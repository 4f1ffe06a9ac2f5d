//! Variables: (index, name, kind, lower, upper), §3.

use serde::{Deserialize, Serialize};

use crate::error::{EshError, EshResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableKind {
    Real,
    Binary,
    Integer,
    Semicontinuous,
}

impl VariableKind {
    pub fn is_discrete(self) -> bool {
        matches!(self, VariableKind::Binary | VariableKind::Integer)
    }
}

/// A decision variable. The index is assigned by [`crate::problem::model::Problem`]
/// at insertion time and is stable and dense thereafter; bounds may be
/// tightened but never loosened (§3).
#[derive(Debug, Clone)]
pub struct Variable {
    index: usize,
    name: String,
    kind: VariableKind,
    lower: f64,
    upper: f64,
}

impl Variable {
    pub(crate) fn new(index: usize, name: impl Into<String>, kind: VariableKind, lower: f64, upper: f64) -> EshResult<Self> {
        if lower > upper {
            return Err(EshError::modeling(format!(
                "variable '{}' has lower bound {lower} greater than upper bound {upper}",
                name.into()
            )));
        }
        let (lower, upper) = match kind {
            VariableKind::Binary => (lower.max(0.0), upper.min(1.0)),
            _ => (lower, upper),
        };
        Ok(Self {
            index,
            name: name.into(),
            kind,
            lower,
            upper,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Tighten the lower bound. Returns an error if `new_lower` would loosen
    /// the bound (§3 invariant: bounds may be tightened but never loosened).
    pub fn tighten_lower(&mut self, new_lower: f64) -> EshResult<()> {
        if new_lower < self.lower {
            return Err(EshError::modeling(format!(
                "refusing to loosen lower bound of '{}' from {} to {}",
                self.name, self.lower, new_lower
            )));
        }
        if new_lower > self.upper {
            return Err(EshError::modeling(format!(
                "tightened lower bound {new_lower} of '{}' would exceed upper bound {}",
                self.name, self.upper
            )));
        }
        self.lower = new_lower;
        Ok(())
    }

    /// Tighten the upper bound; see [`Self::tighten_lower`].
    pub fn tighten_upper(&mut self, new_upper: f64) -> EshResult<()> {
        if new_upper > self.upper {
            return Err(EshError::modeling(format!(
                "refusing to loosen upper bound of '{}' from {} to {}",
                self.name, self.upper, new_upper
            )));
        }
        if new_upper < self.lower {
            return Err(EshError::modeling(format!(
                "tightened upper bound {new_upper} of '{}' would fall below lower bound {}",
                self.name, self.lower
            )));
        }
        self.upper = new_upper;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_bounds_are_clamped_to_unit_interval() {
        let v = Variable::new(0, "b", VariableKind::Binary, -5.0, 5.0).unwrap();
        assert_eq!((v.lower(), v.upper()), (0.0, 1.0));
    }

    #[test]
    fn tightening_cannot_loosen_bounds() {
        let mut v = Variable::new(0, "x", VariableKind::Real, 0.0, 10.0).unwrap();
        assert!(v.tighten_upper(5.0).is_ok());
        assert_eq!(v.upper(), 5.0);
        assert!(v.tighten_upper(7.0).is_err());
        assert_eq!(v.upper(), 5.0);
    }
}
