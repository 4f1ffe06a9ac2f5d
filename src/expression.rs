//! The expression evaluator: an external collaborator per the purpose/scope
//! section (the choice of representation — factorable graph, AD tape,
//! interpreter — is an implementation concern, Design Notes §9). This module
//! ships one concrete, self-contained interpreter (`Expr`) satisfying the
//! narrow [`ExpressionEvaluator`] interface the rest of the engine consumes,
//! for use without an external symbolic engine wired in.

use crate::problem::constraint::Curvature;

/// Narrow interface the core consumes from a nonlinear expression handle:
/// value, gradient, a conservative interval range over a box, and a
/// curvature hint used by the Reformulator's classification pass.
pub trait ExpressionEvaluator: dyn_clone::DynClone + Send + Sync {
    fn value(&self, x: &[f64]) -> f64;

    fn gradient(&self, x: &[f64]) -> Vec<f64>;

    fn interval_range(&self, bounds: &[(f64, f64)]) -> (f64, f64);

    /// `None` means "cannot determine" — the Reformulator treats this the
    /// same as `Curvature::Indeterminate`.
    fn curvature_hint(&self, bounds: &[(f64, f64)]) -> Option<Curvature>;

    fn n_vars(&self) -> usize;
}

dyn_clone::clone_trait_object!(ExpressionEvaluator);

pub type ExprHandle = Box<dyn ExpressionEvaluator>;

/// A small dual number for forward-mode automatic differentiation: tracks a
/// value and the derivative with respect to a single chosen input.
#[derive(Debug, Clone, Copy)]
struct Dual {
    val: f64,
    eps: f64,
}

impl Dual {
    fn constant(v: f64) -> Self {
        Self { val: v, eps: 0.0 }
    }
}

impl std::ops::Add for Dual {
    type Output = Dual;
    fn add(self, rhs: Dual) -> Dual {
        Dual {
            val: self.val + rhs.val,
            eps: self.eps + rhs.eps,
        }
    }
}

impl std::ops::Sub for Dual {
    type Output = Dual;
    fn sub(self, rhs: Dual) -> Dual {
        Dual {
            val: self.val - rhs.val,
            eps: self.eps - rhs.eps,
        }
    }
}

impl std::ops::Mul for Dual {
    type Output = Dual;
    fn mul(self, rhs: Dual) -> Dual {
        Dual {
            val: self.val * rhs.val,
            eps: self.eps * rhs.val + self.val * rhs.eps,
        }
    }
}

impl std::ops::Div for Dual {
    type Output = Dual;
    fn div(self, rhs: Dual) -> Dual {
        Dual {
            val: self.val / rhs.val,
            eps: (self.eps * rhs.val - self.val * rhs.eps) / (rhs.val * rhs.val),
        }
    }
}

impl std::ops::Neg for Dual {
    type Output = Dual;
    fn neg(self) -> Dual {
        Dual {
            val: -self.val,
            eps: -self.eps,
        }
    }
}

/// A conservative interval, used for bound propagation and curvature
/// classification by interval arithmetic.
#[derive(Debug, Clone, Copy)]
struct Interval {
    lo: f64,
    hi: f64,
}

impl Interval {
    fn constant(v: f64) -> Self {
        Self { lo: v, hi: v }
    }

    fn add(self, other: Interval) -> Interval {
        Interval {
            lo: self.lo + other.lo,
            hi: self.hi + other.hi,
        }
    }

    fn sub(self, other: Interval) -> Interval {
        Interval {
            lo: self.lo - other.hi,
            hi: self.hi - other.lo,
        }
    }

    fn neg(self) -> Interval {
        Interval {
            lo: -self.hi,
            hi: -self.lo,
        }
    }

    fn mul(self, other: Interval) -> Interval {
        let candidates = [
            self.lo * other.lo,
            self.lo * other.hi,
            self.hi * other.lo,
            self.hi * other.hi,
        ];
        Interval {
            lo: candidates.iter().cloned().fold(f64::INFINITY, f64::min),
            hi: candidates.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    fn contains_zero(self) -> bool {
        self.lo <= 0.0 && self.hi >= 0.0
    }
}

/// A factorable nonlinear expression tree over a fixed set of variable
/// indices. Supports value/gradient evaluation (forward-mode AD, one pass per
/// variable — adequate for the small dense problems this engine targets),
/// interval bound propagation, and a simple convexity classifier.
///
/// `Serialize`/`Deserialize` let a problem file (§6) carry a nonlinear
/// constraint or objective as a plain JSON tree instead of only linear and
/// quadratic terms.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    Var(usize),
    Const(f64),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    /// Integer power, e.g. `x^2`.
    Pow(Box<Expr>, i32),
    Sqrt(Box<Expr>),
    Exp(Box<Expr>),
    Ln(Box<Expr>),
    Sin(Box<Expr>),
    Cos(Box<Expr>),
}

impl Expr {
    pub fn var(i: usize) -> Expr {
        Expr::Var(i)
    }

    pub fn constant(v: f64) -> Expr {
        Expr::Const(v)
    }

    pub fn into_handle(self, n_vars: usize) -> ExprHandle {
        Box::new(CompiledExpr { expr: self, n_vars })
    }

    fn eval_dual(&self, x: &[Dual]) -> Dual {
        match self {
            Expr::Var(i) => x[*i],
            Expr::Const(v) => Dual::constant(*v),
            Expr::Add(a, b) => a.eval_dual(x) + b.eval_dual(x),
            Expr::Sub(a, b) => a.eval_dual(x) - b.eval_dual(x),
            Expr::Mul(a, b) => a.eval_dual(x) * b.eval_dual(x),
            Expr::Div(a, b) => a.eval_dual(x) / b.eval_dual(x),
            Expr::Neg(a) => -a.eval_dual(x),
            Expr::Pow(a, n) => {
                let base = a.eval_dual(x);
                let pow_val = base.val.powi(*n);
                let dpow = (*n as f64) * base.val.powi(n - 1);
                Dual {
                    val: pow_val,
                    eps: dpow * base.eps,
                }
            }
            Expr::Sqrt(a) => {
                let base = a.eval_dual(x);
                let val = base.val.sqrt();
                Dual {
                    val,
                    eps: base.eps / (2.0 * val),
                }
            }
            Expr::Exp(a) => {
                let base = a.eval_dual(x);
                let val = base.val.exp();
                Dual { val, eps: val * base.eps }
            }
            Expr::Ln(a) => {
                let base = a.eval_dual(x);
                Dual {
                    val: base.val.ln(),
                    eps: base.eps / base.val,
                }
            }
            Expr::Sin(a) => {
                let base = a.eval_dual(x);
                Dual {
                    val: base.val.sin(),
                    eps: base.val.cos() * base.eps,
                }
            }
            Expr::Cos(a) => {
                let base = a.eval_dual(x);
                Dual {
                    val: base.val.cos(),
                    eps: -base.val.sin() * base.eps,
                }
            }
        }
    }

    fn eval_interval(&self, bounds: &[Interval]) -> Interval {
        match self {
            Expr::Var(i) => bounds[*i],
            Expr::Const(v) => Interval::constant(*v),
            Expr::Add(a, b) => a.eval_interval(bounds).add(b.eval_interval(bounds)),
            Expr::Sub(a, b) => a.eval_interval(bounds).sub(b.eval_interval(bounds)),
            Expr::Mul(a, b) => a.eval_interval(bounds).mul(b.eval_interval(bounds)),
            Expr::Div(a, b) => {
                let bi = b.eval_interval(bounds);
                if bi.contains_zero() {
                    Interval { lo: f64::NEG_INFINITY, hi: f64::INFINITY }
                } else {
                    let recip = Interval { lo: 1.0 / bi.hi, hi: 1.0 / bi.lo };
                    a.eval_interval(bounds).mul(recip)
                }
            }
            Expr::Neg(a) => a.eval_interval(bounds).neg(),
            Expr::Pow(a, n) => {
                let ai = a.eval_interval(bounds);
                if *n % 2 == 0 {
                    let candidates = [ai.lo.powi(*n), ai.hi.powi(*n)];
                    let lo = if ai.contains_zero() {
                        0.0
                    } else {
                        candidates.iter().cloned().fold(f64::INFINITY, f64::min)
                    };
                    let hi = candidates.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                    Interval { lo, hi }
                } else {
                    Interval { lo: ai.lo.powi(*n), hi: ai.hi.powi(*n) }
                }
            }
            Expr::Sqrt(a) => {
                let ai = a.eval_interval(bounds);
                Interval { lo: ai.lo.max(0.0).sqrt(), hi: ai.hi.max(0.0).sqrt() }
            }
            Expr::Exp(a) => {
                let ai = a.eval_interval(bounds);
                Interval { lo: ai.lo.exp(), hi: ai.hi.exp() }
            }
            Expr::Ln(a) => {
                let ai = a.eval_interval(bounds);
                Interval { lo: ai.lo.max(1e-300).ln(), hi: ai.hi.max(1e-300).ln() }
            }
            Expr::Sin(_) | Expr::Cos(_) => Interval { lo: -1.0, hi: 1.0 },
        }
    }

    /// Whether this sub-expression is syntactically affine (linear plus a
    /// constant) in the variables, i.e. has curvature `Linear`.
    fn is_affine(&self) -> bool {
        matches!(self.curvature_of(&[]), Curvature::Linear)
    }

    /// Classifies curvature via simple factorable-function composition
    /// rules. `bounds` is currently unused by most rules but threaded through
    /// for rules that would need sign information from the domain (kept for
    /// forward compatibility with tighter domain-aware rules).
    fn curvature_of(&self, bounds: &[(f64, f64)]) -> Curvature {
        match self {
            Expr::Var(_) | Expr::Const(_) => Curvature::Linear,
            Expr::Add(a, b) => combine_add(a.curvature_of(bounds), b.curvature_of(bounds)),
            Expr::Sub(a, b) => combine_add(a.curvature_of(bounds), flip(b.curvature_of(bounds))),
            Expr::Neg(a) => flip(a.curvature_of(bounds)),
            Expr::Mul(a, b) => {
                if let Expr::Const(c) = **a {
                    scale(b.curvature_of(bounds), c)
                } else if let Expr::Const(c) = **b {
                    scale(a.curvature_of(bounds), c)
                } else {
                    Curvature::Indeterminate
                }
            }
            Expr::Div(a, b) => {
                if let Expr::Const(c) = **b {
                    if c != 0.0 {
                        scale(a.curvature_of(bounds), 1.0 / c)
                    } else {
                        Curvature::Indeterminate
                    }
                } else {
                    Curvature::Indeterminate
                }
            }
            Expr::Pow(a, n) => {
                if *n == 1 {
                    a.curvature_of(bounds)
                } else if *n % 2 == 0 && *n > 0 && a.is_affine() {
                    Curvature::Convex
                } else {
                    Curvature::Indeterminate
                }
            }
            Expr::Sqrt(a) => {
                if a.is_affine() {
                    Curvature::Concave
                } else {
                    Curvature::Indeterminate
                }
            }
            Expr::Exp(a) => match a.curvature_of(bounds) {
                Curvature::Linear | Curvature::Convex => Curvature::Convex,
                _ => Curvature::Indeterminate,
            },
            Expr::Ln(a) => match a.curvature_of(bounds) {
                Curvature::Linear | Curvature::Concave => Curvature::Concave,
                _ => Curvature::Indeterminate,
            },
            Expr::Sin(_) | Expr::Cos(_) => Curvature::Indeterminate,
        }
    }
}

fn flip(c: Curvature) -> Curvature {
    c.flip()
}

fn scale(c: Curvature, factor: f64) -> Curvature {
    if factor >= 0.0 { c } else { flip(c) }
}

fn combine_add(a: Curvature, b: Curvature) -> Curvature {
    use Curvature::*;
    match (a, b) {
        (Linear, Linear) => Linear,
        (Linear, other) | (other, Linear) => other,
        (Convex, Convex) => Convex,
        (Concave, Concave) => Concave,
        _ => Indeterminate,
    }
}

/// An [`Expr`] paired with the dimensionality it expects, implementing
/// [`ExpressionEvaluator`].
#[derive(Debug, Clone)]
struct CompiledExpr {
    expr: Expr,
    n_vars: usize,
}

impl ExpressionEvaluator for CompiledExpr {
    fn value(&self, x: &[f64]) -> f64 {
        let duals: Vec<Dual> = x.iter().map(|&v| Dual::constant(v)).collect();
        self.expr.eval_dual(&duals).val
    }

    fn gradient(&self, x: &[f64]) -> Vec<f64> {
        (0..self.n_vars)
            .map(|i| {
                let duals: Vec<Dual> = x
                    .iter()
                    .enumerate()
                    .map(|(j, &v)| Dual { val: v, eps: if i == j { 1.0 } else { 0.0 } })
                    .collect();
                self.expr.eval_dual(&duals).eps
            })
            .collect()
    }

    fn interval_range(&self, bounds: &[(f64, f64)]) -> (f64, f64) {
        let intervals: Vec<Interval> = bounds.iter().map(|&(lo, hi)| Interval { lo, hi }).collect();
        let r = self.expr.eval_interval(&intervals);
        (r.lo, r.hi)
    }

    fn curvature_hint(&self, bounds: &[(f64, f64)]) -> Option<Curvature> {
        Some(self.expr.curvature_of(bounds))
    }

    fn n_vars(&self) -> usize {
        self.n_vars
    }
}

/// Wraps an [`ExprHandle`] as `sign * inner(x) + shift`, used by the
/// Reformulator to normalize two-sided constraints `L <= f(x) <= U` into the
/// one-sided form `g(x) <= 0` without needing to rebuild the underlying
/// expression tree.
#[derive(Clone)]
pub struct AffineTransformedExpr {
    inner: ExprHandle,
    sign: f64,
    shift: f64,
}

impl AffineTransformedExpr {
    pub fn new(inner: ExprHandle, sign: f64, shift: f64) -> ExprHandle {
        Box::new(Self { inner, sign, shift })
    }
}

impl ExpressionEvaluator for AffineTransformedExpr {
    fn value(&self, x: &[f64]) -> f64 {
        self.sign * self.inner.value(x) + self.shift
    }

    fn gradient(&self, x: &[f64]) -> Vec<f64> {
        self.inner.gradient(x).into_iter().map(|g| self.sign * g).collect()
    }

    fn interval_range(&self, bounds: &[(f64, f64)]) -> (f64, f64) {
        let (lo, hi) = self.inner.interval_range(bounds);
        if self.sign >= 0.0 {
            (self.sign * lo + self.shift, self.sign * hi + self.shift)
        } else {
            (self.sign * hi + self.shift, self.sign * lo + self.shift)
        }
    }

    fn curvature_hint(&self, bounds: &[(f64, f64)]) -> Option<Curvature> {
        let inner = self.inner.curvature_hint(bounds)?;
        Some(if self.sign >= 0.0 { inner } else { inner.flip() })
    }

    fn n_vars(&self) -> usize {
        self.inner.n_vars()
    }
}

/// A quadratic form `x^T Q x + a.x + c` as an [`ExpressionEvaluator`], used
/// by the Reformulator to fold a quadratic objective or constraint into the
/// epigraph/nonlinear machinery uniformly (§4.1, "optionally converts
/// quadratic forms into nonlinear when the MIP adapter lacks quadratic
/// support").
#[derive(Debug, Clone)]
pub struct QuadraticForm {
    n_vars: usize,
    linear: Vec<(usize, f64)>,
    quadratic: Vec<(usize, usize, f64)>,
    constant: f64,
}

impl QuadraticForm {
    pub fn new(n_vars: usize, linear: Vec<(usize, f64)>, quadratic: Vec<(usize, usize, f64)>, constant: f64) -> ExprHandle {
        Box::new(Self { n_vars, linear, quadratic, constant })
    }
}

impl ExpressionEvaluator for QuadraticForm {
    fn value(&self, x: &[f64]) -> f64 {
        let lin: f64 = self.linear.iter().map(|&(i, c)| c * x[i]).sum();
        let quad: f64 = self
            .quadratic
            .iter()
            .map(|&(i, j, q)| if i == j { q * x[i] * x[j] } else { 2.0 * q * x[i] * x[j] })
            .sum();
        lin + quad + self.constant
    }

    fn gradient(&self, x: &[f64]) -> Vec<f64> {
        let mut g = vec![0.0; self.n_vars];
        for &(i, c) in &self.linear {
            g[i] += c;
        }
        for &(i, j, q) in &self.quadratic {
            if i == j {
                g[i] += 2.0 * q * x[i];
            } else {
                g[i] += 2.0 * q * x[j];
                g[j] += 2.0 * q * x[i];
            }
        }
        g
    }

    fn interval_range(&self, bounds: &[(f64, f64)]) -> (f64, f64) {
        let mut lo = self.constant;
        let mut hi = self.constant;
        for &(i, c) in &self.linear {
            let (blo, bhi) = bounds[i];
            let candidates = [c * blo, c * bhi];
            lo += candidates.iter().cloned().fold(f64::INFINITY, f64::min);
            hi += candidates.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        }
        for &(i, j, q) in &self.quadratic {
            let (ilo, ihi) = bounds[i];
            let (jlo, jhi) = bounds[j];
            let factor = if i == j { q } else { 2.0 * q };
            let candidates = [ilo * jlo, ilo * jhi, ihi * jlo, ihi * jhi];
            let term_lo = factor * candidates.iter().cloned().fold(f64::INFINITY, f64::min);
            let term_hi = factor * candidates.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let (term_lo, term_hi) = if factor >= 0.0 { (term_lo, term_hi) } else { (term_hi, term_lo) };
            lo += term_lo;
            hi += term_hi;
        }
        (lo, hi)
    }

    fn curvature_hint(&self, _bounds: &[(f64, f64)]) -> Option<Curvature> {
        if self.quadratic.is_empty() {
            return Some(Curvature::Linear);
        }
        let has_off_diagonal = self.quadratic.iter().any(|&(i, j, _)| i != j);
        if has_off_diagonal {
            return Some(Curvature::Indeterminate);
        }
        let all_nonneg = self.quadratic.iter().all(|&(_, _, q)| q >= 0.0);
        let all_nonpos = self.quadratic.iter().all(|&(_, _, q)| q <= 0.0);
        if all_nonneg {
            Some(Curvature::Convex)
        } else if all_nonpos {
            Some(Curvature::Concave)
        } else {
            Some(Curvature::Indeterminate)
        }
    }

    fn n_vars(&self) -> usize {
        self.n_vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_of_squares() -> Expr {
        // x^2 + y^2
        Expr::Add(
            Box::new(Expr::Pow(Box::new(Expr::Var(0)), 2)),
            Box::new(Expr::Pow(Box::new(Expr::Var(1)), 2)),
        )
    }

    #[test]
    fn value_and_gradient_of_sum_of_squares() {
        let handle = sum_of_squares().into_handle(2);
        let x = [2.0, 3.0];
        assert_eq!(handle.value(&x), 13.0);
        assert_eq!(handle.gradient(&x), vec![4.0, 6.0]);
    }

    #[test]
    fn sum_of_squares_is_convex() {
        let handle = sum_of_squares().into_handle(2);
        assert_eq!(
            handle.curvature_hint(&[(-10.0, 10.0), (-10.0, 10.0)]),
            Some(Curvature::Convex)
        );
    }

    #[test]
    fn product_of_two_variables_is_indeterminate() {
        let expr = Expr::Mul(Box::new(Expr::Var(0)), Box::new(Expr::Var(1)));
        let handle = expr.into_handle(2);
        assert_eq!(
            handle.curvature_hint(&[(-10.0, 10.0), (-10.0, 10.0)]),
            Some(Curvature::Indeterminate)
        );
    }

    #[test]
    fn interval_range_of_sum_of_squares_is_nonnegative() {
        let handle = sum_of_squares().into_handle(2);
        let (lo, hi) = handle.interval_range(&[(-2.0, 1.0), (-1.0, 3.0)]);
        assert_eq!(lo, 0.0);
        assert_eq!(hi, 9.0);
    }

    #[test]
    fn diagonal_quadratic_form_with_nonnegative_coefficients_is_convex() {
        let handle = QuadraticForm::new(2, vec![(0, 1.0)], vec![(0, 0, 2.0), (1, 1, 3.0)], 0.0);
        assert_eq!(handle.value(&[1.0, 2.0]), 1.0 + 2.0 + 12.0);
        assert_eq!(handle.curvature_hint(&[(-1.0, 1.0), (-1.0, 1.0)]), Some(Curvature::Convex));
    }
}
