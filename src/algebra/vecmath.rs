use itertools::izip;
use num_traits::{Float, FromPrimitive, NumAssign};
use std::iter::zip;

/// Scalar type of the solver core.
///
/// Everything numerical is generic over `FloatT`, which collects exactly
/// the floating point capabilities the engine relies on: arithmetic with
/// assignment operators, conversion from literals and problem
/// dimensions, and exponent formatting for the iteration table.   `f64`
/// is the intended instantiation; `f32` satisfies the bounds as well.

pub trait FloatT:
    'static + Float + NumAssign + Default + FromPrimitive + std::fmt::Debug + std::fmt::LowerExp
{
}
impl FloatT for f32 {}
impl FloatT for f64 {}

/// Conversion of constants and dimensions into [`FloatT`] values,
/// written `(0.5).as_T()` at the use site.
///
/// Only the two source types the solver needs are covered: `f64` for
/// literal constants (tolerances, safeguard factors) and `usize` for the
/// dimension-dependent scalings of the termination tests.

#[allow(non_snake_case)]
pub trait AsFloatT<T>: 'static {
    fn as_T(&self) -> T;
}

impl<T: FloatT> AsFloatT<T> for f64 {
    #[inline]
    fn as_T(&self) -> T {
        T::from_f64(*self).unwrap()
    }
}

impl<T: FloatT> AsFloatT<T> for usize {
    #[inline]
    fn as_T(&self) -> T {
        T::from_usize(*self).unwrap()
    }
}

/// Scalar operations on [`FloatT`]

pub trait ScalarMath {
    type T: FloatT;
    /// Restrict a value to the range `[min_thresh, max_thresh]`
    fn clip(&self, min_thresh: Self::T, max_thresh: Self::T) -> Self::T;
}

impl<T: FloatT> ScalarMath for T {
    type T = T;
    fn clip(&self, min_thresh: T, max_thresh: T) -> T {
        T::min(T::max(*self, min_thresh), max_thresh)
    }
}

/// Vector operations on slices of [`FloatT`]

pub trait VectorMath {
    type T: FloatT;

    /// Copy values from `src` to `self`
    fn copy_from(&mut self, src: &Self) -> &mut Self;

    /// Apply an elementwise operation to a vector in place.
    fn scalarop(&mut self, op: impl Fn(Self::T) -> Self::T) -> &mut Self;

    /// Set all elements to the same value
    fn set(&mut self, c: Self::T) -> &mut Self;

    /// Multiply all elements by a constant
    fn scale(&mut self, c: Self::T) -> &mut Self;

    /// Negate all elements
    fn negate(&mut self) -> &mut Self;

    /// Standard dot product
    fn dot(&self, y: &Self) -> Self::T;

    /// Sum of elements
    fn sum(&self) -> Self::T;

    /// ℓ∞-norm
    fn norm_inf(&self) -> Self::T;

    /// ℓ1-norm
    fn norm_one(&self) -> Self::T;

    /// ℓ∞-norm of the difference of two vectors
    fn norm_inf_diff(&self, b: &Self) -> Self::T;

    /// Self = a*x + b*self
    fn axpby(&mut self, a: Self::T, x: &Self, b: Self::T) -> &mut Self;
}

impl<T: FloatT> VectorMath for [T] {
    type T = T;

    fn copy_from(&mut self, src: &[T]) -> &mut Self {
        self.copy_from_slice(src);
        self
    }

    fn scalarop(&mut self, op: impl Fn(T) -> T) -> &mut Self {
        for x in &mut *self {
            *x = op(*x);
        }
        self
    }

    fn set(&mut self, c: T) -> &mut Self {
        self.scalarop(|_x| c)
    }

    fn scale(&mut self, c: T) -> &mut Self {
        self.scalarop(|x| x * c)
    }

    fn negate(&mut self) -> &mut Self {
        self.scalarop(|x| -x)
    }

    fn dot(&self, y: &[T]) -> T {
        zip(self, y).fold(T::zero(), |acc, (&x, &y)| acc + x * y)
    }

    fn sum(&self) -> T {
        self.iter().fold(T::zero(), |acc, &x| acc + x)
    }

    fn norm_inf(&self) -> T {
        let mut out = T::zero();
        for v in self.iter().map(|v| v.abs()) {
            out = if v > out { v } else { out };
        }
        out
    }

    fn norm_one(&self) -> T {
        self.iter().fold(T::zero(), |acc, v| acc + v.abs())
    }

    fn norm_inf_diff(&self, b: &[T]) -> T {
        let mut out = T::zero();
        for (&a, &b) in zip(self, b) {
            let v = T::abs(a - b);
            out = if v > out { v } else { out };
        }
        out
    }

    fn axpby(&mut self, a: T, x: &[T], b: T) -> &mut Self {
        assert_eq!(self.len(), x.len());
        for (y, x) in izip!(self.iter_mut(), x) {
            *y = a * (*x) + b * (*y);
        }
        self
    }
}
