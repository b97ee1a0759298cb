use crate::utils::{AtomicF64, Ordering};
use lazy_static::lazy_static;

/// Magnitude above which a variable or constraint bound is treated as
/// infinite.   A custom threshold can be set with [`set_infinity`];
/// changing it applies at module level.
pub const INFINITY_DEFAULT: f64 = 1e30;

lazy_static! {
    static ref INFINITY: AtomicF64 = AtomicF64::new(INFINITY_DEFAULT);
}

/// Revert the infinity threshold to [`INFINITY_DEFAULT`].
pub fn default_infinity() {
    INFINITY.store(INFINITY_DEFAULT, Ordering::Relaxed);
}
/// Set the infinity threshold to a new value.
pub fn set_infinity(v: f64) {
    INFINITY.store(v, Ordering::Relaxed);
}
/// Get the current infinity threshold.
pub fn get_infinity() -> f64 {
    INFINITY.load(Ordering::Relaxed)
}
