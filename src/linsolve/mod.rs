//! Direct solvers for sparse symmetric indefinite systems.
//!
//! The solver core interacts with linear solvers only through the
//! [`SymmetricIndefiniteSolver`] trait, so an external factorization
//! library can be substituted for the bundled LDLᵀ implementation in
//! [`ldl`](crate::linsolve::ldl).

use crate::algebra::{FloatT, SymmetricEntries};
use thiserror::Error;

pub mod ldl;
pub use ldl::{LdlSettings, LdlSettingsBuilder, LdlSolver};

/// Eigenvalue signature `(positive, negative, zero)` of a factorized
/// symmetric matrix.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Inertia {
    pub positive: usize,
    pub negative: usize,
    pub zero: usize,
}

/// Error conditions from factorization operations.

#[derive(Error, Debug)]
pub enum FactorizationError {
    #[error("numerical factorization requested before symbolic factorization")]
    SymbolicFactorizationMissing,
    #[error("matrix dimension or pattern changed since symbolic factorization")]
    PatternChanged,
    #[error("right-hand side dimension is incompatible with the factorization")]
    IncompatibleDimension,
}

/// Interface to a direct solver for sparse symmetric indefinite systems.
///
/// Implementations must tolerate repeated numerical factorizations with
/// mutated diagonal regularization entries at a fixed sparsity pattern;
/// this is how the augmented-system layer restores the expected inertia.

pub trait SymmetricIndefiniteSolver<T: FloatT> {
    /// Analyse the sparsity pattern.   Idempotent once the pattern is
    /// fixed; implementations may skip repeated calls with an unchanged
    /// pattern.
    fn do_symbolic_factorization(&mut self, matrix: &dyn SymmetricEntries<T>);

    /// Compute a numerical factorization of `matrix`.   A rank-deficient
    /// matrix is *not* an error: it is reported through
    /// [`matrix_is_singular`](SymmetricIndefiniteSolver::matrix_is_singular)
    /// so that callers can re-regularize and refactorize.
    fn do_numerical_factorization(
        &mut self,
        matrix: &dyn SymmetricEntries<T>,
    ) -> Result<(), FactorizationError>;

    /// Solve `A x = rhs` using the current factorization.
    fn solve(&mut self, rhs: &[T], solution: &mut [T]);

    /// Rank detected by the last numerical factorization.
    fn rank(&self) -> usize;

    /// Number of negative eigenvalues detected by the last numerical
    /// factorization.
    fn number_negative_eigenvalues(&self) -> usize;

    /// `true` if the last numerical factorization found the matrix to be
    /// rank deficient.
    fn matrix_is_singular(&self) -> bool;

    /// Full inertia of the last numerical factorization.
    fn inertia(&self) -> Inertia;
}
