use crate::algebra::FloatT;

/// Evaluation and iteration counters, threaded explicitly through the
/// solver layers.   Purely diagnostic; no solver decision depends on the
/// values recorded here.

#[derive(Debug, Clone, Default)]
pub struct Statistics<T = f64> {
    /// accepted outer iterations
    pub outer_iterations: usize,
    /// inner iterations over all globalization loops
    pub inner_iterations: usize,
    /// Lagrangian Hessian evaluations
    pub hessian_evaluations: usize,
    /// subproblems handed to an engine
    pub subproblems_solved: usize,
    /// numerical factorizations of KKT or Hessian matrices
    pub factorizations: usize,
    /// Hessian regularization δ_w applied by the last correction loop
    pub last_primal_regularization: T,
    /// largest Hessian regularization applied during the solve
    pub max_primal_regularization: T,
}

impl<T> Statistics<T>
where
    T: FloatT,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_regularization(&mut self, δ: T) {
        self.last_primal_regularization = δ;
        self.max_primal_regularization = T::max(self.max_primal_regularization, δ);
    }
}
