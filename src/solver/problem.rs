use super::Iterate;
use crate::algebra::*;
use crate::model::{is_unbounded, EvaluationError, Model};

/// Index maps for elastic variables.
///
/// A positive elastic `p_j` absorbs violation above the upper bound of
/// constraint `j`, a negative elastic `n_j` absorbs violation below the
/// lower bound.   Elastics are appended after the original variables and
/// exist only for the finitely bounded side(s) of each constraint.

#[derive(Debug, Clone, Default)]
pub struct ElasticVariables {
    number_original_variables: usize,
    /// (constraint index, absorbs-upper-side) for each elastic variable
    assignments: Vec<(usize, bool)>,
    positive: Vec<Option<usize>>,
    negative: Vec<Option<usize>>,
}

impl ElasticVariables {
    pub fn generate<T: FloatT, M: Model<T>>(model: &M) -> Self {
        let n = model.number_variables();
        let m = model.number_constraints();
        let mut assignments = Vec::new();
        let mut positive = vec![None; m];
        let mut negative = vec![None; m];
        for j in 0..m {
            if !is_unbounded(model.constraint_upper_bound(j)) {
                positive[j] = Some(n + assignments.len());
                assignments.push((j, true));
            }
            if !is_unbounded(model.constraint_lower_bound(j)) {
                negative[j] = Some(n + assignments.len());
                assignments.push((j, false));
            }
        }
        Self {
            number_original_variables: n,
            assignments,
            positive,
            negative,
        }
    }

    pub fn count(&self) -> usize {
        self.assignments.len()
    }

    pub fn positive_elastic(&self, j: usize) -> Option<usize> {
        self.positive[j]
    }

    pub fn negative_elastic(&self, j: usize) -> Option<usize> {
        self.negative[j]
    }

    /// current value of elastic variable `i`, derived from the cached
    /// constraint values: exactly the violation it must absorb
    pub fn value<T: FloatT>(&self, constraints: &[T], bounds: (T, T), i: usize) -> T {
        let (j, absorbs_upper) = self.assignments[i - self.number_original_variables];
        let c = constraints[j];
        let (l, u) = bounds;
        if absorbs_upper {
            T::max(T::zero(), c - u)
        } else {
            T::max(T::zero(), l - c)
        }
    }

    fn assignment(&self, i: usize) -> (usize, bool) {
        self.assignments[i - self.number_original_variables]
    }
}

/// A view presenting the user model, or a reformulation of it, to the
/// subproblem engines.   All derivative traversal happens in the view's
/// variable space: original variables first, elastics after.

pub trait OptimizationProblem<T: FloatT> {
    fn number_variables(&self) -> usize;
    fn number_original_variables(&self) -> usize;
    fn number_constraints(&self) -> usize;

    /// σ: 1 in normal mode, 0 in feasibility mode
    fn objective_multiplier(&self) -> T;

    /// elastic penalty coefficient ρ (zero when the view has no elastics)
    fn elastic_objective_coefficient(&self) -> T;

    fn elastic_variables(&self) -> Option<&ElasticVariables>;

    fn variable_lower_bound(&self, i: usize) -> T;
    fn variable_upper_bound(&self, i: usize) -> T;
    fn constraint_lower_bound(&self, j: usize) -> T;
    fn constraint_upper_bound(&self, j: usize) -> T;

    /// ensure `f` and `c` are cached on the iterate
    fn evaluate_functions(&self, iterate: &mut Iterate<T>) -> Result<(), EvaluationError>;

    /// ensure `∇f` and the Jacobian rows are cached on the iterate
    fn evaluate_first_derivatives(&self, iterate: &mut Iterate<T>)
        -> Result<(), EvaluationError>;

    /// Hessian of the view's Lagrangian over the *original* variables
    /// (elastic blocks are linear), written into `hessian`
    fn evaluate_lagrangian_hessian(
        &self,
        x: &[T],
        multipliers: &[T],
        hessian: &mut CscSymmetricMatrix<T>,
    ) -> Result<(), EvaluationError>;

    /// current value of variable `i` in the view's variable space
    fn variable_value(&self, iterate: &Iterate<T>, i: usize) -> T;

    /// constraint value with elastic contributions applied
    fn constraint_value(&self, iterate: &Iterate<T>, j: usize) -> T;

    /// objective gradient of the view, σ∇f plus elastic penalty terms
    fn for_each_objective_gradient(&self, iterate: &Iterate<T>, f: &mut dyn FnMut(usize, T));

    /// Jacobian row `j` of the view, including elastic columns
    fn for_each_jacobian_row(&self, iterate: &Iterate<T>, j: usize, f: &mut dyn FnMut(usize, T));

    fn number_jacobian_nonzeros(&self) -> usize;
    fn number_hessian_nonzeros(&self) -> usize;
}

/// The model itself, unreformulated.

pub struct OriginalProblem<'a, M> {
    model: &'a M,
}

impl<'a, M> OriginalProblem<'a, M> {
    pub fn new(model: &'a M) -> Self {
        Self { model }
    }
}

impl<T: FloatT, M: Model<T>> OptimizationProblem<T> for OriginalProblem<'_, M> {
    fn number_variables(&self) -> usize {
        self.model.number_variables()
    }
    fn number_original_variables(&self) -> usize {
        self.model.number_variables()
    }
    fn number_constraints(&self) -> usize {
        self.model.number_constraints()
    }
    fn objective_multiplier(&self) -> T {
        T::one()
    }
    fn elastic_objective_coefficient(&self) -> T {
        T::zero()
    }
    fn elastic_variables(&self) -> Option<&ElasticVariables> {
        None
    }
    fn variable_lower_bound(&self, i: usize) -> T {
        self.model.variable_lower_bound(i)
    }
    fn variable_upper_bound(&self, i: usize) -> T {
        self.model.variable_upper_bound(i)
    }
    fn constraint_lower_bound(&self, j: usize) -> T {
        self.model.constraint_lower_bound(j)
    }
    fn constraint_upper_bound(&self, j: usize) -> T {
        self.model.constraint_upper_bound(j)
    }

    fn evaluate_functions(&self, iterate: &mut Iterate<T>) -> Result<(), EvaluationError> {
        iterate.evaluate_objective(self.model)?;
        iterate.evaluate_constraints(self.model)?;
        Ok(())
    }

    fn evaluate_first_derivatives(
        &self,
        iterate: &mut Iterate<T>,
    ) -> Result<(), EvaluationError> {
        iterate.evaluate_objective_gradient(self.model)?;
        iterate.evaluate_constraint_jacobian(self.model)?;
        Ok(())
    }

    fn evaluate_lagrangian_hessian(
        &self,
        x: &[T],
        multipliers: &[T],
        hessian: &mut CscSymmetricMatrix<T>,
    ) -> Result<(), EvaluationError> {
        hessian.reset();
        self.model
            .evaluate_lagrangian_hessian(x, T::one(), multipliers, hessian)
    }

    fn variable_value(&self, iterate: &Iterate<T>, i: usize) -> T {
        iterate.primals[i]
    }

    fn constraint_value(&self, iterate: &Iterate<T>, j: usize) -> T {
        iterate.evaluations.constraints[j]
    }

    fn for_each_objective_gradient(&self, iterate: &Iterate<T>, f: &mut dyn FnMut(usize, T)) {
        iterate.evaluations.objective_gradient.for_each(f);
    }

    fn for_each_jacobian_row(&self, iterate: &Iterate<T>, j: usize, f: &mut dyn FnMut(usize, T)) {
        iterate.evaluations.constraint_jacobian[j].for_each(f);
    }

    fn number_jacobian_nonzeros(&self) -> usize {
        self.model.number_jacobian_nonzeros()
    }
    fn number_hessian_nonzeros(&self) -> usize {
        self.model.number_hessian_nonzeros()
    }
}

/// The ℓ1 elastic relaxation
///
/// ```text
/// min σ·f(x) + ρ·Σ(pⱼ + nⱼ)   s.t.   cₗ ≤ c(x) − p + n ≤ cᵤ,  p, n ≥ 0
/// ```
///
/// always feasible in its linearization.   With σ = 0 this is the
/// feasibility problem (minimize constraint violation only).

pub struct L1RelaxedProblem<'a, M, T> {
    model: &'a M,
    elastics: &'a ElasticVariables,
    objective_multiplier: T,
    elastic_coefficient: T,
}

impl<'a, M, T> L1RelaxedProblem<'a, M, T> {
    pub fn new(
        model: &'a M,
        elastics: &'a ElasticVariables,
        objective_multiplier: T,
        elastic_coefficient: T,
    ) -> Self {
        Self {
            model,
            elastics,
            objective_multiplier,
            elastic_coefficient,
        }
    }
}

impl<T: FloatT, M: Model<T>> OptimizationProblem<T> for L1RelaxedProblem<'_, M, T> {
    fn number_variables(&self) -> usize {
        self.model.number_variables() + self.elastics.count()
    }
    fn number_original_variables(&self) -> usize {
        self.model.number_variables()
    }
    fn number_constraints(&self) -> usize {
        self.model.number_constraints()
    }
    fn objective_multiplier(&self) -> T {
        self.objective_multiplier
    }
    fn elastic_objective_coefficient(&self) -> T {
        self.elastic_coefficient
    }
    fn elastic_variables(&self) -> Option<&ElasticVariables> {
        Some(self.elastics)
    }

    fn variable_lower_bound(&self, i: usize) -> T {
        if i < self.number_original_variables() {
            self.model.variable_lower_bound(i)
        } else {
            T::zero()
        }
    }
    fn variable_upper_bound(&self, i: usize) -> T {
        if i < self.number_original_variables() {
            self.model.variable_upper_bound(i)
        } else {
            T::infinity()
        }
    }
    fn constraint_lower_bound(&self, j: usize) -> T {
        self.model.constraint_lower_bound(j)
    }
    fn constraint_upper_bound(&self, j: usize) -> T {
        self.model.constraint_upper_bound(j)
    }

    fn evaluate_functions(&self, iterate: &mut Iterate<T>) -> Result<(), EvaluationError> {
        iterate.evaluate_objective(self.model)?;
        iterate.evaluate_constraints(self.model)?;
        Ok(())
    }

    fn evaluate_first_derivatives(
        &self,
        iterate: &mut Iterate<T>,
    ) -> Result<(), EvaluationError> {
        iterate.evaluate_objective_gradient(self.model)?;
        iterate.evaluate_constraint_jacobian(self.model)?;
        Ok(())
    }

    fn evaluate_lagrangian_hessian(
        &self,
        x: &[T],
        multipliers: &[T],
        hessian: &mut CscSymmetricMatrix<T>,
    ) -> Result<(), EvaluationError> {
        hessian.reset();
        self.model.evaluate_lagrangian_hessian(
            x,
            self.objective_multiplier,
            multipliers,
            hessian,
        )
    }

    fn variable_value(&self, iterate: &Iterate<T>, i: usize) -> T {
        if i < self.number_original_variables() {
            iterate.primals[i]
        } else {
            let (j, _) = self.elastics.assignment(i);
            self.elastics.value(
                &iterate.evaluations.constraints,
                (
                    self.model.constraint_lower_bound(j),
                    self.model.constraint_upper_bound(j),
                ),
                i,
            )
        }
    }

    fn constraint_value(&self, iterate: &Iterate<T>, j: usize) -> T {
        // c − p + n clips the violation onto the nearest finite bound
        let c = iterate.evaluations.constraints[j];
        let l = self.model.constraint_lower_bound(j);
        let u = self.model.constraint_upper_bound(j);
        let lo = if is_unbounded(l) { c } else { l };
        let hi = if is_unbounded(u) { c } else { u };
        c.clip(lo, T::max(lo, hi))
    }

    fn for_each_objective_gradient(&self, iterate: &Iterate<T>, f: &mut dyn FnMut(usize, T)) {
        let σ = self.objective_multiplier;
        if σ != T::zero() {
            iterate
                .evaluations
                .objective_gradient
                .for_each(&mut |i, v| f(i, σ * v));
        }
        let ρ = self.elastic_coefficient;
        let n = self.number_original_variables();
        for k in 0..self.elastics.count() {
            f(n + k, ρ);
        }
    }

    fn for_each_jacobian_row(&self, iterate: &Iterate<T>, j: usize, f: &mut dyn FnMut(usize, T)) {
        iterate.evaluations.constraint_jacobian[j].for_each(&mut |i, v| f(i, v));
        if let Some(p) = self.elastics.positive_elastic(j) {
            f(p, -T::one());
        }
        if let Some(n) = self.elastics.negative_elastic(j) {
            f(n, T::one());
        }
    }

    fn number_jacobian_nonzeros(&self) -> usize {
        self.model.number_jacobian_nonzeros() + 2 * self.model.number_constraints()
    }
    fn number_hessian_nonzeros(&self) -> usize {
        self.model.number_hessian_nonzeros()
    }
}
