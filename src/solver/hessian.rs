use super::{OptimizationProblem, Settings, SolveError, Statistics};
use crate::algebra::*;
use crate::linsolve::{LdlSolver, SymmetricIndefiniteSolver};

/// Hessian models for the SQP engine.
///
/// *Exact* evaluates `∇²L` and uses it unmodified; *convexified*
/// additionally applies an inertia-controlled diagonal shift, restricted
/// to the original variables, until the Hessian block is positive
/// definite.   The shift lands in the matrix's reserved regularization
/// slots so the downstream subproblem sees the convexified curvature.

#[derive(Debug)]
pub enum HessianModel<T: FloatT> {
    Exact,
    Convexified(ConvexifiedHessian<T>),
}

#[derive(Debug)]
pub struct ConvexifiedHessian<T: FloatT> {
    linear_solver: LdlSolver<T>,
}

impl<T> HessianModel<T>
where
    T: FloatT,
{
    pub fn exact() -> Self {
        HessianModel::Exact
    }

    pub fn convexified() -> Self {
        HessianModel::Convexified(ConvexifiedHessian {
            linear_solver: LdlSolver::default(),
        })
    }

    /// `true` if the Hessian container needs reserved regularization slots
    pub fn uses_regularization(&self) -> bool {
        matches!(self, HessianModel::Convexified(_))
    }

    /// Evaluate the Lagrangian Hessian of `problem` at `x`, modifying it
    /// in place when the model convexifies.
    pub fn evaluate<P: OptimizationProblem<T>>(
        &mut self,
        problem: &P,
        x: &[T],
        multipliers: &[T],
        hessian: &mut CscSymmetricMatrix<T>,
        settings: &Settings<T>,
        statistics: &mut Statistics<T>,
    ) -> Result<(), SolveError> {
        problem
            .evaluate_lagrangian_hessian(x, multipliers, hessian)
            .map_err(SolveError::Evaluation)?;
        statistics.hessian_evaluations += 1;

        if let HessianModel::Convexified(model) = self {
            model.regularize(hessian, settings, statistics)?;
        }
        Ok(())
    }
}

impl<T> ConvexifiedHessian<T>
where
    T: FloatT,
{
    // Nocedal and Wright, p. 51: shift the diagonal until the matrix is
    // positive definite, growing the shift geometrically.
    fn regularize(
        &mut self,
        hessian: &mut CscSymmetricMatrix<T>,
        settings: &Settings<T>,
        statistics: &mut Statistics<T>,
    ) -> Result<(), SolveError> {
        let dimension = hessian.dimension();
        if dimension == 0 {
            return Ok(());
        }

        let smallest = hessian.smallest_diagonal_entry(dimension);
        let δ0 = settings.regularization_initial_value;
        let mut δ = if smallest <= T::zero() {
            δ0 - smallest
        } else {
            T::zero()
        };
        let mut bumped = false;

        loop {
            if δ > T::zero() {
                hessian.set_regularization(|_| δ);
            }
            self.linear_solver.do_symbolic_factorization(hessian);
            self.linear_solver
                .do_numerical_factorization(hessian)
                .map_err(SolveError::Factorization)?;
            statistics.factorizations += 1;

            if !self.linear_solver.matrix_is_singular()
                && self.linear_solver.number_negative_eigenvalues() == 0
            {
                statistics.record_regularization(δ);
                return Ok(());
            }

            δ = if δ == T::zero() {
                δ0
            } else if !bumped {
                bumped = true;
                δ * settings.regularization_increase_factor_first
            } else {
                δ * settings.regularization_increase_factor
            };
            if δ > settings.regularization_failure_threshold {
                return Err(SolveError::UnstableRegularization);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{indefinite_box_qp, Model};
    use crate::solver::OriginalProblem;

    #[test]
    fn convexification_lifts_negative_curvature() {
        let model = indefinite_box_qp::<f64>();
        let problem = OriginalProblem::new(&model);
        let mut hessian = CscSymmetricMatrix::new(2, model.number_hessian_nonzeros(), true);
        let mut statistics = Statistics::new();
        let settings = Settings::default();

        let mut exact = HessianModel::exact();
        let mut plain = CscSymmetricMatrix::new(2, model.number_hessian_nonzeros(), false);
        exact
            .evaluate(&problem, &[0.0, 0.5], &[], &mut plain, &settings, &mut statistics)
            .unwrap();
        assert_eq!(plain.smallest_diagonal_entry(2), -1.0);

        let mut convexified = HessianModel::convexified();
        convexified
            .evaluate(
                &problem,
                &[0.0, 0.5],
                &[],
                &mut hessian,
                &settings,
                &mut statistics,
            )
            .unwrap();

        // the shifted diagonal is positive and δ_w was recorded
        assert!(hessian.smallest_diagonal_entry(2) > 0.0);
        assert!(statistics.max_primal_regularization > 1.0);
    }
}
