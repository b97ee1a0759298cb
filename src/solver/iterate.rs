use super::Settings;
use super::TerminationStatus;
use crate::algebra::*;
use crate::model::{is_unbounded, EvaluationError, Model};

/// Lagrange multiplier estimates attached to an iterate.
///
/// The Lagrangian convention is
/// `L = σ·f + λᵀc − z_Lᵀ(x − x_L) − z_Uᵀ(x_U − x)` with `z_L, z_U ≥ 0`,
/// so the stationarity residual is `σ∇f + Jᵀλ − z_L + z_U`.

#[derive(Debug, Clone)]
pub struct Multipliers<T = f64> {
    pub constraints: Vec<T>,
    pub lower_bounds: Vec<T>,
    pub upper_bounds: Vec<T>,
    /// objective multiplier σ: 1 in normal mode, 0 in Fritz-John /
    /// feasibility mode
    pub objective: T,
}

impl<T> Multipliers<T>
where
    T: FloatT,
{
    pub fn new(number_variables: usize, number_constraints: usize) -> Self {
        Self {
            constraints: vec![T::zero(); number_constraints],
            lower_bounds: vec![T::zero(); number_variables],
            upper_bounds: vec![T::zero(); number_variables],
            objective: T::one(),
        }
    }

    /// largest multiplier magnitude over all three groups
    pub fn norm_inf(&self) -> T {
        T::max(
            self.constraints.norm_inf(),
            T::max(
                self.lower_bounds.norm_inf(),
                self.upper_bounds.norm_inf(),
            ),
        )
    }

    /// divide all multipliers by σ so the reported KKT conditions are
    /// scale invariant
    pub fn normalize(&mut self) {
        let σ = self.objective;
        if σ > T::zero() && σ != T::one() {
            let inv = T::recip(σ);
            self.constraints.scale(inv);
            self.lower_bounds.scale(inv);
            self.upper_bounds.scale(inv);
        }
    }
}

/// Progress measures used by the acceptance strategies, in the split
/// form: the objective measure is kept apart from the auxiliary
/// (barrier) measure so interior-point engines compose cleanly.

#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressMeasures<T = f64> {
    /// ℓ1-norm of the constraint violation
    pub infeasibility: T,
    /// objective measure, scaled by σ on use
    pub scaled_optimality: T,
    /// auxiliary measure independent of σ (barrier terms)
    pub unscaled_optimality: T,
}

impl<T> ProgressMeasures<T>
where
    T: FloatT,
{
    /// exact ℓ1 penalty value `σ·f + aux + ‖v‖₁`
    pub fn merit(&self, objective_multiplier: T) -> T {
        objective_multiplier * self.scaled_optimality + self.unscaled_optimality
            + self.infeasibility
    }
}

/// KKT residuals of an iterate, computed for both the optimality
/// problem (σ as given) and the feasibility problem (σ = 0).

#[derive(Debug, Clone, Copy, Default)]
pub struct Residuals<T = f64> {
    pub infeasibility: T,
    pub optimality_stationarity: T,
    pub optimality_complementarity: T,
    pub feasibility_stationarity: T,
    pub feasibility_complementarity: T,
    /// max of stationarity, infeasibility and complementarity
    pub kkt: T,
}

/// Cached model evaluations of an iterate.

#[derive(Debug, Clone)]
pub struct Evaluations<T = f64> {
    pub objective: T,
    pub constraints: Vec<T>,
    pub objective_gradient: SparseVector<T>,
    pub constraint_jacobian: Vec<SparseVector<T>>,
}

/// A primal-dual point with memoized evaluations.
///
/// Every cache carries a computed flag; evaluation is on demand and the
/// caches are invalidated when the primal point is assigned.

#[derive(Debug, Clone)]
pub struct Iterate<T = f64> {
    pub primals: Vec<T>,
    pub multipliers: Multipliers<T>,
    pub evaluations: Evaluations<T>,
    pub is_objective_computed: bool,
    pub is_constraints_computed: bool,
    pub is_objective_gradient_computed: bool,
    pub is_constraint_jacobian_computed: bool,
    pub progress: ProgressMeasures<T>,
    pub residuals: Residuals<T>,
    pub status: TerminationStatus,
}

impl<T> Iterate<T>
where
    T: FloatT,
{
    pub fn new(number_variables: usize, number_constraints: usize) -> Self {
        Self {
            primals: vec![T::zero(); number_variables],
            multipliers: Multipliers::new(number_variables, number_constraints),
            evaluations: Evaluations {
                objective: T::zero(),
                constraints: vec![T::zero(); number_constraints],
                objective_gradient: SparseVector::new(),
                constraint_jacobian: vec![SparseVector::new(); number_constraints],
            },
            is_objective_computed: false,
            is_constraints_computed: false,
            is_objective_gradient_computed: false,
            is_constraint_jacobian_computed: false,
            progress: ProgressMeasures::default(),
            residuals: Residuals::default(),
            status: TerminationStatus::NotOptimal,
        }
    }

    pub fn number_variables(&self) -> usize {
        self.primals.len()
    }

    /// assign a new primal point, invalidating all caches
    pub fn set_primals(&mut self, x: &[T]) {
        self.primals.copy_from(x);
        self.invalidate();
    }

    pub fn invalidate(&mut self) {
        self.is_objective_computed = false;
        self.is_constraints_computed = false;
        self.is_objective_gradient_computed = false;
        self.is_constraint_jacobian_computed = false;
    }

    /// objective `objective_sign·f(x)`, memoized
    pub fn evaluate_objective<M: Model<T>>(&mut self, model: &M) -> Result<T, EvaluationError> {
        if !self.is_objective_computed {
            self.evaluations.objective =
                model.objective_sign() * model.evaluate_objective(&self.primals)?;
            self.is_objective_computed = true;
        }
        Ok(self.evaluations.objective)
    }

    /// constraint values `c(x)`, memoized
    pub fn evaluate_constraints<M: Model<T>>(
        &mut self,
        model: &M,
    ) -> Result<&[T], EvaluationError> {
        if !self.is_constraints_computed {
            model.evaluate_constraints(&self.primals, &mut self.evaluations.constraints)?;
            self.is_constraints_computed = true;
        }
        Ok(&self.evaluations.constraints)
    }

    /// objective gradient `objective_sign·∇f(x)`, memoized
    pub fn evaluate_objective_gradient<M: Model<T>>(
        &mut self,
        model: &M,
    ) -> Result<&SparseVector<T>, EvaluationError> {
        if !self.is_objective_gradient_computed {
            model.evaluate_objective_gradient(
                &self.primals,
                &mut self.evaluations.objective_gradient,
            )?;
            self.evaluations
                .objective_gradient
                .scale(model.objective_sign());
            self.is_objective_gradient_computed = true;
        }
        Ok(&self.evaluations.objective_gradient)
    }

    /// constraint Jacobian rows, memoized
    pub fn evaluate_constraint_jacobian<M: Model<T>>(
        &mut self,
        model: &M,
    ) -> Result<(), EvaluationError> {
        if !self.is_constraint_jacobian_computed {
            model.evaluate_constraint_jacobian(
                &self.primals,
                &mut self.evaluations.constraint_jacobian,
            )?;
            self.is_constraint_jacobian_computed = true;
        }
        Ok(())
    }
}

/// Compute the residuals of `iterate` for both the optimality and the
/// feasibility problem, in the ℓ∞ norm.
pub fn compute_primal_dual_residuals<T: FloatT, M: Model<T>>(
    model: &M,
    iterate: &mut Iterate<T>,
    settings: &Settings<T>,
) -> Result<(), EvaluationError> {
    let n = model.number_variables();
    let m = model.number_constraints();
    let σ = iterate.multipliers.objective;

    iterate.evaluate_constraints(model)?;
    iterate.evaluate_objective_gradient(model)?;
    iterate.evaluate_constraint_jacobian(model)?;

    // residual scaling bounded below by s_max (IPOPT-style)
    let scaling = T::max(
        T::one(),
        iterate.multipliers.norm_inf() / settings.barrier_s_max,
    );

    // stationarity of the Lagrangian: σ∇f + Jᵀλ − z_L + z_U
    let mut gradient = vec![T::zero(); n];
    for (i, (&zl, &zu)) in iterate
        .multipliers
        .lower_bounds
        .iter()
        .zip(iterate.multipliers.upper_bounds.iter())
        .enumerate()
    {
        gradient[i] = -zl + zu;
    }
    for j in 0..m {
        iterate.evaluations.constraint_jacobian[j]
            .add_scaled_into(iterate.multipliers.constraints[j], &mut gradient);
    }
    let feasibility_stationarity = gradient.norm_inf() / scaling;
    iterate
        .evaluations
        .objective_gradient
        .add_scaled_into(σ, &mut gradient);
    let optimality_stationarity = gradient.norm_inf() / scaling;

    // complementarity over bound-active coordinates and inequality
    // constraints.   The feasibility variant measures the relaxed
    // constraints, whose violated values sit on their nearest bound.
    let mut bound_complementarity = T::zero();
    for i in 0..n {
        let (l, u) = (model.variable_lower_bound(i), model.variable_upper_bound(i));
        let x = iterate.primals[i];
        if !is_unbounded(l) {
            bound_complementarity = T::max(
                bound_complementarity,
                T::abs(iterate.multipliers.lower_bounds[i] * (x - l)),
            );
        }
        if !is_unbounded(u) {
            bound_complementarity = T::max(
                bound_complementarity,
                T::abs(iterate.multipliers.upper_bounds[i] * (u - x)),
            );
        }
    }
    let mut optimality_complementarity = bound_complementarity;
    let mut feasibility_complementarity = bound_complementarity;
    for j in 0..m {
        let λ = iterate.multipliers.constraints[j];
        let c = iterate.evaluations.constraints[j];
        let (l, u) = (
            model.constraint_lower_bound(j),
            model.constraint_upper_bound(j),
        );
        if l == u {
            continue;
        }
        let relaxed = c.clip(
            if is_unbounded(l) { c } else { l },
            if is_unbounded(u) { c } else { u },
        );
        // sign of λ picks the side being claimed active
        if λ > T::zero() && !is_unbounded(u) {
            optimality_complementarity = T::max(optimality_complementarity, T::abs(λ * (u - c)));
            feasibility_complementarity =
                T::max(feasibility_complementarity, T::abs(λ * (u - relaxed)));
        } else if λ < T::zero() && !is_unbounded(l) {
            optimality_complementarity = T::max(optimality_complementarity, T::abs(λ * (c - l)));
            feasibility_complementarity =
                T::max(feasibility_complementarity, T::abs(λ * (relaxed - l)));
        }
    }

    let infeasibility = model.constraint_violation_norm_inf(&iterate.evaluations.constraints);

    iterate.residuals = Residuals {
        infeasibility,
        optimality_stationarity,
        optimality_complementarity: optimality_complementarity / scaling,
        feasibility_stationarity,
        feasibility_complementarity: feasibility_complementarity / scaling,
        kkt: T::max(
            optimality_stationarity,
            T::max(infeasibility, optimality_complementarity / scaling),
        ),
    };
    Ok(())
}

/// Termination test for an accepted iterate.
pub fn compute_status<T: FloatT, M: Model<T>>(
    model: &M,
    iterate: &mut Iterate<T>,
    step_norm: T,
    in_feasibility_phase: bool,
    settings: &Settings<T>,
) -> TerminationStatus {
    let n: T = model.number_variables().as_T();
    let nm: T = (model.number_variables() + model.number_constraints()).as_T();
    let tol = settings.tolerance;
    let σ = iterate.multipliers.objective;
    let residuals = &iterate.residuals;

    if iterate.is_objective_computed
        && iterate.evaluations.objective < settings.unbounded_objective_threshold
    {
        return TerminationStatus::Unbounded;
    }

    // tolerances are loosened with the problem dimension
    if residuals.infeasibility <= tol * n {
        if residuals.optimality_stationarity <= tol * T::sqrt(n)
            && residuals.optimality_complementarity <= tol * nm
        {
            if σ > T::zero() {
                return TerminationStatus::FeasibleKKT;
            } else {
                return TerminationStatus::FritzJohn;
            }
        } else if step_norm <= settings.small_step_threshold() {
            return TerminationStatus::FeasibleSmallStep;
        }
    } else {
        // stationary point of the constraint violation
        if residuals.feasibility_stationarity <= tol * T::sqrt(n)
            && residuals.feasibility_complementarity <= tol * nm
            && in_feasibility_phase
        {
            return TerminationStatus::InfeasibleStationary;
        } else if step_norm <= settings.small_step_threshold() && in_feasibility_phase {
            return TerminationStatus::InfeasibleSmallStep;
        }
    }
    TerminationStatus::NotOptimal
}
