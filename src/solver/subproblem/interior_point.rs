#![allow(non_snake_case)]

use super::Warmstart;
use crate::algebra::*;
use crate::linsolve::LdlSolver;
use crate::model::{is_unbounded, Model};
use crate::solver::qp::{fraction_to_boundary, interior};
use crate::solver::{
    AugmentedSystem, Direction, Iterate, OptimizationProblem, Settings, SolveError, Statistics,
    SubproblemStatus,
};

/// Primal-dual interior-point engine.
///
/// One call computes one Newton step on the perturbed KKT conditions of
/// the barrier subproblem at the current barrier parameter, together with
/// fraction-to-boundary step lengths; the globalization mechanism decides
/// how much of the step to take.   Inequality constraint rows receive
/// slack variables internally; elastic variables of relaxed problems are
/// re-derived from the current constraint violation on every call, so the
/// engine carries no per-phase primal state beyond the two barrier
/// parameters.

pub struct InteriorPointSubproblem<T: FloatT> {
    ldl: LdlSolver<T>,
    system: AugmentedSystem<T>,
    hessian: CscSymmetricMatrix<T>,

    μ_optimality: T,
    μ_feasibility: T,
    μ_changed: bool,
    trust_region_radius: T,

    // first-block state: variables (original + elastic) then slacks
    v: Vec<T>,
    vl: Vec<T>,
    vu: Vec<T>,
    zl: Vec<T>,
    zu: Vec<T>,
    slack_of_row: Vec<Option<usize>>,

    // workspaces
    w_g: Vec<T>,
    w_rv: Vec<T>,
    w_rc: Vec<T>,
    w_dzl: Vec<T>,
    w_dzu: Vec<T>,
}

impl<T> InteriorPointSubproblem<T>
where
    T: FloatT,
{
    pub fn new<M: Model<T>>(model: &M, settings: &Settings<T>) -> Self {
        let n = model.number_variables();
        let m = model.number_constraints();
        let max_variables = n + 2 * m;
        let nmax = max_variables + m;
        let dim = nmax + m;
        let kkt_nonzeros = model.number_hessian_nonzeros()
            + nmax
            + model.number_jacobian_nonzeros()
            + 3 * m;

        Self {
            ldl: LdlSolver::default(),
            system: AugmentedSystem::new(dim, kkt_nonzeros),
            hessian: CscSymmetricMatrix::new(n, model.number_hessian_nonzeros(), false),
            μ_optimality: settings.barrier_initial_parameter,
            μ_feasibility: settings.barrier_initial_parameter,
            μ_changed: false,
            trust_region_radius: T::infinity(),
            v: vec![T::zero(); nmax],
            vl: vec![T::zero(); nmax],
            vu: vec![T::zero(); nmax],
            zl: vec![T::zero(); nmax],
            zu: vec![T::zero(); nmax],
            slack_of_row: vec![None; m],
            w_g: vec![T::zero(); nmax],
            w_rv: vec![T::zero(); nmax],
            w_rc: vec![T::zero(); m],
            w_dzl: vec![T::zero(); nmax],
            w_dzu: vec![T::zero(); nmax],
        }
    }

    pub fn set_trust_region_radius(&mut self, radius: T) {
        self.trust_region_radius = radius;
    }

    pub fn enter_feasibility_phase(&mut self) {
        // restart the feasibility barrier from the optimality one
        self.μ_feasibility = T::max(self.μ_optimality, self.μ_feasibility);
    }

    pub fn exit_feasibility_phase(&mut self) {}

    /// `true` once per barrier update: acceptance histories tied to the
    /// previous barrier function must be dropped
    pub fn take_definition_changed(&mut self) -> bool {
        std::mem::take(&mut self.μ_changed)
    }

    /// Push the initial point strictly inside its bounds and seed the
    /// bound duals.
    pub fn generate_initial_iterate<P: OptimizationProblem<T>>(
        &mut self,
        problem: &P,
        iterate: &mut Iterate<T>,
    ) {
        let push = T::from_f64(1e-2).unwrap();
        for i in 0..problem.number_original_variables() {
            let (l, u) = (
                problem.variable_lower_bound(i),
                problem.variable_upper_bound(i),
            );
            iterate.primals[i] = interior(iterate.primals[i], l, u, push);
            iterate.multipliers.lower_bounds[i] =
                if is_unbounded(l) { T::zero() } else { T::one() };
            iterate.multipliers.upper_bounds[i] =
                if is_unbounded(u) { T::zero() } else { T::one() };
        }
        iterate.invalidate();
    }

    /// barrier function −μ·Σ log(gaps) of the current iterate
    pub fn set_auxiliary_measure<P: OptimizationProblem<T>>(
        &self,
        problem: &P,
        iterate: &mut Iterate<T>,
        _settings: &Settings<T>,
    ) {
        let μ = self.current_μ(problem);
        let mut barrier = T::zero();
        for i in 0..problem.number_original_variables() {
            let x = iterate.primals[i];
            let l = problem.variable_lower_bound(i);
            let u = problem.variable_upper_bound(i);
            if !is_unbounded(l) {
                barrier -= T::ln(T::max(x - l, T::min_positive_value()));
            }
            if !is_unbounded(u) {
                barrier -= T::ln(T::max(u - x, T::min_positive_value()));
            }
        }
        iterate.progress.unscaled_optimality = μ * barrier;
    }

    /// Mehrotra-style safeguard: project the bound duals of an accepted
    /// iterate into `[μ/(κ_σ·gap), κ_σ·μ/gap]`.
    pub fn postprocess_accepted_iterate<P: OptimizationProblem<T>>(
        &self,
        problem: &P,
        iterate: &mut Iterate<T>,
        settings: &Settings<T>,
    ) {
        let μ = self.current_μ(problem);
        let κσ = settings.barrier_k_sigma;
        for i in 0..problem.number_original_variables() {
            let x = iterate.primals[i];
            let l = problem.variable_lower_bound(i);
            let u = problem.variable_upper_bound(i);
            if !is_unbounded(l) {
                let gap = T::max(x - l, T::min_positive_value());
                iterate.multipliers.lower_bounds[i] =
                    iterate.multipliers.lower_bounds[i].clip(μ / (κσ * gap), κσ * μ / gap);
            }
            if !is_unbounded(u) {
                let gap = T::max(u - x, T::min_positive_value());
                iterate.multipliers.upper_bounds[i] =
                    iterate.multipliers.upper_bounds[i].clip(μ / (κσ * gap), κσ * μ / gap);
            }
        }
    }

    fn current_μ<P: OptimizationProblem<T>>(&self, problem: &P) -> T {
        if problem.objective_multiplier() == T::zero() {
            self.μ_feasibility
        } else {
            self.μ_optimality
        }
    }

    pub fn compute_direction<P: OptimizationProblem<T>>(
        &mut self,
        problem: &P,
        iterate: &mut Iterate<T>,
        _warmstart: Warmstart,
        settings: &Settings<T>,
        statistics: &mut Statistics<T>,
    ) -> Result<Direction<T>, SolveError> {
        let n = problem.number_variables();
        let n_orig = problem.number_original_variables();
        let m = problem.number_constraints();
        statistics.subproblems_solved += 1;

        problem
            .evaluate_functions(iterate)
            .map_err(SolveError::Evaluation)?;
        problem
            .evaluate_first_derivatives(iterate)
            .map_err(SolveError::Evaluation)?;

        let in_feasibility = problem.objective_multiplier() == T::zero();
        let mut μ = self.current_μ(problem);
        let μ_floor = settings.tolerance / (10.0).as_T();

        // ---------------------------------------------------------
        // first-block state: variables, elastics, slacks
        // ---------------------------------------------------------
        let guard = T::min(μ, settings.barrier_push_fraction);
        for i in 0..n {
            self.vl[i] = problem.variable_lower_bound(i);
            self.vu[i] = problem.variable_upper_bound(i);
            let value = problem.variable_value(iterate, i);
            self.v[i] = interior(value, self.vl[i], self.vu[i], guard);
            if i < n_orig {
                self.zl[i] = T::max(iterate.multipliers.lower_bounds[i], T::zero());
                self.zu[i] = T::max(iterate.multipliers.upper_bounds[i], T::zero());
                if !is_unbounded(self.vl[i]) && self.zl[i] == T::zero() {
                    self.zl[i] = μ / (self.v[i] - self.vl[i]);
                }
                if !is_unbounded(self.vu[i]) && self.zu[i] == T::zero() {
                    self.zu[i] = μ / (self.vu[i] - self.v[i]);
                }
            } else {
                // fresh elastic duals at exact complementarity
                self.zl[i] = μ / (self.v[i] - self.vl[i]);
                self.zu[i] = T::zero();
            }
        }

        let mut n1 = n;
        for j in 0..m {
            let (l, u) = (
                problem.constraint_lower_bound(j),
                problem.constraint_upper_bound(j),
            );
            if l == u && !is_unbounded(l) {
                self.slack_of_row[j] = None;
            } else {
                self.slack_of_row[j] = Some(n1);
                self.vl[n1] = l;
                self.vu[n1] = u;
                let value = self.row_value(problem, iterate, j);
                self.v[n1] = interior(value, l, u, guard);
                self.zl[n1] = if is_unbounded(l) {
                    T::zero()
                } else {
                    μ / (self.v[n1] - l)
                };
                self.zu[n1] = if is_unbounded(u) {
                    T::zero()
                } else {
                    μ / (u - self.v[n1])
                };
                n1 += 1;
            }
        }
        let dim = n1 + m;

        // ---------------------------------------------------------
        // residuals of the perturbed KKT system
        // ---------------------------------------------------------
        self.w_g[..n1].set(T::zero());
        {
            let g = &mut self.w_g;
            problem.for_each_objective_gradient(iterate, &mut |i, value| g[i] += value);
        }
        let λ = &iterate.multipliers.constraints;
        for i in 0..n1 {
            self.w_rv[i] = self.w_g[i] - self.zl[i] + self.zu[i];
        }
        for j in 0..m {
            let rv = &mut self.w_rv;
            problem.for_each_jacobian_row(iterate, j, &mut |i, a| rv[i] += a * λ[j]);
            if let Some(si) = self.slack_of_row[j] {
                self.w_rv[si] -= λ[j];
            }
        }
        for j in 0..m {
            // row value with the interior-pushed elastics of this call
            let mut value = iterate.evaluations.constraints[j];
            if let Some(elastics) = problem.elastic_variables() {
                if let Some(p) = elastics.positive_elastic(j) {
                    value -= self.v[p];
                }
                if let Some(q) = elastics.negative_elastic(j) {
                    value += self.v[q];
                }
            }
            self.w_rc[j] = match self.slack_of_row[j] {
                Some(si) => value - self.v[si],
                None => value - problem.constraint_lower_bound(j),
            };
        }

        let mut comp_μ = T::zero();
        for i in 0..n1 {
            if !is_unbounded(self.vl[i]) {
                comp_μ = T::max(
                    comp_μ,
                    T::abs(self.zl[i] * (self.v[i] - self.vl[i]) - μ),
                );
            }
            if !is_unbounded(self.vu[i]) {
                comp_μ = T::max(
                    comp_μ,
                    T::abs(self.zu[i] * (self.vu[i] - self.v[i]) - μ),
                );
            }
        }

        let s_max = settings.barrier_s_max;
        let multiplier_scale = λ[..m]
            .norm_inf()
            .max(self.zl[..n1].norm_inf().max(self.zu[..n1].norm_inf()));
        let s_d = T::max(T::one(), multiplier_scale / s_max);
        let error_μ = (self.w_rv[..n1].norm_inf() / s_d)
            .max(self.w_rc[..m].norm_inf())
            .max(comp_μ / s_d);

        // barrier reset: tighten μ once the scaled error is resolved at
        // the current value
        if error_μ <= settings.barrier_k_epsilon * μ && μ > μ_floor {
            μ = T::max(
                μ_floor,
                T::min(
                    settings.barrier_k_mu * μ,
                    T::powf(μ, settings.barrier_theta_mu),
                ),
            );
            if in_feasibility {
                self.μ_feasibility = μ;
            } else {
                self.μ_optimality = μ;
            }
            self.μ_changed = true;
        }
        let τ = T::max(settings.barrier_tau_min, T::one() - μ);

        // ---------------------------------------------------------
        // Newton system
        // ---------------------------------------------------------
        problem
            .evaluate_lagrangian_hessian(
                &iterate.primals,
                &iterate.multipliers.constraints,
                &mut self.hessian,
            )
            .map_err(SolveError::Evaluation)?;
        statistics.hessian_evaluations += 1;

        let matrix = &mut self.system.matrix;
        matrix.reset_with_dimension(dim);
        self.hessian.for_each(|r, c, h| matrix.insert(r, c, h));
        for i in 0..n1 {
            let mut Σ = T::zero();
            if !is_unbounded(self.vl[i]) {
                Σ += self.zl[i] / (self.v[i] - self.vl[i]);
            }
            if !is_unbounded(self.vu[i]) {
                Σ += self.zu[i] / (self.vu[i] - self.v[i]);
            }
            if Σ != T::zero() {
                matrix.insert(i, i, Σ);
            }
        }
        for j in 0..m {
            problem.for_each_jacobian_row(iterate, j, &mut |i, a| matrix.insert(i, n1 + j, a));
            if let Some(si) = self.slack_of_row[j] {
                matrix.insert(si, n1 + j, -T::one());
            }
        }

        let smallest_diagonal = self.system.matrix.smallest_diagonal_entry(n1);
        self.system.factorize_with_inertia_control(
            &mut self.ldl,
            n1,
            m,
            smallest_diagonal,
            μ,
            settings,
            statistics,
        )?;

        for i in 0..n1 {
            let mut rhs = -self.w_rv[i] - self.zl[i] + self.zu[i];
            if !is_unbounded(self.vl[i]) {
                rhs += μ / (self.v[i] - self.vl[i]);
            }
            if !is_unbounded(self.vu[i]) {
                rhs -= μ / (self.vu[i] - self.v[i]);
            }
            self.system.rhs[i] = rhs;
        }
        for j in 0..m {
            self.system.rhs[n1 + j] = -self.w_rc[j];
        }
        self.system.solve(&mut self.ldl, dim, settings);

        // ---------------------------------------------------------
        // multiplier displacements and step lengths
        // ---------------------------------------------------------
        let (Δv, Δλ) = self.system.solution[..dim].split_at(n1);

        let mut α_primal =
            fraction_to_boundary(&self.v[..n1], Δv, &self.vl[..n1], &self.vu[..n1], τ);
        let step_norm = Δv[..n_orig].norm_inf();
        if !is_unbounded(self.trust_region_radius) && step_norm > T::zero() {
            α_primal = T::min(α_primal, self.trust_region_radius / step_norm);
        }

        let mut α_dual = T::one();
        for i in 0..n1 {
            self.w_dzl[i] = T::zero();
            self.w_dzu[i] = T::zero();
            if !is_unbounded(self.vl[i]) {
                let gap = self.v[i] - self.vl[i];
                let Δz = μ / gap - self.zl[i] - (self.zl[i] / gap) * Δv[i];
                self.w_dzl[i] = Δz;
                if Δz < T::zero() && self.zl[i] > T::zero() {
                    α_dual = T::min(α_dual, -τ * self.zl[i] / Δz);
                }
            }
            if !is_unbounded(self.vu[i]) {
                let gap = self.vu[i] - self.v[i];
                let Δz = μ / gap - self.zu[i] + (self.zu[i] / gap) * Δv[i];
                self.w_dzu[i] = Δz;
                if Δz < T::zero() && self.zu[i] > T::zero() {
                    α_dual = T::min(α_dual, -τ * self.zu[i] / Δz);
                }
            }
        }

        // ---------------------------------------------------------
        // package the direction
        // ---------------------------------------------------------
        let mut direction = Direction::new(n, m);
        direction.objective_multiplier = problem.objective_multiplier();

        if α_primal <= T::epsilon() && α_dual <= T::epsilon() {
            direction.status = SubproblemStatus::Error;
            return Ok(direction);
        }

        direction.primals.copy_from(&Δv[..n]);
        direction.norm = step_norm;
        direction.primal_dual_step_length = α_primal;
        direction.bound_dual_step_length = α_dual;

        for j in 0..m {
            direction.multipliers.constraints[j] = λ[j] + Δλ[j];
        }
        for i in 0..n_orig {
            direction.multipliers.lower_bounds[i] = self.zl[i] + self.w_dzl[i];
            direction.multipliers.upper_bounds[i] = self.zu[i] + self.w_dzu[i];
        }
        direction.multipliers.objective = problem.objective_multiplier();

        // linear model of the barrier objective along the step
        let mut descent = T::zero();
        for i in 0..n1 {
            let mut gφ = self.w_g[i];
            if !is_unbounded(self.vl[i]) {
                gφ -= μ / (self.v[i] - self.vl[i]);
            }
            if !is_unbounded(self.vu[i]) {
                gφ += μ / (self.vu[i] - self.v[i]);
            }
            descent += gφ * Δv[i];
        }
        direction.linear_term = descent;
        direction.objective = descent;
        direction.status = SubproblemStatus::Optimal;

        Ok(direction)
    }

    // relaxed constraint value c_j − p + n with elastics re-derived from
    // the cached constraint evaluations
    fn row_value<P: OptimizationProblem<T>>(
        &self,
        problem: &P,
        iterate: &Iterate<T>,
        j: usize,
    ) -> T {
        problem.constraint_value(iterate, j)
    }
}
