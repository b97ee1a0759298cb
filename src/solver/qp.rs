#![allow(non_snake_case)]

use super::{AugmentedSystem, Settings, SolveError, Statistics, SubproblemStatus};
use crate::algebra::*;
use crate::linsolve::LdlSolver;
use crate::model::is_unbounded;

/// Data of one quadratic (or linear) subproblem
///
/// ```text
/// min ½dᵀHd + gᵀd   s.t.   cₗ ≤ Jd ≤ cᵤ,   dₗ ≤ d ≤ dᵤ
/// ```
///
/// `H` covers the leading original-variable block (elastic columns are
/// linear); bounds arrive already shifted to direction space and clipped
/// against the trust region.

#[derive(Debug)]
pub struct QpData<T = f64> {
    pub number_variables: usize,
    pub number_constraints: usize,
    pub hessian: CscSymmetricMatrix<T>,
    pub gradient: Vec<T>,
    pub jacobian: Vec<SparseVector<T>>,
    pub constraint_lower: Vec<T>,
    pub constraint_upper: Vec<T>,
    pub variable_lower: Vec<T>,
    pub variable_upper: Vec<T>,
}

impl<T> QpData<T>
where
    T: FloatT,
{
    pub fn new(
        max_variables: usize,
        max_constraints: usize,
        hessian_dimension: usize,
        hessian_capacity: usize,
        hessian_regularized: bool,
    ) -> Self {
        Self {
            number_variables: max_variables,
            number_constraints: max_constraints,
            hessian: CscSymmetricMatrix::new(
                hessian_dimension,
                hessian_capacity,
                hessian_regularized,
            ),
            gradient: vec![T::zero(); max_variables],
            jacobian: vec![SparseVector::new(); max_constraints],
            constraint_lower: vec![T::zero(); max_constraints],
            constraint_upper: vec![T::zero(); max_constraints],
            variable_lower: vec![T::zero(); max_variables],
            variable_upper: vec![T::zero(); max_variables],
        }
    }
}

/// Solution of one QP/LP subproblem.

#[derive(Debug, Clone)]
pub struct QpSolution<T = f64> {
    pub primals: Vec<T>,
    pub constraint_multipliers: Vec<T>,
    pub lower_bound_multipliers: Vec<T>,
    pub upper_bound_multipliers: Vec<T>,
    /// model objective `½dᵀHd + gᵀd`
    pub objective: T,
    pub linear_term: T,
    pub quadratic_term: T,
    pub status: SubproblemStatus,
    pub iterations: usize,
}

/// Interface to the QP/LP solver consumed by the SQP and SLP engines.

pub trait QpSolver<T: FloatT> {
    fn solve(
        &mut self,
        data: &QpData<T>,
        settings: &Settings<T>,
        statistics: &mut Statistics<T>,
    ) -> Result<QpSolution<T>, SolveError>;
}

/// Bundled primal-dual barrier solver for the subproblem QPs.
///
/// Inequality rows receive slack variables bounded by the row interval;
/// the barrier then acts on simple bounds only and every Newton system is
/// an augmented system with first block `(d, s)` and second block the
/// constraint rows, factorized under inertia control.

pub struct BarrierQp<T: FloatT = f64> {
    ldl: LdlSolver<T>,
    system: AugmentedSystem<T>,

    // first-block coordinates: variables then slacks
    v: Vec<T>,
    vl: Vec<T>,
    vu: Vec<T>,
    zl: Vec<T>,
    zu: Vec<T>,
    λ: Vec<T>,
    // slack coordinate of each inequality row
    slack_of_row: Vec<Option<usize>>,
    // workspaces
    w_hv: Vec<T>,
    w_rv: Vec<T>,
    w_rc: Vec<T>,
    w_dzu: Vec<T>,
}

impl<T> BarrierQp<T>
where
    T: FloatT,
{
    pub fn new(max_variables: usize, max_constraints: usize, max_kkt_nonzeros: usize) -> Self {
        let nmax = max_variables + max_constraints;
        let dim = nmax + max_constraints;
        Self {
            ldl: LdlSolver::default(),
            system: AugmentedSystem::new(dim, max_kkt_nonzeros),
            v: vec![T::zero(); nmax],
            vl: vec![T::zero(); nmax],
            vu: vec![T::zero(); nmax],
            zl: vec![T::zero(); nmax],
            zu: vec![T::zero(); nmax],
            λ: vec![T::zero(); max_constraints],
            slack_of_row: vec![None; max_constraints],
            w_hv: vec![T::zero(); nmax],
            w_rv: vec![T::zero(); nmax],
            w_rc: vec![T::zero(); max_constraints],
            w_dzu: vec![T::zero(); nmax],
        }
    }

    /// forget factorization warm starts (cold start)
    pub fn reset(&mut self) {
        self.system.reset_regularization();
    }
}

// push a value strictly inside its bounds
pub(crate) fn interior<T: FloatT>(value: T, lower: T, upper: T, push: T) -> T {
    let mut v = value;
    if !is_unbounded(lower) {
        let pad = if is_unbounded(upper) {
            push * T::max(T::one(), T::abs(lower))
        } else {
            T::min(push * T::max(T::one(), T::abs(lower)), (upper - lower) / (4.0).as_T())
        };
        v = T::max(v, lower + pad);
    }
    if !is_unbounded(upper) {
        let pad = if is_unbounded(lower) {
            push * T::max(T::one(), T::abs(upper))
        } else {
            T::min(push * T::max(T::one(), T::abs(upper)), (upper - lower) / (4.0).as_T())
        };
        v = T::min(v, upper - pad);
    }
    v
}

// largest α ∈ (0, 1] keeping v + αΔv a fraction τ inside its bounds
pub(crate) fn fraction_to_boundary<T: FloatT>(v: &[T], Δv: &[T], vl: &[T], vu: &[T], τ: T) -> T {
    let mut α = T::one();
    for i in 0..v.len() {
        if Δv[i] < T::zero() && !is_unbounded(vl[i]) {
            α = T::min(α, -τ * (v[i] - vl[i]) / Δv[i]);
        }
        if Δv[i] > T::zero() && !is_unbounded(vu[i]) {
            α = T::min(α, τ * (vu[i] - v[i]) / Δv[i]);
        }
    }
    α
}

impl<T> QpSolver<T> for BarrierQp<T>
where
    T: FloatT,
{
    fn solve(
        &mut self,
        data: &QpData<T>,
        settings: &Settings<T>,
        statistics: &mut Statistics<T>,
    ) -> Result<QpSolution<T>, SolveError> {
        let n = data.number_variables;
        let m = data.number_constraints;
        statistics.subproblems_solved += 1;

        // ---------------------------------------------------------
        // problem intake: bound relaxation, slack allocation
        // ---------------------------------------------------------
        let relax = T::epsilon().sqrt() * T::epsilon().sqrt(); // ~1e-8
        for i in 0..n {
            let (mut l, mut u) = (data.variable_lower[i], data.variable_upper[i]);
            if !is_unbounded(l) && !is_unbounded(u) && u - l < relax {
                let pad = relax * T::max(T::one(), T::abs(l));
                l -= pad;
                u += pad;
            }
            self.vl[i] = l;
            self.vu[i] = u;
        }

        let mut n1 = n; // first-block size: variables + slacks
        for j in 0..m {
            let (l, u) = (data.constraint_lower[j], data.constraint_upper[j]);
            if l == u && !is_unbounded(l) {
                self.slack_of_row[j] = None;
            } else {
                self.slack_of_row[j] = Some(n1);
                self.vl[n1] = l;
                self.vu[n1] = u;
                n1 += 1;
            }
        }
        let dim = n1 + m;

        // ---------------------------------------------------------
        // starting point: centered primals, unit duals
        // ---------------------------------------------------------
        let push = settings.barrier_push_fraction;
        for i in 0..n1 {
            self.v[i] = interior(T::zero(), self.vl[i], self.vu[i], push);
        }
        for i in 0..n1 {
            self.zl[i] = if is_unbounded(self.vl[i]) { T::zero() } else { T::one() };
            self.zu[i] = if is_unbounded(self.vu[i]) { T::zero() } else { T::one() };
        }
        self.λ[..m].set(T::zero());

        let mut μ = settings.barrier_initial_parameter;
        let μ_floor = settings.qp_tolerance / (10.0).as_T();
        let mut status = SubproblemStatus::Error;
        let mut iterations = 0;

        for iteration in 0..settings.qp_max_iterations {
            iterations = iteration as usize + 1;

            // -------------------------------------------------------
            // residuals
            // -------------------------------------------------------
            // Hv over the Hessian block
            self.w_hv[..n1].set(T::zero());
            data.hessian.for_each(|r, c, h| {
                self.w_hv[r] += h * self.v[c];
                if r != c {
                    self.w_hv[c] += h * self.v[r];
                }
            });

            // dual residual on (d, s)
            for i in 0..n1 {
                let g = if i < n { data.gradient[i] } else { T::zero() };
                self.w_rv[i] = self.w_hv[i] + g - self.zl[i] + self.zu[i];
            }
            for j in 0..m {
                data.jacobian[j].for_each(|i, a| self.w_rv[i] += a * self.λ[j]);
                if let Some(si) = self.slack_of_row[j] {
                    self.w_rv[si] -= self.λ[j];
                }
            }

            // primal residual per constraint row
            for j in 0..m {
                let mut r = data.jacobian[j].dot_dense(&self.v[..n]);
                match self.slack_of_row[j] {
                    Some(si) => r -= self.v[si],
                    None => r -= data.constraint_lower[j],
                }
                self.w_rc[j] = r;
            }

            // complementarity against μ and against 0
            let mut comp_μ = T::zero();
            let mut comp_0 = T::zero();
            for i in 0..n1 {
                if !is_unbounded(self.vl[i]) {
                    let prod = self.zl[i] * (self.v[i] - self.vl[i]);
                    comp_μ = T::max(comp_μ, T::abs(prod - μ));
                    comp_0 = T::max(comp_0, T::abs(prod));
                }
                if !is_unbounded(self.vu[i]) {
                    let prod = self.zu[i] * (self.vu[i] - self.v[i]);
                    comp_μ = T::max(comp_μ, T::abs(prod - μ));
                    comp_0 = T::max(comp_0, T::abs(prod));
                }
            }

            // scalings bounded below by s_max
            let s_max = settings.barrier_s_max;
            let multiplier_scale = self.λ[..m].norm_inf().max(
                self.zl[..n1].norm_inf().max(self.zu[..n1].norm_inf()),
            );
            let s_d = T::max(T::one(), multiplier_scale / s_max);

            let dual_error = self.w_rv[..n1].norm_inf() / s_d;
            let primal_error = self.w_rc[..m].norm_inf();
            let error_μ = dual_error.max(primal_error).max(comp_μ / s_d);
            let error_0 = dual_error.max(primal_error).max(comp_0 / s_d);

            // -------------------------------------------------------
            // convergence, divergence and barrier updates
            // -------------------------------------------------------
            if error_0 <= settings.qp_tolerance {
                status = SubproblemStatus::Optimal;
                break;
            }
            if self.v[..n].norm_inf() > T::from_f64(1e12).unwrap() {
                status = SubproblemStatus::UnboundedSubproblem;
                break;
            }
            if self.λ[..m].norm_inf() > T::from_f64(1e12).unwrap() {
                // diverging duals: the linearized constraints admit no
                // feasible point
                status = SubproblemStatus::Infeasible;
                break;
            }

            if error_μ <= settings.barrier_k_epsilon * μ {
                μ = T::max(
                    μ_floor,
                    T::min(
                        settings.barrier_k_mu * μ,
                        T::powf(μ, settings.barrier_theta_mu),
                    ),
                );
            }
            let τ = T::max(settings.barrier_tau_min, T::one() - μ);

            // -------------------------------------------------------
            // Newton system on (Δv, Δλ)
            // -------------------------------------------------------
            let matrix = &mut self.system.matrix;
            matrix.reset_with_dimension(dim);
            data.hessian.for_each(|r, c, h| {
                matrix.insert(r, c, h);
            });
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
                data.jacobian[j].for_each(|i, a| matrix.insert(i, n1 + j, a));
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

            // -------------------------------------------------------
            // step lengths and update
            // -------------------------------------------------------
            let (Δv, Δλ) = self.system.solution[..dim].split_at(n1);

            let α_primal = fraction_to_boundary(
                &self.v[..n1],
                Δv,
                &self.vl[..n1],
                &self.vu[..n1],
                τ,
            );

            // multiplier displacements and the dual step length
            let mut α_dual = T::one();
            for i in 0..n1 {
                if !is_unbounded(self.vl[i]) {
                    let gap = self.v[i] - self.vl[i];
                    let Δz = μ / gap - self.zl[i] - (self.zl[i] / gap) * Δv[i];
                    self.w_hv[i] = Δz; // reuse as Δzl storage
                    if Δz < T::zero() && self.zl[i] > T::zero() {
                        α_dual = T::min(α_dual, -τ * self.zl[i] / Δz);
                    }
                } else {
                    self.w_hv[i] = T::zero();
                }
            }
            for i in 0..n1 {
                self.w_dzu[i] = T::zero();
                if !is_unbounded(self.vu[i]) {
                    let gap = self.vu[i] - self.v[i];
                    let Δz = μ / gap - self.zu[i] + (self.zu[i] / gap) * Δv[i];
                    self.w_dzu[i] = Δz;
                    if Δz < T::zero() && self.zu[i] > T::zero() {
                        α_dual = T::min(α_dual, -τ * self.zu[i] / Δz);
                    }
                }
            }

            if α_primal < T::from_f64(1e-14).unwrap() && α_dual < T::from_f64(1e-14).unwrap() {
                status = SubproblemStatus::Error;
                break;
            }

            for i in 0..n1 {
                self.v[i] += α_primal * Δv[i];
                self.zl[i] += α_dual * self.w_hv[i];
                self.zu[i] += α_dual * self.w_dzu[i];
            }
            for j in 0..m {
                self.λ[j] += α_dual * Δλ[j];
            }

            // complementarity watchdog: project the duals into
            // [μ/(κ_σ·gap), κ_σ·μ/gap]
            let κσ = settings.barrier_k_sigma;
            for i in 0..n1 {
                if !is_unbounded(self.vl[i]) {
                    let gap = self.v[i] - self.vl[i];
                    self.zl[i] = self.zl[i].clip(μ / (κσ * gap), κσ * μ / gap);
                }
                if !is_unbounded(self.vu[i]) {
                    let gap = self.vu[i] - self.v[i];
                    self.zu[i] = self.zu[i].clip(μ / (κσ * gap), κσ * μ / gap);
                }
            }
        }

        // classify a run that exhausted its iterations
        if status == SubproblemStatus::Error && iterations as u32 >= settings.qp_max_iterations {
            let primal_error = self.w_rc[..m].norm_inf();
            status = if primal_error > <f64 as AsFloatT<T>>::as_T(&100.0) * settings.qp_tolerance {
                SubproblemStatus::Infeasible
            } else {
                SubproblemStatus::SuboptimalButUsable
            };
        }

        // -------------------------------------------------------
        // package the solution
        // -------------------------------------------------------
        let d = &self.v[..n];
        self.w_hv[..n].set(T::zero());
        data.hessian.for_each(|r, c, h| {
            self.w_hv[r] += h * d[c];
            if r != c {
                self.w_hv[c] += h * d[r];
            }
        });
        let quadratic_term = self.w_hv[..n].dot(d);
        let linear_term = data.gradient[..n].dot(d);

        Ok(QpSolution {
            primals: d.to_vec(),
            constraint_multipliers: self.λ[..m].to_vec(),
            lower_bound_multipliers: self.zl[..n].to_vec(),
            upper_bound_multipliers: self.zu[..n].to_vec(),
            objective: linear_term + quadratic_term / (2.0).as_T(),
            linear_term,
            quadratic_term,
            status,
            iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve_qp(data: &QpData<f64>) -> QpSolution<f64> {
        let mut solver = BarrierQp::new(data.number_variables, data.number_constraints, 64);
        let settings = Settings::default();
        let mut statistics = Statistics::new();
        solver.solve(data, &settings, &mut statistics).unwrap()
    }

    #[test]
    fn unconstrained_qp_is_a_newton_step() {
        // min ½dᵀdiag(1,2)d + (1,2)ᵀd  →  d = (−1, −1)
        let mut hessian = CscSymmetricMatrix::new(2, 2, false);
        hessian.insert(0, 0, 1.0);
        hessian.finalize_column(0);
        hessian.insert(1, 1, 2.0);
        hessian.finalize_column(1);

        let data = QpData {
            number_variables: 2,
            number_constraints: 0,
            hessian,
            gradient: vec![1.0, 2.0],
            jacobian: vec![],
            constraint_lower: vec![],
            constraint_upper: vec![],
            variable_lower: vec![f64::NEG_INFINITY; 2],
            variable_upper: vec![f64::INFINITY; 2],
        };
        let solution = solve_qp(&data);
        assert_eq!(solution.status, SubproblemStatus::Optimal);
        assert!((solution.primals[0] + 1.0).abs() <= 1e-9);
        assert!((solution.primals[1] + 1.0).abs() <= 1e-9);
        assert!((solution.objective + 1.5).abs() <= 1e-8);
    }

    #[test]
    fn bounded_lp_hits_its_bound() {
        // min d  s.t.  −1 ≤ d ≤ 1  →  d = −1, lower multiplier 1
        let data = QpData {
            number_variables: 1,
            number_constraints: 0,
            hessian: CscSymmetricMatrix::new(1, 0, false),
            gradient: vec![1.0],
            jacobian: vec![],
            constraint_lower: vec![],
            constraint_upper: vec![],
            variable_lower: vec![-1.0],
            variable_upper: vec![1.0],
        };
        let solution = solve_qp(&data);
        assert_eq!(solution.status, SubproblemStatus::Optimal);
        assert!((solution.primals[0] + 1.0).abs() <= 1e-6);
        assert!((solution.lower_bound_multipliers[0] - 1.0).abs() <= 1e-6);
    }

    #[test]
    fn equality_row_gives_multiplier() {
        // min ½‖d‖²  s.t.  d₁ + d₂ = 1  →  d = (½, ½), λ = −½
        let mut hessian = CscSymmetricMatrix::new(2, 2, false);
        hessian.insert(0, 0, 1.0);
        hessian.finalize_column(0);
        hessian.insert(1, 1, 1.0);
        hessian.finalize_column(1);

        let mut row = SparseVector::new();
        row.insert(0, 1.0);
        row.insert(1, 1.0);

        let data = QpData {
            number_variables: 2,
            number_constraints: 1,
            hessian,
            gradient: vec![0.0, 0.0],
            jacobian: vec![row],
            constraint_lower: vec![1.0],
            constraint_upper: vec![1.0],
            variable_lower: vec![f64::NEG_INFINITY; 2],
            variable_upper: vec![f64::INFINITY; 2],
        };
        let solution = solve_qp(&data);
        assert_eq!(solution.status, SubproblemStatus::Optimal);
        assert!((solution.primals[0] - 0.5).abs() <= 1e-9);
        assert!((solution.primals[1] - 0.5).abs() <= 1e-9);
        assert!((solution.constraint_multipliers[0] + 0.5).abs() <= 1e-9);
    }

    #[test]
    fn inequality_row_with_slack() {
        // min d  s.t.  0 ≤ d ≤ 2 (as a general constraint), free variable
        let mut row = SparseVector::new();
        row.insert(0, 1.0);

        let data = QpData {
            number_variables: 1,
            number_constraints: 1,
            hessian: CscSymmetricMatrix::new(1, 0, false),
            gradient: vec![1.0],
            jacobian: vec![row],
            constraint_lower: vec![0.0],
            constraint_upper: vec![2.0],
            variable_lower: vec![f64::NEG_INFINITY],
            variable_upper: vec![f64::INFINITY],
        };
        let solution = solve_qp(&data);
        assert_eq!(solution.status, SubproblemStatus::Optimal);
        assert!(solution.primals[0].abs() <= 1e-6);
        // the active lower side is reported through λ < 0
        assert!((solution.constraint_multipliers[0] + 1.0).abs() <= 1e-6);
    }
}
