#![allow(non_snake_case)]

use super::Warmstart;
use crate::algebra::*;
use crate::model::{is_unbounded, Model};
use crate::solver::{
    BarrierQp, ConstraintPartition, Direction, HessianKind, HessianModel, Iterate,
    OptimizationProblem, QpData, QpSolver, Settings, SolveError, Statistics, SubproblemStatus,
};

/// SQP engine: linearize the constraints, model the Lagrangian with a
/// quadratic (or drop it entirely for SLP) and hand the resulting QP/LP
/// to the QP solver.
///
/// With `hessian_model = None` this is the SLP engine: same construction
/// with a zero Hessian.

pub struct SqpSubproblem<T: FloatT> {
    hessian_model: Option<HessianModel<T>>,
    qp_solver: BarrierQp<T>,
    data: QpData<T>,
    trust_region_radius: T,
    data_valid: bool,
}

impl<T> SqpSubproblem<T>
where
    T: FloatT,
{
    pub fn new_qp<M: Model<T>>(model: &M, settings: &Settings<T>) -> Self {
        let hessian_model = match settings.hessian_model {
            HessianKind::Exact => HessianModel::exact(),
            HessianKind::Convexified => HessianModel::convexified(),
        };
        Self::build(model, Some(hessian_model))
    }

    pub fn new_lp<M: Model<T>>(model: &M, _settings: &Settings<T>) -> Self {
        Self::build(model, None)
    }

    fn build<M: Model<T>>(model: &M, hessian_model: Option<HessianModel<T>>) -> Self {
        let n = model.number_variables();
        let m = model.number_constraints();
        // leave room for one positive and one negative elastic per
        // constraint
        let max_variables = n + 2 * m;
        let hessian_nnz = model.number_hessian_nonzeros();
        let regularized = hessian_model
            .as_ref()
            .is_some_and(|h| h.uses_regularization());

        let kkt_nonzeros =
            hessian_nnz + n + (max_variables + 2 * m) + model.number_jacobian_nonzeros() + 3 * m;

        Self {
            hessian_model,
            qp_solver: BarrierQp::new(max_variables, m, kkt_nonzeros),
            data: QpData::new(max_variables, m, n, hessian_nnz, regularized),
            trust_region_radius: T::infinity(),
            data_valid: false,
        }
    }

    pub fn set_trust_region_radius(&mut self, radius: T) {
        self.trust_region_radius = radius;
    }

    pub fn compute_direction<P: OptimizationProblem<T>>(
        &mut self,
        problem: &P,
        iterate: &mut Iterate<T>,
        warmstart: Warmstart,
        settings: &Settings<T>,
        statistics: &mut Statistics<T>,
    ) -> Result<Direction<T>, SolveError> {
        let n = problem.number_variables();
        let n_orig = problem.number_original_variables();
        let m = problem.number_constraints();

        problem
            .evaluate_functions(iterate)
            .map_err(SolveError::Evaluation)?;
        problem
            .evaluate_first_derivatives(iterate)
            .map_err(SolveError::Evaluation)?;

        self.data.number_variables = n;
        self.data.number_constraints = m;

        let refresh = !self.data_valid || warmstart != Warmstart::BoundsOnly;
        if refresh {
            self.assemble_derivatives(problem, iterate, settings, statistics)?;
            self.data_valid = true;
        }
        self.assemble_variable_bounds(problem, iterate);

        if warmstart == Warmstart::ColdStart {
            self.qp_solver.reset();
        }

        let solution = self.qp_solver.solve(&self.data, settings, statistics)?;

        // -------------------------------------------------------
        // translate the QP solution into a Direction
        // -------------------------------------------------------
        let mut direction = Direction::new(n, m);
        direction.status = solution.status;
        direction.objective_multiplier = problem.objective_multiplier();
        if matches!(
            solution.status,
            SubproblemStatus::UnboundedSubproblem | SubproblemStatus::Error
        ) {
            return Ok(direction);
        }

        direction.primals.copy_from(&solution.primals);
        direction.norm = direction.primals[..n_orig].norm_inf();
        direction
            .multipliers
            .constraints
            .copy_from(&solution.constraint_multipliers);
        direction.multipliers.lower_bounds[..n_orig]
            .copy_from(&solution.lower_bound_multipliers[..n_orig]);
        direction.multipliers.upper_bounds[..n_orig]
            .copy_from(&solution.upper_bound_multipliers[..n_orig]);
        direction.multipliers.objective = problem.objective_multiplier();

        self.set_active_bounds(problem, iterate, &mut direction, settings, n_orig);
        self.set_constraint_partition(problem, iterate, &mut direction, settings);

        // predicted elastic penalty at the step
        let ρ = problem.elastic_objective_coefficient();
        let mut current_elastic_total = T::zero();
        if problem.elastic_variables().is_some() {
            for i in n_orig..n {
                current_elastic_total += problem.variable_value(iterate, i);
            }
        }
        direction.linear_term = solution.linear_term;
        direction.quadratic_term = solution.quadratic_term;
        direction.objective = solution.objective + ρ * current_elastic_total;

        Ok(direction)
    }

    fn assemble_derivatives<P: OptimizationProblem<T>>(
        &mut self,
        problem: &P,
        iterate: &mut Iterate<T>,
        settings: &Settings<T>,
        statistics: &mut Statistics<T>,
    ) -> Result<(), SolveError> {
        let n = problem.number_variables();
        let m = problem.number_constraints();

        // objective gradient, dense over the subproblem variables
        self.data.gradient[..n].set(T::zero());
        {
            let gradient = &mut self.data.gradient;
            problem.for_each_objective_gradient(iterate, &mut |i, v| gradient[i] += v);
        }

        // Jacobian rows and row bounds shifted by the relaxed constraint
        // values
        for j in 0..m {
            self.data.jacobian[j].clear();
            {
                let row = &mut self.data.jacobian[j];
                problem.for_each_jacobian_row(iterate, j, &mut |i, v| row.insert(i, v));
            }
            let value = problem.constraint_value(iterate, j);
            self.data.constraint_lower[j] = problem.constraint_lower_bound(j) - value;
            self.data.constraint_upper[j] = problem.constraint_upper_bound(j) - value;
        }

        // quadratic model of the Lagrangian
        match &mut self.hessian_model {
            Some(hessian_model) => {
                hessian_model.evaluate(
                    problem,
                    &iterate.primals,
                    &iterate.multipliers.constraints,
                    &mut self.data.hessian,
                    settings,
                    statistics,
                )?;
            }
            None => self.data.hessian.reset(),
        }
        Ok(())
    }

    fn assemble_variable_bounds<P: OptimizationProblem<T>>(
        &mut self,
        problem: &P,
        iterate: &Iterate<T>,
    ) {
        let n = problem.number_variables();
        let n_orig = problem.number_original_variables();
        let Δ = self.trust_region_radius;

        for i in 0..n {
            let value = problem.variable_value(iterate, i);
            let mut lower = problem.variable_lower_bound(i) - value;
            let mut upper = problem.variable_upper_bound(i) - value;
            // the trust region applies to the original variables only
            if i < n_orig && !is_unbounded(Δ) {
                lower = T::max(lower, -Δ);
                upper = T::min(upper, Δ);
            }
            self.data.variable_lower[i] = lower;
            self.data.variable_upper[i] = upper;
        }
    }

    fn set_active_bounds<P: OptimizationProblem<T>>(
        &self,
        problem: &P,
        iterate: &Iterate<T>,
        direction: &mut Direction<T>,
        settings: &Settings<T>,
        n_orig: usize,
    ) {
        let ε = settings.tr_activity_tolerance;
        let Δ = self.trust_region_radius;
        direction.active_bounds.clear();
        for i in 0..n_orig {
            let d = direction.primals[i];
            let x = iterate.primals[i];
            let at_lower =
                !is_unbounded(self.data.variable_lower[i]) && d - self.data.variable_lower[i] <= ε;
            let at_upper =
                !is_unbounded(self.data.variable_upper[i]) && self.data.variable_upper[i] - d <= ε;
            if at_lower {
                direction.active_bounds.at_lower_bound.push(i);
                // a step held back by the trust region must not claim the
                // model bound is active, unless that bound really is close
                if !is_unbounded(Δ)
                    && T::abs(d + Δ) <= ε
                    && problem.variable_lower_bound(i) - x < -Δ - ε
                {
                    direction.multipliers.lower_bounds[i] = T::zero();
                }
            }
            if at_upper {
                direction.active_bounds.at_upper_bound.push(i);
                if !is_unbounded(Δ)
                    && T::abs(d - Δ) <= ε
                    && problem.variable_upper_bound(i) - x > Δ + ε
                {
                    direction.multipliers.upper_bounds[i] = T::zero();
                }
            }
        }
    }

    fn set_constraint_partition<P: OptimizationProblem<T>>(
        &self,
        problem: &P,
        iterate: &Iterate<T>,
        direction: &mut Direction<T>,
        settings: &Settings<T>,
    ) {
        let Some(elastics) = problem.elastic_variables() else {
            direction.constraint_partition = None;
            return;
        };
        let ε = settings.tr_activity_tolerance;
        let mut partition = ConstraintPartition::default();
        for j in 0..problem.number_constraints() {
            let p_new = elastics.positive_elastic(j).map_or(T::zero(), |i| {
                problem.variable_value(iterate, i) + direction.primals[i]
            });
            let n_new = elastics.negative_elastic(j).map_or(T::zero(), |i| {
                problem.variable_value(iterate, i) + direction.primals[i]
            });
            if p_new > ε {
                partition.infeasible_above.push(j);
            } else if n_new > ε {
                partition.infeasible_below.push(j);
            } else {
                partition.feasible.push(j);
            }
        }
        direction.constraint_partition = Some(partition);
    }
}
