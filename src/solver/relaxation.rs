use super::{
    compute_primal_dual_residuals, compute_status, Direction, ElasticVariables,
    GlobalizationStrategy, Iterate, L1RelaxedProblem, OptimizationProblem, OriginalProblem,
    ProgressMeasures, RelaxationKind, Settings, SolveError, Statistics, Subproblem,
    SubproblemStatus, TerminationStatus, Warmstart,
};
use crate::algebra::*;
use crate::model::{interval_violation, Model};

/// Operating phase of the constraint relaxation.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Optimality,
    FeasibilityRestoration,
}

/// Constraint relaxation strategy.
///
/// Owns the subproblem engine and the acceptance strategy (breaking the
/// cyclic reference the layering would otherwise create).   In
/// *feasibility restoration* mode the optimality phase solves the
/// original problem and switches to the elastic feasibility problem when
/// a subproblem is infeasible or its regularization becomes unstable; in
/// *ℓ1 relaxation* mode every subproblem is elastic (Sl1QP when paired
/// with the QP engine) and the feasibility phase only changes σ to zero.

pub struct ConstraintRelaxation<T: FloatT> {
    kind: RelaxationKind,
    subproblem: Subproblem<T>,
    strategy: GlobalizationStrategy<T>,
    elastics: ElasticVariables,
    phase: Phase,
    force_cold_start: bool,
}

impl<T> ConstraintRelaxation<T>
where
    T: FloatT,
{
    pub fn from_settings<M: Model<T>>(model: &M, settings: &Settings<T>) -> Self {
        Self {
            kind: settings.relaxation,
            subproblem: Subproblem::from_settings(model, settings),
            strategy: GlobalizationStrategy::from_settings(settings),
            elastics: ElasticVariables::generate(model),
            phase: Phase::Optimality,
            force_cold_start: false,
        }
    }

    pub fn solving_feasibility_problem(&self) -> bool {
        self.phase == Phase::FeasibilityRestoration
    }

    pub fn set_trust_region_radius(&mut self, radius: T) {
        self.subproblem.set_trust_region_radius(radius);
    }

    pub fn supports_bounds_only_warmstart(&self) -> bool {
        self.subproblem.supports_bounds_only_warmstart()
    }

    fn uses_original_view(&self) -> bool {
        self.kind == RelaxationKind::FeasibilityRestoration && self.phase == Phase::Optimality
    }

    fn objective_multiplier(&self) -> T {
        if self.phase == Phase::FeasibilityRestoration {
            T::zero()
        } else {
            T::one()
        }
    }

    /// Prepare the initial iterate: subproblem initialization, progress
    /// measures, residuals and acceptance-strategy seeding.
    pub fn initialize<M: Model<T>>(
        &mut self,
        model: &M,
        iterate: &mut Iterate<T>,
        settings: &Settings<T>,
    ) -> Result<(), SolveError> {
        if self.uses_original_view() {
            let problem = OriginalProblem::new(model);
            self.subproblem.generate_initial_iterate(&problem, iterate);
            _evaluate_progress(&self.subproblem, &problem, model, iterate, settings)?;
        } else {
            let problem = L1RelaxedProblem::new(
                model,
                &self.elastics,
                self.objective_multiplier(),
                settings.elastic_objective_coefficient,
            );
            self.subproblem.generate_initial_iterate(&problem, iterate);
            _evaluate_progress(&self.subproblem, &problem, model, iterate, settings)?;
        }
        compute_primal_dual_residuals(model, iterate, settings).map_err(SolveError::Evaluation)?;
        self.strategy.initialize(&iterate.progress);
        Ok(())
    }

    /// Ask the subproblem for a direction, falling back to the
    /// feasibility problem when the optimality subproblem is infeasible
    /// or its inertia correction fails.
    pub fn compute_feasible_direction<M: Model<T>>(
        &mut self,
        model: &M,
        iterate: &mut Iterate<T>,
        warmstart: Warmstart,
        settings: &Settings<T>,
        statistics: &mut Statistics<T>,
    ) -> Result<Direction<T>, SolveError> {
        let mut warmstart = if self.force_cold_start {
            Warmstart::ColdStart
        } else {
            warmstart
        };
        self.force_cold_start = false;

        if self.phase == Phase::Optimality {
            let outcome = if self.uses_original_view() {
                let problem = OriginalProblem::new(model);
                self.subproblem
                    .compute_direction(&problem, iterate, warmstart, settings, statistics)
            } else {
                let problem = L1RelaxedProblem::new(
                    model,
                    &self.elastics,
                    T::one(),
                    settings.elastic_objective_coefficient,
                );
                self.subproblem
                    .compute_direction(&problem, iterate, warmstart, settings, statistics)
            };
            match outcome {
                Ok(direction) if direction.status != SubproblemStatus::Infeasible => {
                    return Ok(_restrict(direction, model.number_variables()));
                }
                Ok(_) | Err(SolveError::UnstableRegularization) => {
                    self.switch_to_feasibility_problem(model, iterate, settings)?;
                    warmstart = Warmstart::ColdStart;
                    self.force_cold_start = false;
                }
                Err(error) => return Err(error),
            }
        }

        // feasibility problem: minimize the constraint violation only
        let problem = L1RelaxedProblem::new(
            model,
            &self.elastics,
            T::zero(),
            settings.elastic_objective_coefficient,
        );
        let direction =
            self.subproblem
                .compute_direction(&problem, iterate, warmstart, settings, statistics)?;
        Ok(_restrict(direction, model.number_variables()))
    }

    /// Switch to the feasibility phase: σ = 0, constraint multipliers
    /// reset, strategy history dropped.
    pub fn switch_to_feasibility_problem<M: Model<T>>(
        &mut self,
        model: &M,
        iterate: &mut Iterate<T>,
        settings: &Settings<T>,
    ) -> Result<(), SolveError> {
        if self.phase == Phase::FeasibilityRestoration {
            return Ok(());
        }
        self.phase = Phase::FeasibilityRestoration;
        self.strategy.register_current_progress(&iterate.progress);
        self.strategy.reset();
        iterate.multipliers.constraints.set(T::zero());
        iterate.multipliers.objective = T::zero();
        self.subproblem.initialize_feasibility_problem();
        self.force_cold_start = true;

        let problem = L1RelaxedProblem::new(
            model,
            &self.elastics,
            T::zero(),
            settings.elastic_objective_coefficient,
        );
        _evaluate_progress(&self.subproblem, &problem, model, iterate, settings)?;
        self.strategy.initialize(&iterate.progress);
        Ok(())
    }

    fn switch_to_optimality_phase<M: Model<T>>(
        &mut self,
        model: &M,
        current: &mut Iterate<T>,
        trial: &mut Iterate<T>,
        settings: &Settings<T>,
    ) -> Result<(), SolveError> {
        self.phase = Phase::Optimality;
        current.multipliers.objective = T::one();
        trial.multipliers.objective = T::one();
        self.subproblem.exit_feasibility_problem();
        self.strategy.reset();
        self.force_cold_start = true;

        if self.uses_original_view() {
            let problem = OriginalProblem::new(model);
            _evaluate_progress(&self.subproblem, &problem, model, trial, settings)?;
        } else {
            let problem = L1RelaxedProblem::new(
                model,
                &self.elastics,
                T::one(),
                settings.elastic_objective_coefficient,
            );
            _evaluate_progress(&self.subproblem, &problem, model, trial, settings)?;
        }
        self.strategy.initialize(&trial.progress);
        Ok(())
    }

    /// Acceptance test for a trial iterate; on acceptance the residuals
    /// and termination status of the trial are refreshed and a
    /// feasibility-phase exit is considered.
    pub fn is_iterate_acceptable<M: Model<T>>(
        &mut self,
        model: &M,
        current: &mut Iterate<T>,
        trial: &mut Iterate<T>,
        direction: &Direction<T>,
        step_length: T,
        settings: &Settings<T>,
    ) -> Result<bool, SolveError> {
        let σ = self.objective_multiplier();

        // a barrier update redefines the subproblem: acceptance history
        // refers to the old barrier function and must be dropped
        if self.subproblem.take_definition_changed() {
            self.strategy.reset();
        }

        // refresh the progress measures under the current phase
        if self.uses_original_view() {
            let problem = OriginalProblem::new(model);
            _evaluate_progress(&self.subproblem, &problem, model, current, settings)?;
            _evaluate_progress(&self.subproblem, &problem, model, trial, settings)?;
        } else {
            let problem = L1RelaxedProblem::new(
                model,
                &self.elastics,
                σ,
                settings.elastic_objective_coefficient,
            );
            _evaluate_progress(&self.subproblem, &problem, model, current, settings)?;
            _evaluate_progress(&self.subproblem, &problem, model, trial, settings)?;
        }

        let step_factor = step_length * direction.primal_dual_step_length;
        let accept = if direction.norm == T::zero() {
            // zero step: accept unconditionally, termination is decided
            // below
            true
        } else {
            let predicted = _predicted_reduction(model, current, direction, step_factor);
            self.strategy.is_iterate_acceptable(
                &current.progress,
                &trial.progress,
                &predicted,
                direction.objective,
                σ,
                step_length,
            )
        };

        if accept {
            if self.uses_original_view() {
                let problem = OriginalProblem::new(model);
                self.subproblem
                    .postprocess_accepted_iterate(&problem, trial, settings);
            } else {
                let problem = L1RelaxedProblem::new(
                    model,
                    &self.elastics,
                    σ,
                    settings.elastic_objective_coefficient,
                );
                self.subproblem
                    .postprocess_accepted_iterate(&problem, trial, settings);
            }
            compute_primal_dual_residuals(model, trial, settings)
                .map_err(SolveError::Evaluation)?;

            // leave the feasibility phase once the violation is resolved
            let n: T = model.number_variables().as_T();
            if self.phase == Phase::FeasibilityRestoration
                && trial.residuals.infeasibility <= settings.tolerance * n
                && self
                    .strategy
                    .is_feasibility_iterate_acceptable(&current.progress, &trial.progress)
            {
                self.switch_to_optimality_phase(model, current, trial, settings)?;
            }

            let step_norm = step_factor * direction.norm;
            trial.status = compute_status(
                model,
                trial,
                step_norm,
                self.solving_feasibility_problem(),
                settings,
            );

            // a small accepted step that leaves the violation in place
            // means the optimality phase is stuck: minimize the
            // violation instead
            if !trial.status.is_terminal()
                && self.phase == Phase::Optimality
                && step_norm <= T::sqrt(settings.tolerance)
                && trial.residuals.infeasibility > settings.tolerance * n
                && trial.progress.infeasibility
                    > <f64 as AsFloatT<T>>::as_T(&0.9) * current.progress.infeasibility
            {
                self.switch_to_feasibility_problem(model, trial, settings)?;
            }
        }
        Ok(accept)
    }

    /// Small-step termination: feasible and infeasible small steps are
    /// terminal; otherwise switch to the feasibility phase and continue.
    pub fn check_termination_with_small_step<M: Model<T>>(
        &mut self,
        model: &M,
        trial: &mut Iterate<T>,
        settings: &Settings<T>,
    ) -> Result<Option<TerminationStatus>, SolveError> {
        trial
            .evaluate_constraints(model)
            .map_err(SolveError::Evaluation)?;
        let violation =
            model.constraint_violation_norm_inf(&trial.evaluations.constraints);
        let n: T = model.number_variables().as_T();

        if violation <= settings.tolerance * n {
            compute_primal_dual_residuals(model, trial, settings)
                .map_err(SolveError::Evaluation)?;
            Ok(Some(TerminationStatus::FeasibleSmallStep))
        } else if self.solving_feasibility_problem() {
            compute_primal_dual_residuals(model, trial, settings)
                .map_err(SolveError::Evaluation)?;
            Ok(Some(TerminationStatus::InfeasibleSmallStep))
        } else {
            self.switch_to_feasibility_problem(model, trial, settings)?;
            Ok(None)
        }
    }
}

// restrict a direction to the original primal space for norm purposes
// (the elastic block stays in `primals` for partition bookkeeping)
fn _restrict<T: FloatT>(mut direction: Direction<T>, n_orig: usize) -> Direction<T> {
    direction.norm = direction.primals[..n_orig.min(direction.primals.len())].norm_inf();
    direction
}

// progress measures of an iterate: ℓ1 violation, objective, auxiliary
fn _evaluate_progress<T: FloatT, M: Model<T>, P: OptimizationProblem<T>>(
    subproblem: &Subproblem<T>,
    problem: &P,
    model: &M,
    iterate: &mut Iterate<T>,
    settings: &Settings<T>,
) -> Result<(), SolveError> {
    problem
        .evaluate_functions(iterate)
        .map_err(SolveError::Evaluation)?;
    iterate.progress.infeasibility =
        model.constraint_violation_norm1(&iterate.evaluations.constraints);
    iterate.progress.scaled_optimality = iterate.evaluations.objective;
    subproblem.set_auxiliary_measure(problem, iterate, settings);
    Ok(())
}

// reduction models at the applied step factor `t`: positive values mean
// predicted improvement
fn _predicted_reduction<T: FloatT, M: Model<T>>(
    model: &M,
    current: &Iterate<T>,
    direction: &Direction<T>,
    t: T,
) -> ProgressMeasures<T> {
    let n_orig = model.number_variables();
    let d = &direction.primals[..n_orig];

    // linearized infeasibility at the step
    let mut linearized = T::zero();
    for (j, row) in current.evaluations.constraint_jacobian.iter().enumerate() {
        let value = current.evaluations.constraints[j] + t * row.dot_dense(d);
        linearized += interval_violation(
            value,
            model.constraint_lower_bound(j),
            model.constraint_upper_bound(j),
        );
    }

    ProgressMeasures {
        infeasibility: current.progress.infeasibility - linearized,
        scaled_optimality: -(t * direction.linear_term
            + t * t * direction.quadratic_term / (2.0).as_T()),
        unscaled_optimality: T::zero(),
    }
}
