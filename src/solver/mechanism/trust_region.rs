use super::assemble_trial_iterate;
use crate::algebra::*;
use crate::model::Model;
use crate::solver::{
    ConstraintRelaxation, Direction, Iterate, Settings, SolveError, Statistics, SubproblemStatus,
    Warmstart,
};

/// Trust-region globalization.
///
/// The inner loop shrinks the radius on rejected, erroneous or unbounded
/// subproblems and grows it when an accepted step presses against the
/// boundary.   Once the radius falls under its minimum, small-step
/// termination is attempted instead of looping.

pub struct TrustRegion<T> {
    radius: T,
}

impl<T> TrustRegion<T>
where
    T: FloatT,
{
    pub fn new(settings: &Settings<T>) -> Self {
        assert!(settings.tr_initial_radius > T::zero());
        assert!(settings.tr_increase_factor > T::one());
        assert!(settings.tr_decrease_factor > T::one());
        Self {
            radius: settings.tr_initial_radius,
        }
    }

    pub fn compute_next_iterate<M: Model<T>>(
        &mut self,
        model: &M,
        relaxation: &mut ConstraintRelaxation<T>,
        current: &mut Iterate<T>,
        settings: &Settings<T>,
        statistics: &mut Statistics<T>,
    ) -> Result<Iterate<T>, SolveError> {
        let mut warmstart = Warmstart::HotStart;

        for _ in 0..settings.max_inner_iterations {
            statistics.inner_iterations += 1;
            relaxation.set_trust_region_radius(self.radius);

            let direction = match relaxation.compute_feasible_direction(
                model, current, warmstart, settings, statistics,
            ) {
                Ok(direction) => direction,
                Err(SolveError::Evaluation(_)) => {
                    // evaluation failure: shrink the region and restart
                    self.radius = self.radius / settings.tr_decrease_factor;
                    warmstart = Warmstart::ColdStart;
                    continue;
                }
                Err(error) => return Err(error),
            };

            match direction.status {
                SubproblemStatus::UnboundedSubproblem => {
                    self.radius = self.radius / settings.tr_aggressive_decrease_factor;
                    warmstart = Warmstart::ColdStart;
                }
                SubproblemStatus::Error => {
                    self.radius = self.radius / settings.tr_decrease_factor;
                    warmstart = Warmstart::ColdStart;
                }
                _ => {
                    let mut trial = assemble_trial_iterate(
                        model,
                        current,
                        &direction,
                        direction.primal_dual_step_length,
                        direction.primal_dual_step_length,
                        direction.bound_dual_step_length,
                    );
                    self.reset_active_trust_region_multipliers(
                        model, &direction, &mut trial, settings,
                    );

                    let accepted = match relaxation.is_iterate_acceptable(
                        model,
                        current,
                        &mut trial,
                        &direction,
                        T::one(),
                        settings,
                    ) {
                        Ok(accepted) => accepted,
                        Err(SolveError::Evaluation(_)) => {
                            // evaluation failure at the trial point
                            self.radius = self.radius / settings.tr_decrease_factor;
                            warmstart = Warmstart::ColdStart;
                            continue;
                        }
                        Err(error) => return Err(error),
                    };
                    if accepted {
                        self.possibly_increase_radius(direction.norm, settings);
                        self.radius = T::max(self.radius, settings.tr_radius_reset_threshold);
                        return Ok(trial);
                    }

                    if self.radius < settings.tr_min_radius {
                        // rejected with a tiny region: terminate or move
                        // to the feasibility phase
                        if let Some(status) = relaxation
                            .check_termination_with_small_step(model, &mut trial, settings)?
                        {
                            trial.status = status;
                            return Ok(trial);
                        }
                        self.radius = T::max(self.radius, settings.tr_radius_reset_threshold);
                        warmstart = Warmstart::ColdStart;
                    } else {
                        // shrink below the step actually taken, otherwise
                        // the reduction has no effect
                        self.radius = T::min(self.radius, direction.norm)
                            / settings.tr_decrease_factor;
                        warmstart = if relaxation.supports_bounds_only_warmstart() {
                            Warmstart::BoundsOnly
                        } else {
                            Warmstart::HotStart
                        };
                    }
                }
            }
        }

        // inner-iteration cap: resolve through the small-step path
        // rather than spinning
        let mut probe = current.clone();
        match relaxation.check_termination_with_small_step(model, &mut probe, settings)? {
            Some(status) => {
                probe.status = status;
                Ok(probe)
            }
            None => Err(SolveError::StepLengthTooSmall),
        }
    }

    fn possibly_increase_radius(&mut self, step_norm: T, settings: &Settings<T>) {
        // grow only when the region was actually limiting the step
        if step_norm >= self.radius - settings.tr_activity_tolerance {
            self.radius *= settings.tr_increase_factor;
        }
    }

    // multipliers of bounds that are active only through the trust
    // region are reset; the region is not a model bound
    fn reset_active_trust_region_multipliers<M: Model<T>>(
        &self,
        model: &M,
        direction: &Direction<T>,
        trial: &mut Iterate<T>,
        settings: &Settings<T>,
    ) {
        let ε = settings.tr_activity_tolerance;
        let n = model.number_variables();
        for &i in &direction.active_bounds.at_lower_bound {
            if i < n
                && T::abs(direction.primals[i] + self.radius) <= ε
                && ε < T::abs(trial.primals[i] - model.variable_lower_bound(i))
            {
                trial.multipliers.lower_bounds[i] = T::zero();
            }
        }
        for &i in &direction.active_bounds.at_upper_bound {
            if i < n
                && T::abs(direction.primals[i] - self.radius) <= ε
                && ε < T::abs(model.variable_upper_bound(i) - trial.primals[i])
            {
                trial.multipliers.upper_bounds[i] = T::zero();
            }
        }
    }
}
