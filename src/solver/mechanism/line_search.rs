use super::assemble_trial_iterate;
use crate::algebra::*;
use crate::model::Model;
use crate::solver::{
    ConstraintRelaxation, Iterate, Settings, SolveError, Statistics, SubproblemStatus, Warmstart,
};

/// Backtracking line search globalization.
///
/// One direction is computed per outer iteration; the step length is
/// halved (by the backtracking ratio) until the acceptance test passes.
/// When the step length collapses, the search either terminates through
/// the small-step logic or switches the relaxation into its feasibility
/// phase and restarts along a fresh direction.

pub struct BacktrackingLineSearch;

impl BacktrackingLineSearch {
    pub fn new() -> Self {
        Self
    }

    pub fn compute_next_iterate<T: FloatT, M: Model<T>>(
        &mut self,
        model: &M,
        relaxation: &mut ConstraintRelaxation<T>,
        current: &mut Iterate<T>,
        settings: &Settings<T>,
        statistics: &mut Statistics<T>,
    ) -> Result<Iterate<T>, SolveError> {
        relaxation.set_trust_region_radius(T::infinity());

        let mut direction = relaxation.compute_feasible_direction(
            model,
            current,
            Warmstart::HotStart,
            settings,
            statistics,
        )?;
        let mut α = T::one();
        let mut switched_phase = false;

        for _ in 0..settings.max_inner_iterations {
            statistics.inner_iterations += 1;

            if matches!(
                direction.status,
                SubproblemStatus::UnboundedSubproblem | SubproblemStatus::Error
            ) {
                // no region to shrink here; resolve through the
                // small-step machinery
                let mut probe = current.clone();
                return match relaxation
                    .check_termination_with_small_step(model, &mut probe, settings)?
                {
                    Some(status) => {
                        probe.status = status;
                        Ok(probe)
                    }
                    None => {
                        direction = relaxation.compute_feasible_direction(
                            model,
                            current,
                            Warmstart::ColdStart,
                            settings,
                            statistics,
                        )?;
                        continue;
                    }
                };
            }

            let mut trial = assemble_trial_iterate(
                model,
                current,
                &direction,
                α * direction.primal_dual_step_length,
                α * direction.primal_dual_step_length,
                direction.bound_dual_step_length,
            );

            match relaxation.is_iterate_acceptable(
                model, current, &mut trial, &direction, α, settings,
            ) {
                Ok(true) => return Ok(trial),
                Ok(false) => {}
                // an evaluation failure at the trial point is treated as
                // a rejection
                Err(SolveError::Evaluation(_)) => {}
                Err(error) => return Err(error),
            }

            α *= settings.ls_backtracking_ratio;
            if α < settings.ls_min_step_length {
                let mut probe = current.clone();
                match relaxation.check_termination_with_small_step(model, &mut probe, settings)? {
                    Some(status) => {
                        probe.status = status;
                        return Ok(probe);
                    }
                    None if !switched_phase => {
                        // restoration restart along a feasibility
                        // direction
                        switched_phase = true;
                        α = T::one();
                        direction = relaxation.compute_feasible_direction(
                            model,
                            current,
                            Warmstart::ColdStart,
                            settings,
                            statistics,
                        )?;
                    }
                    None => return Err(SolveError::StepLengthTooSmall),
                }
            }
        }
        Err(SolveError::StepLengthTooSmall)
    }
}

impl Default for BacktrackingLineSearch {
    fn default() -> Self {
        Self::new()
    }
}
