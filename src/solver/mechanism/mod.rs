use super::{ConstraintRelaxation, Direction, Iterate, Settings, SolveError, Statistics};
use crate::algebra::FloatT;
use crate::model::Model;

mod line_search;
mod trust_region;

pub use line_search::BacktrackingLineSearch;
pub use trust_region::TrustRegion;

/// Globalization mechanism variants.

pub enum GlobalizationMechanism<T: FloatT> {
    TrustRegion(TrustRegion<T>),
    LineSearch(BacktrackingLineSearch),
}

impl<T> GlobalizationMechanism<T>
where
    T: FloatT,
{
    pub fn from_settings(settings: &Settings<T>) -> Self {
        use crate::solver::MechanismKind;
        match settings.mechanism {
            MechanismKind::TrustRegion => {
                GlobalizationMechanism::TrustRegion(TrustRegion::new(settings))
            }
            MechanismKind::LineSearch => {
                GlobalizationMechanism::LineSearch(BacktrackingLineSearch::new())
            }
        }
    }

    /// Produce the next accepted iterate, or a terminal error.
    pub fn compute_next_iterate<M: Model<T>>(
        &mut self,
        model: &M,
        relaxation: &mut ConstraintRelaxation<T>,
        current: &mut Iterate<T>,
        settings: &Settings<T>,
        statistics: &mut Statistics<T>,
    ) -> Result<Iterate<T>, SolveError> {
        match self {
            GlobalizationMechanism::TrustRegion(mechanism) => {
                mechanism.compute_next_iterate(model, relaxation, current, settings, statistics)
            }
            GlobalizationMechanism::LineSearch(mechanism) => {
                mechanism.compute_next_iterate(model, relaxation, current, settings, statistics)
            }
        }
    }
}

/// Trial iterate `current + factors·direction`, projected onto the
/// variable bounds.   Multipliers move toward the direction's target
/// values; the bound duals use their own step fraction.
pub(crate) fn assemble_trial_iterate<T: FloatT, M: Model<T>>(
    model: &M,
    current: &Iterate<T>,
    direction: &Direction<T>,
    primal_factor: T,
    dual_factor: T,
    bound_dual_factor: T,
) -> Iterate<T> {
    let n = model.number_variables();
    let m = model.number_constraints();
    let mut trial = Iterate::new(n, m);

    for i in 0..n {
        trial.primals[i] = current.primals[i] + primal_factor * direction.primals[i];
    }
    model.project_onto_variable_bounds(&mut trial.primals);

    for j in 0..m {
        trial.multipliers.constraints[j] = current.multipliers.constraints[j]
            + dual_factor
                * (direction.multipliers.constraints[j] - current.multipliers.constraints[j]);
    }
    for i in 0..n {
        trial.multipliers.lower_bounds[i] = current.multipliers.lower_bounds[i]
            + bound_dual_factor
                * (direction.multipliers.lower_bounds[i] - current.multipliers.lower_bounds[i]);
        trial.multipliers.upper_bounds[i] = current.multipliers.upper_bounds[i]
            + bound_dual_factor
                * (direction.multipliers.upper_bounds[i] - current.multipliers.upper_bounds[i]);
    }
    trial.multipliers.objective = direction.objective_multiplier;
    trial
}
