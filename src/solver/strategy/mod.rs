use super::{ProgressMeasures, Settings};
use crate::algebra::FloatT;

mod filter;
mod merit;

pub use filter::Filter;
pub use merit::MeritFunction;

/// Acceptance test variants for trial iterates.

pub enum GlobalizationStrategy<T: FloatT> {
    Merit(MeritFunction<T>),
    Filter(Filter<T>),
}

impl<T> GlobalizationStrategy<T>
where
    T: FloatT,
{
    pub fn from_settings(settings: &Settings<T>) -> Self {
        use crate::solver::StrategyKind;
        match settings.strategy {
            StrategyKind::Merit => GlobalizationStrategy::Merit(MeritFunction::new(settings)),
            StrategyKind::Filter => GlobalizationStrategy::Filter(Filter::new(settings)),
        }
    }

    /// Register the progress of the initial iterate.
    pub fn initialize(&mut self, progress: &ProgressMeasures<T>) {
        match self {
            GlobalizationStrategy::Merit(_) => {}
            GlobalizationStrategy::Filter(filter) => filter.initialize(progress),
        }
    }

    /// Decide whether the trial iterate makes sufficient progress.
    ///
    /// `predicted` holds the reduction models evaluated at the actual
    /// step length; `direction_objective` is the subproblem's predicted
    /// model value.
    pub fn is_iterate_acceptable(
        &mut self,
        current: &ProgressMeasures<T>,
        trial: &ProgressMeasures<T>,
        predicted: &ProgressMeasures<T>,
        direction_objective: T,
        objective_multiplier: T,
        step_length: T,
    ) -> bool {
        match self {
            GlobalizationStrategy::Merit(merit) => merit.is_iterate_acceptable(
                current,
                trial,
                direction_objective,
                objective_multiplier,
                step_length,
            ),
            GlobalizationStrategy::Filter(filter) => {
                filter.is_iterate_acceptable(current, trial, predicted, objective_multiplier)
            }
        }
    }

    /// Progress test used when deciding to leave the feasibility phase.
    pub fn is_feasibility_iterate_acceptable(
        &self,
        current: &ProgressMeasures<T>,
        trial: &ProgressMeasures<T>,
    ) -> bool {
        trial.infeasibility < current.infeasibility
    }

    /// Remember the progress of the current iterate across a phase
    /// switch.
    pub fn register_current_progress(&mut self, progress: &ProgressMeasures<T>) {
        if let GlobalizationStrategy::Filter(filter) = self {
            filter.add(progress.infeasibility, progress.scaled_optimality);
        }
    }

    /// Forget accumulated history (the subproblem definition changed).
    pub fn reset(&mut self) {
        if let GlobalizationStrategy::Filter(filter) = self {
            filter.clear();
        }
    }
}
