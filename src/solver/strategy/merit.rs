use crate::algebra::FloatT;
use crate::solver::{ProgressMeasures, Settings};

/// Exact ℓ1 penalty acceptance test
///
/// ```text
/// M(x, σ) = σ·f(x) + ‖violation(c(x))‖₁
/// ```
///
/// A trial point is accepted when the actual merit reduction covers an
/// `η` fraction of the decrease promised by the subproblem.

pub struct MeritFunction<T> {
    η: T,
}

impl<T> MeritFunction<T>
where
    T: FloatT,
{
    pub fn new(settings: &Settings<T>) -> Self {
        Self {
            η: settings.merit_decrease_fraction,
        }
    }

    pub fn is_iterate_acceptable(
        &self,
        current: &ProgressMeasures<T>,
        trial: &ProgressMeasures<T>,
        direction_objective: T,
        objective_multiplier: T,
        step_length: T,
    ) -> bool {
        let σ = objective_multiplier;
        let actual_reduction = current.merit(σ) - trial.merit(σ);
        let promised = current.infeasibility - direction_objective;
        actual_reduction >= self.η * step_length * promised
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measures(infeasibility: f64, objective: f64) -> ProgressMeasures<f64> {
        ProgressMeasures {
            infeasibility,
            scaled_optimality: objective,
            unscaled_optimality: 0.0,
        }
    }

    #[test]
    fn accepts_merit_decrease() {
        let merit = MeritFunction::new(&Settings::default());
        let current = measures(1.0, 10.0);
        let trial = measures(0.5, 9.0);
        assert!(merit.is_iterate_acceptable(&current, &trial, -1.0, 1.0, 1.0));
    }

    #[test]
    fn rejects_merit_increase_with_promised_decrease() {
        let merit = MeritFunction::new(&Settings::default());
        let current = measures(1.0, 10.0);
        let trial = measures(2.0, 10.5);
        assert!(!merit.is_iterate_acceptable(&current, &trial, -3.0, 1.0, 1.0));
    }

    #[test]
    fn accepts_exactly_at_zero_prediction() {
        // pred = 0 and no change in merit must be accepted
        let merit = MeritFunction::new(&Settings::default());
        let current = measures(1.0, 10.0);
        let trial = measures(1.0, 10.0);
        assert!(merit.is_iterate_acceptable(&current, &trial, 1.0, 1.0, 1.0));
    }
}
