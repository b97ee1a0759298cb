use crate::algebra::*;
use crate::solver::{ProgressMeasures, Settings};

/// Fletcher–Leyffer filter acceptance test.
///
/// The filter holds `(infeasibility, objective)` pairs; a trial point is
/// acceptable when it is not dominated by any entry, makes sufficient
/// progress against the current iterate, and, on objective-type steps,
/// satisfies an Armijo condition on the predicted objective reduction.

pub struct Filter<T> {
    entries: Vec<(T, T)>,
    upper_bound: T,
    β: T,
    γ: T,
    armijo: T,
    upper_bound_factor: T,
}

impl<T> Filter<T>
where
    T: FloatT,
{
    pub fn new(settings: &Settings<T>) -> Self {
        Self {
            entries: Vec::new(),
            upper_bound: T::infinity(),
            β: settings.filter_beta,
            γ: settings.filter_gamma,
            armijo: settings.filter_armijo_fraction,
            upper_bound_factor: settings.filter_upper_bound_factor,
        }
    }

    pub fn initialize(&mut self, progress: &ProgressMeasures<T>) {
        self.entries.clear();
        self.upper_bound =
            self.upper_bound_factor * T::max(T::one(), progress.infeasibility);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// insert `(h, f)`, dropping entries it dominates
    pub fn add(&mut self, h: T, f: T) {
        self.entries.retain(|&(hk, fk)| hk < h || fk < f);
        self.entries.push((h, f));
    }

    fn acceptable_to_filter(&self, h: T, f: T) -> bool {
        if h > self.upper_bound {
            return false;
        }
        self.entries
            .iter()
            .all(|&(hk, fk)| h <= self.β * hk || f <= fk - self.γ * h)
    }

    pub fn is_iterate_acceptable(
        &mut self,
        current: &ProgressMeasures<T>,
        trial: &ProgressMeasures<T>,
        predicted: &ProgressMeasures<T>,
        objective_multiplier: T,
    ) -> bool {
        let σ = objective_multiplier;
        let h_current = current.infeasibility;
        let f_current = σ * current.scaled_optimality + current.unscaled_optimality;
        let h_trial = trial.infeasibility;
        let f_trial = σ * trial.scaled_optimality + trial.unscaled_optimality;

        if !self.acceptable_to_filter(h_trial, f_trial) {
            return false;
        }
        // progress against the current pair
        if !(h_trial <= self.β * h_current || f_trial <= f_current - self.γ * h_trial) {
            return false;
        }

        // the predicted measures arrive pre-scaled by σ
        let predicted_objective_reduction =
            predicted.scaled_optimality + predicted.unscaled_optimality;
        if predicted_objective_reduction > T::zero() {
            // objective-type step: Armijo on the objective, filter
            // unchanged
            f_current - f_trial >= self.armijo * predicted_objective_reduction
        } else {
            // infeasibility-type step: block this corner of the (h, f)
            // plane from now on
            self.add(h_current, f_current);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measures(h: f64, f: f64) -> ProgressMeasures<f64> {
        ProgressMeasures {
            infeasibility: h,
            scaled_optimality: f,
            unscaled_optimality: 0.0,
        }
    }

    #[test]
    fn dominated_point_is_rejected() {
        let mut filter = Filter::new(&Settings::default());
        filter.initialize(&measures(1.0, 0.0));
        filter.add(0.5, 1.0);

        // strictly worse than the filter entry in both measures
        let current = measures(2.0, 5.0);
        let trial = measures(0.9, 2.0);
        let predicted = measures(0.0, 0.0);
        assert!(!filter.is_iterate_acceptable(&current, &trial, &predicted, 1.0));
    }

    #[test]
    fn feasibility_improvement_is_accepted_and_recorded() {
        let mut filter = Filter::new(&Settings::default());
        filter.initialize(&measures(1.0, 0.0));

        let current = measures(1.0, 5.0);
        let trial = measures(0.2, 5.5);
        let predicted = measures(0.8, -0.5);
        assert!(filter.is_iterate_acceptable(&current, &trial, &predicted, 1.0));

        // the current pair was added: revisiting it is now blocked
        let worse = measures(1.0, 5.0);
        assert!(!filter.is_iterate_acceptable(&current, &worse, &predicted, 1.0));
    }

    #[test]
    fn infeasibility_above_upper_bound_is_rejected() {
        let mut filter = Filter::new(&Settings::default());
        filter.initialize(&measures(0.01, 0.0));

        let current = measures(0.01, 1.0);
        let trial = measures(1e4, -100.0);
        let predicted = measures(0.0, 0.0);
        assert!(!filter.is_iterate_acceptable(&current, &trial, &predicted, 1.0));
    }
}
