use super::progress;
use super::{
    ConstraintRelaxation, GlobalizationMechanism, Iterate, Multipliers, Residuals, Settings,
    SolveError, Statistics, TerminationStatus,
};
use crate::algebra::FloatT;
use crate::model::Model;
use crate::timers::Timer;

/// Outcome of a solve: terminal status, primal-dual point, residuals and
/// counters.

#[derive(Debug, Clone)]
pub struct SolveResult<T = f64> {
    pub status: TerminationStatus,
    pub primals: Vec<T>,
    pub multipliers: Multipliers<T>,
    pub objective: T,
    pub residuals: Residuals<T>,
    /// wall-clock seconds spent in `solve`
    pub solve_time: f64,
    pub statistics: Statistics<T>,
}

/// The solver driver: owns the settings, assembles the strategy
/// combination per solve and runs the outer iteration loop.

pub struct Steinbock<T: FloatT> {
    settings: Settings<T>,
}

impl<T> Steinbock<T>
where
    T: FloatT,
{
    pub fn new(settings: Settings<T>) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings<T> {
        &self.settings
    }

    /// Solve `model` from its initial point.
    pub fn solve<M: Model<T>>(&mut self, model: &M) -> Result<SolveResult<T>, SolveError> {
        let timer = Timer::start();
        let settings = &self.settings;
        let mut statistics = Statistics::new();

        let n = model.number_variables();
        let m = model.number_constraints();

        let mut mechanism = GlobalizationMechanism::from_settings(settings);
        let mut relaxation = ConstraintRelaxation::from_settings(model, settings);

        // initial primal-dual point, projected onto the bounds
        let mut current = Iterate::new(n, m);
        model.initial_primal_point(&mut current.primals);
        model.project_onto_variable_bounds(&mut current.primals);
        model.initial_dual_point(&mut current.multipliers.constraints);

        relaxation.initialize(model, &mut current, settings)?;

        progress::print_banner(settings.verbose);
        progress::print_configuration(settings, n, m);
        progress::print_status_header(settings);
        progress::print_status(settings, 0, &current, &statistics);

        // ----------
        // outer loop
        // ----------
        while !current.status.is_terminal() {
            if statistics.outer_iterations as u32 >= settings.max_iterations {
                current.status = TerminationStatus::IterationLimit;
                break;
            }
            if timer.elapsed() > settings.time_limit {
                current.status = TerminationStatus::TimeLimit;
                break;
            }

            match mechanism.compute_next_iterate(
                model,
                &mut relaxation,
                &mut current,
                settings,
                &mut statistics,
            ) {
                Ok(next) => {
                    // monotone replacement of the current iterate
                    current = next;
                    statistics.outer_iterations += 1;
                    progress::print_status(
                        settings,
                        statistics.outer_iterations,
                        &current,
                        &statistics,
                    );
                }
                Err(SolveError::UnstableRegularization) => {
                    current.status = TerminationStatus::UnstableRegularization;
                    break;
                }
                Err(error) => return Err(error),
            }
        }

        // scale-invariant multipliers on exit
        current.multipliers.normalize();

        let objective = if current.is_objective_computed {
            model.objective_sign() * current.evaluations.objective
        } else {
            model.objective_sign() * current.evaluate_objective(model)?
        };

        let result = SolveResult {
            status: current.status,
            primals: current.primals.clone(),
            multipliers: current.multipliers.clone(),
            objective,
            residuals: current.residuals,
            solve_time: timer.elapsed(),
            statistics,
        };
        progress::print_footer(settings, &result);
        Ok(result)
    }
}
