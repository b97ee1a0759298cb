use super::{Iterate, Settings, SolveResult, Statistics};
use crate::algebra::FloatT;

pub(crate) fn print_banner(is_verbose: bool) {
    if !is_verbose {
        return;
    }
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    println!("-------------------------------------------------------------");
    println!("      Steinbock v{}  -  nonlinear programming solver", VERSION);
    println!("-------------------------------------------------------------");
}

pub(crate) fn print_configuration<T: FloatT>(
    settings: &Settings<T>,
    number_variables: usize,
    number_constraints: usize,
) {
    if !settings.verbose {
        return;
    }
    println!(
        "problem:  {} variables, {} constraints",
        number_variables, number_constraints
    );
    println!(
        "strategy: {:?} / {:?} / {:?} / {:?}",
        settings.mechanism, settings.strategy, settings.relaxation, settings.subproblem
    );
    println!();
}

pub(crate) fn print_status_header<T: FloatT>(settings: &Settings<T>) {
    if !settings.verbose {
        return;
    }
    println!(
        "{:>4}  {:>13}  {:>9}  {:>9}  {:>9}  {:>6}",
        "iter", "objective", "infeas", "station", "complem", "inner"
    );
}

pub(crate) fn print_status<T: FloatT>(
    settings: &Settings<T>,
    iteration: usize,
    iterate: &Iterate<T>,
    statistics: &Statistics<T>,
) {
    if !settings.verbose {
        return;
    }
    println!(
        "{:>4}  {:>13.6e}  {:>9.2e}  {:>9.2e}  {:>9.2e}  {:>6}",
        iteration,
        iterate.evaluations.objective,
        iterate.residuals.infeasibility,
        iterate.residuals.optimality_stationarity,
        iterate.residuals.optimality_complementarity,
        statistics.inner_iterations,
    );
}

pub(crate) fn print_footer<T: FloatT>(settings: &Settings<T>, result: &SolveResult<T>) {
    if !settings.verbose {
        return;
    }
    println!();
    println!("status:      {}", result.status);
    println!("objective:   {:.10e}", result.objective);
    println!(
        "residuals:   infeas {:.2e}, stationarity {:.2e}, complementarity {:.2e}",
        result.residuals.infeasibility,
        result.residuals.optimality_stationarity,
        result.residuals.optimality_complementarity,
    );
    println!(
        "counts:      {} outer, {} inner, {} Hessians, {} subproblems",
        result.statistics.outer_iterations,
        result.statistics.inner_iterations,
        result.statistics.hessian_evaluations,
        result.statistics.subproblems_solved,
    );
    println!("time:        {:.3}s", result.solve_time);
}
