//! Command line driver for the steinbock solver.
//!
//! The positional argument names a problem from the bundled demo
//! library; a modeling front end supplying `Model` implementations for
//! problem files would plug into the same surface.

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use steinbock::model::{demo_problem, DEMO_PROBLEM_NAMES};
use steinbock::solver::{
    MechanismKind, Preset, RelaxationKind, SettingsBuilder, Steinbock, StrategyKind,
    SubproblemKind, TerminationStatus,
};

#[derive(Parser)]
#[command(name = "steinbock")]
#[command(about = "Nonlinear programming solver")]
struct Cli {
    /// Name of a bundled demo problem
    problem: String,

    /// Globalization mechanism
    #[arg(long, value_enum, default_value = "tr")]
    mechanism: MechanismArg,

    /// Acceptance strategy
    #[arg(long, value_enum, default_value = "merit")]
    strategy: StrategyArg,

    /// Constraint relaxation strategy
    #[arg(long, value_enum, default_value = "feasibility-restoration")]
    relaxation: RelaxationArg,

    /// Subproblem engine
    #[arg(long, value_enum, default_value = "qp")]
    subproblem: SubproblemArg,

    /// Named strategy combination (overrides the four choices above)
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,

    /// KKT residual tolerance
    #[arg(long, default_value = "1e-8")]
    tolerance: f64,

    /// Maximum outer iterations
    #[arg(long, default_value = "500")]
    max_iterations: u32,

    /// Wall-clock time limit in seconds
    #[arg(long)]
    time_limit: Option<f64>,

    /// Suppress the iteration table
    #[arg(long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum MechanismArg {
    /// backtracking line search
    Ls,
    /// trust region
    Tr,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Merit,
    Filter,
}

#[derive(Clone, Copy, ValueEnum)]
enum RelaxationArg {
    FeasibilityRestoration,
    L1Relaxation,
}

#[derive(Clone, Copy, ValueEnum)]
enum SubproblemArg {
    Qp,
    Lp,
    Barrier,
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    /// line search + filter + restoration + barrier
    Ipopt,
    /// trust region + merit + ℓ1 relaxation + QP
    Byrd,
    /// trust region + filter + restoration + LP
    Filterslp,
}

fn main() {
    match run() {
        Ok(status) => {
            // any terminating status exits cleanly
            let _ = status;
            std::process::exit(0);
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<TerminationStatus> {
    let cli = Cli::parse();

    let model = demo_problem(&cli.problem).ok_or_else(|| {
        anyhow!(
            "unknown problem {:?}; available: {}",
            cli.problem,
            DEMO_PROBLEM_NAMES.join(", ")
        )
    })?;

    let mut settings = SettingsBuilder::<f64>::default()
        .mechanism(match cli.mechanism {
            MechanismArg::Ls => MechanismKind::LineSearch,
            MechanismArg::Tr => MechanismKind::TrustRegion,
        })
        .strategy(match cli.strategy {
            StrategyArg::Merit => StrategyKind::Merit,
            StrategyArg::Filter => StrategyKind::Filter,
        })
        .relaxation(match cli.relaxation {
            RelaxationArg::FeasibilityRestoration => RelaxationKind::FeasibilityRestoration,
            RelaxationArg::L1Relaxation => RelaxationKind::L1Relaxation,
        })
        .subproblem(match cli.subproblem {
            SubproblemArg::Qp => SubproblemKind::Qp,
            SubproblemArg::Lp => SubproblemKind::Lp,
            SubproblemArg::Barrier => SubproblemKind::Barrier,
        })
        .tolerance(cli.tolerance)
        .max_iterations(cli.max_iterations)
        .time_limit(cli.time_limit.unwrap_or(f64::INFINITY))
        .verbose(!cli.quiet)
        .build()
        .map_err(|e| anyhow!("invalid settings: {e}"))?;

    if let Some(preset) = cli.preset {
        settings.apply_preset(match preset {
            PresetArg::Ipopt => Preset::Ipopt,
            PresetArg::Byrd => Preset::Byrd,
            PresetArg::Filterslp => Preset::FilterSlp,
        });
    }

    let mut solver = Steinbock::new(settings);
    let result = solver.solve(&model)?;
    Ok(result.status)
}
