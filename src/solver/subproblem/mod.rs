use super::{Direction, Iterate, OptimizationProblem, Settings, SolveError, Statistics};
use crate::algebra::FloatT;
use crate::model::Model;

mod interior_point;
mod sqp;

pub use interior_point::InteriorPointSubproblem;
pub use sqp::SqpSubproblem;

/// What a subproblem engine may reuse from its previous solve.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warmstart {
    /// drop all carried state, including factorization warm starts
    ColdStart,
    /// new iterate: derivatives must be refreshed, warm data may be kept
    HotStart,
    /// same iterate, only the variable bounds changed (trust-region
    /// update); engines that support it skip derivative reassembly
    BoundsOnly,
}

/// The subproblem engine variants, dispatched as a tagged enum.

pub enum Subproblem<T: FloatT> {
    Sqp(SqpSubproblem<T>),
    Slp(SqpSubproblem<T>),
    InteriorPoint(InteriorPointSubproblem<T>),
}

impl<T> Subproblem<T>
where
    T: FloatT,
{
    /// Size the engine for `model`, leaving room for the elastic
    /// variables of the relaxed problems.
    pub fn from_settings<M: Model<T>>(model: &M, settings: &Settings<T>) -> Self {
        use crate::solver::SubproblemKind;
        match settings.subproblem {
            SubproblemKind::Qp => Subproblem::Sqp(SqpSubproblem::new_qp(model, settings)),
            SubproblemKind::Lp => Subproblem::Slp(SqpSubproblem::new_lp(model, settings)),
            SubproblemKind::Barrier => {
                Subproblem::InteriorPoint(InteriorPointSubproblem::new(model, settings))
            }
        }
    }

    /// Prepare the initial iterate (interior-point engines push it
    /// strictly inside the bounds and seed the bound duals).
    pub fn generate_initial_iterate<P: OptimizationProblem<T>>(
        &mut self,
        problem: &P,
        iterate: &mut Iterate<T>,
    ) {
        match self {
            Subproblem::Sqp(_) | Subproblem::Slp(_) => {}
            Subproblem::InteriorPoint(engine) => {
                engine.generate_initial_iterate(problem, iterate);
            }
        }
    }

    /// Compute a primal-dual direction at the current iterate.
    pub fn compute_direction<P: OptimizationProblem<T>>(
        &mut self,
        problem: &P,
        iterate: &mut Iterate<T>,
        warmstart: Warmstart,
        settings: &Settings<T>,
        statistics: &mut Statistics<T>,
    ) -> Result<Direction<T>, SolveError> {
        match self {
            Subproblem::Sqp(engine) | Subproblem::Slp(engine) => {
                engine.compute_direction(problem, iterate, warmstart, settings, statistics)
            }
            Subproblem::InteriorPoint(engine) => {
                engine.compute_direction(problem, iterate, warmstart, settings, statistics)
            }
        }
    }

    /// Communicate the trust-region radius for the next direction.
    pub fn set_trust_region_radius(&mut self, radius: T) {
        match self {
            Subproblem::Sqp(engine) | Subproblem::Slp(engine) => {
                engine.set_trust_region_radius(radius);
            }
            Subproblem::InteriorPoint(engine) => engine.set_trust_region_radius(radius),
        }
    }

    /// Refresh the auxiliary progress measure of `iterate` (the barrier
    /// term for interior-point engines, zero otherwise).
    pub fn set_auxiliary_measure<P: OptimizationProblem<T>>(
        &self,
        problem: &P,
        iterate: &mut Iterate<T>,
        settings: &Settings<T>,
    ) {
        match self {
            Subproblem::Sqp(_) | Subproblem::Slp(_) => {
                iterate.progress.unscaled_optimality = T::zero();
            }
            Subproblem::InteriorPoint(engine) => {
                engine.set_auxiliary_measure(problem, iterate, settings);
            }
        }
    }

    /// Post-acceptance fixups on the new current iterate (the dual
    /// safeguard projection for interior-point engines).
    pub fn postprocess_accepted_iterate<P: OptimizationProblem<T>>(
        &self,
        problem: &P,
        iterate: &mut Iterate<T>,
        settings: &Settings<T>,
    ) {
        if let Subproblem::InteriorPoint(engine) = self {
            engine.postprocess_accepted_iterate(problem, iterate, settings);
        }
    }

    /// Hook called when the relaxation strategy enters its feasibility
    /// phase.
    pub fn initialize_feasibility_problem(&mut self) {
        if let Subproblem::InteriorPoint(engine) = self {
            engine.enter_feasibility_phase();
        }
    }

    /// Hook called when the relaxation strategy returns to the
    /// optimality phase.
    pub fn exit_feasibility_problem(&mut self) {
        if let Subproblem::InteriorPoint(engine) = self {
            engine.exit_feasibility_phase();
        }
    }

    /// `true` if rejected steps can be retried with a bounds-only update
    pub fn supports_bounds_only_warmstart(&self) -> bool {
        !matches!(self, Subproblem::InteriorPoint(_))
    }

    /// `true` once after the engine changed its own problem definition
    /// (a barrier parameter update); acceptance history is then stale.
    pub fn take_definition_changed(&mut self) -> bool {
        match self {
            Subproblem::Sqp(_) | Subproblem::Slp(_) => false,
            Subproblem::InteriorPoint(engine) => engine.take_definition_changed(),
        }
    }
}
