use crate::algebra::*;
use derive_builder::Builder;

/// Globalization mechanism selection.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MechanismKind {
    #[default]
    TrustRegion,
    LineSearch,
}

/// Acceptance strategy selection.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    #[default]
    Merit,
    Filter,
}

/// Constraint relaxation strategy selection.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelaxationKind {
    #[default]
    FeasibilityRestoration,
    L1Relaxation,
}

/// Subproblem engine selection.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubproblemKind {
    #[default]
    Qp,
    Lp,
    Barrier,
}

/// Hessian model selection for the SQP engine.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HessianKind {
    Exact,
    #[default]
    Convexified,
}

/// Named strategy combinations.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// line search + filter + feasibility restoration + barrier subproblem
    Ipopt,
    /// trust region + ℓ1 merit + ℓ1 relaxation + QP subproblem
    Byrd,
    /// trust region + filter + feasibility restoration + LP subproblem
    FilterSlp,
}

/// Solver configuration.
///
/// Built through [`SettingsBuilder`]; all fields default to the values
/// listed below, and [`Settings::preset`] produces classical strategy
/// combinations.

#[derive(Builder, Debug, Clone)]
pub struct Settings<T: FloatT> {
    // -------------------------------------
    // termination
    // -------------------------------------
    ///maximum number of outer iterations
    #[builder(default = "500")]
    pub max_iterations: u32,

    ///maximum run time (seconds)
    #[builder(default = "f64::INFINITY")]
    pub time_limit: f64,

    ///KKT residual tolerance
    #[builder(default = "(1e-8).as_T()")]
    pub tolerance: T,

    ///objective values below this threshold terminate as unbounded
    #[builder(default = "(-1e20).as_T()")]
    pub unbounded_objective_threshold: T,

    ///verbose printing
    #[builder(default = "false")]
    pub verbose: bool,

    // -------------------------------------
    // strategy combination
    // -------------------------------------
    ///globalization mechanism
    #[builder(default)]
    pub mechanism: MechanismKind,

    ///acceptance strategy
    #[builder(default)]
    pub strategy: StrategyKind,

    ///constraint relaxation strategy
    #[builder(default)]
    pub relaxation: RelaxationKind,

    ///subproblem engine
    #[builder(default)]
    pub subproblem: SubproblemKind,

    ///Hessian model used by the QP engine
    #[builder(default)]
    pub hessian_model: HessianKind,

    // -------------------------------------
    // trust region
    // -------------------------------------
    ///initial trust-region radius
    #[builder(default = "(10.0).as_T()")]
    pub tr_initial_radius: T,

    ///radius increase factor on active steps
    #[builder(default = "(2.0).as_T()")]
    pub tr_increase_factor: T,

    ///radius decrease factor on rejected steps
    #[builder(default = "(2.0).as_T()")]
    pub tr_decrease_factor: T,

    ///radius decrease factor on unbounded subproblems
    #[builder(default = "(4.0).as_T()")]
    pub tr_aggressive_decrease_factor: T,

    ///tolerance for detecting a step pinned against the radius
    #[builder(default = "(1e-8).as_T()")]
    pub tr_activity_tolerance: T,

    ///radius below which small-step termination is attempted
    #[builder(default = "(1e-16).as_T()")]
    pub tr_min_radius: T,

    ///radius restored after every accepted step
    #[builder(default = "(1e-4).as_T()")]
    pub tr_radius_reset_threshold: T,

    ///cap on inner iterations of a globalization mechanism
    #[builder(default = "100")]
    pub max_inner_iterations: u32,

    // -------------------------------------
    // line search
    // -------------------------------------
    ///backtracking ratio
    #[builder(default = "(0.5).as_T()")]
    pub ls_backtracking_ratio: T,

    ///minimum step length before the search gives up
    #[builder(default = "(1e-10).as_T()")]
    pub ls_min_step_length: T,

    // -------------------------------------
    // acceptance tests
    // -------------------------------------
    ///merit acceptance margin η
    #[builder(default = "(1e-8).as_T()")]
    pub merit_decrease_fraction: T,

    ///filter infeasibility contraction factor β
    #[builder(default = "(0.999).as_T()")]
    pub filter_beta: T,

    ///filter objective margin factor γ
    #[builder(default = "(1e-5).as_T()")]
    pub filter_gamma: T,

    ///Armijo coefficient for filter f-type steps
    #[builder(default = "(1e-4).as_T()")]
    pub filter_armijo_fraction: T,

    ///initial filter infeasibility upper bound factor
    #[builder(default = "(100.0).as_T()")]
    pub filter_upper_bound_factor: T,

    // -------------------------------------
    // constraint relaxation
    // -------------------------------------
    ///elastic objective coefficient ρ
    #[builder(default = "(10.0).as_T()")]
    pub elastic_objective_coefficient: T,

    // -------------------------------------
    // interior point
    // -------------------------------------
    ///initial barrier parameter
    #[builder(default = "(0.1).as_T()")]
    pub barrier_initial_parameter: T,

    ///fraction-to-boundary floor τ_min
    #[builder(default = "(0.99).as_T()")]
    pub barrier_tau_min: T,

    ///multiplier safeguard κ_σ
    #[builder(default = "(1e10).as_T()")]
    pub barrier_k_sigma: T,

    ///residual scaling threshold s_max
    #[builder(default = "(100.0).as_T()")]
    pub barrier_s_max: T,

    ///linear barrier decrease factor κ_μ
    #[builder(default = "(0.2).as_T()")]
    pub barrier_k_mu: T,

    ///superlinear barrier decrease exponent θ_μ
    #[builder(default = "(1.5).as_T()")]
    pub barrier_theta_mu: T,

    ///barrier reset margin κ_ε
    #[builder(default = "(10.0).as_T()")]
    pub barrier_k_epsilon: T,

    ///interior push fraction for initial points and bound projections
    #[builder(default = "(1e-2).as_T()")]
    pub barrier_push_fraction: T,

    // -------------------------------------
    // regularization
    // -------------------------------------
    ///initial Hessian regularization δ₀
    #[builder(default = "(1e-4).as_T()")]
    pub regularization_initial_value: T,

    ///increase factor for the first bump of a correction loop
    #[builder(default = "(8.0).as_T()")]
    pub regularization_increase_factor_first: T,

    ///increase factor for later bumps
    #[builder(default = "(100.0).as_T()")]
    pub regularization_increase_factor: T,

    ///warm-start decrease factor between outer calls
    #[builder(default = "(1.0 / 3.0).as_T()")]
    pub regularization_decrease_factor: T,

    ///warm-start floor
    #[builder(default = "(1e-20).as_T()")]
    pub regularization_minimum: T,

    ///value above which the correction is abandoned
    #[builder(default = "(1e40).as_T()")]
    pub regularization_failure_threshold: T,

    ///constraint regularization base δ_c0
    #[builder(default = "(1e-8).as_T()")]
    pub constraint_regularization_initial_value: T,

    ///constraint regularization exponent κ in δ_c0·μ^κ
    #[builder(default = "(0.25).as_T()")]
    pub constraint_regularization_exponent: T,

    ///static constraint regularization keeping KKT systems quasidefinite
    #[builder(default = "(1e-10).as_T()")]
    pub static_constraint_regularization: T,

    // -------------------------------------
    // iterative refinement
    // -------------------------------------
    ///iterative refinement maximum rounds
    #[builder(default = "8")]
    pub iterative_refinement_max_iter: u32,

    ///iterative refinement relative tolerance
    #[builder(default = "(1e-13).as_T()")]
    pub iterative_refinement_reltol: T,

    ///iterative refinement absolute tolerance
    #[builder(default = "(1e-12).as_T()")]
    pub iterative_refinement_abstol: T,

    ///iterative refinement stalling ratio
    #[builder(default = "(5.0).as_T()")]
    pub iterative_refinement_stop_ratio: T,

    // -------------------------------------
    // bundled QP solver
    // -------------------------------------
    ///iteration cap for one QP/LP subproblem solve
    #[builder(default = "200")]
    pub qp_max_iterations: u32,

    ///KKT tolerance for QP/LP subproblem solves
    #[builder(default = "(1e-9).as_T()")]
    pub qp_tolerance: T,
}

impl<T> Default for Settings<T>
where
    T: FloatT,
{
    fn default() -> Settings<T> {
        SettingsBuilder::<T>::default().build().unwrap()
    }
}

impl<T> Settings<T>
where
    T: FloatT,
{
    /// A classical strategy combination with all other fields at their
    /// defaults.
    pub fn preset(preset: Preset) -> Settings<T> {
        let mut settings = Settings::default();
        settings.apply_preset(preset);
        settings
    }

    /// Overwrite the strategy combination fields from a preset.
    pub fn apply_preset(&mut self, preset: Preset) {
        match preset {
            Preset::Ipopt => {
                self.mechanism = MechanismKind::LineSearch;
                self.strategy = StrategyKind::Filter;
                self.relaxation = RelaxationKind::FeasibilityRestoration;
                self.subproblem = SubproblemKind::Barrier;
            }
            Preset::Byrd => {
                self.mechanism = MechanismKind::TrustRegion;
                self.strategy = StrategyKind::Merit;
                self.relaxation = RelaxationKind::L1Relaxation;
                self.subproblem = SubproblemKind::Qp;
            }
            Preset::FilterSlp => {
                self.mechanism = MechanismKind::TrustRegion;
                self.strategy = StrategyKind::Filter;
                self.relaxation = RelaxationKind::FeasibilityRestoration;
                self.subproblem = SubproblemKind::Lp;
            }
        }
    }

    /// tolerance under which a step counts as "small" for termination
    pub fn small_step_threshold(&self) -> T {
        self.tolerance / (100.0).as_T()
    }
}

#[test]
fn test_settings_defaults_and_presets() {
    let settings = Settings::<f64>::default();
    assert_eq!(settings.mechanism, MechanismKind::TrustRegion);
    assert_eq!(settings.strategy, StrategyKind::Merit);
    assert_eq!(settings.tolerance, 1e-8);

    let ipopt = Settings::<f64>::preset(Preset::Ipopt);
    assert_eq!(ipopt.mechanism, MechanismKind::LineSearch);
    assert_eq!(ipopt.subproblem, SubproblemKind::Barrier);

    let builder = SettingsBuilder::<f64>::default()
        .max_iterations(7u32)
        .verbose(true)
        .build()
        .unwrap();
    assert_eq!(builder.max_iterations, 7);
    assert!(builder.verbose);
}
