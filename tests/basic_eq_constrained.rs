use steinbock::model::equality_quadratic;
use steinbock::solver::*;

// min ½(x₁² + x₂²) s.t. x₁ + x₂ = 1: the first SQP step is the exact
// solution x* = (0.5, 0.5) with λ* = −0.5

#[test]
fn test_equality_constrained_quadratic() {
    let model = equality_quadratic::<f64>();
    let settings = SettingsBuilder::default()
        .mechanism(MechanismKind::LineSearch)
        .strategy(StrategyKind::Merit)
        .subproblem(SubproblemKind::Qp)
        .hessian_model(HessianKind::Exact)
        .build()
        .unwrap();

    let mut solver = Steinbock::new(settings);
    let result = solver.solve(&model).unwrap();

    assert_eq!(result.status, TerminationStatus::FeasibleKKT);
    assert!((result.primals[0] - 0.5).abs() <= 1e-10);
    assert!((result.primals[1] - 0.5).abs() <= 1e-10);
    assert!((result.multipliers.constraints[0] + 0.5).abs() <= 1e-9);
    assert_eq!(result.statistics.outer_iterations, 1);
    assert!(result.residuals.optimality_stationarity < 1e-12);
    assert!(result.residuals.infeasibility <= 1e-10);
}

#[test]
fn test_equality_constrained_multiplier_signs() {
    // multiplier sign convention: stationarity σ∇f + Jᵀλ − z_L + z_U = 0
    let model = equality_quadratic::<f64>();
    let settings = SettingsBuilder::default()
        .mechanism(MechanismKind::TrustRegion)
        .subproblem(SubproblemKind::Qp)
        .hessian_model(HessianKind::Exact)
        .build()
        .unwrap();

    let mut solver = Steinbock::new(settings);
    let result = solver.solve(&model).unwrap();
    assert_eq!(result.status, TerminationStatus::FeasibleKKT);

    let λ = result.multipliers.constraints[0];
    for i in 0..2 {
        let gradient = result.primals[i];
        assert!((gradient + λ).abs() <= 1e-8);
    }
}
