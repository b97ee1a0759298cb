use steinbock::model::convex_quadratic;
use steinbock::solver::*;

// min ½xᵀAx − bᵀx with A = diag(1,2,3), b = (1,2,3): one exact-Hessian
// SQP step lands on x* = (1,1,1)

#[test]
fn test_unconstrained_quadratic() {
    let model = convex_quadratic::<f64>();
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
    for &xi in &result.primals {
        assert!((xi - 1.0).abs() <= 1e-9);
    }
    assert!((result.objective + 3.0).abs() <= 1e-9);
    assert!(result.residuals.kkt <= 1e-10);
    assert_eq!(result.statistics.outer_iterations, 1);
}

#[test]
fn test_unconstrained_quadratic_trust_region() {
    // the same problem under the trust-region mechanism; the region is
    // wide enough not to cut the Newton step
    let model = convex_quadratic::<f64>();
    let settings = SettingsBuilder::default()
        .mechanism(MechanismKind::TrustRegion)
        .subproblem(SubproblemKind::Qp)
        .hessian_model(HessianKind::Exact)
        .build()
        .unwrap();

    let mut solver = Steinbock::new(settings);
    let result = solver.solve(&model).unwrap();

    assert_eq!(result.status, TerminationStatus::FeasibleKKT);
    for &xi in &result.primals {
        assert!((xi - 1.0).abs() <= 1e-6);
    }
    assert!((result.objective + 3.0).abs() <= 1e-8);
}
