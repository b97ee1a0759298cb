use steinbock::model::indefinite_box_qp;
use steinbock::solver::*;

// a bounded QP with Lagrangian Hessian diag(−1, 1): the convexified
// Hessian model must regularize before the subproblem is usable

#[test]
fn test_indefinite_hessian_is_regularized() {
    let model = indefinite_box_qp::<f64>();
    let settings = SettingsBuilder::default()
        .mechanism(MechanismKind::TrustRegion)
        .strategy(StrategyKind::Merit)
        .relaxation(RelaxationKind::FeasibilityRestoration)
        .subproblem(SubproblemKind::Qp)
        .hessian_model(HessianKind::Convexified)
        .build()
        .unwrap();

    let mut solver = Steinbock::new(settings);
    let result = solver.solve(&model).unwrap();

    // regularization was applied at least once, with δ_w above the
    // negative curvature
    assert!(result.statistics.max_primal_regularization > 0.0);

    // successful termination at the bound-active minimizer (1, 0)
    assert!(matches!(
        result.status,
        TerminationStatus::FeasibleKKT | TerminationStatus::FeasibleSmallStep
    ));
    assert!((result.primals[0] - 1.0).abs() <= 1e-6);
    assert!(result.primals[1].abs() <= 1e-6);
    assert!((result.objective + 0.6).abs() <= 1e-6);

    // the upper-bound multiplier carries the negative gradient
    assert!(result.multipliers.upper_bounds[0] > 1.0);
}
