use steinbock::model::{infeasible_linear, Model};
use steinbock::solver::*;

// min x s.t. x ≥ 2 and x ≤ 1: infeasible, best achievable total
// violation is 1

#[test]
fn test_infeasible_instance_terminates() {
    let model = infeasible_linear::<f64>();
    let mut settings = Settings::preset(Preset::Byrd);
    settings.max_iterations = 200;

    let mut solver = Steinbock::new(settings);
    let result = solver.solve(&model).unwrap();

    assert!(matches!(
        result.status,
        TerminationStatus::InfeasibleStationary | TerminationStatus::InfeasibleSmallStep
    ));

    // the iterate ends between the two contradictory constraints
    let x = result.primals[0];
    assert!((1.0 - 1e-3..=2.0 + 1e-3).contains(&x));

    // total ℓ1 violation is 1 wherever the iterate lands in [1, 2]
    let mut c = [0.0; 2];
    model.evaluate_constraints(&result.primals, &mut c).unwrap();
    let violation = (2.0 - c[0]).max(0.0) + (c[1] - 1.0).max(0.0);
    assert!((violation - 1.0).abs() <= 1e-3);
}
