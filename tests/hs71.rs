use steinbock::model::{hs71, Model};
use steinbock::solver::*;

// Hock-Schittkowski 71, the classical interior-point test problem

#[test]
fn test_hs71_barrier_line_search() {
    let model = hs71::<f64>();
    let mut settings = Settings::preset(Preset::Ipopt);
    settings.max_iterations = 2000;

    let mut solver = Steinbock::new(settings);
    let result = solver.solve(&model).unwrap();

    assert!(matches!(
        result.status,
        TerminationStatus::FeasibleKKT | TerminationStatus::FeasibleSmallStep
    ));
    assert!((result.objective - 17.0140173).abs() <= 1e-5);

    // bound feasibility of the accepted iterate is exact
    for &xi in &result.primals {
        assert!((1.0..=5.0).contains(&xi));
    }
    // known solution x* ≈ (1, 4.743, 3.821, 1.379)
    assert!((result.primals[0] - 1.0).abs() <= 1e-4);
    assert!((result.primals[1] - 4.7429994).abs() <= 1e-3);
    assert!((result.primals[2] - 3.8211503).abs() <= 1e-3);
    assert!((result.primals[3] - 1.3794082).abs() <= 1e-3);

    // both constraints are satisfied at the solution
    let mut c = [0.0; 2];
    model.evaluate_constraints(&result.primals, &mut c).unwrap();
    assert!(c[0] >= 25.0 - 1e-6);
    assert!((c[1] - 40.0).abs() <= 1e-6);

    // strict interiority of the bound duals at a lower-bound-active
    // coordinate
    assert!(result.multipliers.lower_bounds[0] > 0.0);
}
