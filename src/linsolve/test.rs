use super::*;
use crate::algebra::CooSymmetricMatrix;

// 5x5 symmetric indefinite example with known solution
fn indefinite_example() -> CooSymmetricMatrix<f64> {
    let mut m = CooSymmetricMatrix::new(5, 7, false);
    m.insert(0, 0, 2.0);
    m.insert(0, 1, 3.0);
    m.insert(1, 2, 4.0);
    m.insert(1, 4, 6.0);
    m.insert(2, 2, 1.0);
    m.insert(2, 3, 5.0);
    m.insert(4, 4, 1.0);
    m
}

fn natural_order_solver() -> LdlSolver<f64> {
    let settings = LdlSettingsBuilder::default()
        .perm((0..5).collect::<Vec<usize>>())
        .build()
        .unwrap();
    LdlSolver::new(settings)
}

#[test]
fn factor_and_solve_indefinite() {
    let m = indefinite_example();
    let mut solver = natural_order_solver();
    solver.do_symbolic_factorization(&m);
    solver.do_numerical_factorization(&m).unwrap();

    assert!(!solver.matrix_is_singular());
    assert_eq!(solver.rank(), 5);
    assert_eq!(
        solver.inertia(),
        Inertia {
            positive: 3,
            negative: 2,
            zero: 0
        }
    );

    let rhs = [8.0, 45.0, 31.0, 15.0, 17.0];
    let mut x = [0.0; 5];
    solver.solve(&rhs, &mut x);
    for (xi, expected) in x.iter().zip([1.0, 2.0, 3.0, 4.0, 5.0]) {
        assert!((xi - expected).abs() <= 1e-12);
    }
}

#[test]
fn refactorization_is_idempotent() {
    let m = indefinite_example();
    let mut solver = natural_order_solver();
    solver.do_symbolic_factorization(&m);
    // repeated symbolic calls at a fixed pattern are a no-op
    solver.do_symbolic_factorization(&m);

    solver.do_numerical_factorization(&m).unwrap();
    let first = solver.inertia();
    let rhs = [8.0, 45.0, 31.0, 15.0, 17.0];
    let mut x1 = [0.0; 5];
    solver.solve(&rhs, &mut x1);

    solver.do_numerical_factorization(&m).unwrap();
    assert_eq!(first, solver.inertia());
    let mut x2 = [0.0; 5];
    solver.solve(&rhs, &mut x2);
    assert_eq!(x1, x2);
}

#[test]
fn mutated_regularization_at_fixed_pattern() {
    // matrix with reserved diagonal slots: refactorization after a
    // regularization change reuses the symbolic analysis
    let mut m = CooSymmetricMatrix::new(2, 2, true);
    m.insert(0, 0, 1.0);
    m.insert(0, 1, 2.0);

    let settings = LdlSettingsBuilder::default()
        .perm(vec![0, 1])
        .build()
        .unwrap();
    let mut solver = LdlSolver::new(settings);
    solver.do_symbolic_factorization(&m);
    solver.do_numerical_factorization(&m).unwrap();
    // [1 2; 2 0] has one eigenvalue of each sign
    assert_eq!(solver.number_negative_eigenvalues(), 1);

    m.set_regularization(|_| 5.0);
    solver.do_numerical_factorization(&m).unwrap();
    // [6 2; 2 5] is positive definite
    assert_eq!(solver.number_negative_eigenvalues(), 0);
    assert_eq!(solver.rank(), 2);
}

#[test]
fn singular_matrix_is_reported_not_patched() {
    let mut m = CooSymmetricMatrix::new(2, 3, false);
    m.insert(0, 0, 1.0);
    m.insert(0, 1, 1.0);
    m.insert(1, 1, 1.0);

    let settings = LdlSettingsBuilder::default()
        .perm(vec![0, 1])
        .build()
        .unwrap();
    let mut solver = LdlSolver::new(settings);
    solver.do_symbolic_factorization(&m);
    solver.do_numerical_factorization(&m).unwrap();

    assert!(solver.matrix_is_singular());
    assert_eq!(solver.rank(), 1);
    assert_eq!(solver.inertia().zero, 1);
}

#[test]
fn duplicate_entries_accumulate() {
    // the diagonal is split across two entries
    let mut m = CooSymmetricMatrix::new(1, 2, false);
    m.insert(0, 0, 1.5);
    m.insert(0, 0, 2.5);

    let mut solver = LdlSolver::default();
    solver.do_symbolic_factorization(&m);
    solver.do_numerical_factorization(&m).unwrap();

    let mut x: [f64; 1] = [0.0];
    solver.solve(&[8.0_f64], &mut x);
    assert!((x[0] - 2.0).abs() <= 1e-15);
}

#[test]
fn numerical_before_symbolic_is_an_error() {
    let m = indefinite_example();
    let mut solver = LdlSolver::default();
    assert!(matches!(
        solver.do_numerical_factorization(&m),
        Err(FactorizationError::SymbolicFactorizationMissing)
    ));
}
