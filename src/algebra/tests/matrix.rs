#![allow(non_snake_case)]

use crate::algebra::*;

fn fill_example(m: &mut CooSymmetricMatrix<f64>) {
    m.insert(0, 0, 4.0);
    m.insert(0, 1, 1.0);
    m.insert(1, 1, 2.0);
}

fn collect(m: &impl SymmetricEntries<f64>) -> Vec<(usize, usize, f64)> {
    let mut out = Vec::new();
    m.for_each_entry(&mut |r, c, v| out.push((r, c, v)));
    out
}

#[test]
fn coo_reset_roundtrip() {
    let mut m = CooSymmetricMatrix::<f64>::new(2, 3, true);
    fill_example(&mut m);
    let before = collect(&m);

    // reset followed by identical re-inserts is indistinguishable
    // from a fresh matrix
    m.reset();
    fill_example(&mut m);
    assert_eq!(before, collect(&m));

    let mut fresh = CooSymmetricMatrix::<f64>::new(2, 3, true);
    fill_example(&mut fresh);
    assert_eq!(before, collect(&fresh));
}

#[test]
fn coo_regularization_slots_precede_entries() {
    let mut m = CooSymmetricMatrix::<f64>::new(2, 3, true);
    fill_example(&mut m);
    m.set_regularization(|i| 0.5 + i as f64);

    let entries = collect(&m);
    // the two reserved slots come first, user entries are untouched
    assert_eq!(entries[0], (0, 0, 0.5));
    assert_eq!(entries[1], (1, 1, 1.5));
    assert_eq!(&entries[2..], &[(0, 0, 4.0), (0, 1, 1.0), (1, 1, 2.0)]);
}

#[test]
fn coo_smallest_diagonal_sums_duplicates() {
    let mut m = CooSymmetricMatrix::<f64>::new(3, 4, true);
    m.insert(0, 0, 3.0);
    m.insert(1, 1, -1.0);
    m.insert(2, 2, 2.0);
    m.set_regularization(|_| 0.25);
    // diagonal sums are (3.25, -0.75, 2.25)
    assert_eq!(m.smallest_diagonal_entry(3), -0.75);
    // restricting to the first row ignores the negative entry
    assert_eq!(m.smallest_diagonal_entry(1), 3.25);
}

#[test]
#[should_panic]
fn coo_capacity_overflow_is_fatal() {
    let mut m = CooSymmetricMatrix::<f64>::new(2, 1, false);
    m.insert(0, 0, 1.0);
    m.insert(1, 1, 1.0);
}

#[test]
fn csc_column_building() {
    let mut m = CscSymmetricMatrix::<f64>::new(3, 4, false);
    m.insert(0, 0, 1.0);
    m.finalize_column(0);
    // column 1 left empty, implicitly finalized
    m.insert(0, 2, 5.0);
    m.insert(2, 2, 6.0);
    m.finalize_column(2);

    let entries = collect(&m);
    assert_eq!(entries, vec![(0, 0, 1.0), (0, 2, 5.0), (2, 2, 6.0)]);
}

#[test]
fn csc_regularization_slots_lead_each_column() {
    let mut m = CscSymmetricMatrix::<f64>::new(2, 2, true);
    m.insert(0, 0, 2.0);
    m.finalize_column(0);
    m.insert(0, 1, -1.0);
    m.finalize_column(1);
    m.set_regularization(|i| 10.0 * (i + 1) as f64);

    let entries = collect(&m);
    assert_eq!(
        entries,
        vec![(0, 0, 10.0), (0, 0, 2.0), (1, 1, 20.0), (0, 1, -1.0)]
    );
    assert_eq!(m.smallest_diagonal_entry(2), 12.0);
}

#[test]
fn csc_matrix_triu_check() {
    let A = CscMatrix::<f64>::new(
        2,
        2,
        vec![0, 1, 3],
        vec![0, 0, 1],
        vec![1.0, 2.0, 3.0],
    );
    assert!(A.is_square());
    assert!(A.is_triu());
    assert_eq!(A.nnz(), 3);
}
