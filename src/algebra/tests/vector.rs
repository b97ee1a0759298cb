use crate::algebra::*;

#[test]
fn test_norms_and_dot() {
    let x = vec![1.0, -4.0, 2.0];
    let y = vec![2.0, 1.0, -1.0];
    assert_eq!(x.norm_inf(), 4.0);
    assert_eq!(x.norm_one(), 7.0);
    assert_eq!(x.dot(&y), -4.0);
    assert_eq!(x.sum(), -1.0);
    assert_eq!(x.norm_inf_diff(&y), 5.0);
}

#[test]
fn test_axpby_and_scalarops() {
    let x = vec![1.0, 2.0];
    let mut y = vec![10.0, 20.0];
    // y = 2x + 0.5y
    y.axpby(2.0, &x, 0.5);
    assert_eq!(y, vec![7.0, 14.0]);

    y.negate();
    assert_eq!(y, vec![-7.0, -14.0]);
    y.set(3.0);
    y.scale(2.0);
    assert_eq!(y, vec![6.0, 6.0]);
}

#[test]
fn test_clip() {
    assert_eq!((5.0).clip(0.0, 1.0), 1.0);
    assert_eq!((-5.0).clip(0.0, 1.0), 0.0);
    assert_eq!((0.5).clip(0.0, 1.0), 0.5);
}
