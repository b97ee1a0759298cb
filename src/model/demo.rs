//! Closure-backed models and a small library of classical test problems.
//!
//! A real application would implement [`Model`](crate::model::Model) on
//! top of a modeling front end; the demo library keeps the solver and its
//! command line driver exercisable without one.

use super::{EvaluationError, Model};
use crate::algebra::{AsFloatT, CscSymmetricMatrix, FloatT, SparseVector};

type ObjectiveFn<T> = Box<dyn Fn(&[T]) -> T>;
type GradientFn<T> = Box<dyn Fn(&[T], &mut SparseVector<T>)>;
type ConstraintsFn<T> = Box<dyn Fn(&[T], &mut [T])>;
type JacobianFn<T> = Box<dyn Fn(&[T], &mut [SparseVector<T>])>;
type HessianFn<T> = Box<dyn Fn(&[T], T, &[T], &mut CscSymmetricMatrix<T>)>;

/// A [`Model`](crate::model::Model) whose evaluators are closures.

pub struct DemoModel<T = f64> {
    name: &'static str,
    variable_bounds: Vec<(T, T)>,
    constraint_bounds: Vec<(T, T)>,
    initial_point: Vec<T>,
    hessian_nonzeros: usize,
    objective: ObjectiveFn<T>,
    gradient: GradientFn<T>,
    constraints: ConstraintsFn<T>,
    jacobian: JacobianFn<T>,
    hessian: HessianFn<T>,
}

impl<T> DemoModel<T>
where
    T: FloatT,
{
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Model<T> for DemoModel<T>
where
    T: FloatT,
{
    fn number_variables(&self) -> usize {
        self.variable_bounds.len()
    }

    fn number_constraints(&self) -> usize {
        self.constraint_bounds.len()
    }

    fn variable_lower_bound(&self, i: usize) -> T {
        self.variable_bounds[i].0
    }
    fn variable_upper_bound(&self, i: usize) -> T {
        self.variable_bounds[i].1
    }
    fn constraint_lower_bound(&self, j: usize) -> T {
        self.constraint_bounds[j].0
    }
    fn constraint_upper_bound(&self, j: usize) -> T {
        self.constraint_bounds[j].1
    }

    fn evaluate_objective(&self, x: &[T]) -> Result<T, EvaluationError> {
        let f = (self.objective)(x);
        if f.is_finite() {
            Ok(f)
        } else {
            Err(EvaluationError::NotFinite)
        }
    }

    fn evaluate_objective_gradient(
        &self,
        x: &[T],
        gradient: &mut SparseVector<T>,
    ) -> Result<(), EvaluationError> {
        gradient.clear();
        (self.gradient)(x, gradient);
        let mut ok = true;
        gradient.for_each(|_, v| ok &= v.is_finite());
        if ok {
            Ok(())
        } else {
            Err(EvaluationError::NotFinite)
        }
    }

    fn evaluate_constraints(&self, x: &[T], constraints: &mut [T]) -> Result<(), EvaluationError> {
        (self.constraints)(x, constraints);
        if constraints.iter().all(|c| c.is_finite()) {
            Ok(())
        } else {
            Err(EvaluationError::NotFinite)
        }
    }

    fn evaluate_constraint_jacobian(
        &self,
        x: &[T],
        jacobian: &mut [SparseVector<T>],
    ) -> Result<(), EvaluationError> {
        for row in jacobian.iter_mut() {
            row.clear();
        }
        (self.jacobian)(x, jacobian);
        let mut ok = true;
        for row in jacobian.iter() {
            row.for_each(|_, v| ok &= v.is_finite());
        }
        if ok {
            Ok(())
        } else {
            Err(EvaluationError::NotFinite)
        }
    }

    fn evaluate_lagrangian_hessian(
        &self,
        x: &[T],
        objective_multiplier: T,
        multipliers: &[T],
        hessian: &mut CscSymmetricMatrix<T>,
    ) -> Result<(), EvaluationError> {
        (self.hessian)(x, objective_multiplier, multipliers, hessian);
        Ok(())
    }

    fn number_hessian_nonzeros(&self) -> usize {
        self.hessian_nonzeros
    }

    fn initial_primal_point(&self, x: &mut [T]) {
        x.copy_from_slice(&self.initial_point);
    }
}

fn free<T: FloatT>() -> (T, T) {
    (T::neg_infinity(), T::infinity())
}

/// Unconstrained convex quadratic `min ½xᵀAx − bᵀx` with `A = diag(1,2,3)`
/// and `b = (1,2,3)`.   Solution `x* = (1,1,1)` with objective `−3`.
pub fn convex_quadratic<T: FloatT>() -> DemoModel<T> {
    DemoModel {
        name: "convex-quadratic",
        variable_bounds: vec![free(); 3],
        constraint_bounds: vec![],
        initial_point: vec![T::zero(); 3],
        hessian_nonzeros: 3,
        objective: Box::new(|x: &[T]| {
            let half: T = (0.5).as_T();
            let mut f = T::zero();
            for i in 0..3 {
                let a: T = (i + 1).as_T();
                f += half * a * x[i] * x[i] - a * x[i];
            }
            f
        }),
        gradient: Box::new(|x: &[T], g: &mut SparseVector<T>| {
            for i in 0..3 {
                let a: T = (i + 1).as_T();
                g.insert(i, a * x[i] - a);
            }
        }),
        constraints: Box::new(|_, _| {}),
        jacobian: Box::new(|_, _| {}),
        hessian: Box::new(|_x, σ, _λ, h: &mut CscSymmetricMatrix<T>| {
            for i in 0..3 {
                let a: T = (i + 1).as_T();
                h.insert(i, i, σ * a);
                h.finalize_column(i);
            }
        }),
    }
}

/// Equality constrained quadratic `min ½(x₁² + x₂²)` s.t. `x₁ + x₂ = 1`.
/// Solution `x* = (0.5, 0.5)` with `λ* = −0.5`.
pub fn equality_quadratic<T: FloatT>() -> DemoModel<T> {
    DemoModel {
        name: "equality-quadratic",
        variable_bounds: vec![free(); 2],
        constraint_bounds: vec![(T::one(), T::one())],
        initial_point: vec![T::zero(); 2],
        hessian_nonzeros: 2,
        objective: Box::new(|x: &[T]| {
            <f64 as AsFloatT<T>>::as_T(&0.5) * (x[0] * x[0] + x[1] * x[1])
        }),
        gradient: Box::new(|x: &[T], g: &mut SparseVector<T>| {
            g.insert(0, x[0]);
            g.insert(1, x[1]);
        }),
        constraints: Box::new(|x: &[T], c: &mut [T]| {
            c[0] = x[0] + x[1];
        }),
        jacobian: Box::new(|_x, rows: &mut [SparseVector<T>]| {
            rows[0].insert(0, T::one());
            rows[0].insert(1, T::one());
        }),
        hessian: Box::new(|_x, σ, _λ, h: &mut CscSymmetricMatrix<T>| {
            h.insert(0, 0, σ);
            h.finalize_column(0);
            h.insert(1, 1, σ);
            h.finalize_column(1);
        }),
    }
}

/// Hock–Schittkowski problem 71.
///
/// `min x₁x₄(x₁+x₂+x₃) + x₃` s.t. `x₁x₂x₃x₄ ≥ 25`,
/// `x₁²+x₂²+x₃²+x₄² = 40`, `1 ≤ xᵢ ≤ 5`, starting from `(1,5,5,1)`.
/// Optimal objective ≈ 17.0140173.
pub fn hs71<T: FloatT>() -> DemoModel<T> {
    DemoModel {
        name: "hs71",
        variable_bounds: vec![(T::one(), (5.0).as_T()); 4],
        constraint_bounds: vec![
            ((25.0).as_T(), T::infinity()),
            ((40.0).as_T(), (40.0).as_T()),
        ],
        initial_point: vec![T::one(), (5.0).as_T(), (5.0).as_T(), T::one()],
        hessian_nonzeros: 10,
        objective: Box::new(|x: &[T]| x[0] * x[3] * (x[0] + x[1] + x[2]) + x[2]),
        gradient: Box::new(|x: &[T], g: &mut SparseVector<T>| {
            let s = x[0] + x[1] + x[2];
            g.insert(0, x[3] * s + x[0] * x[3]);
            g.insert(1, x[0] * x[3]);
            g.insert(2, x[0] * x[3] + T::one());
            g.insert(3, x[0] * s);
        }),
        constraints: Box::new(|x: &[T], c: &mut [T]| {
            c[0] = x[0] * x[1] * x[2] * x[3];
            c[1] = x[0] * x[0] + x[1] * x[1] + x[2] * x[2] + x[3] * x[3];
        }),
        jacobian: Box::new(|x: &[T], rows: &mut [SparseVector<T>]| {
            rows[0].insert(0, x[1] * x[2] * x[3]);
            rows[0].insert(1, x[0] * x[2] * x[3]);
            rows[0].insert(2, x[0] * x[1] * x[3]);
            rows[0].insert(3, x[0] * x[1] * x[2]);
            let two: T = (2.0).as_T();
            for i in 0..4 {
                rows[1].insert(i, two * x[i]);
            }
        }),
        hessian: Box::new(|x: &[T], σ, λ: &[T], h: &mut CscSymmetricMatrix<T>| {
            let two: T = (2.0).as_T();
            let (λ1, λ2) = (λ[0], λ[1]);
            h.insert(0, 0, σ * two * x[3] + λ2 * two);
            h.finalize_column(0);
            h.insert(0, 1, σ * x[3] + λ1 * x[2] * x[3]);
            h.insert(1, 1, λ2 * two);
            h.finalize_column(1);
            h.insert(0, 2, σ * x[3] + λ1 * x[1] * x[3]);
            h.insert(1, 2, λ1 * x[0] * x[3]);
            h.insert(2, 2, λ2 * two);
            h.finalize_column(2);
            h.insert(0, 3, σ * (two * x[0] + x[1] + x[2]) + λ1 * x[1] * x[2]);
            h.insert(1, 3, σ * x[0] + λ1 * x[0] * x[2]);
            h.insert(2, 3, σ * x[0] + λ1 * x[0] * x[1]);
            h.insert(3, 3, λ2 * two);
            h.finalize_column(3);
        }),
    }
}

/// Infeasible linear program `min x` s.t. `x ≥ 2` and `x ≤ 1`, posed as
/// two general constraints.   Best achievable constraint violation is 1.
pub fn infeasible_linear<T: FloatT>() -> DemoModel<T> {
    DemoModel {
        name: "infeasible-linear",
        variable_bounds: vec![free()],
        constraint_bounds: vec![
            ((2.0).as_T(), T::infinity()),
            (T::neg_infinity(), T::one()),
        ],
        initial_point: vec![T::zero()],
        hessian_nonzeros: 0,
        objective: Box::new(|x: &[T]| x[0]),
        gradient: Box::new(|_x, g: &mut SparseVector<T>| {
            g.insert(0, T::one());
        }),
        constraints: Box::new(|x: &[T], c: &mut [T]| {
            c[0] = x[0];
            c[1] = x[0];
        }),
        jacobian: Box::new(|_x, rows: &mut [SparseVector<T>]| {
            rows[0].insert(0, T::one());
            rows[1].insert(0, T::one());
        }),
        hessian: Box::new(|_x, _σ, _λ, h: &mut CscSymmetricMatrix<T>| {
            h.finalize_column(0);
        }),
    }
}

/// Bound constrained nonconvex quadratic whose Lagrangian Hessian is
/// `diag(−1, 1)`, exercising the inertia correction.
pub fn indefinite_box_qp<T: FloatT>() -> DemoModel<T> {
    DemoModel {
        name: "indefinite-box-qp",
        variable_bounds: vec![(-T::one(), T::one()); 2],
        constraint_bounds: vec![],
        initial_point: vec![T::zero(), (0.5).as_T()],
        hessian_nonzeros: 2,
        objective: Box::new(|x: &[T]| {
            let half: T = (0.5).as_T();
            let tenth: T = (0.1).as_T();
            -half * x[0] * x[0] + half * x[1] * x[1] - tenth * x[0]
        }),
        gradient: Box::new(|x: &[T], g: &mut SparseVector<T>| {
            let tenth: T = (0.1).as_T();
            g.insert(0, -x[0] - tenth);
            g.insert(1, x[1]);
        }),
        constraints: Box::new(|_, _| {}),
        jacobian: Box::new(|_, _| {}),
        hessian: Box::new(|_x, σ, _λ, h: &mut CscSymmetricMatrix<T>| {
            h.insert(0, 0, -σ);
            h.finalize_column(0);
            h.insert(1, 1, σ);
            h.finalize_column(1);
        }),
    }
}

/// Look up a demo problem by name, as used by the command line driver.
pub fn demo_problem(name: &str) -> Option<DemoModel<f64>> {
    match name {
        "convex-quadratic" => Some(convex_quadratic()),
        "equality-quadratic" => Some(equality_quadratic()),
        "hs71" => Some(hs71()),
        "infeasible-linear" => Some(infeasible_linear()),
        "indefinite-box-qp" => Some(indefinite_box_qp()),
        _ => None,
    }
}

/// Names of the bundled demo problems.
pub const DEMO_PROBLEM_NAMES: &[&str] = &[
    "convex-quadratic",
    "equality-quadratic",
    "hs71",
    "infeasible-linear",
    "indefinite-box-qp",
];
