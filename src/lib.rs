//Rust hates greek characters
#![allow(confusable_idents)]
#![allow(uncommon_codepoints)]

//! <p align="center">
//! <b>Steinbock</b>: a solver for smooth nonlinear programs.
//! </p>
//!
//! Steinbock solves problems of the form
//!
//! ```text
//! minimize        f(x)
//! subject to      cₗ ≤ c(x) ≤ cᵤ
//!                 xₗ ≤  x   ≤ xᵤ
//! ```
//!
//! with twice continuously differentiable `f` and `c`, by combining a
//! globalization mechanism (trust region or backtracking line search), a
//! constraint relaxation strategy (feasibility restoration or ℓ1
//! relaxation), a subproblem engine (SQP, SLP or primal-dual interior
//! point) and an acceptance test (ℓ1 merit function or filter).
//!
//! Problems are described by implementing the [`Model`](crate::model::Model)
//! trait; the solver is driven through [`Steinbock`](crate::solver::Steinbock).

pub mod algebra;
pub mod linsolve;
pub mod model;
pub mod solver;
pub mod timers;

pub(crate) mod utils;
