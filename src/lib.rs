#![allow(clippy::many_single_char_names)]
#![allow(clippy::type_complexity)]
#![warn(missing_docs)]

//! # Sella
//!
//! Dense KKT and saddle-point linear-system machinery for interior-point
//! methods in constrained nonlinear optimization, written entirely in Rust
//! on top of [`nalgebra`].
//!
//! The crate implements the computational core that every interior-point
//! iteration invokes when minimizing
//!
//! ```text
//! f(x)   subject to   A·x = b,  h(x) = 0,  xlower ≤ x ≤ xupper,
//! ```
//!
//! with support for variables fixed at a value. The outer iteration logic
//! (globalization, line search, convergence control) is intentionally left
//! to the caller; this crate supplies the pieces such a loop needs:
//!
//! * [`Canonicalizer`](canonical::Canonicalizer) — maintains the canonical
//!   form `R·W·Q = [I S]` of the constraint matrix `W = [A; J]`, with
//!   priority-weighted basis selection, cheap basis exchanges and optional
//!   rational cleanup. Linearly dependent constraint rows are detected and
//!   dropped, not treated as errors.
//! * [`SaddlePointSolver`](saddle::SaddlePointSolver) — decomposes and
//!   solves the plain saddle-point system `[H Wᵀ; W G]·[x; y] = [a; b]`
//!   with one of four methods ([`SaddlePointMethod`]) that exploit the
//!   block structure differently.
//! * [`Stepper`](step::Stepper) — assembles the expanded primal-dual KKT
//!   system with bound-slack blocks, folds those blocks into an effective
//!   saddle-point problem and dispatches to the saddle-point solver.
//! * [`Stability`](stability::Stability) — classifies variables sitting on
//!   their bounds as stable or unstable from the sign of the reduced
//!   gradient; unstable variables are pinned for the current step.
//!
//! All solvers are value types owning their buffers: inputs are read-only
//! views, outputs are mutable views of caller storage, and no views are
//! retained across calls. Everything is single-threaded and synchronous;
//! cloning a solver yields an independent deep copy.
//!
//! ## Solving a saddle-point system
//!
//! ```rust
//! use approx::assert_abs_diff_eq;
//! use sella::nalgebra as na;
//! use na::{dmatrix, dvector, DVector};
//! use sella::{SaddlePointMatrix, SaddlePointSolver};
//!
//! let h = dmatrix![1.0, 0.0; 0.0, 1.0];
//! let w = dmatrix![1.0, 1.0];
//!
//! let mut solver = SaddlePointSolver::new(2, 1);
//! solver
//!     .decompose(SaddlePointMatrix::new(&h, &w, None, &[]))
//!     .unwrap();
//!
//! let a = dvector![0.0, 0.0];
//! let b = dvector![1.0];
//! let mut x = DVector::zeros(2);
//! let mut y = DVector::zeros(1);
//! solver.solve(&a, &b, &mut x, &mut y).unwrap();
//!
//! assert_abs_diff_eq!(x, dvector![0.5, 0.5], epsilon = 1e-12);
//! ```
//!
//! ## Computing an interior-point step
//!
//! ```rust
//! use sella::nalgebra as na;
//! use na::{dmatrix, dvector, DMatrix, DVector};
//! use sella::{Domain, StepProblem, Stepper};
//!
//! // minimize ||x||² subject to x₀ + x₁ + x₂ = 1.
//! let a = dmatrix![1.0, 1.0, 1.0];
//! let mut stepper = Stepper::new(&a, Domain::unconstrained(3), 0);
//!
//! let x = DVector::zeros(3);
//! let y = DVector::zeros(1);
//! let z = DVector::zeros(3);
//! let w = DVector::zeros(3);
//! let g = DVector::zeros(3);
//! let h = DMatrix::identity(3, 3);
//! let j = DMatrix::zeros(0, 3);
//! let hres = DVector::zeros(0);
//! let b = dvector![1.0];
//!
//! let problem = StepProblem::new(&x, &y, &z, &w, &g, &h, &j, &hres, &b);
//! stepper.decompose(&problem).unwrap();
//! stepper.solve(&problem).unwrap();
//!
//! // One Newton step reaches the optimum (1/3, 1/3, 1/3).
//! let step = stepper.step();
//! assert!((step.dx[0] - 1.0 / 3.0).abs() <= 1e-12);
//! ```
//!
//! ## Error handling
//!
//! `decompose` and `solve` return a ternary outcome: success, a
//! recoverable [`SolveError::NumericalFailure`] (a pivot fell below the
//! singularity tolerance; regularize and retry), or
//! [`SolveError::Invalid`] for misuse such as solving before decomposing.
//! Dimension mismatches are programming errors and panic. The crate logs
//! through the [`log`] facade and never configures logging itself.
//!
//! ## License
//!
//! Licensed under MIT.

pub mod canonical;
mod core;
pub mod saddle;
pub mod stability;
pub mod step;

pub use canonical::Canonicalizer;
pub use core::*;
pub use saddle::SaddlePointSolver;
pub use stability::{Stability, StabilityStatus};
pub use step::{Step, StepProblem, Stepper};

#[cfg(feature = "testing")]
pub mod testing;

#[cfg(not(feature = "testing"))]
pub(crate) mod testing;

pub use nalgebra;
