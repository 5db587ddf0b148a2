//! Options for the linear-system solvers.

use getset::{CopyGetters, Setters};
use nalgebra::convert;

use super::base::RealField;

/// Method used to solve the saddle-point systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SaddlePointMethod {
    /// Factors the assembled system with partial-pivoting LU.
    ///
    /// Takes no advantage of the block structure. Accurate enough in
    /// general and usually the fastest choice for small problems.
    PartialPivLU,
    /// Factors the assembled system with full-pivoting LU.
    ///
    /// More accurate and more expensive than partial pivoting. Useful for
    /// ill-conditioned problems of small dimension.
    FullPivLU,
    /// Eliminates the primal block through a null-space basis of the
    /// constraint matrix, reducing the system dimension from `n + m` to
    /// `n - m`.
    ///
    /// Suitable for dense Hessians when the number of constraints is
    /// relatively large.
    Nullspace,
    /// Eliminates the multiplier block through the inverse of the Hessian,
    /// reducing the system dimension from `n + m` to `m`.
    ///
    /// The Hessian matrix **must be diagonal**. A non-diagonal Hessian
    /// falls back to [`SaddlePointMethod::PartialPivLU`].
    RangespaceDiagonal,
}

/// Options for [`SaddlePointSolver`](crate::saddle::SaddlePointSolver).
#[derive(Debug, Clone, Copy, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct SaddlePointOptions<T: RealField + Copy> {
    /// The method used for the decomposition. Default:
    /// [`SaddlePointMethod::PartialPivLU`].
    method: SaddlePointMethod,
    /// Replace the entries of the canonical form by their nearest rational
    /// numbers after each canonicalization. Useful when the constraint
    /// matrix has rational entries and round-off from repeated
    /// canonicalization accumulates. Default: `false`.
    rationalize: bool,
    /// The largest denominator considered by the rational cleanup.
    /// Default: `1_000_000`.
    max_denominator: u64,
    /// Tolerance of the linear-independence test for the rows of the
    /// constraint matrix. Default: `1e-10`.
    tolerance_linear: T,
    /// Smallest acceptable pivot magnitude when exchanging basic and
    /// non-basic variables. Default: `1e-8`.
    tolerance_pivot: T,
    /// Relative pivot threshold below which a decomposition is reported as
    /// numerically singular. Default: `1e-14`.
    tolerance_decompose: T,
}

impl<T: RealField + Copy> Default for SaddlePointOptions<T> {
    fn default() -> Self {
        Self {
            method: SaddlePointMethod::PartialPivLU,
            rationalize: false,
            max_denominator: 1_000_000,
            tolerance_linear: convert(1e-10),
            tolerance_pivot: convert(1e-8),
            tolerance_decompose: convert(1e-14),
        }
    }
}

/// Options for [`Stepper`](crate::step::Stepper).
#[derive(Debug, Clone, Copy, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct StepperOptions<T: RealField + Copy> {
    /// The central-path parameter used to regularize degenerate bound
    /// slacks and in the centrality residuals. Default: `1e-8`.
    mu: T,
    /// Treat variables classified as unstable as fixed at their bound for
    /// the current step. Default: `true`.
    pin_unstable: bool,
    /// Options forwarded to the embedded saddle-point solver.
    saddle: SaddlePointOptions<T>,
}

impl<T: RealField + Copy> Default for StepperOptions<T> {
    fn default() -> Self {
        Self {
            mu: convert(1e-8),
            pin_unstable: true,
            saddle: SaddlePointOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = SaddlePointOptions::<f64>::default();
        assert_eq!(options.method(), SaddlePointMethod::PartialPivLU);
        assert!(!options.rationalize());

        let options = StepperOptions::<f64>::default();
        assert!(options.mu() > 0.0);
        assert!(options.pin_unstable());
    }

    #[test]
    fn setters() {
        let mut options = StepperOptions::<f64>::default();
        options.set_mu(1e-6);

        let mut saddle = options.saddle();
        saddle.set_method(SaddlePointMethod::Nullspace);
        options.set_saddle(saddle);

        assert_eq!(options.mu(), 1e-6);
        assert_eq!(options.saddle().method(), SaddlePointMethod::Nullspace);
    }
}
