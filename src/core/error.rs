use thiserror::Error;

/// Error returned from `decompose` and `solve` operations.
///
/// Together with the success case this forms a ternary outcome: success, a
/// recoverable numerical failure, or an invalid use of the API. Dimension
/// mismatches are caller bugs and panic instead.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SolveError {
    /// The decomposition encountered a pivot below the singularity
    /// tolerance. The caller may regularize the Hessian (add a small
    /// multiple of the identity) and retry.
    #[error("numerically singular system: pivot below the decomposition tolerance")]
    NumericalFailure,
    /// The operation was called in a state where it is not valid.
    #[error("invalid operation: {0}")]
    Invalid(&'static str),
}

/// Error reported by the evaluation callbacks.
///
/// The core propagates evaluation failures without retrying.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EvalError {
    /// The objective function could not be evaluated at the given point.
    #[error("objective function evaluation failed")]
    Objective,
    /// The constraint function could not be evaluated at the given point.
    #[error("constraint function evaluation failed")]
    Constraint,
}
