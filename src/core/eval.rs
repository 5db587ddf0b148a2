//! Evaluation callbacks injected by the outer optimization loop.

use nalgebra::{
    storage::{Storage, StorageMut},
    DMatrix, DVector, Dyn, IsContiguous, Matrix, Vector,
};

use super::{base::RealField, domain::Domain, error::EvalError};

/// The base trait for [`Objective`] and [`Constraint`].
pub trait Problem {
    /// Type of the scalar, usually f32 or f64.
    type Field: RealField + Copy;

    /// Gets the domain (bound constraints) of the problem.
    fn domain(&self) -> Domain<Self::Field>;
}

/// Definition of an objective function.
///
/// The callback evaluates the function value, the gradient and the Hessian
/// matrix in one pass, writing the derivatives into caller-owned storage.
pub trait Objective: Problem {
    /// Evaluates the objective in given point, filling the gradient `g` and
    /// the Hessian matrix `h` and returning the function value.
    fn eval<Sx, Sg, Sh>(
        &self,
        x: &Vector<Self::Field, Dyn, Sx>,
        g: &mut Vector<Self::Field, Dyn, Sg>,
        h: &mut Matrix<Self::Field, Dyn, Dyn, Sh>,
    ) -> Result<Self::Field, EvalError>
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
        Sg: StorageMut<Self::Field, Dyn>,
        Sh: StorageMut<Self::Field, Dyn, Dyn>;
}

/// Definition of a nonlinear equality constraint function `h(x) = 0`.
pub trait Constraint: Problem {
    /// Gets the number of constraint equations.
    fn dim(&self) -> usize;

    /// Evaluates the constraint in given point, filling the residuals `hx`
    /// and the Jacobian matrix `j`.
    fn eval<Sx, Sh, Sj>(
        &self,
        x: &Vector<Self::Field, Dyn, Sx>,
        hx: &mut Vector<Self::Field, Dyn, Sh>,
        j: &mut Matrix<Self::Field, Dyn, Dyn, Sj>,
    ) -> Result<(), EvalError>
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
        Sh: StorageMut<Self::Field, Dyn>,
        Sj: StorageMut<Self::Field, Dyn, Dyn>;
}

/// Workspace owning the outputs of the evaluation callbacks.
///
/// The buffers are allocated once and reused across iterations, so an outer
/// loop can drive the callbacks without allocating per call.
#[derive(Debug, Clone)]
pub struct Evaluation<T: RealField + Copy> {
    f: T,
    g: DVector<T>,
    h: DMatrix<T>,
    hx: DVector<T>,
    j: DMatrix<T>,
}

impl<T: RealField + Copy> Evaluation<T> {
    /// Initializes the workspace with zeros for `n` variables and `mj`
    /// nonlinear constraint equations.
    pub fn zeros(n: usize, mj: usize) -> Self {
        Self {
            f: T::zero(),
            g: DVector::zeros(n),
            h: DMatrix::zeros(n, n),
            hx: DVector::zeros(mj),
            j: DMatrix::zeros(mj, n),
        }
    }

    /// Runs both callbacks in given point, filling the owned buffers.
    ///
    /// A failure reported by either callback is propagated and leaves the
    /// buffers in an unspecified state.
    pub fn evaluate<O, C, Sx>(
        &mut self,
        objective: &O,
        constraint: &C,
        x: &Vector<T, Dyn, Sx>,
    ) -> Result<(), EvalError>
    where
        O: Objective<Field = T>,
        C: Constraint<Field = T>,
        Sx: Storage<T, Dyn> + IsContiguous,
    {
        self.f = objective.eval(x, &mut self.g, &mut self.h)?;
        constraint.eval(x, &mut self.hx, &mut self.j)?;
        Ok(())
    }

    /// Gets the objective value.
    pub fn f(&self) -> T {
        self.f
    }

    /// Gets the objective gradient.
    pub fn g(&self) -> &DVector<T> {
        &self.g
    }

    /// Gets the objective Hessian.
    pub fn h(&self) -> &DMatrix<T> {
        &self.h
    }

    /// Gets the constraint residuals.
    pub fn hx(&self) -> &DVector<T> {
        &self.hx
    }

    /// Gets the constraint Jacobian.
    pub fn j(&self) -> &DMatrix<T> {
        &self.j
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::dvector;

    struct Quadratic;

    impl Problem for Quadratic {
        type Field = f64;

        fn domain(&self) -> Domain<Self::Field> {
            Domain::unconstrained(2)
        }
    }

    impl Objective for Quadratic {
        fn eval<Sx, Sg, Sh>(
            &self,
            x: &Vector<f64, Dyn, Sx>,
            g: &mut Vector<f64, Dyn, Sg>,
            h: &mut Matrix<f64, Dyn, Dyn, Sh>,
        ) -> Result<f64, EvalError>
        where
            Sx: Storage<f64, Dyn> + IsContiguous,
            Sg: StorageMut<f64, Dyn>,
            Sh: StorageMut<f64, Dyn, Dyn>,
        {
            g[0] = 2.0 * x[0];
            g[1] = 2.0 * x[1];
            h.fill(0.0);
            h[(0, 0)] = 2.0;
            h[(1, 1)] = 2.0;
            Ok(x[0] * x[0] + x[1] * x[1])
        }
    }

    impl Constraint for Quadratic {
        fn dim(&self) -> usize {
            1
        }

        fn eval<Sx, Sh, Sj>(
            &self,
            x: &Vector<f64, Dyn, Sx>,
            hx: &mut Vector<f64, Dyn, Sh>,
            j: &mut Matrix<f64, Dyn, Dyn, Sj>,
        ) -> Result<(), EvalError>
        where
            Sx: Storage<f64, Dyn> + IsContiguous,
            Sh: StorageMut<f64, Dyn>,
            Sj: StorageMut<f64, Dyn, Dyn>,
        {
            hx[0] = x[0] - x[1];
            j[(0, 0)] = 1.0;
            j[(0, 1)] = -1.0;
            Ok(())
        }
    }

    #[test]
    fn evaluation_workspace() {
        let p = Quadratic;
        let mut eval = Evaluation::zeros(2, 1);

        eval.evaluate(&p, &p, &dvector![1.0, 2.0]).unwrap();

        assert_abs_diff_eq!(eval.f(), 5.0);
        assert_abs_diff_eq!(eval.g(), &dvector![2.0, 4.0]);
        assert_abs_diff_eq!(eval.hx(), &dvector![-1.0]);
        assert_eq!(eval.j()[(0, 1)], -1.0);
    }
}
