//! Interior-point step computation.
//!
//! Per outer iteration, the stepper approximates the Newton step of the
//! primal-dual KKT system
//!
//! ```text
//! [ H   Aᵀ  Jᵀ  -I  -I ] [Δx]    [ g + Aᵀy_A + Jᵀy_J - z - w ]
//! [ A   0   0   0   0  ] [Δy_A]  [ A·x - b                   ]
//! [ J   0   0   0   0  ] [Δy_J] = - [ h                      ]
//! [ Z   0   0   L   0  ] [Δz]    [ L∘Z - μ·1                 ]
//! [ W   0   0   0   U  ] [Δw]    [ U∘W - μ·1                 ]
//! ```
//!
//! where `Z`, `W` are the bound multipliers and `L = x - xlower`,
//! `U = x - xupper` the bound slacks. The last two block rows are diagonal
//! and are eliminated first, which folds the bound terms into an effective
//! Hessian `H' = H + diag(Z/L) + diag(W/U)` and an effective gradient.
//! The remaining plain saddle-point system is dispatched to
//! [`SaddlePointSolver`]; `Δz` and `Δw` are recovered afterwards by
//! back-substitution.
//!
//! Degenerate slacks are regularized with the central-path parameter `μ`:
//! a violated or active lower slack becomes `μ`, an upper one `-μ`.
//! Variables without a bound or with fixed value get a neutral slack of
//! one and a zero multiplier, so their bound rows carry no information.

use log::debug;
use nalgebra::{
    storage::Storage, DMatrix, DMatrixView, DVector, DVectorView, Dyn, Matrix,
};

use crate::core::{
    masked, Domain, RealField, SaddlePointMatrix, SolveError, StepperOptions,
};
use crate::saddle::SaddlePointSolver;
use crate::stability::Stability;

/// Data of the current outer iteration, passed to the stepper as borrowed
/// views. The stepper never retains the views past a call.
#[derive(Debug, Clone, Copy)]
pub struct StepProblem<'a, T: RealField + Copy> {
    /// Current primal variables.
    pub x: DVectorView<'a, T>,
    /// Current multipliers of the rows of `[A; J]`.
    pub y: DVectorView<'a, T>,
    /// Current lower-bound multipliers.
    pub z: DVectorView<'a, T>,
    /// Current upper-bound multipliers.
    pub w: DVectorView<'a, T>,
    /// Current objective gradient.
    pub g: DVectorView<'a, T>,
    /// Current objective Hessian.
    pub h: DMatrixView<'a, T>,
    /// Current Jacobian of the nonlinear constraints.
    pub j: DMatrixView<'a, T>,
    /// Current residuals of the nonlinear constraints.
    pub hres: DVectorView<'a, T>,
    /// Right-hand side of the linear constraints `A·x = b`.
    pub b: DVectorView<'a, T>,
}

impl<'a, T: RealField + Copy> StepProblem<'a, T> {
    /// Packs the iteration data from borrowed views.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        x: impl Into<DVectorView<'a, T>>,
        y: impl Into<DVectorView<'a, T>>,
        z: impl Into<DVectorView<'a, T>>,
        w: impl Into<DVectorView<'a, T>>,
        g: impl Into<DVectorView<'a, T>>,
        h: impl Into<DMatrixView<'a, T>>,
        j: impl Into<DMatrixView<'a, T>>,
        hres: impl Into<DVectorView<'a, T>>,
        b: impl Into<DVectorView<'a, T>>,
    ) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            z: z.into(),
            w: w.into(),
            g: g.into(),
            h: h.into(),
            j: j.into(),
            hres: hres.into(),
            b: b.into(),
        }
    }
}

/// The computed step, as views into the stepper-owned solution vector.
#[derive(Debug, Clone, Copy)]
pub struct Step<'a, T: RealField + Copy> {
    /// Step of the primal variables.
    pub dx: DVectorView<'a, T>,
    /// Step of the constraint multipliers.
    pub dy: DVectorView<'a, T>,
    /// Step of the lower-bound multipliers.
    pub dz: DVectorView<'a, T>,
    /// Step of the upper-bound multipliers.
    pub dw: DVectorView<'a, T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Decomposed,
}

/// Interior-point stepper.
///
/// The stepper owns all working buffers, which are allocated once at
/// construction and reused across iterations. One instance serves one
/// problem structure (dimensions are set at construction); it is not safe
/// for concurrent use, and cloning yields an independent deep copy.
///
/// Per iteration, call [`decompose`](Self::decompose) and then
/// [`solve`](Self::solve); re-decomposing without an intervening solve is
/// allowed. See [module](self) documentation for the system being solved.
#[derive(Debug, Clone)]
pub struct Stepper<T: RealField + Copy> {
    n: usize,
    m: usize,
    mj: usize,
    a: DMatrix<T>,
    dom: Domain<T>,
    options: StepperOptions<T>,
    saddle: SaddlePointSolver<T>,
    stability: Stability<T>,
    z: DVector<T>,
    w: DVector<T>,
    l: DVector<T>,
    u: DVector<T>,
    heff: DMatrix<T>,
    wmat: DMatrix<T>,
    weights: DVector<T>,
    fixed: Vec<usize>,
    fixed_mask: Vec<bool>,
    aeff: DVector<T>,
    r: DVector<T>,
    s: DVector<T>,
    state: State,
}

impl<T: RealField + Copy> Stepper<T> {
    /// Initializes the stepper with default options.
    ///
    /// `a` is the coefficient matrix of the linear equality constraints
    /// (it stays constant over the lifetime of the stepper), `dom` the
    /// domain of the variables and `mj` the number of nonlinear constraint
    /// equations.
    pub fn new<S>(a: &Matrix<T, Dyn, Dyn, S>, dom: Domain<T>, mj: usize) -> Self
    where
        S: Storage<T, Dyn, Dyn>,
    {
        Self::with_options(a, dom, mj, StepperOptions::default())
    }

    /// Initializes the stepper with given options.
    pub fn with_options<S>(
        a: &Matrix<T, Dyn, Dyn, S>,
        dom: Domain<T>,
        mj: usize,
        options: StepperOptions<T>,
    ) -> Self
    where
        S: Storage<T, Dyn, Dyn>,
    {
        let n = dom.dim();
        let m = a.nrows();
        assert!(a.ncols() == n, "constraint matrix has invalid dimension");

        let mt = m + mj;
        let t = 3 * n + mt;

        Self {
            n,
            m,
            mj,
            a: a.clone_owned(),
            dom,
            options,
            saddle: SaddlePointSolver::with_options(n, mt, options.saddle()),
            stability: Stability::new(n),
            z: DVector::zeros(n),
            w: DVector::zeros(n),
            l: DVector::from_element(n, T::one()),
            u: DVector::from_element(n, T::one()),
            heff: DMatrix::zeros(n, n),
            wmat: DMatrix::zeros(mt, n),
            weights: DVector::zeros(n),
            fixed: Vec::new(),
            fixed_mask: vec![false; n],
            aeff: DVector::zeros(n),
            r: DVector::zeros(t),
            s: DVector::zeros(t),
            state: State::Created,
        }
    }

    /// Gets the current options.
    pub fn options(&self) -> StepperOptions<T> {
        self.options
    }

    /// Replaces the options (e.g. to shrink the central-path parameter as
    /// the outer iteration progresses). Any existing decomposition is
    /// discarded.
    pub fn set_options(&mut self, options: StepperOptions<T>) {
        self.options = options;
        self.saddle.set_options(options.saddle());
        self.state = State::Created;
    }

    /// Gets the stability classification of the last decomposition.
    pub fn stability(&self) -> &Stability<T> {
        &self.stability
    }

    /// Decomposes the KKT system for the current iteration data.
    ///
    /// This updates the canonical form of `[A; J]` with priority weights
    /// derived from the distance of the variables to their bounds,
    /// classifies the variables and folds the bound-slack blocks into the
    /// effective saddle-point matrix. A numerically singular decomposition
    /// is retried once with a `μ`-regularized Hessian before the failure is
    /// reported.
    pub fn decompose(&mut self, problem: &StepProblem<'_, T>) -> Result<(), SolveError> {
        self.assert_dims(problem);

        let n = self.n;
        let mu = self.options.mu();

        self.wmat.rows_mut(0, self.m).copy_from(&self.a);
        self.wmat.rows_mut(self.m, self.mj).copy_from(&problem.j);

        // Priority weights: the further a variable sits from its bounds,
        // the better a basic candidate it is.
        for i in 0..n {
            self.weights[i] = if self.dom.is_fixed(i) {
                T::zero()
            } else {
                let xi = problem.x[i];
                let dl = xi - self.dom.lower()[i];
                let du = self.dom.upper()[i] - xi;
                let d = dl.min(du);
                if d.is_finite() {
                    d.max(T::EPSILON)
                } else {
                    xi.abs() + T::one()
                }
            };
        }
        self.saddle.canonicalize(&self.wmat, &self.weights);

        self.stability.update(
            self.saddle.canonicalizer(),
            &problem.x,
            &problem.g,
            self.dom.lower(),
            self.dom.upper(),
        );

        self.fixed.clear();
        self.fixed.extend_from_slice(self.dom.fixed());
        if self.options.pin_unstable() {
            self.fixed.extend_from_slice(self.stability.unstable());
        }
        self.fixed.sort_unstable();
        self.fixed.dedup();
        if self.fixed.len() > self.dom.fixed().len() {
            debug!(
                "{} unstable variables held at their bound for this step",
                self.fixed.len() - self.dom.fixed().len()
            );
        }

        self.fixed_mask.fill(false);
        for &f in &self.fixed {
            self.fixed_mask[f] = true;
        }

        // Bound multipliers and slacks; neutral values everywhere else.
        self.z.fill(T::zero());
        self.w.fill(T::zero());
        self.l.fill(T::one());
        self.u.fill(T::one());
        for &i in self.dom.lower_bounded() {
            if self.fixed_mask[i] {
                continue;
            }
            self.z[i] = problem.z[i];
            let li = problem.x[i] - self.dom.lower()[i];
            self.l[i] = if li > T::zero() { li } else { mu };
        }
        for &i in self.dom.upper_bounded() {
            if self.fixed_mask[i] {
                continue;
            }
            self.w[i] = problem.w[i];
            let ui = problem.x[i] - self.dom.upper()[i];
            self.u[i] = if ui < T::zero() { ui } else { -mu };
        }

        self.heff.copy_from(&problem.h);
        for i in 0..n {
            self.heff[(i, i)] += self.z[i] / self.l[i] + self.w[i] / self.u[i];
        }

        let result = self.saddle.decompose(SaddlePointMatrix::new(
            &self.heff,
            &self.wmat,
            None,
            &self.fixed,
        ));
        if result == Err(SolveError::NumericalFailure) {
            debug!("saddle point decomposition failed, regularizing the Hessian and retrying");
            for i in 0..n {
                self.heff[(i, i)] += mu;
            }
            self.saddle.decompose(SaddlePointMatrix::new(
                &self.heff,
                &self.wmat,
                None,
                &self.fixed,
            ))?;
        } else {
            result?;
        }

        self.state = State::Decomposed;
        Ok(())
    }

    /// Assembles the right-hand side for the current iteration data and
    /// solves for the step `(Δx, Δy, Δz, Δw)`.
    ///
    /// Valid only after [`decompose`](Self::decompose); multiple solves per
    /// decomposition are allowed and do not modify the decomposition.
    pub fn solve(&mut self, problem: &StepProblem<'_, T>) -> Result<(), SolveError> {
        if self.state != State::Decomposed {
            return Err(SolveError::Invalid("solve requires a prior decompose"));
        }
        self.assert_dims(problem);

        let n = self.n;
        let mt = self.m + self.mj;
        let mu = self.options.mu();

        // Optimality residual: a = -(g + Wᵀy - z - w), zero on fixed rows.
        let mut a = self.wmat.tr_mul(&problem.y);
        a += problem.g;
        a -= &self.z;
        a -= &self.w;
        a.neg_mut();
        for &f in &self.fixed {
            a[f] = T::zero();
        }

        // Feasibility residuals of the linear and nonlinear constraints.
        let ax = &self.a * &problem.x;
        for k in 0..self.m {
            self.r[n + k] = problem.b[k] - ax[k];
        }
        for k in 0..self.mj {
            self.r[n + self.m + k] = -problem.hres[k];
        }

        // Centrality residuals on the bounded, non-fixed variables.
        self.r.rows_mut(n + mt, 2 * n).fill(T::zero());
        for &i in self.dom.lower_bounded() {
            if !self.fixed_mask[i] {
                self.r[n + mt + i] = mu - self.l[i] * self.z[i];
            }
        }
        for &i in self.dom.upper_bounded() {
            if !self.fixed_mask[i] {
                self.r[n + mt + n + i] = mu - self.u[i] * self.w[i];
            }
        }

        // Fold the centrality rows into the effective gradient.
        for i in 0..n {
            self.aeff[i] = a[i]
                + self.r[n + mt + i] / self.l[i]
                + self.r[n + mt + n + i] / self.u[i];
        }
        self.r.rows_mut(0, n).copy_from(&a);

        let mut dx = DVector::zeros(n);
        let mut dy = DVector::zeros(mt);
        self.saddle
            .solve(&self.aeff, &self.r.rows(n, mt), &mut dx, &mut dy)?;

        // Back-substitute the bound multiplier steps.
        for i in 0..n {
            let c = self.r[n + mt + i];
            let d = self.r[n + mt + n + i];
            self.s[n + mt + i] = (c - self.z[i] * dx[i]) / self.l[i];
            self.s[n + mt + n + i] = (d - self.w[i] * dx[i]) / self.u[i];
        }
        self.s.rows_mut(0, n).copy_from(&dx);
        self.s.rows_mut(n, mt).copy_from(&dy);

        Ok(())
    }

    /// Gets the computed step.
    pub fn step(&self) -> Step<'_, T> {
        let n = self.n;
        let mt = self.m + self.mj;
        Step {
            dx: self.s.rows(0, n),
            dy: self.s.rows(n, mt),
            dz: self.s.rows(n + mt, n),
            dw: self.s.rows(n + mt + n, n),
        }
    }

    /// Gets the assembled right-hand side of the last solve.
    pub fn residual(&self) -> &DVector<T> {
        &self.r
    }

    /// Assembles the expanded KKT coefficient matrix for the current
    /// iteration data, with the bound slacks and the fixed-variable
    /// structure of the last decomposition. Useful for verification; the
    /// stepper itself never materializes this matrix.
    pub fn kkt_matrix(&self, problem: &StepProblem<'_, T>) -> DMatrix<T> {
        self.assert_dims(problem);

        let n = self.n;
        let mt = self.m + self.mj;
        let t = 3 * n + mt;

        let mut kkt = DMatrix::zeros(t, t);

        kkt.view_mut((0, 0), (n, n))
            .copy_from(&masked(problem.h, &self.fixed));
        for i in 0..n {
            if self.fixed_mask[i] {
                continue;
            }
            for k in 0..mt {
                kkt[(i, n + k)] = self.wmat[(k, i)];
            }
            kkt[(i, n + mt + i)] = -T::one();
            kkt[(i, n + mt + n + i)] = -T::one();
        }
        kkt.view_mut((n, 0), (mt, n)).copy_from(&self.wmat);
        for i in 0..n {
            kkt[(n + mt + i, i)] = self.z[i];
            kkt[(n + mt + i, n + mt + i)] = self.l[i];
            kkt[(n + mt + n + i, i)] = self.w[i];
            kkt[(n + mt + n + i, n + mt + n + i)] = self.u[i];
        }

        kkt
    }

    fn assert_dims(&self, problem: &StepProblem<'_, T>) {
        let n = self.n;
        assert!(problem.x.nrows() == n, "vector x has invalid dimension");
        assert!(
            problem.y.nrows() == self.m + self.mj,
            "vector y has invalid dimension"
        );
        assert!(problem.z.nrows() == n, "vector z has invalid dimension");
        assert!(problem.w.nrows() == n, "vector w has invalid dimension");
        assert!(problem.g.nrows() == n, "vector g has invalid dimension");
        assert!(
            problem.h.nrows() == n && problem.h.ncols() == n,
            "Hessian has invalid dimensions"
        );
        assert!(
            problem.j.nrows() == self.mj && problem.j.ncols() == n,
            "constraint Jacobian has invalid dimensions"
        );
        assert!(
            problem.hres.nrows() == self.mj,
            "constraint residuals have invalid dimension"
        );
        assert!(problem.b.nrows() == self.m, "vector b has invalid dimension");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::{dmatrix, dvector};

    use crate::testing::*;

    fn zeros(n: usize) -> DVector<f64> {
        DVector::zeros(n)
    }

    struct Parts {
        x: DVector<f64>,
        y: DVector<f64>,
        z: DVector<f64>,
        w: DVector<f64>,
        g: DVector<f64>,
        h: DMatrix<f64>,
        j: DMatrix<f64>,
        hres: DVector<f64>,
        b: DVector<f64>,
    }

    impl Parts {
        fn problem(&self) -> StepProblem<'_, f64> {
            StepProblem::new(
                &self.x, &self.y, &self.z, &self.w, &self.g, &self.h, &self.j, &self.hres,
                &self.b,
            )
        }
    }

    #[test]
    fn equality_constrained_quadratic_single_step() {
        // minimize ||x||² subject to x₀ + x₁ + x₂ = 1 reaches the optimum
        // (1/3, 1/3, 1/3) in one Newton step from the origin.
        let a = dmatrix![1.0, 1.0, 1.0];
        let mut stepper = Stepper::new(&a, Domain::unconstrained(3), 0);

        let parts = Parts {
            x: zeros(3),
            y: zeros(1),
            z: zeros(3),
            w: zeros(3),
            g: zeros(3),
            h: DMatrix::identity(3, 3),
            j: DMatrix::zeros(0, 3),
            hres: zeros(0),
            b: dvector![1.0],
        };

        stepper.decompose(&parts.problem()).unwrap();
        stepper.solve(&parts.problem()).unwrap();

        let step = stepper.step();
        assert_abs_diff_eq!(
            step.dx.clone_owned(),
            dvector![1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
            epsilon = 1e-12
        );
    }

    #[test]
    fn newton_iteration_converges() {
        // minimize x₀² + x₁² subject to x₀ - x₁ = 0 from a far-away start.
        let a = dmatrix![1.0, -1.0];
        let mut stepper = Stepper::new(&a, Domain::unconstrained(2), 0);

        let mut parts = Parts {
            x: dvector![200.0, 30000.0],
            y: zeros(1),
            z: zeros(2),
            w: zeros(2),
            g: zeros(2),
            h: 2.0 * DMatrix::identity(2, 2),
            j: DMatrix::zeros(0, 2),
            hres: zeros(0),
            b: dvector![0.0],
        };

        for _ in 0..5 {
            parts.g = 2.0 * &parts.x;
            stepper.decompose(&parts.problem()).unwrap();
            stepper.solve(&parts.problem()).unwrap();

            let (dx, dy) = {
                let step = stepper.step();
                (step.dx.clone_owned(), step.dy.clone_owned())
            };
            parts.x += dx;
            parts.y += dy;
        }

        assert!(parts.x.norm() <= 1e-9);
        assert!(parts.y.norm() <= 1e-9);
    }

    #[test]
    fn fixed_variables_reduce_to_the_free_subproblem() {
        let mut rng = fastrand::Rng::with_seed(21);
        let h = random_spd_matrix(4, &mut rng);
        let g = random_vector(4, &mut rng);

        // The first two variables are fixed at zero by their bounds.
        let inf = f64::INFINITY;
        let dom = Domain::rect(vec![0.0, 0.0, -inf, -inf], vec![0.0, 0.0, inf, inf]);
        let a = dmatrix![5.0, -3.0, 1.0, 1.0];

        let mut stepper = Stepper::new(&a, dom, 0);
        let parts = Parts {
            x: zeros(4),
            y: zeros(1),
            z: zeros(4),
            w: zeros(4),
            g: g.clone(),
            h: h.clone(),
            j: DMatrix::zeros(0, 4),
            hres: zeros(0),
            b: dvector![1.0],
        };
        stepper.decompose(&parts.problem()).unwrap();
        stepper.solve(&parts.problem()).unwrap();
        let step = stepper.step();

        assert_eq!(step.dx[0], 0.0);
        assert_eq!(step.dx[1], 0.0);

        // The identity rows of the fixed variables are satisfied exactly.
        let kkt = stepper.kkt_matrix(&parts.problem());
        let residual = kkt * &stepper.s - stepper.residual();
        assert_eq!(residual[0], 0.0);
        assert_eq!(residual[1], 0.0);

        // The free part must match the standalone two-variable problem.
        let h2 = h.view((2, 2), (2, 2)).clone_owned();
        let g2 = dvector![g[2], g[3]];
        let a2 = dmatrix![1.0, 1.0];

        let mut sub = Stepper::new(&a2, Domain::unconstrained(2), 0);
        let sub_parts = Parts {
            x: zeros(2),
            y: zeros(1),
            z: zeros(2),
            w: zeros(2),
            g: g2,
            h: h2,
            j: DMatrix::zeros(0, 2),
            hres: zeros(0),
            b: dvector![1.0],
        };
        sub.decompose(&sub_parts.problem()).unwrap();
        sub.solve(&sub_parts.problem()).unwrap();
        let sub_step = sub.step();

        assert_abs_diff_eq!(step.dx[2], sub_step.dx[0], epsilon = 1e-12);
        assert_abs_diff_eq!(step.dx[3], sub_step.dx[1], epsilon = 1e-12);
    }

    #[test]
    fn step_matches_expanded_kkt_system() {
        let n = 8;
        let m = 2;
        let mj = 1;
        let mut rng = fastrand::Rng::with_seed(22);

        let a = random_matrix(m, n, &mut rng);
        let dom = Domain::rect(vec![0.0; n], vec![10.0; n]);

        let mut stepper = Stepper::new(&a, dom, mj);
        let parts = Parts {
            x: DVector::from_element(n, 5.0),
            y: random_vector(m + mj, &mut rng),
            z: DVector::from_element(n, 0.5),
            w: DVector::from_element(n, -0.5),
            g: random_vector(n, &mut rng),
            h: random_spd_matrix(n, &mut rng),
            j: random_matrix(mj, n, &mut rng),
            hres: random_vector(mj, &mut rng),
            b: random_vector(m, &mut rng),
        };

        stepper.decompose(&parts.problem()).unwrap();
        stepper.solve(&parts.problem()).unwrap();

        let kkt = stepper.kkt_matrix(&parts.problem());
        let residual = kkt * &stepper.s - stepper.residual();

        assert!(residual.norm() / stepper.residual().norm() <= 1e-10);
    }

    #[test]
    fn unstable_variables_keep_the_step_finite() {
        let n = 10;
        let m = 3;
        let mut rng = fastrand::Rng::with_seed(23);

        let a = random_matrix(m, n, &mut rng);
        let dom = Domain::rect(vec![0.0; n], vec![f64::INFINITY; n]);

        let mut x = DVector::from_element(n, 1.0);
        let mut z = DVector::from_element(n, 1e-3);
        for i in 0..m {
            x[i] = 1e-16;
            z[i] = 1.0;
        }

        let mut stepper = Stepper::new(&a, dom, 0);
        let parts = Parts {
            x,
            y: random_vector(m, &mut rng),
            z,
            w: zeros(n),
            g: random_vector(n, &mut rng),
            h: random_spd_matrix(n, &mut rng),
            j: DMatrix::zeros(0, n),
            hres: zeros(0),
            b: random_vector(m, &mut rng),
        };

        stepper.decompose(&parts.problem()).unwrap();
        stepper.solve(&parts.problem()).unwrap();

        assert!(stepper.s.iter().all(|v| v.is_finite()));

        // The rows of the nearly active variables absorb the barrier terms;
        // the rest of the expanded system must still be solved accurately.
        let kkt = stepper.kkt_matrix(&parts.problem());
        let mut residual = kkt * &stepper.s - stepper.residual();
        for i in 0..m {
            residual[i] = 0.0;
        }

        assert!(residual.norm() / stepper.residual().norm() <= 1e-10);
    }

    #[test]
    fn active_bound_slacks_are_regularized() {
        let n = 3;
        let a = dmatrix![1.0, 1.0, 1.0];
        let dom = Domain::rect(vec![0.0; n], vec![f64::INFINITY; n]);

        let mut options = StepperOptions::default();
        options.set_mu(1e-6);
        options.set_pin_unstable(false);
        let mut stepper = Stepper::with_options(&a, dom, 0, options);

        // The first variable sits exactly on its lower bound.
        let parts = Parts {
            x: dvector![0.0, 1.0, 2.0],
            y: zeros(1),
            z: dvector![1.0, 0.1, 0.1],
            w: zeros(n),
            g: zeros(n),
            h: DMatrix::identity(n, n),
            j: DMatrix::zeros(0, n),
            hres: zeros(0),
            b: dvector![3.0],
        };

        stepper.decompose(&parts.problem()).unwrap();

        let kkt = stepper.kkt_matrix(&parts.problem());
        let mt = 1;
        assert_eq!(kkt[(n + mt, n + mt)], 1e-6);
        assert_eq!(kkt[(n + mt + 1, n + mt + 1)], 1.0);
    }

    #[test]
    fn solve_before_decompose_is_invalid() {
        let a = dmatrix![1.0, 1.0];
        let mut stepper = Stepper::new(&a, Domain::unconstrained(2), 0);

        let parts = Parts {
            x: zeros(2),
            y: zeros(1),
            z: zeros(2),
            w: zeros(2),
            g: zeros(2),
            h: DMatrix::identity(2, 2),
            j: DMatrix::zeros(0, 2),
            hres: zeros(0),
            b: dvector![0.0],
        };

        assert!(matches!(
            stepper.solve(&parts.problem()),
            Err(SolveError::Invalid(_))
        ));

        // Decomposing twice in a row is fine.
        stepper.decompose(&parts.problem()).unwrap();
        stepper.decompose(&parts.problem()).unwrap();
        stepper.solve(&parts.problem()).unwrap();
    }
}
