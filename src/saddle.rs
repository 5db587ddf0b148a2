//! Saddle-point problem solvers.
//!
//! A saddle-point problem is the linear system
//!
//! ```text
//! [ H  Wᵀ ] [ x ]   [ a ]
//! [ W  G  ] [ y ] = [ b ]
//! ```
//!
//! arising from the first-order optimality conditions of a constrained
//! optimization problem. `H` is the Hessian of the objective, `W` the
//! Jacobian of the constraints and `G` an optional negative-semidefinite
//! block. Fixed variables are honored through the identity-row structure of
//! [`SaddlePointMatrix`].
//!
//! Four methods are available (see [`SaddlePointMethod`]), all sharing one
//! canonical reduction: the constraint matrix is brought to the canonical
//! form `R·W·Q = [I S]` first, which splits the variables into basic and
//! non-basic and drops linearly dependent constraint rows. There is no need
//! for `W` to have linearly independent rows, but the right-hand side `b`
//! must be consistent with the dependencies for the residual to stay
//! bounded.
//!
//! [`SaddlePointSolver::decompose`] and [`SaddlePointSolver::solve`] are
//! separated so that one decomposition can serve multiple solves.

mod dense;
mod nullspace;
mod rangespace;

use log::debug;
use nalgebra::{
    storage::{Storage, StorageMut},
    DMatrix, DVector, Dyn, Matrix, Vector,
};

use crate::canonical::Canonicalizer;
use crate::core::{
    masked, RealField, SaddlePointMatrix, SaddlePointMethod, SaddlePointOptions, SolveError,
};

/// Solver for saddle-point problems.
///
/// The solver owns its factorization buffers and reuses them across calls.
/// It is not safe for concurrent use; cloning produces an independent deep
/// copy of all state. See [module](self) documentation for more details.
#[derive(Debug, Clone)]
pub struct SaddlePointSolver<T: RealField + Copy> {
    n: usize,
    m: usize,
    options: SaddlePointOptions<T>,
    canonicalizer: Canonicalizer<T>,
    fresh_canonical: bool,
    factors: Option<Factors<T>>,
}

#[derive(Debug, Clone)]
enum Factors<T: RealField + Copy> {
    PartialPiv(dense::PartialPivFactors<T>),
    FullPiv(dense::FullPivFactors<T>),
    Nullspace(nullspace::NullspaceFactors<T>),
    Rangespace(rangespace::RangespaceFactors<T>),
}

impl<T: RealField + Copy> SaddlePointSolver<T> {
    /// Initializes the solver for problems with `n` variables and `m`
    /// constraint rows, with default options.
    pub fn new(n: usize, m: usize) -> Self {
        Self::with_options(n, m, SaddlePointOptions::default())
    }

    /// Initializes the solver with given options.
    pub fn with_options(n: usize, m: usize, options: SaddlePointOptions<T>) -> Self {
        assert!(n > 0, "empty problem");
        assert!(m <= n, "more constraint rows than variables");

        Self {
            n,
            m,
            options,
            canonicalizer: Canonicalizer::empty(
                options.tolerance_linear(),
                options.tolerance_pivot(),
            ),
            fresh_canonical: false,
            factors: None,
        }
    }

    /// Gets the current options.
    pub fn options(&self) -> SaddlePointOptions<T> {
        self.options
    }

    /// Replaces the options. Any existing canonical form and decomposition
    /// are discarded.
    pub fn set_options(&mut self, options: SaddlePointOptions<T>) {
        self.options = options;
        self.canonicalizer =
            Canonicalizer::empty(options.tolerance_linear(), options.tolerance_pivot());
        self.fresh_canonical = false;
        self.factors = None;
    }

    /// Gets the embedded canonicalizer with the current canonical form of
    /// the constraint matrix.
    pub fn canonicalizer(&self) -> &Canonicalizer<T> {
        &self.canonicalizer
    }

    /// Brings the constraint matrix to canonical form using given priority
    /// weights for the basis selection.
    ///
    /// The next call to [`decompose`](Self::decompose) reuses this
    /// canonical form instead of deriving weights on its own. Calling this
    /// method is optional; it exists so that callers can control the basis
    /// (and inspect the canonical form, e.g. for stability classification)
    /// before decomposing.
    pub fn canonicalize<Sw, Sv>(&mut self, w: &Matrix<T, Dyn, Dyn, Sw>, weights: &Vector<T, Dyn, Sv>)
    where
        Sw: Storage<T, Dyn, Dyn>,
        Sv: Storage<T, Dyn>,
    {
        assert!(
            w.nrows() == self.m && w.ncols() == self.n,
            "constraint matrix has invalid dimensions"
        );

        self.canonicalizer.compute(w);
        self.canonicalizer.update_weights(weights);
        if self.options.rationalize() {
            self.canonicalizer.rationalize(self.options.max_denominator());
        }
        self.fresh_canonical = true;
    }

    /// Decomposes the saddle-point matrix with the configured method.
    ///
    /// A pivot below the decomposition tolerance is reported as
    /// [`SolveError::NumericalFailure`]; the caller may regularize the
    /// Hessian and retry.
    ///
    /// # Panics
    ///
    /// Panics if the matrix dimensions disagree with the solver dimensions.
    pub fn decompose(&mut self, matrix: SaddlePointMatrix<'_, T>) -> Result<(), SolveError> {
        assert!(
            matrix.nvars() == self.n && matrix.nrows_w() == self.m,
            "saddle point matrix has invalid dimensions"
        );

        if !self.fresh_canonical {
            // Derive priority weights from the Hessian diagonal: small
            // curvature makes a safer basic candidate. Fixed variables get
            // no weight so they stay out of the basis.
            let h = matrix.h();
            let mut weights = DVector::from_fn(self.n, |i, _| {
                T::one() / (T::one() + h[(i, i)].abs())
            });
            for &f in matrix.fixed() {
                weights[f] = T::zero();
            }
            self.canonicalize(&matrix.w(), &weights);
        }
        self.fresh_canonical = false;

        let hm = masked(matrix.h(), matrix.fixed());
        let red = Reduction::new(&self.canonicalizer, matrix.fixed(), self.n);
        let tol = self.options.tolerance_decompose();

        let mut method = self.options.method();
        if method == SaddlePointMethod::RangespaceDiagonal && !is_diagonal(&hm) {
            debug!("Hessian is not diagonal, falling back to partial-pivoting LU");
            method = SaddlePointMethod::PartialPivLU;
        }
        if matrix.g().is_some()
            && matches!(
                method,
                SaddlePointMethod::Nullspace | SaddlePointMethod::RangespaceDiagonal
            )
        {
            debug!("G block present, falling back to partial-pivoting LU");
            method = SaddlePointMethod::PartialPivLU;
        }

        let factors = match method {
            SaddlePointMethod::PartialPivLU => {
                Factors::PartialPiv(dense::decompose_partial(&hm, matrix.g(), red, tol)?)
            }
            SaddlePointMethod::FullPivLU => {
                Factors::FullPiv(dense::decompose_full(&hm, matrix.g(), red, tol)?)
            }
            SaddlePointMethod::Nullspace => {
                Factors::Nullspace(nullspace::decompose(&hm, red, tol)?)
            }
            SaddlePointMethod::RangespaceDiagonal => {
                Factors::Rangespace(rangespace::decompose(&hm, red, tol)?)
            }
        };

        self.factors = Some(factors);
        Ok(())
    }

    /// Solves the saddle-point problem for the given right-hand side,
    /// writing the solution into `x` and `y`.
    ///
    /// The decomposition is not modified, so repeated solves with the same
    /// right-hand side produce identical results. For fixed variables `f`,
    /// the solution satisfies `x[f] == a[f]` exactly.
    ///
    /// # Panics
    ///
    /// Panics if a vector dimension disagrees with the solver dimensions.
    pub fn solve<Sa, Sb, Sx, Sy>(
        &self,
        a: &Vector<T, Dyn, Sa>,
        b: &Vector<T, Dyn, Sb>,
        x: &mut Vector<T, Dyn, Sx>,
        y: &mut Vector<T, Dyn, Sy>,
    ) -> Result<(), SolveError>
    where
        Sa: Storage<T, Dyn>,
        Sb: Storage<T, Dyn>,
        Sx: StorageMut<T, Dyn>,
        Sy: StorageMut<T, Dyn>,
    {
        assert!(a.nrows() == self.n, "vector a has invalid dimension");
        assert!(b.nrows() == self.m, "vector b has invalid dimension");
        assert!(x.nrows() == self.n, "vector x has invalid dimension");
        assert!(y.nrows() == self.m, "vector y has invalid dimension");

        let factors = self
            .factors
            .as_ref()
            .ok_or(SolveError::Invalid("solve called before decompose"))?;

        match factors {
            Factors::PartialPiv(f) => dense::solve_partial(f, a, b, x, y),
            Factors::FullPiv(f) => dense::solve_full(f, a, b, x, y),
            Factors::Nullspace(f) => nullspace::solve(f, a, b, x, y),
            Factors::Rangespace(f) => rangespace::solve(f, a, b, x, y),
        }
    }

    /// Computes the relative residuals of the constraint equation
    /// `W·x = b`, entry `i` being `(W·x - b)[i] / (1 + |b[i]|)`.
    ///
    /// Rows of `W` that are linearly dependent on others keep a bounded
    /// residual only when `b` is consistent with the dependency.
    pub fn residuals<Sw, Sx, Sb, Sr>(
        &self,
        w: &Matrix<T, Dyn, Dyn, Sw>,
        x: &Vector<T, Dyn, Sx>,
        b: &Vector<T, Dyn, Sb>,
        r: &mut Vector<T, Dyn, Sr>,
    ) where
        Sw: Storage<T, Dyn, Dyn>,
        Sx: Storage<T, Dyn>,
        Sb: Storage<T, Dyn>,
        Sr: StorageMut<T, Dyn>,
    {
        assert!(
            w.nrows() == self.m && w.ncols() == self.n,
            "constraint matrix has invalid dimensions"
        );
        assert!(x.nrows() == self.n, "vector x has invalid dimension");
        assert!(b.nrows() == self.m, "vector b has invalid dimension");
        assert!(r.nrows() == self.m, "vector r has invalid dimension");

        for i in 0..self.m {
            let wx = w.row(i).transpose().dot(x);
            r[i] = (wx - b[i]) / (T::one() + b[i].abs());
        }
    }
}

/// Snapshot of the canonical form and the fixed-variable structure taken at
/// decomposition time, so that later solves observe exactly the
/// decomposition they belong to.
#[derive(Debug, Clone)]
pub(crate) struct Reduction<T: RealField + Copy> {
    pub(crate) n: usize,
    pub(crate) r: DMatrix<T>,
    pub(crate) s: DMatrix<T>,
    pub(crate) jb: Vec<usize>,
    pub(crate) jn: Vec<usize>,
    /// Positions within `jn` of the free non-basic variables.
    pub(crate) jn_free: Vec<usize>,
    /// Positions within `jn` of the fixed non-basic variables.
    pub(crate) jn_fixed: Vec<usize>,
    /// Original indices of all fixed variables.
    pub(crate) fixed: Vec<usize>,
    fixed_mask: Vec<bool>,
}

impl<T: RealField + Copy> Reduction<T> {
    fn new(canonicalizer: &Canonicalizer<T>, fixed: &[usize], n: usize) -> Self {
        let mut fixed_mask = vec![false; n];
        for &f in fixed {
            fixed_mask[f] = true;
        }

        let jn = canonicalizer.nonbasic().to_vec();
        let (jn_free, jn_fixed): (Vec<usize>, Vec<usize>) =
            (0..jn.len()).partition(|&p| !fixed_mask[jn[p]]);

        Self {
            n,
            r: canonicalizer.r().clone(),
            s: canonicalizer.s().clone(),
            jb: canonicalizer.basic().to_vec(),
            jn,
            jn_free,
            jn_fixed,
            fixed: fixed.to_vec(),
            fixed_mask,
        }
    }

    pub(crate) fn nb(&self) -> usize {
        self.jb.len()
    }

    pub(crate) fn is_fixed(&self, var: usize) -> bool {
        self.fixed_mask[var]
    }

    /// Original indices of the free non-basic variables, in `jn` order.
    pub(crate) fn free_nonbasic(&self) -> Vec<usize> {
        self.jn_free.iter().map(|&p| self.jn[p]).collect()
    }

    /// Original indices of the fixed non-basic variables, in `jn` order.
    pub(crate) fn fixed_nonbasic(&self) -> Vec<usize> {
        self.jn_fixed.iter().map(|&p| self.jn[p]).collect()
    }

    /// Gathers the entries of `v` at the given original indices.
    pub(crate) fn gather<S: Storage<T, Dyn>>(v: &Vector<T, Dyn, S>, ids: &[usize]) -> DVector<T> {
        DVector::from_iterator(ids.len(), ids.iter().map(|&i| v[i]))
    }

    /// Computes `b̃ = R·b - Sφ·aφ`, the canonical constraint right-hand
    /// side with the contribution of the fixed non-basic variables removed.
    pub(crate) fn reduced_b<Sa, Sb>(
        &self,
        sphi: &DMatrix<T>,
        a: &Vector<T, Dyn, Sa>,
        b: &Vector<T, Dyn, Sb>,
    ) -> DVector<T>
    where
        Sa: Storage<T, Dyn>,
        Sb: Storage<T, Dyn>,
    {
        let aphi = Self::gather(a, &self.fixed_nonbasic());
        &self.r * b - sphi * aphi
    }

    /// Writes the solution parts back in original variable order. Fixed
    /// variables take their prescribed values last, so they win even in the
    /// degenerate case of a fixed variable forced into the basis.
    pub(crate) fn scatter<Sa, Sx>(
        &self,
        xb: &DVector<T>,
        xf: &DVector<T>,
        a: &Vector<T, Dyn, Sa>,
        x: &mut Vector<T, Dyn, Sx>,
    ) where
        Sa: Storage<T, Dyn>,
        Sx: StorageMut<T, Dyn>,
    {
        for (i, &var) in self.jb.iter().enumerate() {
            x[var] = xb[i];
        }
        for (i, &var) in self.free_nonbasic().iter().enumerate() {
            x[var] = xf[i];
        }
        for &var in &self.fixed {
            x[var] = a[var];
        }
    }

    /// Recovers the multipliers of the original rows, `y = Rᵀ·y'`.
    pub(crate) fn multipliers<Sy>(&self, yp: &DVector<T>, y: &mut Vector<T, Dyn, Sy>)
    where
        Sy: StorageMut<T, Dyn>,
    {
        y.copy_from(&self.r.tr_mul(yp));
    }
}

/// Reports a numerical failure when the smallest pivot falls below the
/// relative tolerance. An empty pivot sequence is fine.
pub(crate) fn check_pivots<T: RealField + Copy>(
    pivots: impl IntoIterator<Item = T>,
    tolerance: T,
) -> Result<(), SolveError> {
    let mut min = T::from_subset(&f64::INFINITY);
    let mut max = T::zero();
    let mut empty = true;

    for p in pivots {
        let p = p.abs();
        min = min.min(p);
        max = max.max(p);
        empty = false;
    }

    if empty {
        return Ok(());
    }
    if min <= tolerance * max.max(T::one()) {
        debug!("decomposition pivot below tolerance, reporting numerical failure");
        return Err(SolveError::NumericalFailure);
    }
    Ok(())
}

fn is_diagonal<T: RealField + Copy>(h: &DMatrix<T>) -> bool {
    for j in 0..h.ncols() {
        for i in 0..h.nrows() {
            if i != j && h[(i, j)] != T::zero() {
                return false;
            }
        }
    }
    true
}
