//! Canonical forms of linear constraint matrices.
//!
//! The canonical form of a matrix `W` with `m` rows and `n` columns
//! (`m <= n`) is
//!
//! ```text
//! C = R·W·Q = [I S]
//! ```
//!
//! where `Q` is a permutation of the columns and `R` is the canonicalizer
//! matrix built from the linearly independent rows of `W`. The columns
//! selected into the identity block correspond to the *basic* variables;
//! the remaining columns are *non-basic*. Linearly dependent rows of `W`
//! are detected during the computation and simply dropped from the
//! canonical form, so rank deficiency is not an error.
//!
//! The basis can be revised cheaply after the initial computation: with
//! priority weights for the variables ([`Canonicalizer::update_weights`]),
//! with an externally supplied ordering
//! ([`Canonicalizer::update_ordering`]), or one elementary pivot at a time
//! ([`Canonicalizer::swap`]).

use log::{debug, warn};
use nalgebra::{
    convert, storage::Storage, try_convert, DMatrix, DVector, Dyn, Matrix, RowDVector, Vector,
};
use num_traits::Zero;

use crate::core::{index::sort_descending_permutation, RealField};

/// Canonicalizer of a linear constraint matrix.
///
/// See [module](self) documentation for more details.
#[derive(Debug, Clone)]
pub struct Canonicalizer<T: RealField + Copy> {
    nrows: usize,
    ncols: usize,
    r: DMatrix<T>,
    s: DMatrix<T>,
    jb: Vec<usize>,
    jn: Vec<usize>,
    ili: Vec<usize>,
    tolerance_linear: T,
    tolerance_pivot: T,
}

impl<T: RealField + Copy> Canonicalizer<T> {
    /// Computes the canonical form of the given matrix with default
    /// tolerances.
    pub fn new<S>(w: &Matrix<T, Dyn, Dyn, S>) -> Self
    where
        S: Storage<T, Dyn, Dyn>,
    {
        let mut canonicalizer = Self::empty(convert(1e-10), convert(1e-8));
        canonicalizer.compute(w);
        canonicalizer
    }

    /// Computes the canonical form of the given matrix with given
    /// tolerances for the linear-independence and pivot acceptance tests.
    pub fn with_tolerances<S>(
        w: &Matrix<T, Dyn, Dyn, S>,
        tolerance_linear: T,
        tolerance_pivot: T,
    ) -> Self
    where
        S: Storage<T, Dyn, Dyn>,
    {
        let mut canonicalizer = Self::empty(tolerance_linear, tolerance_pivot);
        canonicalizer.compute(w);
        canonicalizer
    }

    pub(crate) fn empty(tolerance_linear: T, tolerance_pivot: T) -> Self {
        Self {
            nrows: 0,
            ncols: 0,
            r: DMatrix::zeros(0, 0),
            s: DMatrix::zeros(0, 0),
            jb: Vec::new(),
            jn: Vec::new(),
            ili: Vec::new(),
            tolerance_linear,
            tolerance_pivot,
        }
    }

    /// Gets the number of variables (columns of `W`).
    pub fn num_variables(&self) -> usize {
        self.ncols
    }

    /// Gets the number of rows of `W`.
    pub fn num_rows(&self) -> usize {
        self.nrows
    }

    /// Gets the number of basic variables, which equals the number of
    /// linearly independent rows of `W`.
    pub fn num_basic_variables(&self) -> usize {
        self.jb.len()
    }

    /// Gets the number of non-basic variables.
    pub fn num_nonbasic_variables(&self) -> usize {
        self.jn.len()
    }

    /// Gets the canonicalizer matrix `R` restricted to the linearly
    /// independent rows of `W`.
    pub fn r(&self) -> &DMatrix<T> {
        &self.r
    }

    /// Gets the matrix `S` in the canonical form `[I S]`.
    pub fn s(&self) -> &DMatrix<T> {
        &self.s
    }

    /// Gets the indices of the basic variables.
    pub fn basic(&self) -> &[usize] {
        &self.jb
    }

    /// Gets the indices of the non-basic variables.
    pub fn nonbasic(&self) -> &[usize] {
        &self.jn
    }

    /// Gets the indices of the linearly independent rows of the original
    /// matrix.
    pub fn independent_rows(&self) -> &[usize] {
        &self.ili
    }

    /// Gets the permutation `Q` as the variable indices in canonical order
    /// (basic first, then non-basic).
    pub fn ordering(&self) -> Vec<usize> {
        let mut ordering = Vec::with_capacity(self.ncols);
        ordering.extend_from_slice(&self.jb);
        ordering.extend_from_slice(&self.jn);
        ordering
    }

    /// Assembles the canonical matrix `C = R·W·Q = [I S]`.
    pub fn canonical(&self) -> DMatrix<T> {
        let nb = self.jb.len();
        let mut c = DMatrix::zeros(nb, self.ncols);
        c.view_mut((0, 0), (nb, nb)).fill_with_identity();
        c.view_mut((0, nb), (nb, self.jn.len())).copy_from(&self.s);
        c
    }

    /// Computes the canonical form of the given matrix.
    ///
    /// The computation performs a full-pivoting LU decomposition of `W`.
    /// Rows whose pivot falls below the linear-independence tolerance are
    /// considered linearly dependent on the rows above and are dropped from
    /// the canonical form.
    ///
    /// # Panics
    ///
    /// Panics if the matrix has more rows than columns.
    pub fn compute<S>(&mut self, w: &Matrix<T, Dyn, Dyn, S>)
    where
        S: Storage<T, Dyn, Dyn>,
    {
        let (m, n) = w.shape();
        assert!(m <= n, "the matrix has more rows than columns");

        self.nrows = m;
        self.ncols = n;

        if m == 0 {
            self.r = DMatrix::zeros(0, 0);
            self.s = DMatrix::zeros(0, n);
            self.jb.clear();
            self.jn = (0..n).collect();
            self.ili.clear();
            return;
        }

        let lu = w.clone_owned().full_piv_lu();
        let lmat = lu.l();
        let umat = lu.u();

        // Determine the rank. Pivots produced by full pivoting are tested
        // against the magnitude of the largest one.
        let pivot_max = umat[(0, 0)].abs();
        let tol = self.tolerance_linear * if pivot_max > T::one() { pivot_max } else { T::one() };
        let mut nb = 0;
        while nb < m && umat[(nb, nb)].abs() > tol {
            nb += 1;
        }

        // Recover the row and column orderings chosen by the pivoting.
        let mut rows = DVector::<usize>::from_iterator(m, 0..m);
        lu.p().permute_rows(&mut rows);
        let mut cols = RowDVector::<usize>::from_iterator(n, 0..n);
        lu.q().permute_columns(&mut cols);

        self.ili = rows.iter().take(nb).copied().collect();
        self.jb = cols.iter().take(nb).copied().collect();
        self.jn = cols.iter().skip(nb).copied().collect();

        // With P·W·Q = L·U and rank nb, the canonicalizer of the
        // independent rows is R = U1⁻¹·L1⁻¹·P_top and S = U1⁻¹·U2, where
        // L1, U1 are the leading nb×nb blocks and U2 the remaining columns
        // of U.
        let l1 = lmat.view((0, 0), (nb, nb));
        let u1 = umat.view((0, 0), (nb, nb));

        let mut r = DMatrix::zeros(nb, m);
        for (i, &row) in self.ili.iter().enumerate() {
            r[(i, row)] = T::one();
        }
        let invertible = l1.solve_lower_triangular_mut(&mut r);
        debug_assert!(invertible);
        let invertible = u1.solve_upper_triangular_mut(&mut r);
        debug_assert!(invertible);

        let mut s = umat.view((0, nb), (nb, n - nb)).clone_owned();
        let invertible = u1.solve_upper_triangular_mut(&mut s);
        debug_assert!(invertible);

        self.r = r;
        self.s = s;

        debug!(
            "canonicalized a {}x{} matrix (rank {}, {} dependent rows)",
            m,
            n,
            nb,
            m - nb
        );
    }

    /// Swaps a basic variable with a non-basic variable.
    ///
    /// The entry `S[ib, inb]` becomes the pivot of an in-place Gauss-Jordan
    /// step applied to both `R` and `S`, which costs `O(m·n)`. Applying the
    /// same swap twice restores the canonical form up to floating-point
    /// round-off.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of range or the pivot entry is zero.
    pub fn swap(&mut self, ib: usize, inb: usize) {
        let nb = self.jb.len();
        assert!(ib < nb, "basic index out of range");
        assert!(inb < self.jn.len(), "non-basic index out of range");

        let pivot = self.s[(ib, inb)];
        assert!(pivot != T::zero(), "pivot entry is zero");
        let pivot_inv = T::one() / pivot;

        let s_col: Vec<T> = (0..nb).map(|k| self.s[(k, inb)]).collect();

        // Gauss-Jordan step turning the tableau column of the entering
        // variable into a unit vector, applied to both R and S.
        self.r.row_mut(ib).scale_mut(pivot_inv);
        self.s.row_mut(ib).scale_mut(pivot_inv);

        let r_piv = self.r.row(ib).clone_owned();
        let s_piv = self.s.row(ib).clone_owned();

        for k in 0..nb {
            if k == ib {
                continue;
            }
            let factor = s_col[k];
            if factor.is_zero() {
                continue;
            }
            for c in 0..self.nrows {
                self.r[(k, c)] -= factor * r_piv[c];
            }
            for c in 0..self.jn.len() {
                self.s[(k, c)] -= factor * s_piv[c];
            }
        }

        // The column of the leaving variable is the pivot column of the
        // inverse operation.
        for k in 0..nb {
            self.s[(k, inb)] = if k == ib {
                pivot_inv
            } else {
                -s_col[k] * pivot_inv
            };
        }

        std::mem::swap(&mut self.jb[ib], &mut self.jn[inb]);
    }

    /// Updates the canonical form with given priority weights for the
    /// variables.
    ///
    /// Both partitions are sorted in descending order of weight and basic
    /// and non-basic variables are exchanged so that the basis collects as
    /// much total weight as the structure of `W` permits. Candidate pivots
    /// with magnitude below the pivot tolerance are rejected, so a variable
    /// with non-positive weight may remain basic when a row of `S` offers
    /// no acceptable pivot (the degenerate case).
    ///
    /// # Panics
    ///
    /// Panics if the weights dimension differs from the number of
    /// variables.
    pub fn update_weights<Sw>(&mut self, weights: &Vector<T, Dyn, Sw>)
    where
        Sw: Storage<T, Dyn>,
    {
        assert!(
            weights.nrows() == self.ncols,
            "weights have invalid dimension"
        );

        self.sort_by_weights(weights);

        let nb = self.jb.len();
        let nn = self.jn.len();
        let mut swaps = 0;

        for j in 0..nn {
            let wj = weights[self.jn[j]];

            // Pivot acceptance is relative to the scale of the column.
            let mut scale = T::one();
            for k in 0..nb {
                let v = self.s[(k, j)].abs();
                if v > scale {
                    scale = v;
                }
            }
            let tol = self.tolerance_pivot * scale;

            // Exchange with the lightest basic variable reachable through
            // an acceptable pivot.
            let mut best: Option<(usize, T)> = None;
            for k in 0..nb {
                if self.s[(k, j)].abs() <= tol {
                    continue;
                }
                let wk = weights[self.jb[k]];
                if wk >= wj {
                    continue;
                }
                match best {
                    Some((_, wbest)) if wbest <= wk => {}
                    _ => best = Some((k, wk)),
                }
            }

            if let Some((k, _)) = best {
                self.swap(k, j);
                swaps += 1;
            }
        }

        if swaps > 0 {
            self.sort_by_weights(weights);
        }

        debug!("updated canonical basis with priority weights ({swaps} swaps)");
    }

    /// Applies an externally supplied ordering of the basic and non-basic
    /// variables without changing the basis selection.
    ///
    /// # Panics
    ///
    /// Panics if `kb` or `kn` is not a permutation of the respective
    /// partition.
    pub fn update_ordering(&mut self, kb: &[usize], kn: &[usize]) {
        assert!(is_permutation(kb, self.jb.len()), "invalid basic ordering");
        assert!(
            is_permutation(kn, self.jn.len()),
            "invalid non-basic ordering"
        );

        self.r = self.r.select_rows(kb.iter());
        self.s = self.s.select_rows(kb.iter()).select_columns(kn.iter());
        self.jb = kb.iter().map(|&k| self.jb[k]).collect();
        self.jn = kn.iter().map(|&k| self.jn[k]).collect();
        self.ili = kb.iter().map(|&k| self.ili[k]).collect();
    }

    /// Replaces every entry of `R` and `S` by the nearest rational number
    /// with denominator not greater than `max_denominator`.
    ///
    /// This removes accumulated round-off when the original matrix has
    /// rational entries. Entries for which no rational within the round-off
    /// tolerance exists are kept in floating point and reported with a
    /// warning.
    pub fn rationalize(&mut self, max_denominator: u64) {
        let mut kept = 0usize;

        for v in self.r.iter_mut().chain(self.s.iter_mut()) {
            match try_convert(*v).and_then(|x| nearest_rational(x, max_denominator)) {
                Some((num, den)) => {
                    *v = convert::<f64, T>(num as f64) / convert::<f64, T>(den as f64);
                }
                None => kept += 1,
            }
        }

        if kept > 0 {
            warn!(
                "rationalization kept {kept} entries in floating point: no rational with \
                 denominator <= {max_denominator} within tolerance"
            );
        }
    }

    fn sort_by_weights<Sw>(&mut self, weights: &Vector<T, Dyn, Sw>)
    where
        Sw: Storage<T, Dyn>,
    {
        let wb: Vec<T> = self.jb.iter().map(|&j| weights[j]).collect();
        let wn: Vec<T> = self.jn.iter().map(|&j| weights[j]).collect();
        let kb = sort_descending_permutation(&wb);
        let kn = sort_descending_permutation(&wn);
        self.update_ordering(&kb, &kn);
    }
}

fn is_permutation(k: &[usize], len: usize) -> bool {
    if k.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for &i in k {
        if i >= len || seen[i] {
            return false;
        }
        seen[i] = true;
    }
    true
}

/// Finds the rational number closest to `x` among those with denominator
/// not greater than `max_denominator`, using the continued-fraction
/// expansion of `x`. Ties break toward the smaller denominator. Returns
/// `None` when the closest such rational is further from `x` than the
/// round-off tolerance.
fn nearest_rational(x: f64, max_denominator: u64) -> Option<(i64, i64)> {
    if !x.is_finite() || x.abs() >= 2f64.powi(52) {
        return None;
    }

    let max_den = max_denominator.max(1) as i128;

    let (mut p0, mut q0): (i128, i128) = (1, 0);
    let (mut p1, mut q1): (i128, i128) = (x.floor() as i128, 1);
    let mut frac = x - x.floor();

    loop {
        if frac < f64::EPSILON {
            break;
        }
        let rec = frac.recip();
        let a = rec.floor();
        if a >= 9.0e15 {
            break;
        }

        let ai = a as i128;
        let p2 = ai * p1 + p0;
        let q2 = ai * q1 + q0;

        if q2 > max_den {
            // The best approximation with a bounded denominator is either
            // the last convergent or the furthest semiconvergent that
            // still fits the bound.
            let k = (max_den - q0) / q1;
            if k > 0 {
                let ps = k * p1 + p0;
                let qs = k * q1 + q0;
                let e1 = (x - ratio(p1, q1)).abs();
                let es = (x - ratio(ps, qs)).abs();
                if es < e1 {
                    p1 = ps;
                    q1 = qs;
                }
            }
            break;
        }

        (p0, q0) = (p1, q1);
        (p1, q1) = (p2, q2);
        frac = rec - a;
    }

    let tol = f64::EPSILON.sqrt() * x.abs().max(1.0);
    if (x - ratio(p1, q1)).abs() > tol {
        return None;
    }

    let num = i64::try_from(p1).ok()?;
    let den = i64::try_from(q1).ok()?;
    Some((num, den))
}

fn ratio(p: i128, q: i128) -> f64 {
    p as f64 / q as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::{dmatrix, dvector};

    use crate::testing::*;

    fn check_canonical_form(canonicalizer: &Canonicalizer<f64>, w: &DMatrix<f64>) {
        let ordering = canonicalizer.ordering();
        let wq = w.select_columns(ordering.iter());
        let c = canonicalizer.r() * wq;

        assert_abs_diff_eq!(c, canonicalizer.canonical(), epsilon = 1e-9);
    }

    #[test]
    fn canonical_form() {
        let w = pascal_matrix::<f64>(3, 6);
        let canonicalizer = Canonicalizer::new(&w);

        assert_eq!(canonicalizer.num_basic_variables(), 3);
        assert_eq!(canonicalizer.num_nonbasic_variables(), 3);
        check_canonical_form(&canonicalizer, &w);
    }

    #[test]
    fn partitions_are_disjoint_and_complete() {
        let mut rng = fastrand::Rng::with_seed(17);
        let w = random_matrix::<f64>(4, 9, &mut rng);
        let canonicalizer = Canonicalizer::new(&w);

        let mut all = canonicalizer.ordering();
        all.sort_unstable();
        assert_eq!(all, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn rank_deficiency_is_reported() {
        let mut w = pascal_matrix::<f64>(3, 5);
        let (row0, row1) = (w.row(0).clone_owned(), w.row(1).clone_owned());
        w.set_row(2, &(row0 - row1));

        let canonicalizer = Canonicalizer::new(&w);

        assert_eq!(canonicalizer.num_basic_variables(), 2);
        assert_eq!(canonicalizer.independent_rows().len(), 2);
        check_canonical_form(&canonicalizer, &w);
    }

    #[test]
    fn compute_is_deterministic() {
        let w = pascal_matrix::<f64>(3, 6);

        let first = Canonicalizer::new(&w);
        let second = Canonicalizer::new(&w);

        assert_eq!(first.r(), second.r());
        assert_eq!(first.s(), second.s());
        assert_eq!(first.ordering(), second.ordering());
    }

    #[test]
    fn swap_twice_restores() {
        let mut rng = fastrand::Rng::with_seed(3);
        let w = random_matrix::<f64>(3, 7, &mut rng);
        let mut canonicalizer = Canonicalizer::new(&w);

        let r = canonicalizer.r().clone();
        let s = canonicalizer.s().clone();
        let jb = canonicalizer.basic().to_vec();
        let jn = canonicalizer.nonbasic().to_vec();

        canonicalizer.swap(1, 2);
        assert_ne!(canonicalizer.basic(), &jb[..]);
        canonicalizer.swap(1, 2);

        assert_eq!(canonicalizer.basic(), &jb[..]);
        assert_eq!(canonicalizer.nonbasic(), &jn[..]);
        assert_abs_diff_eq!(canonicalizer.r(), &r, epsilon = 1e-12);
        assert_abs_diff_eq!(canonicalizer.s(), &s, epsilon = 1e-12);
    }

    #[test]
    fn weights_select_the_heaviest_basis() {
        let mut rng = fastrand::Rng::with_seed(11);
        let w = random_matrix::<f64>(3, 8, &mut rng);
        let mut canonicalizer = Canonicalizer::new(&w);

        let weights = dvector![1.0, 7.0, 2.0, 8.0, 3.0, 6.0, 4.0, 5.0];
        canonicalizer.update_weights(&weights);
        check_canonical_form(&canonicalizer, &w);

        // Every basic variable must outweigh every non-basic one, unless
        // the pivot connecting them is negligible (which a dense random
        // matrix does not produce).
        let min_basic = canonicalizer
            .basic()
            .iter()
            .map(|&j| weights[j])
            .fold(f64::INFINITY, f64::min);
        let max_nonbasic = canonicalizer
            .nonbasic()
            .iter()
            .map(|&j| weights[j])
            .fold(0.0, f64::max);

        assert!(min_basic >= max_nonbasic);

        // Both partitions are ordered by descending weight.
        for pair in canonicalizer.basic().windows(2) {
            assert!(weights[pair[0]] >= weights[pair[1]]);
        }
        for pair in canonicalizer.nonbasic().windows(2) {
            assert!(weights[pair[0]] >= weights[pair[1]]);
        }
    }

    #[test]
    fn degenerate_weights_keep_structurally_forced_basic() {
        // The first variable is the only one appearing in the first row,
        // so it must stay basic no matter how light it is.
        let w = dmatrix![
            1.0, 0.0, 0.0, 0.0;
            0.0, 1.0, 2.0, 3.0
        ];
        let mut canonicalizer = Canonicalizer::new(&w);

        let weights = dvector![0.0, 5.0, 6.0, 7.0];
        canonicalizer.update_weights(&weights);

        assert!(canonicalizer.basic().contains(&0));
        check_canonical_form(&canonicalizer, &w);
    }

    #[test]
    fn ordering_update() {
        let w = pascal_matrix::<f64>(3, 6);
        let mut canonicalizer = Canonicalizer::new(&w);

        let r = canonicalizer.r().clone();
        let s = canonicalizer.s().clone();
        let jb = canonicalizer.basic().to_vec();
        let jn = canonicalizer.nonbasic().to_vec();

        let kb = vec![2, 1, 0];
        let kn = vec![2, 1, 0];
        canonicalizer.update_ordering(&kb, &kn);

        assert_eq!(canonicalizer.basic(), &[jb[2], jb[1], jb[0]]);
        assert_eq!(canonicalizer.nonbasic(), &[jn[2], jn[1], jn[0]]);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(canonicalizer.r()[(i, j)], r[(2 - i, j)]);
                assert_eq!(canonicalizer.s()[(i, j)], s[(2 - i, 2 - j)]);
            }
        }
        check_canonical_form(&canonicalizer, &w);
    }

    #[test]
    fn rationalize_removes_roundoff() {
        let w = dmatrix![
            3.0, 1.0, 2.0;
            1.0, 3.0, 1.0
        ];
        let mut canonicalizer = Canonicalizer::new(&w);
        canonicalizer.rationalize(16);

        // The inverse of the basic block [[3, 1], [1, 3]] has entries with
        // denominator 8, which must be recovered exactly.
        let ordering = canonicalizer.ordering();
        let wq = w.select_columns(ordering.iter());
        let c = canonicalizer.r() * wq;

        assert_eq!(c, canonicalizer.canonical());
    }

    #[test]
    fn nearest_rational_convergents() {
        assert_eq!(nearest_rational(0.5, 10), Some((1, 2)));
        assert_eq!(nearest_rational(1.0 / 3.0, 100), Some((1, 3)));
        assert_eq!(nearest_rational(2.0 / 7.0 + 1e-13, 50), Some((2, 7)));
        assert_eq!(nearest_rational(-5.0 / 8.0, 16), Some((-5, 8)));
        assert_eq!(nearest_rational(4.0, 10), Some((4, 1)));
    }

    #[test]
    fn nearest_rational_falls_back_when_bound_is_too_small() {
        // No rational with denominator <= 2 is close enough to 1/3.
        assert_eq!(nearest_rational(1.0 / 3.0, 2), None);
        assert_eq!(nearest_rational(f64::NAN, 10), None);
    }
}
