//! Null-space method: eliminates the basic variables through the
//! constraint block and solves a reduced system on the non-basic (free)
//! variables, whose dimension is `n - nb - nf`.
//!
//! With the canonical form `R·W·Q = [I S]`, the columns `Q·[-S; I]` span
//! the null space of `W`, so the reduced matrix is the projection
//! `Zᵀ·H·Z` of the Hessian onto that space. Suitable for dense Hessians
//! when the constraints remove a large part of the dimension.

use nalgebra::{
    storage::{Storage, StorageMut},
    DMatrix, Dyn, Vector, LU,
};

use crate::core::{RealField, SolveError};

use super::{check_pivots, Reduction};

#[derive(Debug, Clone)]
pub(super) struct NullspaceFactors<T: RealField + Copy> {
    /// Factorization of the reduced matrix; `None` when the reduced
    /// dimension is zero.
    lu: Option<LU<T, Dyn, Dyn>>,
    hbb: DMatrix<T>,
    hbf: DMatrix<T>,
    /// `Hfb - Sfᵀ·Hbb`, reused when building the reduced right-hand side.
    mf: DMatrix<T>,
    sf: DMatrix<T>,
    sphi: DMatrix<T>,
    jf: Vec<usize>,
    red: Reduction<T>,
}

pub(super) fn decompose<T: RealField + Copy>(
    hm: &DMatrix<T>,
    red: Reduction<T>,
    tolerance: T,
) -> Result<NullspaceFactors<T>, SolveError> {
    let jf = red.free_nonbasic();

    let sf = red.s.select_columns(red.jn_free.iter());
    let sphi = red.s.select_columns(red.jn_fixed.iter());

    let hbb = hm.select_rows(red.jb.iter()).select_columns(red.jb.iter());
    let hbf = hm.select_rows(red.jb.iter()).select_columns(jf.iter());
    let hfb = hm.select_rows(jf.iter()).select_columns(red.jb.iter());
    let hff = hm.select_rows(jf.iter()).select_columns(jf.iter());

    let mf = hfb - sf.tr_mul(&hbb);
    let reduced = hff - sf.tr_mul(&hbf) - &mf * &sf;

    let lu = if jf.is_empty() {
        None
    } else {
        let lu = reduced.lu();
        check_pivots(lu.u().diagonal().iter().copied(), tolerance)?;
        Some(lu)
    };

    Ok(NullspaceFactors {
        lu,
        hbb,
        hbf,
        mf,
        sf,
        sphi,
        jf,
        red,
    })
}

pub(super) fn solve<T, Sa, Sb, Sx, Sy>(
    factors: &NullspaceFactors<T>,
    a: &Vector<T, Dyn, Sa>,
    b: &Vector<T, Dyn, Sb>,
    x: &mut Vector<T, Dyn, Sx>,
    y: &mut Vector<T, Dyn, Sy>,
) -> Result<(), SolveError>
where
    T: RealField + Copy,
    Sa: Storage<T, Dyn>,
    Sb: Storage<T, Dyn>,
    Sx: StorageMut<T, Dyn>,
    Sy: StorageMut<T, Dyn>,
{
    let red = &factors.red;

    let ab = Reduction::gather(a, &red.jb);
    let af = Reduction::gather(a, &factors.jf);
    let btil = red.reduced_b(&factors.sphi, a, b);

    let mut xf = af - factors.sf.tr_mul(&ab) - &factors.mf * &btil;
    if let Some(lu) = factors.lu.as_ref() {
        if !lu.solve_mut(&mut xf) {
            return Err(SolveError::NumericalFailure);
        }
    }

    let xb = btil - &factors.sf * &xf;
    let yp = ab - &factors.hbb * &xb - &factors.hbf * &xf;

    red.scatter(&xb, &xf, a, x);
    red.multipliers(&yp, y);
    Ok(())
}
