//! Range-space method for diagonal Hessians: eliminates the non-basic
//! variables through the inverse of the Hessian diagonal and solves a
//! reduced system of dimension `nb` on the canonical multipliers.
//!
//! With `H = diag(g)` the canonical equations reduce to
//!
//! ```text
//! Ub·y' = ab - gb∘b̃ + gb∘(Sf·(af / gf)),      Ub = I + diag(gb)·Sf·diag(1/gf)·Sfᵀ
//! ```
//!
//! followed by back-substitution of the non-basic and basic primal parts.
//! The non-basic partition is processed in two sub-ranges, split by
//! whether the diagonal entry dominates the scale of its canonical column;
//! a sub-range of size zero skips its contribution.

use nalgebra::{
    storage::{Storage, StorageMut},
    DMatrix, DVector, Dyn, Vector, LU,
};

use crate::core::{RealField, SolveError};

use super::{check_pivots, Reduction};

#[derive(Debug, Clone)]
pub(super) struct RangespaceFactors<T: RealField + Copy> {
    /// Factorization of `Ub`; `None` when there are no basic variables.
    lu: Option<LU<T, Dyn, Dyn>>,
    gb: DVector<T>,
    gf_inv: DVector<T>,
    sf: DMatrix<T>,
    sphi: DMatrix<T>,
    jf: Vec<usize>,
    /// Positions within the free non-basic partition whose diagonal entry
    /// is moderate relative to the canonical column scale.
    moderate: Vec<usize>,
    /// Positions whose diagonal entry dominates the canonical column
    /// scale.
    dominant: Vec<usize>,
    red: Reduction<T>,
}

pub(super) fn decompose<T: RealField + Copy>(
    hm: &DMatrix<T>,
    red: Reduction<T>,
    tolerance: T,
) -> Result<RangespaceFactors<T>, SolveError> {
    let jf = red.free_nonbasic();
    let nb = red.nb();

    let sf = red.s.select_columns(red.jn_free.iter());
    let sphi = red.s.select_columns(red.jn_fixed.iter());

    let diag = hm.diagonal();
    let gb = Reduction::gather(&diag, &red.jb);
    let gf = Reduction::gather(&diag, &jf);

    // The diagonal of the non-basic partition is inverted, so it must be
    // bounded away from zero.
    let gmax = if diag.nrows() > 0 { diag.amax() } else { T::zero() };
    let threshold = tolerance * gmax.max(T::one());
    if gf.iter().any(|v| v.abs() <= threshold) {
        return Err(SolveError::NumericalFailure);
    }
    let gf_inv = gf.map(|v| T::one() / v);

    // Split the non-basic partition by diagonal dominance over the scale
    // of the canonical column.
    let kappa = T::one() / T::EPSILON_SQRT;
    let mut moderate = Vec::new();
    let mut dominant = Vec::new();
    for (i, v) in gf.iter().enumerate() {
        let mut scale = T::one();
        for k in 0..nb {
            let s = sf[(k, i)].abs();
            if s > scale {
                scale = s;
            }
        }
        if v.abs() > kappa * scale {
            dominant.push(i);
        } else {
            moderate.push(i);
        }
    }

    // Ub = I + Ls·Ssᵀ + Lu·Suᵀ, accumulated per sub-range.
    let mut ub = DMatrix::identity(nb, nb);
    for group in [&moderate, &dominant] {
        if group.is_empty() {
            continue;
        }
        let sg = sf.select_columns(group.iter());
        let mut lg = sg.clone();
        for (c, &p) in group.iter().enumerate() {
            lg.column_mut(c).scale_mut(gf_inv[p]);
        }
        for r in 0..nb {
            lg.row_mut(r).scale_mut(gb[r]);
        }
        ub += lg * sg.transpose();
    }

    let lu = if nb > 0 {
        let lu = ub.lu();
        check_pivots(lu.u().diagonal().iter().copied(), tolerance)?;
        Some(lu)
    } else {
        None
    };

    Ok(RangespaceFactors {
        lu,
        gb,
        gf_inv,
        sf,
        sphi,
        jf,
        moderate,
        dominant,
        red,
    })
}

pub(super) fn solve<T, Sa, Sb, Sx, Sy>(
    factors: &RangespaceFactors<T>,
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

    let scaled_af = af.component_mul(&factors.gf_inv);
    let mut yp = &ab - factors.gb.component_mul(&btil)
        + factors.gb.component_mul(&(&factors.sf * &scaled_af));
    if let Some(lu) = factors.lu.as_ref() {
        if !lu.solve_mut(&mut yp) {
            return Err(SolveError::NumericalFailure);
        }
    }

    // Back-substitute the non-basic parts, dominant sub-range first, then
    // the basic part.
    let sty = factors.sf.tr_mul(&yp);
    let mut xf = DVector::zeros(factors.jf.len());
    for group in [&factors.dominant, &factors.moderate] {
        for &p in group.iter() {
            xf[p] = (af[p] - sty[p]) * factors.gf_inv[p];
        }
    }
    let xb = &btil - &factors.sf * &xf;

    red.scatter(&xb, &xf, a, x);
    red.multipliers(&yp, y);
    Ok(())
}
