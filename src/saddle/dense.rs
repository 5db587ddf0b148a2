//! Full-system methods: partial- and full-pivoting LU over the assembled
//! canonical saddle-point matrix.
//!
//! Both methods factor the dense system of dimension `n + nb`, where `nb`
//! is the number of linearly independent constraint rows. They take no
//! advantage of the block structure beyond the canonical reduction itself.

use nalgebra::{
    storage::{Storage, StorageMut},
    DMatrix, DMatrixView, DVector, Dyn, FullPivLU, Vector, LU,
};

use crate::core::{RealField, SolveError};

use super::{check_pivots, Reduction};

#[derive(Debug, Clone)]
pub(super) struct PartialPivFactors<T: RealField + Copy> {
    lu: LU<T, Dyn, Dyn>,
    red: Reduction<T>,
}

#[derive(Debug, Clone)]
pub(super) struct FullPivFactors<T: RealField + Copy> {
    lu: FullPivLU<T, Dyn, Dyn>,
    red: Reduction<T>,
}

pub(super) fn decompose_partial<T: RealField + Copy>(
    hm: &DMatrix<T>,
    g: Option<DMatrixView<'_, T>>,
    red: Reduction<T>,
    tolerance: T,
) -> Result<PartialPivFactors<T>, SolveError> {
    let lu = assemble(hm, g, &red).lu();
    check_pivots(lu.u().diagonal().iter().copied(), tolerance)?;
    Ok(PartialPivFactors { lu, red })
}

pub(super) fn decompose_full<T: RealField + Copy>(
    hm: &DMatrix<T>,
    g: Option<DMatrixView<'_, T>>,
    red: Reduction<T>,
    tolerance: T,
) -> Result<FullPivFactors<T>, SolveError> {
    let lu = assemble(hm, g, &red).full_piv_lu();
    check_pivots(lu.u().diagonal().iter().copied(), tolerance)?;
    Ok(FullPivFactors { lu, red })
}

pub(super) fn solve_partial<T, Sa, Sb, Sx, Sy>(
    factors: &PartialPivFactors<T>,
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
    let mut u = rhs(&factors.red, a, b);
    if !factors.lu.solve_mut(&mut u) {
        return Err(SolveError::NumericalFailure);
    }
    unpack(&factors.red, &u, a, x, y);
    Ok(())
}

pub(super) fn solve_full<T, Sa, Sb, Sx, Sy>(
    factors: &FullPivFactors<T>,
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
    let mut u = rhs(&factors.red, a, b);
    if !factors.lu.solve_mut(&mut u) {
        return Err(SolveError::NumericalFailure);
    }
    unpack(&factors.red, &u, a, x, y);
    Ok(())
}

/// Assembles the canonical system
///
/// ```text
/// [ Hq  Cᵀ ]          C = [I S]
/// [ C   RGRᵀ ]
/// ```
///
/// with the variables in canonical order and the rows of fixed variables
/// replaced by identity rows (the masked Hessian already carries that
/// structure; the constraint-transpose block of those rows stays zero).
fn assemble<T: RealField + Copy>(
    hm: &DMatrix<T>,
    g: Option<DMatrixView<'_, T>>,
    red: &Reduction<T>,
) -> DMatrix<T> {
    let n = red.n;
    let nb = red.nb();
    let ord: Vec<usize> = red.jb.iter().chain(red.jn.iter()).copied().collect();

    let mut k = DMatrix::zeros(n + nb, n + nb);

    let hq = hm.select_rows(ord.iter()).select_columns(ord.iter());
    k.view_mut((0, 0), (n, n)).copy_from(&hq);

    for (pos, &var) in ord.iter().enumerate() {
        if red.is_fixed(var) {
            continue;
        }
        if pos < nb {
            k[(pos, n + pos)] = T::one();
        } else {
            for row in 0..nb {
                k[(pos, n + row)] = red.s[(row, pos - nb)];
            }
        }
    }

    for row in 0..nb {
        k[(n + row, row)] = T::one();
        for pos in nb..n {
            k[(n + row, pos)] = red.s[(row, pos - nb)];
        }
    }

    if let Some(g) = g {
        let rg = &red.r * g * red.r.transpose();
        k.view_mut((n, n), (nb, nb)).copy_from(&rg);
    }

    k
}

fn rhs<T, Sa, Sb>(red: &Reduction<T>, a: &Vector<T, Dyn, Sa>, b: &Vector<T, Dyn, Sb>) -> DVector<T>
where
    T: RealField + Copy,
    Sa: Storage<T, Dyn>,
    Sb: Storage<T, Dyn>,
{
    let n = red.n;
    let nb = red.nb();

    let mut u = DVector::zeros(n + nb);
    for (pos, &var) in red.jb.iter().chain(red.jn.iter()).enumerate() {
        u[pos] = a[var];
    }
    u.rows_mut(n, nb).copy_from(&(&red.r * b));
    u
}

fn unpack<T, Sa, Sx, Sy>(
    red: &Reduction<T>,
    u: &DVector<T>,
    a: &Vector<T, Dyn, Sa>,
    x: &mut Vector<T, Dyn, Sx>,
    y: &mut Vector<T, Dyn, Sy>,
) where
    T: RealField + Copy,
    Sa: Storage<T, Dyn>,
    Sx: StorageMut<T, Dyn>,
    Sy: StorageMut<T, Dyn>,
{
    let n = red.n;
    let nb = red.nb();

    for (pos, &var) in red.jb.iter().chain(red.jn.iter()).enumerate() {
        x[var] = u[pos];
    }
    for &var in &red.fixed {
        x[var] = a[var];
    }
    red.multipliers(&u.rows(n, nb).clone_owned(), y);
}
