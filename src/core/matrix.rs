//! Saddle-point coefficient matrices as borrowed views.

use nalgebra::{DMatrix, DMatrixView};

use super::base::RealField;

/// Coefficient matrix of a saddle-point problem.
///
/// The matrix has the block structure
///
/// ```text
/// [ H  Wᵀ ]
/// [ W  G  ]
/// ```
///
/// where `H` is the Hessian of an objective function, `W` the Jacobian of
/// the constraints and `G` an optional negative-semidefinite block. When
/// some variables are fixed, their rows are replaced by rows of the
/// identity matrix and the free rows lose the corresponding columns:
///
/// ```text
/// [ Hx  0  Wxᵀ ]
/// [ 0   I  0   ]
/// [ Wx  Wf G   ]
/// ```
///
/// The type only borrows the blocks; it is created per call and never
/// retained by the solvers.
#[derive(Debug, Clone, Copy)]
pub struct SaddlePointMatrix<'a, T: RealField + Copy> {
    h: DMatrixView<'a, T>,
    w: DMatrixView<'a, T>,
    g: Option<DMatrixView<'a, T>>,
    fixed: &'a [usize],
}

impl<'a, T: RealField + Copy> SaddlePointMatrix<'a, T> {
    /// Creates the matrix from its blocks and the indices of the fixed
    /// variables.
    ///
    /// # Panics
    ///
    /// Panics if the block dimensions are inconsistent or a fixed index is
    /// out of range.
    pub fn new(
        h: impl Into<DMatrixView<'a, T>>,
        w: impl Into<DMatrixView<'a, T>>,
        g: Option<DMatrixView<'a, T>>,
        fixed: &'a [usize],
    ) -> Self {
        let h = h.into();
        let w = w.into();

        let n = h.nrows();
        let m = w.nrows();
        assert!(h.ncols() == n, "Hessian matrix is not square");
        assert!(w.ncols() == n, "constraint matrix has invalid dimension");
        if let Some(g) = g.as_ref() {
            assert!(
                g.nrows() == m && g.ncols() == m,
                "G block has invalid dimension"
            );
        }
        assert!(
            fixed.iter().all(|&i| i < n),
            "fixed variable index out of range"
        );

        Self { h, w, g, fixed }
    }

    /// Gets the number of variables.
    pub fn nvars(&self) -> usize {
        self.h.nrows()
    }

    /// Gets the number of constraint rows.
    pub fn nrows_w(&self) -> usize {
        self.w.nrows()
    }

    /// Gets the Hessian block.
    pub fn h(&self) -> DMatrixView<'a, T> {
        self.h
    }

    /// Gets the constraint block.
    pub fn w(&self) -> DMatrixView<'a, T> {
        self.w
    }

    /// Gets the G block, if any.
    pub fn g(&self) -> Option<DMatrixView<'a, T>> {
        self.g
    }

    /// Gets the indices of the fixed variables.
    pub fn fixed(&self) -> &'a [usize] {
        self.fixed
    }

    /// Assembles the matrix into dense storage, honoring the fixed-variable
    /// structure.
    pub fn dense(&self) -> DMatrix<T> {
        let n = self.nvars();
        let m = self.nrows_w();
        let t = n + m;

        let mut dense = DMatrix::zeros(t, t);

        dense.view_mut((0, 0), (n, n)).copy_from(&masked(self.h, self.fixed));

        let mut wt = self.w.transpose();
        for &f in self.fixed {
            wt.row_mut(f).fill(T::zero());
        }
        dense.view_mut((0, n), (n, m)).copy_from(&wt);

        dense.view_mut((n, 0), (m, n)).copy_from(&self.w);
        if let Some(g) = self.g.as_ref() {
            dense.view_mut((n, n), (m, m)).copy_from(g);
        }

        dense
    }
}

/// Returns a copy of `h` with the rows and columns of the fixed variables
/// zeroed out and ones on their diagonal entries.
pub(crate) fn masked<T: RealField + Copy>(h: DMatrixView<'_, T>, fixed: &[usize]) -> DMatrix<T> {
    let mut hm = h.clone_owned();
    for &f in fixed {
        hm.row_mut(f).fill(T::zero());
        hm.column_mut(f).fill(T::zero());
        hm[(f, f)] = T::one();
    }
    hm
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::dmatrix;

    #[test]
    fn dense_assembly() {
        let h = dmatrix![2.0, 1.0; 1.0, 2.0];
        let w = dmatrix![1.0, -1.0];

        let spm = SaddlePointMatrix::new(&h, &w, None, &[]);
        let dense = spm.dense();

        let expected = dmatrix![
            2.0, 1.0, 1.0;
            1.0, 2.0, -1.0;
            1.0, -1.0, 0.0
        ];
        assert_eq!(dense, expected);
    }

    #[test]
    fn dense_assembly_with_fixed() {
        let h = dmatrix![2.0, 1.0; 1.0, 2.0];
        let w = dmatrix![1.0, -1.0];
        let fixed = [0];

        let spm = SaddlePointMatrix::new(&h, &w, None, &fixed);
        let dense = spm.dense();

        let expected = dmatrix![
            1.0, 0.0, 0.0;
            0.0, 2.0, -1.0;
            1.0, -1.0, 0.0
        ];
        assert_eq!(dense, expected);
    }

    #[test]
    #[should_panic]
    fn dimension_mismatch() {
        let h = dmatrix![2.0, 1.0; 1.0, 2.0];
        let w = dmatrix![1.0, -1.0, 0.0];

        SaddlePointMatrix::new(&h, &w, None, &[]);
    }
}
