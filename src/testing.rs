//! Fixture matrices and vectors for tests and benchmarks.
//!
//! The generators are deterministic: the structured ones are built from
//! the Pascal triangle, the random ones take a caller-seeded
//! [`fastrand::Rng`].

#![allow(unused)]

use nalgebra::{convert, DMatrix, DVector};

use crate::core::RealField;

/// Returns the Pascal matrix with given dimensions: ones in the first row
/// and column, every other entry the sum of its left and upper neighbors.
/// Any leading square block is non-singular.
pub fn pascal_matrix<T: RealField + Copy>(m: usize, n: usize) -> DMatrix<T> {
    let mut a = DMatrix::from_element(m, n, T::one());
    for i in 1..m {
        for j in 1..n {
            a[(i, j)] = a[(i, j - 1)] + a[(i - 1, j)];
        }
    }
    a
}

/// Returns a symmetric positive-definite matrix with eigenvalues `1..=n`,
/// built by conjugating a diagonal with the orthogonal factor of the
/// Pascal matrix.
pub fn non_singular_matrix<T: RealField + Copy>(n: usize) -> DMatrix<T> {
    let q = pascal_matrix::<T>(n, n).qr().q();
    let d = DVector::from_fn(n, |i, _| convert::<f64, T>((i + 1) as f64));
    &q * DMatrix::from_diagonal(&d) * q.transpose()
}

/// Returns a matrix with entries uniformly drawn from `(-1, 1)`.
pub fn random_matrix<T: RealField + Copy>(m: usize, n: usize, rng: &mut fastrand::Rng) -> DMatrix<T> {
    DMatrix::from_fn(m, n, |_, _| convert::<f64, T>(2.0 * rng.f64() - 1.0))
}

/// Returns a vector with entries uniformly drawn from `(-1, 1)`.
pub fn random_vector<T: RealField + Copy>(n: usize, rng: &mut fastrand::Rng) -> DVector<T> {
    DVector::from_fn(n, |_, _| convert::<f64, T>(2.0 * rng.f64() - 1.0))
}

/// Returns a random, well-conditioned symmetric positive-definite matrix.
pub fn random_spd_matrix<T: RealField + Copy>(n: usize, rng: &mut fastrand::Rng) -> DMatrix<T> {
    let a = random_matrix::<T>(n, n, rng);
    let mut spd = &a * a.transpose();
    let shift = convert::<f64, T>(n as f64);
    for i in 0..n {
        spd[(i, i)] += shift;
    }
    spd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pascal() {
        let a = pascal_matrix::<f64>(3, 4);
        assert_eq!(a[(0, 3)], 1.0);
        assert_eq!(a[(1, 1)], 2.0);
        assert_eq!(a[(2, 3)], 10.0);
    }

    #[test]
    fn non_singular() {
        let a = non_singular_matrix::<f64>(5);
        assert!(a.determinant().abs() > 1.0);
    }

    #[test]
    fn random_is_deterministic() {
        let mut rng1 = fastrand::Rng::with_seed(1);
        let mut rng2 = fastrand::Rng::with_seed(1);
        assert_eq!(
            random_matrix::<f64>(3, 3, &mut rng1),
            random_matrix::<f64>(3, 3, &mut rng2)
        );
    }
}
