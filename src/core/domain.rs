//! Problem domain definition (dimensionality, bound constraints, fixed
//! variables).

use std::iter::FromIterator;

use nalgebra::{storage::StorageMut, Dim, DVector, Vector};

use super::base::RealField;

/// Domain of the primal variables.
///
/// Every variable carries a lower and an upper bound. Negative and positive
/// infinity indicate that the variable is unbounded in that direction. A
/// variable whose bounds coincide is *fixed*: it is held at that value and
/// its row and column are neutralized in the linear systems assembled from
/// the domain.
#[derive(Debug, Clone)]
pub struct Domain<T: RealField + Copy> {
    lower: DVector<T>,
    upper: DVector<T>,
    lower_bounded: Vec<usize>,
    upper_bounded: Vec<usize>,
    fixed: Vec<usize>,
}

impl<T: RealField + Copy> Domain<T> {
    /// Creates unconstrained domain with given dimensionality.
    pub fn unconstrained(dim: usize) -> Self {
        assert!(dim > 0, "empty domain");

        let inf = T::from_subset(&f64::INFINITY);
        Self::rect(vec![-inf; dim], vec![inf; dim])
    }

    /// Creates rectangular domain with given lower and upper bounds.
    ///
    /// Positive and negative infinity can be used to indicate a value
    /// unbounded in that dimension and direction. Equal bounds fix the
    /// variable to that value.
    ///
    /// # Panics
    ///
    /// Panics if the bounds differ in length, are empty or if `lower[i] >
    /// upper[i]` for some `i`.
    pub fn rect(lower: Vec<T>, upper: Vec<T>) -> Self {
        assert!(
            lower.len() == upper.len(),
            "lower and upper have different size"
        );
        assert!(!lower.is_empty(), "empty domain");

        let mut lower_bounded = Vec::new();
        let mut upper_bounded = Vec::new();
        let mut fixed = Vec::new();

        for (i, (&li, &ui)) in lower.iter().zip(upper.iter()).enumerate() {
            assert!(li <= ui, "invalid bounds");

            if li == ui {
                fixed.push(i);
                continue;
            }
            if li.is_finite() {
                lower_bounded.push(i);
            }
            if ui.is_finite() {
                upper_bounded.push(i);
            }
        }

        Self {
            lower: DVector::from_vec(lower),
            upper: DVector::from_vec(upper),
            lower_bounded,
            upper_bounded,
            fixed,
        }
    }

    /// Gets the dimensionality of the domain.
    pub fn dim(&self) -> usize {
        self.lower.nrows()
    }

    /// Gets the lower bounds.
    pub fn lower(&self) -> &DVector<T> {
        &self.lower
    }

    /// Gets the upper bounds.
    pub fn upper(&self) -> &DVector<T> {
        &self.upper
    }

    /// Gets the indices of variables with a finite lower bound, excluding
    /// the fixed ones.
    pub fn lower_bounded(&self) -> &[usize] {
        &self.lower_bounded
    }

    /// Gets the indices of variables with a finite upper bound, excluding
    /// the fixed ones.
    pub fn upper_bounded(&self) -> &[usize] {
        &self.upper_bounded
    }

    /// Gets the indices of the fixed variables (equal bounds).
    pub fn fixed(&self) -> &[usize] {
        &self.fixed
    }

    /// Determines whether the variable `i` is fixed.
    pub fn is_fixed(&self, i: usize) -> bool {
        self.lower[i] == self.upper[i]
    }

    /// Projects given point into the domain.
    ///
    /// Returns true if the point was not feasible and got clamped.
    pub fn project<D, Sx>(&self, x: &mut Vector<T, D, Sx>) -> bool
    where
        D: Dim,
        Sx: StorageMut<T, D>,
    {
        let mut not_feasible = false;

        self.lower
            .iter()
            .zip(self.upper.iter())
            .zip(x.iter_mut())
            .for_each(|((li, ui), xi)| {
                if &*xi < li {
                    *xi = *li;
                    not_feasible = true;
                } else if &*xi > ui {
                    *xi = *ui;
                    not_feasible = true;
                }
            });

        not_feasible
    }
}

impl<T: RealField + Copy> FromIterator<(T, T)> for Domain<T> {
    fn from_iter<I: IntoIterator<Item = (T, T)>>(iter: I) -> Self {
        let (lower, upper) = iter.into_iter().unzip();
        Self::rect(lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::dvector;

    #[test]
    fn index_sets() {
        let inf = f64::INFINITY;
        let dom = Domain::rect(vec![0.0, -inf, 1.0, 3.0], vec![inf, 2.0, 1.0, 5.0]);

        assert_eq!(dom.lower_bounded(), &[0, 3]);
        assert_eq!(dom.upper_bounded(), &[1, 3]);
        assert_eq!(dom.fixed(), &[2]);
        assert!(dom.is_fixed(2));
        assert!(!dom.is_fixed(0));
    }

    #[test]
    fn projection() {
        let dom = Domain::rect(vec![0.0, 0.0], vec![1.0, 1.0]);

        let mut x = dvector![10.0, -10.0];
        assert!(dom.project(&mut x));
        assert_eq!(x, dvector![1.0, 0.0]);

        let mut x = dvector![0.5, 0.5];
        assert!(!dom.project(&mut x));
    }

    #[test]
    #[should_panic]
    fn invalid_bounds() {
        Domain::rect(vec![1.0], vec![0.0]);
    }
}
