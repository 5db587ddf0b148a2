//! Stability classification of the primal variables.
//!
//! A variable sitting exactly on one of its bounds is *unstable* when the
//! sign of its reduced gradient pushes it out of the feasible region: the
//! bound would become active again immediately after any step. Such
//! variables are pinned at their bound for the current step.
//!
//! The classification works on the canonical form of the constraint
//! matrix. With the gradient split into its basic part `g_b` and non-basic
//! part `g_n`, the multiplier estimate is `λ = Rᵀ·g_b` and the instability
//! signal is
//!
//! ```text
//! s = g_n - Sᵀ·g_b    on the non-basic variables,
//! s = 0               on the basic variables.
//! ```

use nalgebra::{storage::Storage, DVector, Dyn, Vector};

use crate::canonical::Canonicalizer;
use crate::core::{index::move_right_if, RealField};

/// Classifier of the primal variables into stable, lower-unstable and
/// upper-unstable partitions.
#[derive(Debug, Clone)]
pub struct Stability<T: RealField + Copy> {
    jsu: Vec<usize>,
    ns: usize,
    nlu: usize,
    nuu: usize,
    s: DVector<T>,
    lambda: DVector<T>,
}

/// View of the current stability partition.
#[derive(Debug, Clone, Copy)]
pub struct StabilityStatus<'a, T: RealField + Copy> {
    /// Indices of the stable variables.
    pub js: &'a [usize],
    /// Indices of all unstable variables (lower-unstable first).
    pub ju: &'a [usize],
    /// Indices of the lower-unstable variables.
    pub jlu: &'a [usize],
    /// Indices of the upper-unstable variables.
    pub juu: &'a [usize],
    /// The instability signal, zero on basic and stable variables.
    pub s: &'a DVector<T>,
    /// The multiplier estimate `λ = Rᵀ·g_b`.
    pub lambda: &'a DVector<T>,
}

impl<T: RealField + Copy> Stability<T> {
    /// Initializes the classifier for `n` variables; all variables start
    /// stable.
    pub fn new(n: usize) -> Self {
        Self {
            jsu: (0..n).collect(),
            ns: n,
            nlu: 0,
            nuu: 0,
            s: DVector::zeros(n),
            lambda: DVector::zeros(0),
        }
    }

    /// Updates the classification from the current point, gradient and
    /// bounds, using the canonical form of the constraint matrix.
    ///
    /// The partition is computed stably: upper-unstable variables move to
    /// the tail first, then lower-unstable variables to the tail of the
    /// remaining prefix, so the relative order of the index vector evolves
    /// deterministically across iterations.
    ///
    /// # Panics
    ///
    /// Panics if a vector dimension disagrees with the number of variables
    /// of the canonical form.
    pub fn update<Sx, Sg, Sl, Su>(
        &mut self,
        canonicalizer: &Canonicalizer<T>,
        x: &Vector<T, Dyn, Sx>,
        g: &Vector<T, Dyn, Sg>,
        xlower: &Vector<T, Dyn, Sl>,
        xupper: &Vector<T, Dyn, Su>,
    ) where
        Sx: Storage<T, Dyn>,
        Sg: Storage<T, Dyn>,
        Sl: Storage<T, Dyn>,
        Su: Storage<T, Dyn>,
    {
        let n = self.jsu.len();
        assert!(canonicalizer.num_variables() == n, "canonical form has invalid dimension");
        assert!(x.nrows() == n, "vector x has invalid dimension");
        assert!(g.nrows() == n, "vector g has invalid dimension");
        assert!(xlower.nrows() == n, "lower bounds have invalid dimension");
        assert!(xupper.nrows() == n, "upper bounds have invalid dimension");

        let jb = canonicalizer.basic();
        let jn = canonicalizer.nonbasic();

        let gb = DVector::from_iterator(jb.len(), jb.iter().map(|&j| g[j]));

        self.lambda = canonicalizer.r().tr_mul(&gb);

        let sn = canonicalizer.s().tr_mul(&gb);
        for &j in jb {
            self.s[j] = T::zero();
        }
        for (k, &j) in jn.iter().enumerate() {
            self.s[j] = g[j] - sn[k];
        }

        let s = &self.s;
        let pos1 = move_right_if(&mut self.jsu, |i| x[i] == xupper[i] && s[i] < T::zero());
        let pos2 = move_right_if(&mut self.jsu[..pos1], |i| {
            x[i] == xlower[i] && s[i] > T::zero()
        });

        self.ns = pos2;
        self.nlu = pos1 - pos2;
        self.nuu = n - pos1;
    }

    /// Gets the number of stable variables.
    pub fn num_stable(&self) -> usize {
        self.ns
    }

    /// Gets the number of lower-unstable variables.
    pub fn num_lower_unstable(&self) -> usize {
        self.nlu
    }

    /// Gets the number of upper-unstable variables.
    pub fn num_upper_unstable(&self) -> usize {
        self.nuu
    }

    /// Gets the indices of the unstable variables.
    pub fn unstable(&self) -> &[usize] {
        &self.jsu[self.ns..]
    }

    /// Gets the current partition.
    pub fn status(&self) -> StabilityStatus<'_, T> {
        StabilityStatus {
            js: &self.jsu[..self.ns],
            ju: &self.jsu[self.ns..],
            jlu: &self.jsu[self.ns..self.ns + self.nlu],
            juu: &self.jsu[self.ns + self.nlu..],
            s: &self.s,
            lambda: &self.lambda,
        }
    }
}
