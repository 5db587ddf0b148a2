use criterion::{criterion_group, criterion_main, Criterion};
use sella::{
    nalgebra as na,
    testing::{random_matrix, random_spd_matrix, random_vector},
    SaddlePointMatrix, SaddlePointMethod, SaddlePointOptions, SaddlePointSolver,
};

use na::{DMatrix, DVector};

const N: usize = 60;
const M: usize = 12;

fn decompose_and_solve(method: SaddlePointMethod, h: &DMatrix<f64>, w: &DMatrix<f64>) {
    let mut rng = fastrand::Rng::with_seed(99);
    let a = random_vector(N, &mut rng);
    let b = random_vector(M, &mut rng);

    let mut options = SaddlePointOptions::default();
    options.set_method(method);

    let mut solver = SaddlePointSolver::with_options(N, M, options);
    solver
        .decompose(SaddlePointMatrix::new(h, w, None, &[]))
        .unwrap();

    let mut x = DVector::zeros(N);
    let mut y = DVector::zeros(M);
    solver.solve(&a, &b, &mut x, &mut y).unwrap();
    assert!(x.iter().all(|v| v.is_finite()));
}

fn saddle_point_methods(c: &mut Criterion) {
    let mut rng = fastrand::Rng::with_seed(42);
    let h = random_spd_matrix(N, &mut rng);
    let hdiag = DMatrix::from_diagonal(&DVector::from_fn(N, |i, _| 1.0 + i as f64));
    let w = random_matrix(M, N, &mut rng);

    c.bench_function("partial piv lu", |b| {
        b.iter(|| decompose_and_solve(SaddlePointMethod::PartialPivLU, &h, &w))
    });

    c.bench_function("full piv lu", |b| {
        b.iter(|| decompose_and_solve(SaddlePointMethod::FullPivLU, &h, &w))
    });

    c.bench_function("nullspace", |b| {
        b.iter(|| decompose_and_solve(SaddlePointMethod::Nullspace, &h, &w))
    });

    c.bench_function("rangespace diagonal", |b| {
        b.iter(|| decompose_and_solve(SaddlePointMethod::RangespaceDiagonal, &hdiag, &w))
    });
}

criterion_group!(benches, saddle_point_methods);
criterion_main!(benches);
