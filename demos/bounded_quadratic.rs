//! A small interior-point iteration built on top of the stepper: minimize
//! `(x₀ - 2)² + (x₁ - 1)²` subject to `x₀ + x₁ = 3/2` and `0 ≤ x ≤ 1`.
//!
//! The optimum sits on the upper bound of the first variable, at
//! `x = (1, 1/2)`. The outer loop here is deliberately minimal: full
//! Newton steps with a fraction-to-boundary rule and a geometrically
//! shrinking central-path parameter.

use sella::nalgebra as na;

use na::{dmatrix, dvector, DMatrix, DVector};
use sella::{Domain, StepProblem, Stepper, StepperOptions};

const THETA: f64 = 0.995;

fn main() {
    let target = dvector![2.0, 1.0];
    let a = dmatrix![1.0, 1.0];
    let b = dvector![1.5];
    let dom = Domain::rect(vec![0.0, 0.0], vec![1.0, 1.0]);

    let mut options = StepperOptions::default();
    let mut mu = 0.1;
    options.set_mu(mu);

    let mut stepper = Stepper::with_options(&a, dom.clone(), 0, options);

    let mut x = dvector![0.5, 0.5];
    let mut y = DVector::zeros(1);
    let mut z = dvector![1.0, 1.0];
    let mut w = dvector![-1.0, -1.0];

    let j = DMatrix::zeros(0, 2);
    let hres = DVector::zeros(0);
    let h = 2.0 * DMatrix::identity(2, 2);

    for iteration in 0..40 {
        let g = 2.0 * (&x - &target);
        let problem = StepProblem::new(&x, &y, &z, &w, &g, &h, &j, &hres, &b);

        stepper.decompose(&problem).expect("decomposition failed");
        stepper.solve(&problem).expect("solve failed");

        let step = stepper.step();
        let (dx, dy, dz, dw) = (
            step.dx.clone_owned(),
            step.dy.clone_owned(),
            step.dz.clone_owned(),
            step.dw.clone_owned(),
        );

        // Fraction-to-boundary rule: keep x strictly inside the box, the
        // lower multipliers positive and the upper multipliers negative.
        let mut alpha: f64 = 1.0;
        for i in 0..2 {
            if dx[i] < 0.0 {
                alpha = alpha.min(THETA * (x[i] - dom.lower()[i]) / -dx[i]);
            }
            if dx[i] > 0.0 {
                alpha = alpha.min(THETA * (dom.upper()[i] - x[i]) / dx[i]);
            }
            if dz[i] < 0.0 {
                alpha = alpha.min(THETA * z[i] / -dz[i]);
            }
            if dw[i] > 0.0 {
                alpha = alpha.min(THETA * -w[i] / dw[i]);
            }
        }

        x += alpha * &dx;
        y += alpha * &dy;
        z += alpha * &dz;
        w += alpha * &dw;

        let progress = alpha * dx.norm();
        println!(
            "iteration {iteration:2}: x = ({:.6}, {:.6}), mu = {mu:.1e}, step = {progress:.2e}",
            x[0], x[1]
        );

        if progress <= 1e-10 && mu <= 1e-8 {
            break;
        }

        mu = (0.2 * mu).max(1e-9);
        options.set_mu(mu);
        stepper.set_options(options);
    }

    println!("solution: x = ({:.6}, {:.6}), expected (1, 0.5)", x[0], x[1]);
}
