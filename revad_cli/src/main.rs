//! Demo binary for the tensor autodiff workspace.
//!
//! Builds tensor expressions, computes gradients, validates them against
//! finite differences, and trains a small network. Set `RUST_LOG=debug`
//! for backward-pass and optimizer logging.

use revad_nn::prelude::*;
use revad_tensor::{finite_diff_grad, Error, Tensor};

fn main() -> Result<(), Error> {
    env_logger::init();

    println!("=== Tensor Autodiff Demo ===\n");

    gradient_demo()?;
    finite_difference_check()?;
    training_demo()?;
    Ok(())
}

/// z = sum(x * y + sin(x)), element-wise over vectors.
fn gradient_demo() -> Result<(), Error> {
    let x = Tensor::var("x", vec![0.5f64, 1.5, 2.5], vec![3]);
    let y = Tensor::var("y", vec![2.0f64, 3.0, 4.0], vec![3]);

    let z = x.mul(&y)?.add(&x.sin()?)?.sum(None, false);
    println!("Expression: z = sum(x * y + sin(x))");
    println!("Value:      z = {:.10}\n", z.item());

    let grads = z.backward()?;
    let aligned = gradients_for(&[&x, &y], &grads);
    println!("dz/dx = {:?}  (expected y + cos(x))", aligned[0].values());
    println!("dz/dy = {:?}  (expected x)\n", aligned[1].values());
    Ok(())
}

/// Validate a matmul + tanh gradient against central finite differences.
fn finite_difference_check() -> Result<(), Error> {
    let w_vals = vec![0.3f64, -0.2, 0.5, 0.1, -0.4, 0.25];
    let x = Tensor::from_vec(vec![1.0f64, -1.5], vec![2, 1]);

    let w = Tensor::var("w", w_vals.clone(), vec![3, 2]);
    let z = w.matmul(&x)?.tanh()?.sum(None, false);
    let grads = z.backward()?;
    let dw = &gradients_for(&[&w], &grads)[0];

    let f = |vals: &[f64]| {
        let w = Tensor::from_vec(vals.to_vec(), vec![3, 2]);
        let x = Tensor::from_vec(vec![1.0f64, -1.5], vec![2, 1]);
        w.matmul(&x)
            .and_then(|m| m.tanh())
            .map(|t| t.sum(None, false).item())
            .unwrap_or(f64::NAN)
    };
    let fd = finite_diff_grad(f, &w_vals, 1e-6);

    let max_err = dw
        .values()
        .iter()
        .zip(&fd)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f64, f64::max);
    println!("Finite difference check: z = sum(tanh(W x))");
    println!("  max |autodiff - fd| = {:.2e}", max_err);

    let tolerance = 1e-5;
    if max_err < tolerance {
        println!("  PASS (tolerance {:.0e})\n", tolerance);
        Ok(())
    } else {
        println!("  FAIL (tolerance {:.0e})\n", tolerance);
        std::process::exit(1);
    }
}

/// Fit y = 2 x1 - x2 + 0.5 with a single dense layer and Adam.
fn training_demo() -> Result<(), Error> {
    let xs = vec![0.0f64, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.5, 0.5, 2.0, 1.0];
    let ts: Vec<f64> = xs.chunks(2).map(|p| 2.0 * p[0] - p[1] + 0.5).collect();
    let x = Tensor::from_vec(xs, vec![6, 2]);
    let t = Tensor::from_vec(ts, vec![6, 1]);

    let mut opt = Adam::new(Dense::<f64>::new(2, 1), 0.05);
    println!("Training: y = 2*x1 - x2 + 0.5 (dense layer, Adam)");
    for epoch in 0..600 {
        let loss = mse_loss(&opt.model().forward(&x)?, &t)?;
        if epoch % 150 == 0 {
            println!("  epoch {:3}: loss = {:.8}", epoch, loss.item());
        }
        let grads = loss.backward()?;
        let aligned = gradients_for(&opt.model().parameters(), &grads);
        opt.update(&aligned)?;
    }
    println!(
        "  learned: w = {:?}, b = {:?}",
        opt.model().weight().values(),
        opt.model().bias().values()
    );
    Ok(())
}
