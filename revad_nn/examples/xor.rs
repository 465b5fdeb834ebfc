//! Train a small MLP on the XOR function.
//!
//! Run with `cargo run --example xor` (add `RUST_LOG=debug` for optimizer
//! and backward-pass logging).

use revad_nn::prelude::*;
use revad_tensor::{Error, Tensor};

fn main() -> Result<(), Error> {
    env_logger::init();

    let x = Tensor::from_vec(vec![0.0f32, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0], vec![4, 2]);
    let t = Tensor::from_vec(vec![0.0f32, 1.0, 1.0, 0.0], vec![4, 1]);

    let net = sequential!(Dense::<f32>::new(2, 8), Tanh, Dense::new(8, 1));
    let mut opt = Adam::new(net, 0.05);

    for epoch in 0..1000 {
        let logits = opt.model().forward(&x)?;
        let loss = binary_cross_entropy_with_logits(&logits, &t)?;
        if epoch % 100 == 0 {
            println!("epoch {:4}: loss = {:.6}", epoch, loss.item());
        }
        let grads = loss.backward()?;
        let aligned = gradients_for(&opt.model().parameters(), &grads);
        opt.update(&aligned)?;
    }

    println!("\npredictions:");
    let predictions = sigmoid(&opt.model().forward(&x)?)?;
    for (inputs, p) in x.values().chunks(2).zip(predictions.values()) {
        println!("  {:?} -> {:.4}", inputs, p);
    }
    Ok(())
}
