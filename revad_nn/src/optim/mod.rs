//! Optimizers.
//!
//! An optimizer owns its model and steps it in place: compute a loss from
//! `optimizer.model()`, run the backward pass, collect the per-parameter
//! gradients with [`gradients_for`], and call `update`. Updated parameters
//! are detached, so the next forward pass starts a fresh graph.
//!
//! Hyperparameters and accumulated state are stored as tensors and persist
//! through serde together with the model.

mod adam;
mod sgd;

pub use adam::Adam;
pub use sgd::{Momentum, Sgd};

use revad_tensor::{Gradients, Numeric, Tensor};

/// Gradients aligned with a parameter list.
///
/// Parameters the backward pass never reached (not part of the loss graph)
/// get zero gradients, so optimizers can step every parameter uniformly.
pub fn gradients_for<E: Numeric>(
    parameters: &[&Tensor<E>],
    gradients: &Gradients<E>,
) -> Vec<Tensor<E>> {
    parameters
        .iter()
        .map(|p| match gradients.wrt(p) {
            Some(g) => g.clone(),
            None => Tensor::zeros(p.shape()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradients_for_zero_fills() {
        let x = Tensor::var("x", vec![2.0f32], vec![1]);
        let unused = Tensor::var("u", vec![1.0f32, 1.0], vec![2]);
        let grads = x.relu().sum(None, false).backward().unwrap();

        let aligned = gradients_for(&[&x, &unused], &grads);
        assert_eq!(aligned[0].values(), &[1.0]);
        assert_eq!(aligned[1].values(), &[0.0, 0.0]);
        assert_eq!(aligned[1].shape().dims(), &[2]);
    }
}
