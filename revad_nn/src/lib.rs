//! # revad_nn - Neural Network Building Blocks for revad_tensor
//!
//! Layers compose through the [`Layer`] trait: statically with
//! [`Sequential`] (or the [`sequential!`] macro) and dynamically with
//! [`Stack`]. Optimizers own their model and persist their full state,
//! hyperparameters included, through serde.
//!
//! ## Example
//!
//! ```
//! use revad_nn::prelude::*;
//! use revad_tensor::Tensor;
//!
//! let net = sequential!(Dense::<f32>::new(2, 8), Tanh, Dense::new(8, 1));
//! let mut opt = Adam::new(net, 0.01);
//!
//! let x = Tensor::from_vec(vec![0.0f32, 1.0], vec![1, 2]);
//! let t = Tensor::from_vec(vec![1.0f32], vec![1, 1]);
//!
//! let loss = mse_loss(&opt.model().forward(&x).unwrap(), &t).unwrap();
//! let grads = loss.backward().unwrap();
//! let aligned = gradients_for(&opt.model().parameters(), &grads);
//! opt.update(&aligned).unwrap();
//! ```

pub mod layers;
pub mod loss;
pub mod optim;

pub use layers::{sigmoid, Dense, Layer, Relu, Sequential, Sigmoid, Stack, Tanh};
pub use loss::{binary_cross_entropy_with_logits, mse_loss};
pub use optim::{gradients_for, Adam, Momentum, Sgd};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::layers::{sigmoid, Dense, Layer, Relu, Sequential, Sigmoid, Stack, Tanh};
    pub use crate::loss::{binary_cross_entropy_with_logits, mse_loss};
    pub use crate::optim::{gradients_for, Adam, Momentum, Sgd};
    pub use crate::sequential;
}
