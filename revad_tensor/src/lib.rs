//! # revad_tensor - Tensor Autodiff with a Pluggable Numeric Backend
//!
//! This crate provides a tensor-based reverse-mode automatic differentiation
//! engine. Element types plug in through the [`Numeric`] kernel contract;
//! `f32`, `f64` and `i32` ship in-tree.
//!
//! ## Overview
//!
//! The core abstractions are:
//! - [`Shape`] and [`Strides`] - Tensor shape and memory layout
//! - [`Numeric`] - Kernel contract an element type must provide
//! - [`Buffer`] - Reference-counted, copy-on-write value storage
//! - [`Tensor`] - Reference-counted handle to a computation graph node
//! - [`Gradients`] - Result of a backward pass
//! - [`Error`] - Typed failures (shape mismatches, unsupported kernels)
//!
//! ## Example
//!
//! ```
//! use revad_tensor::prelude::*;
//!
//! // Create variables
//! let x = Tensor::var("x", vec![1.0f32, 2.0, 3.0], vec![3]);
//! let y = Tensor::var("y", vec![4.0f32, 5.0, 6.0], vec![3]);
//!
//! // Build computation: z = sum(x * y + exp(x))
//! let z = (&x * &y + x.exp().unwrap()).sum(None, false);
//!
//! // Compute gradients
//! let grads = z.backward().unwrap();
//! let dx = grads.wrt(&x).unwrap();
//! assert_eq!(dx.values()[1], 5.0 + 2.0f32.exp());
//! ```

pub mod backward;
pub mod buffer;
pub mod error;
pub mod node;
pub mod numeric;
pub mod shape;
pub mod tensor;

pub use backward::{backward, backward_with, finite_diff_grad, Gradients};
pub use buffer::Buffer;
pub use error::Error;
pub use node::{NodeId, TensorOp};
pub use numeric::Numeric;
pub use shape::{Shape, Strides};
pub use tensor::Tensor;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::backward::{backward, backward_with, finite_diff_grad, Gradients};
    pub use crate::buffer::Buffer;
    pub use crate::error::Error;
    pub use crate::node::{NodeId, TensorOp};
    pub use crate::numeric::Numeric;
    pub use crate::shape::{Shape, Strides};
    pub use crate::tensor::Tensor;
}
