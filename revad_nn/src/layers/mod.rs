//! Layers and layer composition.

mod activations;
mod dense;
mod sequential;

pub use activations::{sigmoid, Relu, Sigmoid, Tanh};
pub use dense::Dense;
pub use sequential::{Sequential, Stack};

use revad_tensor::{Error, Numeric, Tensor};

/// A differentiable, composable building block.
///
/// `Input` and `Output` are associated types so compositions are checked
/// structurally at compile time; most layers map tensors to tensors.
/// `parameters()` and `parameters_mut()` must enumerate the same tensors in
/// the same order across calls: optimizers align gradient lists with
/// parameter lists positionally.
pub trait Layer<E: Numeric> {
    type Input;
    type Output;

    fn forward(&self, input: &Self::Input) -> Result<Self::Output, Error>;

    /// Trainable parameters in stable order.
    fn parameters(&self) -> Vec<&Tensor<E>>;

    /// Mutable access to the same parameters, in the same order.
    fn parameters_mut(&mut self) -> Vec<&mut Tensor<E>>;
}
