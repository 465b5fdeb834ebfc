//! Plain and momentum gradient descent.

use log::debug;
use revad_tensor::{Error, Numeric, Tensor};

use crate::layers::Layer;

/// Vanilla stochastic gradient descent: `p -= lr * grad`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Sgd<E: Numeric, L: Layer<E>> {
    pub model: L,
    learning_rate: Tensor<E>,
}

impl<E: Numeric, L: Layer<E>> Sgd<E, L> {
    pub fn new(model: L, learning_rate: E) -> Self {
        Sgd {
            model,
            learning_rate: Tensor::scalar(learning_rate),
        }
    }

    pub fn model(&self) -> &L {
        &self.model
    }

    /// Step every parameter against its gradient. Gradients must align
    /// with `model.parameters()` positionally; use
    /// [`gradients_for`](super::gradients_for).
    pub fn update(&mut self, gradients: &[Tensor<E>]) -> Result<(), Error> {
        let params = self.model.parameters_mut();
        debug!("sgd step over {} parameters", params.len());
        assert_eq!(
            params.len(),
            gradients.len(),
            "got {} gradients for {} parameters",
            gradients.len(),
            params.len()
        );
        for (param, grad) in params.into_iter().zip(gradients) {
            let step = self.learning_rate.mul(grad)?;
            *param = param.sub(&step)?.detach();
        }
        Ok(())
    }
}

/// Gradient descent with velocity accumulation:
/// `v = momentum * v + lr * grad; p -= v`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Momentum<E: Numeric, L: Layer<E>> {
    pub model: L,
    velocities: Vec<Tensor<E>>,
    learning_rate: Tensor<E>,
    momentum: Tensor<E>,
}

impl<E: Numeric, L: Layer<E>> Momentum<E, L> {
    pub fn new(model: L, learning_rate: E, momentum: E) -> Self {
        let velocities = model
            .parameters()
            .iter()
            .map(|p| Tensor::zeros(p.shape()))
            .collect();
        Momentum {
            model,
            velocities,
            learning_rate: Tensor::scalar(learning_rate),
            momentum: Tensor::scalar(momentum),
        }
    }

    pub fn model(&self) -> &L {
        &self.model
    }

    /// Drop accumulated velocities.
    pub fn reset(&mut self) {
        for v in &mut self.velocities {
            *v = Tensor::zeros(v.shape());
        }
    }

    pub fn update(&mut self, gradients: &[Tensor<E>]) -> Result<(), Error> {
        let params = self.model.parameters_mut();
        debug!("momentum step over {} parameters", params.len());
        assert_eq!(
            params.len(),
            gradients.len(),
            "got {} gradients for {} parameters",
            gradients.len(),
            params.len()
        );
        for (i, (param, grad)) in params.into_iter().zip(gradients).enumerate() {
            let velocity = self.velocities[i]
                .mul(&self.momentum)?
                .add(&self.learning_rate.mul(grad)?)?;
            *param = param.sub(&velocity)?.detach();
            self.velocities[i] = velocity.detach();
        }
        Ok(())
    }
}
