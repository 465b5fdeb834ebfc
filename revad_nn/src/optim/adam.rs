//! Adam optimizer.

use log::debug;
use revad_tensor::{Error, Numeric, Tensor};

use crate::layers::Layer;

/// Adam: adaptive moment estimation.
///
/// Tracks an exponential moving average of gradients (`first_moments`) and
/// of squared gradients (`second_moments`) per parameter, corrects both for
/// startup bias through the running `beta1t`/`beta2t` powers, and scales
/// the step by the corrected second moment.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Adam<E: Numeric, L: Layer<E>> {
    pub model: L,
    first_moments: Vec<Tensor<E>>,
    second_moments: Vec<Tensor<E>>,
    learning_rate: Tensor<E>,
    beta1: Tensor<E>,
    beta2: Tensor<E>,
    beta1t: Tensor<E>,
    beta2t: Tensor<E>,
    epsilon: Tensor<E>,
}

impl<E: Numeric, L: Layer<E>> Adam<E, L> {
    /// Create with the usual defaults: `beta1 = 0.9`, `beta2 = 0.999`,
    /// `epsilon = 1e-8`.
    pub fn new(model: L, learning_rate: E) -> Self {
        Self::with_params(
            model,
            learning_rate,
            E::from_f64(0.9),
            E::from_f64(0.999),
            E::from_f64(1e-8),
        )
    }

    pub fn with_params(model: L, learning_rate: E, beta1: E, beta2: E, epsilon: E) -> Self {
        let zeros = |model: &L| -> Vec<Tensor<E>> {
            model
                .parameters()
                .iter()
                .map(|p| Tensor::zeros(p.shape()))
                .collect()
        };
        Adam {
            first_moments: zeros(&model),
            second_moments: zeros(&model),
            model,
            learning_rate: Tensor::scalar(learning_rate),
            beta1: Tensor::scalar(beta1),
            beta2: Tensor::scalar(beta2),
            beta1t: Tensor::scalar(beta1),
            beta2t: Tensor::scalar(beta2),
            epsilon: Tensor::scalar(epsilon),
        }
    }

    pub fn model(&self) -> &L {
        &self.model
    }

    /// Drop accumulated moments and restart the bias-correction schedule.
    pub fn reset(&mut self) {
        for m in self.first_moments.iter_mut().chain(&mut self.second_moments) {
            *m = Tensor::zeros(m.shape());
        }
        self.beta1t = self.beta1.clone();
        self.beta2t = self.beta2.clone();
    }

    /// Step every parameter. Gradients must align with
    /// `model.parameters()` positionally; use
    /// [`gradients_for`](super::gradients_for).
    pub fn update(&mut self, gradients: &[Tensor<E>]) -> Result<(), Error> {
        let one = Tensor::scalar(E::ONE);
        let params = self.model.parameters_mut();
        debug!("adam step over {} parameters", params.len());
        assert_eq!(
            params.len(),
            gradients.len(),
            "got {} gradients for {} parameters",
            gradients.len(),
            params.len()
        );
        for (i, (param, grad)) in params.into_iter().zip(gradients).enumerate() {
            let m = self.first_moments[i]
                .mul(&self.beta1)?
                .add(&grad.mul(&one.sub(&self.beta1)?)?)?;
            let v = self.second_moments[i]
                .mul(&self.beta2)?
                .add(&grad.mul(grad)?.mul(&one.sub(&self.beta2)?)?)?;

            let m_hat = m.div(&one.sub(&self.beta1t)?)?;
            let v_hat = v.div(&one.sub(&self.beta2t)?)?;

            let delta = self
                .learning_rate
                .div(&v_hat.sqrt()?.add(&self.epsilon)?)?
                .mul(&m_hat)?;
            *param = param.sub(&delta)?.detach();

            self.first_moments[i] = m.detach();
            self.second_moments[i] = v.detach();
        }
        self.beta1t = self.beta1t.mul(&self.beta1)?.detach();
        self.beta2t = self.beta2t.mul(&self.beta2)?.detach();
        Ok(())
    }
}
