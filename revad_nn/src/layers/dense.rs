//! Fully connected layer.

use rand::Rng;
use revad_tensor::{Error, Numeric, Tensor};

use super::Layer;

/// A fully connected (affine) layer: `y = x W^T + b`.
///
/// The weight is stored as `[outputs, inputs]` and applied through the
/// transpose-flagged matrix product, so no transpose is materialized on the
/// forward path. Accepts `[batch, inputs]` batches or a single `[inputs]`
/// vector.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dense<E: Numeric> {
    weight: Tensor<E>,
    bias: Tensor<E>,
}

impl<E: Numeric> Dense<E> {
    /// Create a layer with Kaiming-uniform weights and zero bias.
    pub fn new(inputs: usize, outputs: usize) -> Self {
        let mut rng = rand::thread_rng();
        let bound = (2.0 / inputs as f64).sqrt();
        let weight: Vec<E> = (0..outputs * inputs)
            .map(|_| E::from_f64((rng.gen::<f64>() * 2.0 - 1.0) * bound))
            .collect();
        Dense {
            weight: Tensor::var("weight", weight, vec![outputs, inputs]),
            bias: Tensor::var("bias", vec![E::ZERO; outputs], vec![outputs]),
        }
    }

    /// Create a layer from explicit parameter tensors.
    ///
    /// `weight` must be `[outputs, inputs]` and `bias` `[outputs]`.
    pub fn from_tensors(weight: Tensor<E>, bias: Tensor<E>) -> Result<Self, Error> {
        if weight.ndim() != 2 || bias.ndim() != 1 || weight.shape().dim(0) != bias.shape().dim(0) {
            return Err(Error::ShapeMismatch {
                op: "dense",
                lhs: weight.shape().clone(),
                rhs: bias.shape().clone(),
            });
        }
        Ok(Dense { weight, bias })
    }

    pub fn inputs(&self) -> usize {
        self.weight.shape().dim(1)
    }

    pub fn outputs(&self) -> usize {
        self.weight.shape().dim(0)
    }

    pub fn weight(&self) -> &Tensor<E> {
        &self.weight
    }

    pub fn bias(&self) -> &Tensor<E> {
        &self.bias
    }
}

impl<E: Numeric> Layer<E> for Dense<E> {
    type Input = Tensor<E>;
    type Output = Tensor<E>;

    fn forward(&self, input: &Tensor<E>) -> Result<Tensor<E>, Error> {
        match input.ndim() {
            1 => {
                let batch = input.view(&[1, -1])?;
                let out = batch.matmul_t(&self.weight, false, true)?.add(&self.bias)?;
                out.view(&[-1])
            }
            _ => input.matmul_t(&self.weight, false, true)?.add(&self.bias),
        }
    }

    fn parameters(&self) -> Vec<&Tensor<E>> {
        vec![&self.weight, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor<E>> {
        vec![&mut self.weight, &mut self.bias]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_layer() -> Dense<f32> {
        Dense::from_tensors(
            Tensor::var("w", vec![1.0, 0.0, 0.0, 1.0], vec![2, 2]),
            Tensor::var("b", vec![0.5, -0.5], vec![2]),
        )
        .unwrap()
    }

    #[test]
    fn test_forward_batch() {
        let layer = identity_layer();
        let x = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], vec![2, 2]);
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.shape().dims(), &[2, 2]);
        assert_eq!(y.values(), &[1.5, 1.5, 3.5, 3.5]);
    }

    #[test]
    fn test_forward_vector_promotes() {
        let layer = identity_layer();
        let x = Tensor::from_vec(vec![1.0f32, 2.0], vec![2]);
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.shape().dims(), &[2]);
        assert_eq!(y.values(), &[1.5, 1.5]);
    }

    #[test]
    fn test_parameters_order() {
        let layer = identity_layer();
        let params = layer.parameters();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].shape().dims(), &[2, 2]);
        assert_eq!(params[1].shape().dims(), &[2]);
        assert!(params.iter().all(|p| p.requires_grad()));
    }

    #[test]
    fn test_init_bounds() {
        let layer: Dense<f64> = Dense::new(8, 4);
        assert_eq!(layer.inputs(), 8);
        assert_eq!(layer.outputs(), 4);
        let bound = (2.0f64 / 8.0).sqrt();
        assert!(layer.weight().values().iter().all(|w| w.abs() <= bound));
        assert!(layer.bias().values().iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_from_tensors_validates() {
        let w = Tensor::var("w", vec![0.0f32; 6], vec![2, 3]);
        let b = Tensor::var("b", vec![0.0f32; 3], vec![3]);
        assert!(Dense::from_tensors(w, b).is_err());
    }
}
