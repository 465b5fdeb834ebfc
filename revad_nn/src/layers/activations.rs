//! Activation layers.
//!
//! Each activation is a parameterless unit struct implementing [`Layer`],
//! so activations compose with [`super::Sequential`] and
//! [`super::Stack`] like any other layer.

use revad_tensor::{Error, Numeric, Tensor};

use super::Layer;

/// Logistic sigmoid `1 / (1 + exp(-x))`, composed from tracked primitives
/// so the backward pass falls out of the graph.
pub fn sigmoid<E: Numeric>(x: &Tensor<E>) -> Result<Tensor<E>, Error> {
    let one = Tensor::scalar(E::ONE);
    one.div(&one.add(&x.neg().exp()?)?)
}

macro_rules! activation_layer {
    ($(#[$doc:meta])* $name:ident, |$x:ident| $body:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name;

        impl<E: Numeric> Layer<E> for $name {
            type Input = Tensor<E>;
            type Output = Tensor<E>;

            fn forward(&self, $x: &Tensor<E>) -> Result<Tensor<E>, Error> {
                $body
            }

            fn parameters(&self) -> Vec<&Tensor<E>> {
                Vec::new()
            }

            fn parameters_mut(&mut self) -> Vec<&mut Tensor<E>> {
                Vec::new()
            }
        }
    };
}

activation_layer!(
    /// Rectified linear unit.
    Relu,
    |x| Ok(x.relu())
);

activation_layer!(
    /// Hyperbolic tangent.
    Tanh,
    |x| x.tanh()
);

activation_layer!(
    /// Logistic sigmoid.
    Sigmoid,
    |x| sigmoid(x)
);

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_relu_layer() {
        let x = Tensor::from_vec(vec![-1.0f32, 0.0, 2.0], vec![3]);
        let y = Layer::<f32>::forward(&Relu, &x).unwrap();
        assert_eq!(y.values(), &[0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_sigmoid_values() {
        let x = Tensor::from_vec(vec![0.0f64, 2.0, -2.0], vec![3]);
        let y = sigmoid(&x).unwrap();
        assert_relative_eq!(y.values()[0], 0.5);
        assert_relative_eq!(y.values()[1], 1.0 / (1.0 + (-2.0f64).exp()));
        assert_relative_eq!(y.values()[1] + y.values()[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sigmoid_gradient() {
        // d/dx sigmoid = sigmoid * (1 - sigmoid)
        let x = Tensor::var("x", vec![0.3f64], vec![1]);
        let y = sigmoid(&x).unwrap().sum(None, false);
        let grads = y.backward().unwrap();
        let s = 1.0 / (1.0 + (-0.3f64).exp());
        assert_relative_eq!(grads.wrt(&x).unwrap().values()[0], s * (1.0 - s), epsilon = 1e-12);
    }

    #[test]
    fn test_activations_have_no_parameters() {
        assert!(Layer::<f32>::parameters(&Tanh).is_empty());
        assert!(Layer::<f32>::parameters(&Sigmoid).is_empty());
    }
}
