//! Layer composition: typed pairs and a homogeneous runtime stack.

use revad_tensor::{Error, Numeric, Tensor};

use super::Layer;

/// Composition of two layers, checked at compile time: the second layer's
/// input type must equal the first layer's output type. Longer chains nest
/// pairs; the [`sequential!`](crate::sequential) macro builds the nesting.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sequential<F, S> {
    first: F,
    second: S,
}

impl<F, S> Sequential<F, S> {
    pub fn new(first: F, second: S) -> Self {
        Sequential { first, second }
    }

    pub fn first(&self) -> &F {
        &self.first
    }

    pub fn second(&self) -> &S {
        &self.second
    }
}

impl<E, F, S> Layer<E> for Sequential<F, S>
where
    E: Numeric,
    F: Layer<E>,
    S: Layer<E, Input = F::Output>,
{
    type Input = F::Input;
    type Output = S::Output;

    fn forward(&self, input: &Self::Input) -> Result<Self::Output, Error> {
        let mid = self.first.forward(input)?;
        self.second.forward(&mid)
    }

    /// First layer's parameters, then the second's.
    fn parameters(&self) -> Vec<&Tensor<E>> {
        let mut params = self.first.parameters();
        params.extend(self.second.parameters());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor<E>> {
        let mut params = self.first.parameters_mut();
        params.extend(self.second.parameters_mut());
        params
    }
}

/// Chain layers into nested [`Sequential`] pairs, right-associated:
/// `sequential!(a, b, c)` is `Sequential::new(a, Sequential::new(b, c))`.
#[macro_export]
macro_rules! sequential {
    ($layer:expr $(,)?) => { $layer };
    ($first:expr, $($rest:expr),+ $(,)?) => {
        $crate::layers::Sequential::new($first, $crate::sequential!($($rest),+))
    };
}

/// An ordered sequence of boxed tensor-to-tensor layers, assembled at
/// runtime. Trades the compile-time shape of [`Sequential`] for the ability
/// to grow dynamically; not serializable.
pub struct Stack<E: Numeric> {
    layers: Vec<Box<dyn Layer<E, Input = Tensor<E>, Output = Tensor<E>>>>,
}

impl<E: Numeric> Stack<E> {
    pub fn new() -> Self {
        Stack { layers: Vec::new() }
    }

    /// Append a layer to the end of the sequence.
    pub fn push(&mut self, layer: impl Layer<E, Input = Tensor<E>, Output = Tensor<E>> + 'static) {
        self.layers.push(Box::new(layer));
    }

    /// Builder-style [`push`](Stack::push).
    pub fn with(
        mut self,
        layer: impl Layer<E, Input = Tensor<E>, Output = Tensor<E>> + 'static,
    ) -> Self {
        self.push(layer);
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl<E: Numeric> Default for Stack<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Numeric> Layer<E> for Stack<E> {
    type Input = Tensor<E>;
    type Output = Tensor<E>;

    /// Applies the layers in insertion order. An empty stack is the
    /// identity.
    fn forward(&self, input: &Tensor<E>) -> Result<Tensor<E>, Error> {
        let mut current = input.clone();
        for layer in &self.layers {
            current = layer.forward(&current)?;
        }
        Ok(current)
    }

    fn parameters(&self) -> Vec<&Tensor<E>> {
        self.layers.iter().flat_map(|l| l.parameters()).collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor<E>> {
        self.layers
            .iter_mut()
            .flat_map(|l| l.parameters_mut())
            .collect()
    }
}
