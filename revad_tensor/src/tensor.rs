//! The graph tensor type and its forward operations.
//!
//! A [`Tensor`] is a reference-counted handle to an immutable graph node.
//! Operations compute their value eagerly through the element type's
//! [`Numeric`] kernels and record an operation tag plus the operand handles,
//! but only while some operand is gradient-tracked; otherwise the result is
//! a plain constant and retains no graph.

use std::sync::Arc;

use crate::buffer::Buffer;
use crate::error::Error;
use crate::node::{next_node_id, NodeId, TensorNode, TensorOp};
use crate::numeric::Numeric;
use crate::shape::Shape;

/// A tensor expression in the computation graph.
/// Reference-counted for efficient sharing.
#[derive(Clone)]
pub struct Tensor<E: Numeric>(pub(crate) Arc<TensorNode<E>>);

impl<E: Numeric> std::fmt::Debug for Tensor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("id", &self.0.id)
            .field("op", &self.0.op.name())
            .field("shape", &self.0.shape)
            .field("requires_grad", &self.0.requires_grad)
            .finish()
    }
}

impl<E: Numeric> Tensor<E> {
    fn new_node(
        op: TensorOp,
        values: Buffer<E>,
        shape: Shape,
        children: Vec<Tensor<E>>,
        requires_grad: bool,
    ) -> Self {
        assert!(
            values.len() >= shape.numel(),
            "buffer holds {} elements, shape {} needs {}",
            values.len(),
            shape,
            shape.numel()
        );
        Tensor(Arc::new(TensorNode {
            id: NodeId(next_node_id()),
            op,
            values,
            shape,
            children,
            requires_grad,
        }))
    }

    fn leaf(op: TensorOp, values: Buffer<E>, shape: Shape, requires_grad: bool) -> Self {
        Self::new_node(op, values, shape, Vec::new(), requires_grad)
    }

    /// Record an operation result. The graph is only retained while some
    /// operand is gradient-tracked; otherwise the result is a detached
    /// constant.
    pub(crate) fn from_op(
        op: TensorOp,
        values: Buffer<E>,
        shape: Shape,
        children: Vec<Tensor<E>>,
    ) -> Self {
        if children.iter().any(|c| c.requires_grad()) {
            Self::new_node(op, values, shape, children, true)
        } else {
            Self::leaf(TensorOp::Const, values, shape, false)
        }
    }

    // === Constructors ===

    /// Create a constant tensor from values.
    pub fn from_vec(values: Vec<E>, shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        assert_eq!(
            values.len(),
            shape.numel(),
            "got {} values for shape {}",
            values.len(),
            shape
        );
        Self::leaf(TensorOp::Const, Buffer::from_vec(values), shape, false)
    }

    /// Create a named variable tensor (tracked for gradients).
    pub fn var(name: &str, values: Vec<E>, shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        assert_eq!(
            values.len(),
            shape.numel(),
            "got {} values for shape {}",
            values.len(),
            shape
        );
        Self::leaf(
            TensorOp::Var {
                name: Some(name.to_string()),
            },
            Buffer::from_vec(values),
            shape,
            true,
        )
    }

    /// Create a constant tensor filled with `value`.
    pub fn full(value: E, shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        let values = Buffer::filled(value, shape.numel());
        Self::leaf(TensorOp::Const, values, shape, false)
    }

    pub fn zeros(shape: impl Into<Shape>) -> Self {
        Self::full(E::ZERO, shape)
    }

    pub fn ones(shape: impl Into<Shape>) -> Self {
        Self::full(E::ONE, shape)
    }

    /// Create a 0-dimensional constant.
    pub fn scalar(value: E) -> Self {
        Self::from_vec(vec![value], Shape::scalar())
    }

    /// Create a 1-D constant of `count` evenly spaced values in
    /// `[start, end)`.
    pub fn arange(start: E, end: E, count: usize) -> Self {
        let mut values = vec![E::ZERO; count];
        E::arange(start, end, &mut values, count);
        Self::from_vec(values, vec![count])
    }

    // === Accessors ===

    /// Get unique node ID.
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    /// Get the operation tag.
    pub fn op(&self) -> &TensorOp {
        &self.0.op
    }

    /// Get child tensors (operation operands).
    pub fn children(&self) -> &[Tensor<E>] {
        &self.0.children
    }

    /// Get the shape.
    pub fn shape(&self) -> &Shape {
        &self.0.shape
    }

    pub fn ndim(&self) -> usize {
        self.0.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.0.shape.numel()
    }

    /// Whether gradients are tracked through this tensor.
    pub fn requires_grad(&self) -> bool {
        self.0.requires_grad
    }

    /// Whether this tensor is a graph leaf (no recorded operands).
    pub fn is_leaf(&self) -> bool {
        self.0.children.is_empty()
    }

    /// Get variable name if this is a named variable.
    pub fn var_name(&self) -> Option<&str> {
        match &self.0.op {
            TensorOp::Var { name } => name.as_deref(),
            _ => None,
        }
    }

    /// Get values as a contiguous slice.
    pub fn values(&self) -> &[E] {
        &self.0.values[..self.0.shape.numel()]
    }

    pub fn to_vec(&self) -> Vec<E> {
        self.values().to_vec()
    }

    /// Get the value of a single-element tensor.
    pub fn item(&self) -> E {
        assert_eq!(self.numel(), 1, "item() on tensor of shape {}", self.shape());
        self.values()[0]
    }

    // === Graph surgery ===

    /// Keep the value, drop the recorded operation and operands.
    ///
    /// The value buffer is shared (copy-on-write), so this is cheap. A leaf
    /// detaches to itself. Non-leaf nodes always track gradients, so the
    /// detached leaf stays trainable; gradient flow into the original graph
    /// is severed.
    pub fn detach(&self) -> Self {
        if self.is_leaf() {
            return self.clone();
        }
        Self::leaf(
            TensorOp::Var { name: None },
            self.0.values.clone(),
            self.0.shape.clone(),
            true,
        )
    }

    /// Untracked constant view of this tensor's value, sharing the buffer.
    /// Used when computing with a tensor's value must not grow the graph.
    pub(crate) fn value_leaf(&self) -> Self {
        if self.is_leaf() && !self.requires_grad() {
            return self.clone();
        }
        Self::leaf(
            TensorOp::Const,
            self.0.values.clone(),
            self.0.shape.clone(),
            false,
        )
    }

    /// Untracked reinterpretation of the value under another shape.
    pub(crate) fn with_shape(&self, shape: Shape) -> Self {
        debug_assert_eq!(self.numel(), shape.numel());
        Self::leaf(TensorOp::Const, self.0.values.clone(), shape, false)
    }

    // === Unary operations ===

    fn unary_infallible(&self, op: TensorOp, kernel: fn(&[E], &mut [E], usize)) -> Self {
        let n = self.numel();
        let mut out = vec![E::ZERO; n];
        kernel(self.values(), &mut out, n);
        Self::from_op(op, Buffer::from_vec(out), self.0.shape.clone(), vec![self.clone()])
    }

    fn unary(
        &self,
        op: TensorOp,
        kernel: fn(&[E], &mut [E], usize) -> Result<(), Error>,
    ) -> Result<Self, Error> {
        let n = self.numel();
        let mut out = vec![E::ZERO; n];
        kernel(self.values(), &mut out, n)?;
        Ok(Self::from_op(op, Buffer::from_vec(out), self.0.shape.clone(), vec![self.clone()]))
    }

    /// Negate: -self
    pub fn neg(&self) -> Self {
        self.unary_infallible(TensorOp::Neg, E::vneg)
    }

    /// ReLU: max(0, self)
    pub fn relu(&self) -> Self {
        self.unary_infallible(TensorOp::Relu, E::relu)
    }

    /// Exponential: exp(self)
    pub fn exp(&self) -> Result<Self, Error> {
        self.unary(TensorOp::Exp, E::exp)
    }

    /// Natural log: ln(self)
    pub fn log(&self) -> Result<Self, Error> {
        self.unary(TensorOp::Log, E::log)
    }

    /// Square root: sqrt(self)
    pub fn sqrt(&self) -> Result<Self, Error> {
        self.unary(TensorOp::Sqrt, E::sqrt)
    }

    /// Hyperbolic tangent: tanh(self)
    pub fn tanh(&self) -> Result<Self, Error> {
        self.unary(TensorOp::Tanh, E::tanh)
    }

    /// Sine: sin(self)
    pub fn sin(&self) -> Result<Self, Error> {
        self.unary(TensorOp::Sin, E::sin)
    }

    /// Cosine: cos(self)
    pub fn cos(&self) -> Result<Self, Error> {
        self.unary(TensorOp::Cos, E::cos)
    }

    /// Tangent: tan(self)
    pub fn tan(&self) -> Result<Self, Error> {
        self.unary(TensorOp::Tan, E::tan)
    }

    // === Binary operations (broadcasting) ===

    fn binary(
        &self,
        other: &Self,
        op: TensorOp,
        kernel: fn(&[E], &[E], &mut [E], usize),
        f: fn(E, E) -> E,
    ) -> Result<Self, Error> {
        let name = op.name();
        let out_shape = self
            .shape()
            .broadcast_with(other.shape())
            .ok_or_else(|| Error::shape_mismatch(name, self.shape(), other.shape()))?;
        let values = if self.shape() == other.shape() {
            let n = out_shape.numel();
            let mut out = vec![E::ZERO; n];
            kernel(self.values(), other.values(), &mut out, n);
            out
        } else {
            map_broadcast(
                self.values(),
                self.shape(),
                other.values(),
                other.shape(),
                &out_shape,
                f,
            )
        };
        Ok(Self::from_op(
            op,
            Buffer::from_vec(values),
            out_shape,
            vec![self.clone(), other.clone()],
        ))
    }

    /// Add: self + other
    pub fn add(&self, other: &Self) -> Result<Self, Error> {
        self.binary(other, TensorOp::Add, E::vadd, |a, b| a + b)
    }

    /// Subtract: self - other
    pub fn sub(&self, other: &Self) -> Result<Self, Error> {
        self.binary(other, TensorOp::Sub, E::vsub, |a, b| a - b)
    }

    /// Multiply: self * other
    pub fn mul(&self, other: &Self) -> Result<Self, Error> {
        self.binary(other, TensorOp::Mul, E::vmul, |a, b| a * b)
    }

    /// Divide: self / other
    pub fn div(&self, other: &Self) -> Result<Self, Error> {
        self.binary(other, TensorOp::Div, E::vdiv, |a, b| a / b)
    }

    /// Element-wise maximum.
    pub fn maximum(&self, other: &Self) -> Result<Self, Error> {
        self.binary(other, TensorOp::Maximum, E::vmax, |a, b| if b > a { b } else { a })
    }

    /// Element-wise minimum.
    pub fn minimum(&self, other: &Self) -> Result<Self, Error> {
        self.binary(other, TensorOp::Minimum, E::vmin, |a, b| if b < a { b } else { a })
    }

    /// Untracked 0/1 mask from a broadcast element-wise predicate.
    pub(crate) fn mask_where(
        &self,
        other: &Self,
        pred: impl Fn(E, E) -> bool,
    ) -> Result<Self, Error> {
        let out_shape = self
            .shape()
            .broadcast_with(other.shape())
            .ok_or_else(|| Error::shape_mismatch("mask", self.shape(), other.shape()))?;
        let values = map_broadcast(
            self.values(),
            self.shape(),
            other.values(),
            other.shape(),
            &out_shape,
            |a, b| if pred(a, b) { E::ONE } else { E::ZERO },
        );
        Ok(Self::leaf(TensorOp::Const, Buffer::from_vec(values), out_shape, false))
    }

    /// Untracked 0/1 mask from an element-wise predicate.
    pub(crate) fn mask(&self, pred: impl Fn(E) -> bool) -> Self {
        let values = self
            .values()
            .iter()
            .map(|&v| if pred(v) { E::ONE } else { E::ZERO })
            .collect();
        Self::leaf(TensorOp::Const, Buffer::from_vec(values), self.0.shape.clone(), false)
    }

    /// Untracked reduction of the value to a broadcast-compatible smaller
    /// shape, summing over the broadcast dimensions.
    pub(crate) fn sum_to_shape(&self, target: &Shape) -> Self {
        if self.shape() == target {
            return self.value_leaf();
        }
        let values = sum_to_values(self.values(), self.shape(), target);
        Self::leaf(TensorOp::Const, Buffer::from_vec(values), target.clone(), false)
    }

    /// Untracked materialized broadcast of the value to a larger shape.
    pub(crate) fn broadcast_to_shape(&self, to: &Shape) -> Self {
        if self.shape() == to {
            return self.value_leaf();
        }
        let values = broadcast_values(self.values(), self.shape(), to);
        Self::leaf(TensorOp::Const, Buffer::from_vec(values), to.clone(), false)
    }

    // === Reductions ===

    /// Sum over axes (`None` = all axes, producing a scalar unless
    /// `keepdims`). Reduction axes are caller constants, so an
    /// out-of-range axis panics instead of returning an error.
    pub fn sum(&self, axes: Option<&[usize]>, keepdims: bool) -> Self {
        let (values, keep_shape) = self.reduce_keepdims(axes);
        let out_shape = if keepdims {
            keep_shape
        } else {
            squeeze_axes(self.shape(), axes)
        };
        Self::from_op(
            TensorOp::Sum {
                axes: axes.map(|a| a.to_vec()),
                keepdims,
            },
            Buffer::from_vec(values),
            out_shape,
            vec![self.clone()],
        )
    }

    /// Mean over axes (`None` = all axes, producing a scalar unless
    /// `keepdims`). Panics on an out-of-range axis, like [`sum`](Self::sum).
    pub fn mean(&self, axes: Option<&[usize]>, keepdims: bool) -> Self {
        let (mut values, keep_shape) = self.reduce_keepdims(axes);
        let count = E::from_usize(self.numel() / keep_shape.numel());
        for v in &mut values {
            *v = *v / count;
        }
        let out_shape = if keepdims {
            keep_shape
        } else {
            squeeze_axes(self.shape(), axes)
        };
        Self::from_op(
            TensorOp::Mean {
                axes: axes.map(|a| a.to_vec()),
                keepdims,
            },
            Buffer::from_vec(values),
            out_shape,
            vec![self.clone()],
        )
    }

    /// Sum into the keepdims shape (reduced axes become 1).
    fn reduce_keepdims(&self, axes: Option<&[usize]>) -> (Vec<E>, Shape) {
        match axes {
            None => {
                let total = E::sum(self.values(), self.numel());
                (vec![total], Shape::new(vec![1; self.ndim()]))
            }
            Some(axes) => {
                let mut dims = self.shape().dims().to_vec();
                for &ax in axes {
                    assert!(ax < self.ndim(), "reduction axis {} out of range", ax);
                    dims[ax] = 1;
                }
                let keep = Shape::new(dims);
                (sum_to_values(self.values(), self.shape(), &keep), keep)
            }
        }
    }

    /// Index and value of the first maximal element in flat order.
    /// Not differentiable; queries the value only.
    pub fn argmax(&self) -> Result<(usize, E), Error> {
        E::argmax(self.values(), self.numel())
    }

    /// Index and value of the first minimal element in flat order.
    pub fn argmin(&self) -> Result<(usize, E), Error> {
        E::argmin(self.values(), self.numel())
    }

    // === Linear algebra ===

    /// Matrix product of 1-D/2-D operands.
    ///
    /// 1-D operands are promoted: `(k,)x(k,)` contracts to a scalar,
    /// `(k,)x(k,n)` yields `(n,)`, `(m,k)x(k,)` yields `(m,)`. Higher ranks
    /// and inner-dimension disagreements fail with
    /// [`Error::ShapeMismatch`].
    pub fn matmul(&self, other: &Self) -> Result<Self, Error> {
        let mismatch = || Error::shape_mismatch("matmul", self.shape(), other.shape());
        match (self.ndim(), other.ndim()) {
            (1, 1) => {
                let k = self.shape().dim(0);
                if other.shape().dim(0) != k {
                    return Err(mismatch());
                }
                let lhs = self.view(&[1, k as isize])?;
                let rhs = other.view(&[k as isize, 1])?;
                lhs.matmul_t(&rhs, false, false)?.view(&[])
            }
            (1, 2) => {
                let k = self.shape().dim(0);
                if other.shape().dim(0) != k {
                    return Err(mismatch());
                }
                let n = other.shape().dim(1);
                let lhs = self.view(&[1, k as isize])?;
                lhs.matmul_t(other, false, false)?.view(&[n as isize])
            }
            (2, 1) => {
                let k = other.shape().dim(0);
                if self.shape().dim(1) != k {
                    return Err(mismatch());
                }
                let m = self.shape().dim(0);
                let rhs = other.view(&[k as isize, 1])?;
                self.matmul_t(&rhs, false, false)?.view(&[m as isize])
            }
            (2, 2) => self.matmul_t(other, false, false),
            _ => Err(mismatch()),
        }
    }

    /// Strict 2-D matrix product with transpose flags folded into the GEMM
    /// call, avoiding materialized operand transposes.
    pub fn matmul_t(
        &self,
        other: &Self,
        transpose_lhs: bool,
        transpose_rhs: bool,
    ) -> Result<Self, Error> {
        if self.ndim() != 2 || other.ndim() != 2 {
            return Err(Error::shape_mismatch("matmul", self.shape(), other.shape()));
        }
        let (lr, lc) = (self.shape().dim(0), self.shape().dim(1));
        let (rr, rc) = (other.shape().dim(0), other.shape().dim(1));
        let (m, k) = if transpose_lhs { (lc, lr) } else { (lr, lc) };
        let (k2, n) = if transpose_rhs { (rc, rr) } else { (rr, rc) };
        if k != k2 {
            return Err(Error::shape_mismatch("matmul", self.shape(), other.shape()));
        }
        let mut out = vec![E::ZERO; m * n];
        E::gemm(
            self.values(),
            other.values(),
            &mut out,
            (lr, lc),
            (rr, rc),
            (m, n),
            E::ONE,
            E::ZERO,
            transpose_lhs,
            transpose_rhs,
        );
        Ok(Self::from_op(
            TensorOp::Matmul {
                transpose_lhs,
                transpose_rhs,
            },
            Buffer::from_vec(out),
            Shape::new(vec![m, n]),
            vec![self.clone(), other.clone()],
        ))
    }

    /// Materialized transpose of a 2-D tensor.
    pub fn transposed(&self) -> Result<Self, Error> {
        if self.ndim() != 2 {
            return Err(Error::shape_mismatch("transpose", self.shape(), self.shape()));
        }
        let (rows, cols) = (self.shape().dim(0), self.shape().dim(1));
        let mut out = vec![E::ZERO; rows * cols];
        E::transpose(self.values(), &mut out, rows, cols);
        Ok(Self::from_op(
            TensorOp::Transpose,
            Buffer::from_vec(out),
            Shape::new(vec![cols, rows]),
            vec![self.clone()],
        ))
    }

    // === Shape operations ===

    /// Reinterpret the value under another shape, sharing the buffer.
    /// At most one dimension may be `-1` (inferred).
    pub fn view(&self, dims: &[isize]) -> Result<Self, Error> {
        let new_shape = self.shape().view_as(dims)?;
        Ok(Self::from_op(
            TensorOp::View {
                original: self.0.shape.clone(),
            },
            self.0.values.clone(),
            new_shape,
            vec![self.clone()],
        ))
    }

    /// Compute gradients of this tensor via reverse-mode autodiff.
    pub fn backward(&self) -> Result<crate::backward::Gradients<E>, Error> {
        crate::backward::backward(self)
    }
}

// === Value-level broadcast walkers ===

/// Right-aligned broadcast strides of `shape` inside `out`; broadcast
/// dimensions step by zero.
fn broadcast_strides(shape: &Shape, out: &Shape) -> Vec<usize> {
    let strides = shape.contiguous_strides();
    let offset = out.ndim() - shape.ndim();
    let mut result = vec![0usize; out.ndim()];
    for i in 0..shape.ndim() {
        result[offset + i] = if shape.dim(i) == 1 && out.dim(offset + i) != 1 {
            0
        } else {
            strides.0[i]
        };
    }
    result
}

fn map_broadcast<E: Numeric>(
    lhs: &[E],
    lhs_shape: &Shape,
    rhs: &[E],
    rhs_shape: &Shape,
    out_shape: &Shape,
    f: impl Fn(E, E) -> E,
) -> Vec<E> {
    let ls = broadcast_strides(lhs_shape, out_shape);
    let rs = broadcast_strides(rhs_shape, out_shape);
    let mut idx = vec![0usize; out_shape.ndim()];
    let (mut li, mut ri) = (0usize, 0usize);
    let mut out = Vec::with_capacity(out_shape.numel());
    for _ in 0..out_shape.numel() {
        out.push(f(lhs[li], rhs[ri]));
        for d in (0..idx.len()).rev() {
            idx[d] += 1;
            li += ls[d];
            ri += rs[d];
            if idx[d] < out_shape.dim(d) {
                break;
            }
            idx[d] = 0;
            li -= ls[d] * out_shape.dim(d);
            ri -= rs[d] * out_shape.dim(d);
        }
    }
    out
}

/// Sum `values` (laid out as `from`) into the broadcast-compatible smaller
/// `target` shape.
fn sum_to_values<E: Numeric>(values: &[E], from: &Shape, target: &Shape) -> Vec<E> {
    let mut out = vec![E::ZERO; target.numel()];
    let ts = broadcast_strides(target, from);
    let mut idx = vec![0usize; from.ndim()];
    let mut ti = 0usize;
    for &v in values.iter().take(from.numel()) {
        out[ti] = out[ti] + v;
        for d in (0..idx.len()).rev() {
            idx[d] += 1;
            ti += ts[d];
            if idx[d] < from.dim(d) {
                break;
            }
            idx[d] = 0;
            ti -= ts[d] * from.dim(d);
        }
    }
    out
}

/// Materialize `values` (laid out as `from`) under the broadcast larger
/// `to` shape.
fn broadcast_values<E: Numeric>(values: &[E], from: &Shape, to: &Shape) -> Vec<E> {
    let fs = broadcast_strides(from, to);
    let mut idx = vec![0usize; to.ndim()];
    let mut fi = 0usize;
    let mut out = Vec::with_capacity(to.numel());
    for _ in 0..to.numel() {
        out.push(values[fi]);
        for d in (0..idx.len()).rev() {
            idx[d] += 1;
            fi += fs[d];
            if idx[d] < to.dim(d) {
                break;
            }
            idx[d] = 0;
            fi -= fs[d] * to.dim(d);
        }
    }
    out
}

/// Shape after dropping reduced axes (`None` reduces everything).
fn squeeze_axes(shape: &Shape, axes: Option<&[usize]>) -> Shape {
    match axes {
        None => Shape::scalar(),
        Some(axes) => Shape::new(
            shape
                .dims()
                .iter()
                .enumerate()
                .filter(|(i, _)| !axes.contains(i))
                .map(|(_, &d)| d)
                .collect(),
        ),
    }
}

// === Operator overloads ===
// Sugar only: shape violations panic with the typed error's message. Use
// the named methods where errors must propagate.

fn expect_shapes<E: Numeric>(result: Result<Tensor<E>, Error>) -> Tensor<E> {
    match result {
        Ok(t) => t,
        Err(e) => panic!("{}", e),
    }
}

impl<E: Numeric> std::ops::Neg for &Tensor<E> {
    type Output = Tensor<E>;
    fn neg(self) -> Tensor<E> {
        Tensor::neg(self)
    }
}

impl<E: Numeric> std::ops::Neg for Tensor<E> {
    type Output = Tensor<E>;
    fn neg(self) -> Tensor<E> {
        Tensor::neg(&self)
    }
}

macro_rules! impl_binop {
    ($trait:ident, $method:ident) => {
        impl<E: Numeric> std::ops::$trait for &Tensor<E> {
            type Output = Tensor<E>;
            fn $method(self, rhs: &Tensor<E>) -> Tensor<E> {
                expect_shapes(Tensor::$method(self, rhs))
            }
        }

        impl<E: Numeric> std::ops::$trait<Tensor<E>> for &Tensor<E> {
            type Output = Tensor<E>;
            fn $method(self, rhs: Tensor<E>) -> Tensor<E> {
                expect_shapes(Tensor::$method(self, &rhs))
            }
        }

        impl<E: Numeric> std::ops::$trait<&Tensor<E>> for Tensor<E> {
            type Output = Tensor<E>;
            fn $method(self, rhs: &Tensor<E>) -> Tensor<E> {
                expect_shapes(Tensor::$method(&self, rhs))
            }
        }

        impl<E: Numeric> std::ops::$trait for Tensor<E> {
            type Output = Tensor<E>;
            fn $method(self, rhs: Tensor<E>) -> Tensor<E> {
                expect_shapes(Tensor::$method(&self, &rhs))
            }
        }
    };
}

impl_binop!(Add, add);
impl_binop!(Sub, sub);
impl_binop!(Mul, mul);
impl_binop!(Div, div);

// === Serde: value + shape + trainability; the graph is never persisted ===

#[cfg(feature = "serde")]
mod serde_impls {
    use serde::de::Error as _;
    use serde::ser::SerializeStruct;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Tensor;
    use crate::buffer::Buffer;
    use crate::node::TensorOp;
    use crate::numeric::Numeric;
    use crate::shape::Shape;

    impl<E: Numeric + Serialize> Serialize for Tensor<E> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut s = serializer.serialize_struct("Tensor", 3)?;
            s.serialize_field("values", self.values())?;
            s.serialize_field("shape", self.shape())?;
            s.serialize_field("requiresGradient", &self.requires_grad())?;
            s.end()
        }
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct TensorRepr<E> {
        values: Vec<E>,
        shape: Shape,
        #[serde(default)]
        requires_gradient: bool,
    }

    impl<'de, E: Numeric + Deserialize<'de>> Deserialize<'de> for Tensor<E> {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let repr = TensorRepr::<E>::deserialize(deserializer)?;
            if repr.values.len() != repr.shape.numel() {
                return Err(D::Error::custom(format!(
                    "tensor of shape {} needs {} values, got {}",
                    repr.shape,
                    repr.shape.numel(),
                    repr.values.len()
                )));
            }
            let op = if repr.requires_gradient {
                TensorOp::Var { name: None }
            } else {
                TensorOp::Const
            };
            Ok(Tensor::leaf(
                op,
                Buffer::from_vec(repr.values),
                repr.shape,
                repr.requires_gradient,
            ))
        }
    }
}
