//! Computation graph nodes.
//!
//! Every tensor is a node: an operation tag, the computed value, and the
//! operand tensors the value was computed from. Backward dispatch is a
//! `match` on the tag; there are no captured closures in the graph.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::buffer::Buffer;
use crate::numeric::Numeric;
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Global counter for unique node IDs.
static NODE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

pub(crate) fn next_node_id() -> u64 {
    NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Unique identifier for a node in the computation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u64);

/// Operation tags recorded in the graph.
///
/// Tags carry only the data the backward pass needs to invert the forward
/// computation (transpose flags, reduced axes, the pre-view shape).
#[derive(Debug, Clone, PartialEq)]
pub enum TensorOp {
    // === Leaf nodes ===
    /// Constant leaf; backward traversal stops here and records nothing.
    Const,
    /// Trainable leaf; backward traversal stops here and records the adjoint.
    Var { name: Option<String> },

    // === Unary element-wise ===
    Neg,
    Exp,
    Log,
    Sqrt,
    Tanh,
    Relu,
    Sin,
    Cos,
    Tan,

    // === Binary element-wise (broadcasting) ===
    Add,
    Sub,
    Mul,
    Div,
    Maximum,
    Minimum,

    // === Reductions ===
    Sum {
        axes: Option<Vec<usize>>,
        keepdims: bool,
    },
    Mean {
        axes: Option<Vec<usize>>,
        keepdims: bool,
    },

    // === Linear algebra ===
    /// Strict 2-D matrix product with transpose flags baked into the GEMM
    /// call rather than materialized operand transposes.
    Matmul {
        transpose_lhs: bool,
        transpose_rhs: bool,
    },

    // === Shape operations ===
    Transpose,
    View {
        original: Shape,
    },
}

impl TensorOp {
    /// Human-readable tag name for diagnostics and logging.
    pub fn name(&self) -> &'static str {
        match self {
            TensorOp::Const => "const",
            TensorOp::Var { .. } => "var",
            TensorOp::Neg => "neg",
            TensorOp::Exp => "exp",
            TensorOp::Log => "log",
            TensorOp::Sqrt => "sqrt",
            TensorOp::Tanh => "tanh",
            TensorOp::Relu => "relu",
            TensorOp::Sin => "sin",
            TensorOp::Cos => "cos",
            TensorOp::Tan => "tan",
            TensorOp::Add => "add",
            TensorOp::Sub => "sub",
            TensorOp::Mul => "mul",
            TensorOp::Div => "div",
            TensorOp::Maximum => "maximum",
            TensorOp::Minimum => "minimum",
            TensorOp::Sum { .. } => "sum",
            TensorOp::Mean { .. } => "mean",
            TensorOp::Matmul { .. } => "matmul",
            TensorOp::Transpose => "transpose",
            TensorOp::View { .. } => "view",
        }
    }
}

/// Internal node structure behind a [`Tensor`].
pub struct TensorNode<E: Numeric> {
    pub(crate) id: NodeId,
    pub(crate) op: TensorOp,
    pub(crate) values: Buffer<E>,
    pub(crate) shape: Shape,
    pub(crate) children: Vec<Tensor<E>>,
    pub(crate) requires_grad: bool,
}

impl<E: Numeric> std::fmt::Debug for TensorNode<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorNode")
            .field("id", &self.id)
            .field("op", &self.op.name())
            .field("shape", &self.shape)
            .field("children", &self.children.len())
            .field("requires_grad", &self.requires_grad)
            .finish()
    }
}
