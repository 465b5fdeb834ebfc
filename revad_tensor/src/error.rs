//! Typed errors for tensor and kernel operations.

use thiserror::Error;

use crate::shape::Shape;

/// Errors raised by tensor operations and numeric kernels.
///
/// All of these are programming errors at the call site; there is no
/// recovery or retry anywhere in the differentiation core. They are typed
/// (rather than panics) so callers and tests can assert on the exact kind.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Operand shapes violate an operation's precondition.
    #[error("{op}: incompatible shapes {lhs} and {rhs}")]
    ShapeMismatch { op: &'static str, lhs: Shape, rhs: Shape },

    /// The element type has no meaningful semantics for the operation.
    #[error("{op} is unavailable for element type {dtype}")]
    UnsupportedOperation { op: &'static str, dtype: &'static str },

    /// A reduction was requested over zero elements.
    #[error("{op}: reduction over zero elements")]
    EmptyReduction { op: &'static str },

    /// A view's target shape cannot be reconciled with the element count.
    #[error("cannot view tensor of shape {shape} as {requested:?}")]
    InvalidView { shape: Shape, requested: Vec<isize> },
}

impl Error {
    /// Shorthand used by operators that compare two operand shapes.
    pub(crate) fn shape_mismatch(op: &'static str, lhs: &Shape, rhs: &Shape) -> Self {
        Error::ShapeMismatch {
            op,
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        }
    }
}
