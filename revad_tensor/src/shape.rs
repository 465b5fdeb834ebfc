//! Shape and stride utilities for tensors.

use std::fmt;

use crate::error::Error;

/// A tensor shape (ordered dimension sizes).
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Shape(pub Vec<usize>);

impl Shape {
    /// Create a new shape from dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// Create a scalar shape (0-dimensional).
    pub fn scalar() -> Self {
        Shape(vec![])
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Get dimension at index.
    pub fn dim(&self, idx: usize) -> usize {
        self.0[idx]
    }

    /// Get dimensions as slice.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Total number of elements.
    ///
    /// Zero-size dimensions are not supported: every shape holds at least
    /// one element, so a shape containing a 0 still counts as 1 and the
    /// tensor constructors reject an empty value vector for it.
    pub fn numel(&self) -> usize {
        self.0.iter().product::<usize>().max(1)
    }

    /// Check if this is a scalar (0-dim tensor).
    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    /// Compute row-major (C-contiguous) strides for this shape.
    pub fn contiguous_strides(&self) -> Strides {
        let mut strides = vec![1usize; self.ndim()];
        let mut step = 1;
        for (slot, &dim) in strides.iter_mut().zip(&self.0).rev() {
            *slot = step;
            step *= dim;
        }
        Strides(strides)
    }

    /// Resolve a view request against this shape.
    ///
    /// At most one requested dimension may be `-1`; it is inferred so the
    /// element counts match. Fails with [`Error::InvalidView`] when the
    /// counts cannot be reconciled.
    pub fn view_as(&self, requested: &[isize]) -> Result<Shape, Error> {
        let invalid = || Error::InvalidView {
            shape: self.clone(),
            requested: requested.to_vec(),
        };

        let mut inferred: Option<usize> = None;
        let mut known: usize = 1;
        for (i, &d) in requested.iter().enumerate() {
            if d == -1 {
                if inferred.is_some() {
                    return Err(invalid());
                }
                inferred = Some(i);
            } else if d < 0 {
                return Err(invalid());
            } else {
                known *= d as usize;
            }
        }

        let total = self.numel();
        let mut dims: Vec<usize> = requested
            .iter()
            .map(|&d| if d < 0 { 0 } else { d as usize })
            .collect();

        match inferred {
            Some(i) => {
                if known == 0 || total % known != 0 {
                    return Err(invalid());
                }
                dims[i] = total / known;
            }
            None => {
                if known != total {
                    return Err(invalid());
                }
            }
        }
        Ok(Shape(dims))
    }

    /// Check if two shapes are broadcast-compatible, aligning trailing
    /// dimensions; size-1 dimensions stretch. Returns the broadcast result
    /// shape if compatible.
    pub fn broadcast_with(&self, other: &Shape) -> Option<Shape> {
        let ndim = self.ndim().max(other.ndim());
        let mut dims = vec![1usize; ndim];
        for i in 0..ndim {
            let a = if i < self.ndim() { self.0[self.ndim() - 1 - i] } else { 1 };
            let b = if i < other.ndim() { other.0[other.ndim() - 1 - i] } else { 1 };
            dims[ndim - 1 - i] = match (a, b) {
                (a, b) if a == b => a,
                (1, b) => b,
                (a, 1) => a,
                _ => return None,
            };
        }
        Some(Shape(dims))
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.0)
    }
}

/// Prints as a tuple: `(2, 3)`, `(7,)`, `()`.
impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        let mut dims = self.0.iter();
        if let Some(d) = dims.next() {
            write!(f, "{}", d)?;
            for d in dims {
                write!(f, ", {}", d)?;
            }
        }
        if self.0.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Shape(v)
    }
}

impl From<&[usize]> for Shape {
    fn from(s: &[usize]) -> Self {
        Shape(s.to_vec())
    }
}

impl From<&Shape> for Shape {
    fn from(s: &Shape) -> Self {
        s.clone()
    }
}

/// Tensor strides (step size in each dimension).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Strides(pub Vec<usize>);

impl Strides {
    pub fn new(strides: Vec<usize>) -> Self {
        Strides(strides)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Compute flat index from multi-dimensional indices.
    pub fn index(&self, indices: &[usize]) -> usize {
        debug_assert_eq!(self.0.len(), indices.len());
        self.0.iter().zip(indices.iter()).map(|(s, i)| s * i).sum()
    }
}
