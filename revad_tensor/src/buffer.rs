//! Reference-counted value storage.
//!
//! A [`Buffer`] is the flat element storage behind a tensor. Clones share the
//! allocation; the first mutation through a shared handle copies the values
//! first, so no write is ever observable through another handle.

use std::sync::Arc;

use crate::numeric::Numeric;

/// Shared, copy-on-write element storage.
#[derive(Debug, Clone)]
pub struct Buffer<E: Numeric> {
    values: Arc<Vec<E>>,
}

impl<E: Numeric> Buffer<E> {
    /// Take ownership of existing values.
    pub fn from_vec(values: Vec<E>) -> Self {
        Buffer {
            values: Arc::new(values),
        }
    }

    /// Allocate `count` elements, all set to `value`.
    pub fn filled(value: E, count: usize) -> Self {
        Buffer::from_vec(vec![value; count])
    }

    /// Allocate `count` zeroed elements.
    pub fn zeroed(count: usize) -> Self {
        Buffer::filled(E::ZERO, count)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether another handle currently shares this allocation.
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.values) > 1
    }

    pub fn as_slice(&self) -> &[E] {
        &self.values
    }

    /// Mutable access, copying the values first if the allocation is shared.
    pub fn as_mut_slice(&mut self) -> &mut [E] {
        Arc::make_mut(&mut self.values).as_mut_slice()
    }
}

impl<E: Numeric> std::ops::Deref for Buffer<E> {
    type Target = [E];

    fn deref(&self) -> &[E] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_constructors() {
        let b = Buffer::from_vec(vec![1.0f32, 2.0, 3.0]);
        assert_eq!(b.len(), 3);
        assert_eq!(b.as_slice(), &[1.0, 2.0, 3.0]);

        let z: Buffer<f64> = Buffer::zeroed(4);
        assert_eq!(z.as_slice(), &[0.0; 4]);

        let f = Buffer::filled(7i32, 2);
        assert_eq!(f.as_slice(), &[7, 7]);
    }

    #[test]
    fn test_clone_shares_storage() {
        let a = Buffer::from_vec(vec![1.0f32, 2.0]);
        assert!(!a.is_shared());
        let b = a.clone();
        assert!(a.is_shared());
        assert!(b.is_shared());
        assert_eq!(a.as_slice().as_ptr(), b.as_slice().as_ptr());
    }

    #[test]
    fn test_write_copies_when_shared() {
        let mut a = Buffer::from_vec(vec![1.0f32, 2.0]);
        let b = a.clone();

        a.as_mut_slice()[0] = 99.0;
        assert_eq!(a.as_slice(), &[99.0, 2.0]);
        // the other handle still sees the original values
        assert_eq!(b.as_slice(), &[1.0, 2.0]);
        assert!(!a.is_shared());
    }

    #[test]
    fn test_write_in_place_when_unique() {
        let mut a = Buffer::from_vec(vec![5i32, 6]);
        let ptr = a.as_slice().as_ptr();
        a.as_mut_slice()[1] = 60;
        assert_eq!(a.as_slice().as_ptr(), ptr);
        assert_eq!(a.as_slice(), &[5, 60]);
    }
}
