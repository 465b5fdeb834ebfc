//! The numeric backend contract.
//!
//! [`Numeric`] is the capability set an element type must provide to serve
//! as a tensor's element type: fill, elementwise arithmetic, reductions,
//! transcendental functions, transpose and GEMM. Kernels are shape-agnostic:
//! they operate on raw slices plus explicit count/stride parameters, and the
//! tensor layer is responsible for validating shapes before calling in.
//!
//! The in-tree plugins cover `f32`/`f64` (full contract) and `i32`
//! (arithmetic only; the transcendental kernels either truncate or fail).
//! Accelerated backends implement the same trait and must match these
//! kernels' numeric results exactly.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::error::Error;

mod float;
mod int;

/// Numeric primitives for one element type.
///
/// Slice lengths are validated by the caller; kernels index unchecked up to
/// `count` (and trap via the usual bounds checks if the caller lied).
/// Operations a type cannot represent return
/// [`Error::UnsupportedOperation`] instead of producing truncated garbage.
pub trait Numeric:
    Copy
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    const ZERO: Self;
    const ONE: Self;
    /// Element type name used in diagnostics and errors.
    const DTYPE: &'static str;

    fn from_usize(n: usize) -> Self;
    fn from_f64(v: f64) -> Self;
    fn to_f64(self) -> f64;

    // === Fill ===

    /// Write `value` to `count` slots of `result` spaced by `stride`.
    fn fill(value: Self, result: &mut [Self], stride: usize, count: usize) {
        for i in 0..count {
            result[i * stride] = value;
        }
    }

    // === Elementwise binary ===

    fn vadd(lhs: &[Self], rhs: &[Self], result: &mut [Self], count: usize) {
        for i in 0..count {
            result[i] = lhs[i] + rhs[i];
        }
    }

    fn vsub(lhs: &[Self], rhs: &[Self], result: &mut [Self], count: usize) {
        for i in 0..count {
            result[i] = lhs[i] - rhs[i];
        }
    }

    fn vmul(lhs: &[Self], rhs: &[Self], result: &mut [Self], count: usize) {
        for i in 0..count {
            result[i] = lhs[i] * rhs[i];
        }
    }

    fn vdiv(lhs: &[Self], rhs: &[Self], result: &mut [Self], count: usize) {
        for i in 0..count {
            result[i] = lhs[i] / rhs[i];
        }
    }

    fn vmax(lhs: &[Self], rhs: &[Self], result: &mut [Self], count: usize) {
        for i in 0..count {
            result[i] = if rhs[i] > lhs[i] { rhs[i] } else { lhs[i] };
        }
    }

    fn vmin(lhs: &[Self], rhs: &[Self], result: &mut [Self], count: usize) {
        for i in 0..count {
            result[i] = if rhs[i] < lhs[i] { rhs[i] } else { lhs[i] };
        }
    }

    // === Elementwise unary ===

    fn vneg(val: &[Self], result: &mut [Self], count: usize) {
        for i in 0..count {
            result[i] = -val[i];
        }
    }

    fn relu(val: &[Self], result: &mut [Self], count: usize) {
        for i in 0..count {
            result[i] = if val[i] > Self::ZERO { val[i] } else { Self::ZERO };
        }
    }

    fn log(val: &[Self], result: &mut [Self], count: usize) -> Result<(), Error>;
    fn exp(val: &[Self], result: &mut [Self], count: usize) -> Result<(), Error>;
    fn sqrt(val: &[Self], result: &mut [Self], count: usize) -> Result<(), Error>;
    fn tanh(val: &[Self], result: &mut [Self], count: usize) -> Result<(), Error>;
    fn sin(val: &[Self], result: &mut [Self], count: usize) -> Result<(), Error>;
    fn cos(val: &[Self], result: &mut [Self], count: usize) -> Result<(), Error>;
    fn tan(val: &[Self], result: &mut [Self], count: usize) -> Result<(), Error>;

    // === Transpose ===

    /// Transpose a row-major `rows x cols` matrix into `result`.
    /// `result` must be independent storage; there is no in-place contract.
    fn transpose(val: &[Self], result: &mut [Self], rows: usize, cols: usize) {
        for x in 0..cols {
            for y in 0..rows {
                result[y + x * rows] = val[y * cols + x];
            }
        }
    }

    // === Reductions ===

    fn sum(val: &[Self], count: usize) -> Self {
        let mut acc = Self::ZERO;
        for &v in val.iter().take(count) {
            acc = acc + v;
        }
        acc
    }

    fn sum_strided(val: &[Self], stride: usize, count: usize) -> Self {
        let mut acc = Self::ZERO;
        for i in 0..count {
            acc = acc + val[i * stride];
        }
        acc
    }

    /// Index and value of the first maximal element (strict `>` comparison,
    /// so ties resolve to the earliest index).
    fn argmax(values: &[Self], count: usize) -> Result<(usize, Self), Error> {
        Self::argmax_strided(values, 1, count)
    }

    fn argmax_strided(values: &[Self], stride: usize, count: usize) -> Result<(usize, Self), Error> {
        if count == 0 {
            return Err(Error::EmptyReduction { op: "argmax" });
        }
        let mut max_i = 0;
        let mut max_v = values[0];
        for i in 1..count {
            let v = values[i * stride];
            if v > max_v {
                max_i = i;
                max_v = v;
            }
        }
        Ok((max_i, max_v))
    }

    /// Index and value of the first minimal element.
    fn argmin(values: &[Self], count: usize) -> Result<(usize, Self), Error> {
        Self::argmin_strided(values, 1, count)
    }

    fn argmin_strided(values: &[Self], stride: usize, count: usize) -> Result<(usize, Self), Error> {
        if count == 0 {
            return Err(Error::EmptyReduction { op: "argmin" });
        }
        let mut min_i = 0;
        let mut min_v = values[0];
        for i in 1..count {
            let v = values[i * stride];
            if v < min_v {
                min_i = i;
                min_v = v;
            }
        }
        Ok((min_i, min_v))
    }

    // === GEMM ===

    /// General matrix multiply:
    /// `result = alpha * op(lhs) @ op(rhs) + beta * result`
    /// where `op` transposes its operand when the corresponding flag is set.
    ///
    /// Shapes are physical (rows, cols) of the stored row-major matrices;
    /// inner dimensions after applying the flags must match, and
    /// `result_shape` must equal the outer dimensions. The tensor layer
    /// validates this with typed errors; kernels only debug-assert.
    #[allow(clippy::too_many_arguments)]
    fn gemm(
        lhs: &[Self],
        rhs: &[Self],
        result: &mut [Self],
        lhs_shape: (usize, usize),
        rhs_shape: (usize, usize),
        result_shape: (usize, usize),
        alpha: Self,
        beta: Self,
        transpose_first: bool,
        transpose_second: bool,
    ) {
        debug_assert_eq!(
            if transpose_first { lhs_shape.1 } else { lhs_shape.0 },
            result_shape.0
        );
        debug_assert_eq!(
            if transpose_second { rhs_shape.0 } else { rhs_shape.1 },
            result_shape.1
        );
        debug_assert_eq!(
            if transpose_first { lhs_shape.0 } else { lhs_shape.1 },
            if transpose_second { rhs_shape.1 } else { rhs_shape.0 }
        );

        let (m, n) = result_shape;
        let k = if transpose_first { lhs_shape.0 } else { lhs_shape.1 };

        for i in 0..m {
            for j in 0..n {
                let mut acc = Self::ZERO;
                for l in 0..k {
                    let a = if transpose_first {
                        lhs[l * lhs_shape.1 + i]
                    } else {
                        lhs[i * lhs_shape.1 + l]
                    };
                    let b = if transpose_second {
                        rhs[j * rhs_shape.1 + l]
                    } else {
                        rhs[l * rhs_shape.1 + j]
                    };
                    acc = acc + a * b;
                }
                result[i * n + j] = alpha * acc + beta * result[i * n + j];
            }
        }
    }

    // === Copy & progressions ===

    /// Strided copy, used to materialize non-contiguous views.
    fn copy(values: &[Self], src_stride: usize, result: &mut [Self], dst_stride: usize, count: usize) {
        for i in 0..count {
            result[i * dst_stride] = values[i * src_stride];
        }
    }

    /// Fill `result` with `count` evenly spaced values from `start` towards
    /// `end` (half-open; `end` itself is not produced).
    fn arange(start: Self, end: Self, result: &mut [Self], count: usize) {
        let span = end - start;
        let denom = Self::from_usize(count);
        for (i, slot) in result.iter_mut().enumerate().take(count) {
            *slot = start + span * Self::from_usize(i) / denom;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_strided() {
        let mut buf = [0.0f32; 6];
        f32::fill(7.0, &mut buf, 2, 3);
        assert_eq!(buf, [7.0, 0.0, 7.0, 0.0, 7.0, 0.0]);
    }

    #[test]
    fn test_binary_kernels() {
        let a = [1.0f32, 2.0, 3.0];
        let b = [4.0f32, 5.0, 1.0];
        let mut out = [0.0f32; 3];

        f32::vadd(&a, &b, &mut out, 3);
        assert_eq!(out, [5.0, 7.0, 4.0]);
        f32::vmax(&a, &b, &mut out, 3);
        assert_eq!(out, [4.0, 5.0, 3.0]);
        f32::vmin(&a, &b, &mut out, 3);
        assert_eq!(out, [1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_transpose_kernel() {
        // 2x3 row-major -> 3x2
        let val = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut out = [0.0f32; 6];
        f32::transpose(&val, &mut out, 2, 3);
        assert_eq!(out, [1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_argmax_first_occurrence_wins() {
        let vals = [3, 5, 5, 1];
        assert_eq!(i32::argmax(&vals, 4).unwrap(), (1, 5));

        let vals = [2.0f32, 1.0, 1.0, 2.0];
        assert_eq!(f32::argmin(&vals, 4).unwrap(), (1, 1.0));
    }

    #[test]
    fn test_argmax_strided() {
        let vals = [0.0f32, 9.0, 5.0, 9.0, 1.0, 9.0];
        // every second element: [0, 5, 1]
        assert_eq!(f32::argmax_strided(&vals, 2, 3).unwrap(), (1, 5.0));
    }

    #[test]
    fn test_empty_reduction_fails() {
        let vals: [f32; 0] = [];
        assert!(matches!(
            f32::argmax(&vals, 0),
            Err(Error::EmptyReduction { op: "argmax" })
        ));
        assert!(matches!(
            f32::argmin(&vals, 0),
            Err(Error::EmptyReduction { op: "argmin" })
        ));
    }

    #[test]
    fn test_gemm_plain() {
        // 2x3 @ 3x2 -> 2x2
        let a = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b = [7.0f32, 8.0, 9.0, 10.0, 11.0, 12.0];
        let mut c = [0.0f32; 4];
        f32::gemm(&a, &b, &mut c, (2, 3), (3, 2), (2, 2), 1.0, 0.0, false, false);
        assert_eq!(c, [58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_gemm_transpose_flags() {
        // a is stored 3x2; op(a) with transpose_first is the 2x3 matrix
        // [[1,3,5],[2,4,6]]
        let a = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b = [7.0f32, 8.0, 9.0, 10.0, 11.0, 12.0];
        let mut c = [0.0f32; 4];
        f32::gemm(&a, &b, &mut c, (3, 2), (3, 2), (2, 2), 1.0, 0.0, true, false);
        // [[1,3,5],[2,4,6]] @ [[7,8],[9,10],[11,12]]
        assert_eq!(c, [89.0, 98.0, 116.0, 128.0]);
    }

    #[test]
    fn test_gemm_alpha_beta() {
        let a = [1.0f32, 0.0, 0.0, 1.0];
        let b = [1.0f32, 2.0, 3.0, 4.0];
        let mut c = [10.0f32, 10.0, 10.0, 10.0];
        f32::gemm(&a, &b, &mut c, (2, 2), (2, 2), (2, 2), 2.0, 1.0, false, false);
        // 2 * I @ b + c
        assert_eq!(c, [12.0, 14.0, 16.0, 18.0]);
    }

    #[test]
    fn test_copy_strided() {
        let src = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut dst = [0.0f32; 6];
        f32::copy(&src, 2, &mut dst, 1, 3);
        assert_eq!(&dst[..3], &[1.0, 3.0, 5.0]);

        let mut spread = [0.0f32; 6];
        f32::copy(&src, 1, &mut spread, 2, 3);
        assert_eq!(spread, [1.0, 0.0, 2.0, 0.0, 3.0, 0.0]);
    }

    #[test]
    fn test_arange_even_spacing() {
        let mut out = [0.0f32; 4];
        f32::arange(0.0, 2.0, &mut out, 4);
        assert_eq!(out, [0.0, 0.5, 1.0, 1.5]);

        let mut neg = [0.0f32; 2];
        f32::arange(1.0, -1.0, &mut neg, 2);
        assert_eq!(neg, [1.0, 0.0]);
    }
}
