//! `i32` plugin.
//!
//! Integers carry the arithmetic, comparison and reduction kernels. The
//! exponential family rounds through `f32` and truncates back, which is
//! enough for index math and integer labels. Trigonometric kernels and
//! `tanh` have no sensible integer projection and fail with
//! [`Error::UnsupportedOperation`].

use crate::error::Error;
use crate::numeric::Numeric;

macro_rules! unary_via_f32 {
    ($name:ident, $method:ident) => {
        fn $name(val: &[Self], result: &mut [Self], count: usize) -> Result<(), Error> {
            for i in 0..count {
                result[i] = (val[i] as f32).$method() as i32;
            }
            Ok(())
        }
    };
}

macro_rules! unary_unsupported {
    ($name:ident) => {
        fn $name(_val: &[Self], _result: &mut [Self], _count: usize) -> Result<(), Error> {
            Err(Error::UnsupportedOperation {
                op: stringify!($name),
                dtype: Self::DTYPE,
            })
        }
    };
}

impl Numeric for i32 {
    const ZERO: Self = 0;
    const ONE: Self = 1;
    const DTYPE: &'static str = "i32";

    fn from_usize(n: usize) -> Self {
        n as i32
    }

    fn from_f64(v: f64) -> Self {
        v as i32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    unary_via_f32!(log, ln);
    unary_via_f32!(exp, exp);
    unary_via_f32!(sqrt, sqrt);

    unary_unsupported!(tanh);
    unary_unsupported!(sin);
    unary_unsupported!(cos);
    unary_unsupported!(tan);
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::numeric::Numeric;

    #[test]
    fn test_int_exponential_family_truncates() {
        let mut out = [0i32; 3];
        i32::sqrt(&[4, 10, 16], &mut out, 3).unwrap();
        assert_eq!(out, [2, 3, 4]);

        i32::log(&[1, 20], &mut out, 2).unwrap();
        assert_eq!(&out[..2], &[0, 2]);

        i32::exp(&[0, 2], &mut out, 2).unwrap();
        assert_eq!(&out[..2], &[1, 7]);
    }

    #[test]
    fn test_int_trig_unsupported() {
        let mut out = [0i32; 1];
        for res in [
            i32::tanh(&[1], &mut out, 1),
            i32::sin(&[1], &mut out, 1),
            i32::cos(&[1], &mut out, 1),
            i32::tan(&[1], &mut out, 1),
        ] {
            assert!(matches!(
                res,
                Err(Error::UnsupportedOperation { dtype: "i32", .. })
            ));
        }
    }

    #[test]
    fn test_int_arithmetic_kernels() {
        let mut out = [0i32; 3];
        i32::vmul(&[2, 3, 4], &[5, 6, 7], &mut out, 3);
        assert_eq!(out, [10, 18, 28]);

        i32::relu(&[-3, 0, 9], &mut out, 3);
        assert_eq!(out, [0, 0, 9]);
    }

    #[test]
    fn test_int_arange() {
        let mut out = [0i32; 5];
        i32::arange(0, 10, &mut out, 5);
        assert_eq!(out, [0, 2, 4, 6, 8]);
    }
}
