//! `f32`/`f64` plugins. Floats support the entire contract.

use crate::error::Error;
use crate::numeric::Numeric;

macro_rules! unary_float_kernel {
    ($name:ident, $method:ident) => {
        fn $name(val: &[Self], result: &mut [Self], count: usize) -> Result<(), Error> {
            for i in 0..count {
                result[i] = val[i].$method();
            }
            Ok(())
        }
    };
}

macro_rules! impl_float_numeric {
    ($t:ty, $dtype:literal) => {
        impl Numeric for $t {
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;
            const DTYPE: &'static str = $dtype;

            fn from_usize(n: usize) -> Self {
                n as $t
            }

            fn from_f64(v: f64) -> Self {
                v as $t
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            unary_float_kernel!(log, ln);
            unary_float_kernel!(exp, exp);
            unary_float_kernel!(sqrt, sqrt);
            unary_float_kernel!(tanh, tanh);
            unary_float_kernel!(sin, sin);
            unary_float_kernel!(cos, cos);
            unary_float_kernel!(tan, tan);
        }
    };
}

impl_float_numeric!(f32, "f32");
impl_float_numeric!(f64, "f64");

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::numeric::Numeric;

    // qualified calls throughout: the bare method syntax would resolve to
    // the std inherent float methods instead of the kernel trait

    #[test]
    fn test_float_unary_kernels() {
        let vals = [1.0f64, std::f64::consts::E, 4.0];
        let mut out = [0.0f64; 3];

        <f64 as Numeric>::log(&vals, &mut out, 3).unwrap();
        assert_relative_eq!(out[0], 0.0);
        assert_relative_eq!(out[1], 1.0);

        <f64 as Numeric>::sqrt(&vals, &mut out, 3).unwrap();
        assert_relative_eq!(out[2], 2.0);

        <f64 as Numeric>::tanh(&[0.0], &mut out, 1).unwrap();
        assert_relative_eq!(out[0], 0.0);
    }

    #[test]
    fn test_float_trig_kernels() {
        let vals = [0.0f32, std::f32::consts::FRAC_PI_2];
        let mut out = [0.0f32; 2];

        <f32 as Numeric>::sin(&vals, &mut out, 2).unwrap();
        assert_relative_eq!(out[0], 0.0);
        assert_relative_eq!(out[1], 1.0);

        <f32 as Numeric>::cos(&vals, &mut out, 2).unwrap();
        assert_relative_eq!(out[0], 1.0);
    }

    #[test]
    fn test_relu_default() {
        let vals = [-2.0f32, 0.0, 3.5];
        let mut out = [0.0f32; 3];
        f32::relu(&vals, &mut out, 3);
        assert_eq!(out, [0.0, 0.0, 3.5]);
    }
}
