use half::{bf16, f16};

use crate::config::Precision;

/// Host element type of a matrix.
///
/// Elements are plain old data so matrices are handed to a runtime as raw bytes.
pub trait Element:
    bytemuck::Pod + Send + Sync + PartialEq + core::fmt::Debug + core::fmt::Display + 'static
{
    /// Precision of the kernel able to process this element.
    const PRECISION: Precision;

    /// Convert to `f64`.
    fn to_f64(self) -> f64;

    /// Convert from `f64`, rounding to the nearest value.
    fn from_f64(value: f64) -> Self;
}

impl Element for f64 {
    const PRECISION: Precision = Precision::Double;

    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }
}

impl Element for f32 {
    const PRECISION: Precision = Precision::Single;

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl Element for f16 {
    const PRECISION: Precision = Precision::Half;

    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }

    fn from_f64(value: f64) -> Self {
        f16::from_f64(value)
    }
}

impl Element for bf16 {
    const PRECISION: Precision = Precision::BHalf;

    fn to_f64(self) -> f64 {
        bf16::to_f64(self)
    }

    fn from_f64(value: f64) -> Self {
        bf16::from_f64(value)
    }
}
