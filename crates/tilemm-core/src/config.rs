use core::fmt::Display;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GenerateError;

/// Floating point precision of a kernel.
///
/// Only [Precision::Single] and [Precision::Double] have a device mapping, the half variants
/// exist so tuning drivers can describe them and get a proper rejection from the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Precision {
    /// IEEE binary16.
    #[serde(rename = "f16")]
    Half,
    /// bfloat16.
    #[serde(rename = "bf16")]
    BHalf,
    /// IEEE binary32.
    #[serde(rename = "f32")]
    Single,
    /// IEEE binary64.
    #[serde(rename = "f64")]
    Double,
}

impl Precision {
    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            Precision::Half | Precision::BHalf => 2,
            Precision::Single => 4,
            Precision::Double => 8,
        }
    }
}

impl Display for Precision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Precision::Half => "f16",
            Precision::BHalf => "bf16",
            Precision::Single => "f32",
            Precision::Double => "f64",
        })
    }
}

impl FromStr for Precision {
    type Err = GenerateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "f16" | "half" | "float16" => Ok(Precision::Half),
            "bf16" | "bfloat16" => Ok(Precision::BHalf),
            "f32" | "float" | "float32" | "single" => Ok(Precision::Single),
            "f64" | "double" | "float64" => Ok(Precision::Double),
            _ => Err(GenerateError::UnsupportedPrecision {
                precision: s.to_string(),
            }),
        }
    }
}

/// Tuning parameters of a tiled matmul kernel.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Element precision, selects the device type and its zero literal.
    pub precision: Precision,
    /// Side length of the square shared memory tile staged by every cube.
    pub tile_width: u32,
    /// Emit the inner product as `tile_width` statements instead of a loop.
    pub unroll: bool,
}

impl Display for KernelConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let unroll = if self.unroll { "unrolled" } else { "rolled" };
        write!(f, "{}-tw{}-{unroll}", self.precision, self.tile_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_aliases() {
        assert_eq!("float".parse::<Precision>().unwrap(), Precision::Single);
        assert_eq!("F64".parse::<Precision>().unwrap(), Precision::Double);
        assert_eq!("bfloat16".parse::<Precision>().unwrap(), Precision::BHalf);
        assert_eq!("half".parse::<Precision>().unwrap(), Precision::Half);
    }

    #[test]
    fn unknown_precision_is_named() {
        let err = "complex128".parse::<Precision>().unwrap_err();

        assert_eq!(
            err,
            GenerateError::UnsupportedPrecision {
                precision: "complex128".to_string()
            }
        );
    }

    #[test]
    fn label_describes_every_axis() {
        let rolled = KernelConfig::new(Precision::Double, 8, false);
        let unrolled = KernelConfig::new(Precision::Single, 16, true);

        assert_eq!(rolled.to_string(), "f64-tw8-rolled");
        assert_eq!(unrolled.to_string(), "f32-tw16-unrolled");
    }
}
