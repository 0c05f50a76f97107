use core::fmt::Display;
use thiserror::Error;

/// Number of units (threads) in a cube (thread block), per dimension.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CubeDim {
    /// Units along x.
    pub x: u32,
    /// Units along y.
    pub y: u32,
    /// Units along z.
    pub z: u32,
}

impl CubeDim {
    /// Total number of units in the cube.
    pub fn num_elems(&self) -> u32 {
        self.x * self.y * self.z
    }
}

/// Number of cubes (thread blocks) dispatched, per dimension.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CubeCount {
    /// Cubes along x.
    pub x: u32,
    /// Cubes along y.
    pub y: u32,
    /// Cubes along z.
    pub z: u32,
}

/// Hardware limits relevant to launching a tiled kernel.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProperties {
    /// Maximum number of units (threads) in a single cube.
    pub max_units_per_cube: u32,
    /// Maximum cube size per dimension.
    pub max_cube_dim: CubeDim,
    /// Maximum number of cubes per dimension.
    pub max_cube_count: CubeCount,
}

/// Block and grid dimensions of a square tiled launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchGeometry {
    /// One unit per output element of a tile: `tile_width x tile_width x 1`.
    pub cube_dim: CubeDim,
    /// `ceil(size / tile_width)` cubes along x and y.
    pub cube_count: CubeCount,
}

impl LaunchGeometry {
    /// Compute the geometry covering a `size x size` output with square tiles.
    ///
    /// The grid always covers the remainder tile when `size` isn't a multiple of `tile_width`.
    pub fn square(
        size: u32,
        tile_width: u32,
        properties: &DeviceProperties,
    ) -> Result<Self, ExecutionError> {
        if tile_width == 0 {
            return Err(ExecutionError::InvalidInput {
                reason: "tile width must be at least 1".to_string(),
            });
        }

        let units = tile_width.checked_mul(tile_width).unwrap_or(u32::MAX);
        if units > properties.max_units_per_cube {
            return Err(ExecutionError::TooManyUnits {
                requested: units,
                max: properties.max_units_per_cube,
            });
        }

        let cube_dim = CubeDim::new(tile_width, tile_width, 1);
        let max_dim = properties.max_cube_dim;
        if cube_dim.x > max_dim.x || cube_dim.y > max_dim.y {
            return Err(ExecutionError::CubeDimTooBig {
                requested: cube_dim,
                max: max_dim,
            });
        }

        let cubes = size.div_ceil(tile_width);
        let cube_count = CubeCount::new(cubes, cubes, 1);
        let max_count = properties.max_cube_count;
        if cube_count.x > max_count.x || cube_count.y > max_count.y {
            return Err(ExecutionError::CubeCountTooBig {
                requested: cube_count,
                max: max_count,
            });
        }

        Ok(Self {
            cube_dim,
            cube_count,
        })
    }
}

impl Display for LaunchGeometry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "grid=({}, {}, {}) block=({}, {}, {})",
            self.cube_count.x,
            self.cube_count.y,
            self.cube_count.z,
            self.cube_dim.x,
            self.cube_dim.y,
            self.cube_dim.z
        )
    }
}

/// Host buffers bound to a single matmul launch.
///
/// Buffers are raw bytes in row-major order; the element type is fixed by the compiled kernel.
#[derive(Debug)]
pub struct MatmulBindings<'a> {
    /// Left-hand side matrix, input only.
    pub lhs: &'a [u8],
    /// Right-hand side matrix, input only.
    pub rhs: &'a [u8],
    /// Output matrix, written by the device and copied back after the launch.
    pub out: &'a mut [u8],
    /// Side length of the three matrices, passed to the kernel as its last argument.
    pub size: i32,
}

/// Errors raised while executing a compiled kernel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// The host inputs don't satisfy the kernel's requirements.
    #[error("Invalid execution input\nCaused by:\n  {reason}")]
    InvalidInput {
        /// What's wrong with the inputs.
        reason: String,
    },

    /// The matrix side length can't be passed to the kernel.
    #[error("Matrix size {size} exceeds the maximum kernel dimension {max}")]
    DimensionOverflow {
        /// The requested size.
        size: usize,
        /// The largest supported size.
        max: usize,
    },

    /// Total units per cube exceeds the device maximum.
    #[error("Total unit count exceeds maximum.\nRequested {requested} units, max units is {max}.")]
    TooManyUnits {
        /// Requested value.
        requested: u32,
        /// Maximum value.
        max: u32,
    },

    /// A cube dimension exceeds the device maximum.
    #[error("Cube dim exceeds maximum bounds.\nRequested {requested:?}, max is {max:?}.")]
    CubeDimTooBig {
        /// Requested value.
        requested: CubeDim,
        /// Maximum value.
        max: CubeDim,
    },

    /// The grid exceeds the device maximum.
    #[error("Cube count exceeds maximum bounds.\nRequested {requested:?}, max is {max:?}.")]
    CubeCountTooBig {
        /// Requested value.
        requested: CubeCount,
        /// Maximum value.
        max: CubeCount,
    },

    /// Moving data between host and device failed.
    #[error("A transfer error happened during execution\nCaused by:\n  {reason}")]
    Transfer {
        /// The cause of the error.
        reason: String,
    },

    /// The device refused the launch.
    #[error("A launch error happened during execution\nCaused by:\n  {reason}")]
    Launch {
        /// The cause of the error.
        reason: String,
    },

    /// Waiting for the device or reading its timers failed.
    #[error("A synchronization error happened during execution\nCaused by:\n  {reason}")]
    Sync {
        /// The cause of the error.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn properties() -> DeviceProperties {
        DeviceProperties::new(
            1024,
            CubeDim::new(1024, 1024, 64),
            CubeCount::new(i32::MAX as u32, u16::MAX as u32, u16::MAX as u32),
        )
    }

    #[test]
    fn grid_covers_remainder_tile() {
        let geometry = LaunchGeometry::square(50, 8, &properties()).unwrap();

        assert_eq!(geometry.cube_dim, CubeDim::new(8, 8, 1));
        assert_eq!(geometry.cube_count, CubeCount::new(7, 7, 1));
    }

    #[test]
    fn grid_is_exact_when_divisible() {
        let geometry = LaunchGeometry::square(64, 16, &properties()).unwrap();

        assert_eq!(geometry.cube_count, CubeCount::new(4, 4, 1));
        assert_eq!(geometry.to_string(), "grid=(4, 4, 1) block=(16, 16, 1)");
    }

    #[test]
    fn tile_larger_than_matrix_uses_one_cube() {
        let geometry = LaunchGeometry::square(3, 32, &properties()).unwrap();

        assert_eq!(geometry.cube_count, CubeCount::new(1, 1, 1));
    }

    #[test]
    fn rejects_too_many_units() {
        let err = LaunchGeometry::square(64, 33, &properties()).unwrap_err();

        assert_eq!(
            err,
            ExecutionError::TooManyUnits {
                requested: 1089,
                max: 1024
            }
        );
    }

    #[test]
    fn rejects_grid_over_device_limit() {
        let mut properties = properties();
        properties.max_cube_count = CubeCount::new(4, 4, 1);

        let err = LaunchGeometry::square(100, 8, &properties).unwrap_err();

        assert!(matches!(err, ExecutionError::CubeCountTooBig { .. }));
    }

    #[test]
    fn rejects_zero_tile_width() {
        let err = LaunchGeometry::square(8, 0, &properties()).unwrap_err();

        assert!(matches!(err, ExecutionError::InvalidInput { .. }));
    }
}
