use thiserror::Error;
use tilemm_runtime::{compiler::CompilationError, server::ExecutionError};

use crate::template::TemplateError;

/// Errors raised while generating kernel source.
///
/// Generation never touches a device, so these are raised before any resource is acquired.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// The precision has no device type or zero literal.
    #[error("Precision {precision} is not supported by the tiled matmul kernel")]
    UnsupportedPrecision {
        /// The rejected precision.
        precision: String,
    },

    /// Tiles must hold at least one element.
    #[error("Tile width must be at least 1")]
    InvalidTileWidth,

    /// The template couldn't be instantiated.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Any error raised by a kernel operation, from generation to execution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    /// Source generation failed.
    #[error(transparent)]
    Generate(#[from] GenerateError),
    /// The toolchain rejected the generated source.
    #[error(transparent)]
    Compilation(#[from] CompilationError),
    /// The compiled kernel failed to run.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}
