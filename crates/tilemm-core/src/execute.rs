use tilemm_runtime::{
    logging::with_kernel_logger,
    server::{ExecutionError, LaunchGeometry, MatmulBindings},
    Runtime,
};

use crate::{element::Element, kernel::CompiledMatmul, matrix::Matrix};

/// Result of a kernel execution.
#[derive(Debug, Clone, PartialEq)]
pub struct MatmulOutput<E> {
    /// The product of the two inputs.
    pub output: Matrix<E>,
    /// Device time spent in the kernel in milliseconds, only measured for timed executions.
    pub elapsed_ms: Option<f64>,
}

/// Multiply `lhs` by `rhs` with a compiled kernel.
///
/// Both matrices must have the same size and an element type matching the kernel precision.
/// Inputs are copied to the device, the kernel is launched with one cube per output tile and
/// the product is copied back. Device memory doesn't outlive the call.
///
/// When `timed` is set, the kernel is bracketed by device events and the time between them is
/// returned in milliseconds; otherwise no events are recorded.
pub fn execute<R: Runtime, E: Element>(
    context: &R::Context,
    kernel: &CompiledMatmul<R>,
    lhs: &Matrix<E>,
    rhs: &Matrix<E>,
    timed: bool,
) -> Result<MatmulOutput<E>, ExecutionError> {
    let config = kernel.config();

    if E::PRECISION != config.precision {
        return Err(ExecutionError::InvalidInput {
            reason: format!("Kernel {config} can't process {} elements", E::PRECISION),
        });
    }
    if lhs.size() != rhs.size() {
        return Err(ExecutionError::InvalidInput {
            reason: format!(
                "Matrix sizes differ: lhs is {0}x{0}, rhs is {1}x{1}",
                lhs.size(),
                rhs.size()
            ),
        });
    }

    let size = lhs.size();
    if size == 0 {
        return Ok(MatmulOutput {
            output: Matrix::zeros(0),
            elapsed_ms: timed.then_some(0.0),
        });
    }

    let width = i32::try_from(size).map_err(|_| ExecutionError::DimensionOverflow {
        size,
        max: i32::MAX as usize,
    })?;
    let properties = R::properties(context);
    let geometry = LaunchGeometry::square(width as u32, config.tile_width, &properties)?;

    let mut output = Matrix::<E>::zeros(size);
    let bindings = MatmulBindings {
        lhs: lhs.as_bytes(),
        rhs: rhs.as_bytes(),
        out: bytemuck::cast_slice_mut(output.data_mut()),
        size: width,
    };

    log::trace!("Launching {config} with {geometry} for a {size}x{size} product");

    let elapsed_ms = R::launch(context, kernel.function(), geometry, bindings, timed)?;

    if let Some(elapsed) = elapsed_ms {
        with_kernel_logger(|logger| logger.register_profiled(config, elapsed, &geometry));
    }

    Ok(MatmulOutput { output, elapsed_ms })
}
