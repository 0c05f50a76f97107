//! Host-side helpers to check a kernel against a reference product.

use rand::{rngs::StdRng, Rng, SeedableRng};
use tilemm_runtime::{compiler::CompileOptions, server::ExecutionError, Runtime};

use crate::{
    config::KernelConfig, element::Element, error::KernelError, kernel::MatmulKernel,
    matrix::Matrix, template::Template,
};

const LHS_SEED: u64 = 0x5eed_0001;
const RHS_SEED: u64 = 0x5eed_0002;

/// Outcome of [check_kernel].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelCheck {
    /// Normwise relative error between the kernel output and the host product.
    pub relative_error: f64,
    /// Device time spent in the kernel, in milliseconds.
    pub elapsed_ms: Option<f64>,
}

/// A matrix of uniform values in `[-1, 1)`, reproducible for a given seed.
pub fn random_matrix<E: Element>(size: usize, seed: u64) -> Matrix<E> {
    let mut rng = StdRng::seed_from_u64(seed);
    Matrix::from_fn(size, |_, _| E::from_f64(rng.random_range(-1.0..1.0)))
}

/// Naive host product, accumulated in `f64`.
pub fn matmul_reference<E: Element>(
    lhs: &Matrix<E>,
    rhs: &Matrix<E>,
) -> Result<Matrix<f64>, ExecutionError> {
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
    Ok(Matrix::from_fn(size, |row, col| {
        (0..size)
            .map(|k| lhs[(row, k)].to_f64() * rhs[(k, col)].to_f64())
            .sum()
    }))
}

/// `max |actual - expected| / max |expected|`, zero when both matrices are zero.
///
/// Matrices of different sizes are infinitely far apart, and so is any matrix holding a NaN
/// or an infinity, so a kernel writing garbage can never pass a tolerance check.
pub fn relative_error<A: Element, B: Element>(actual: &Matrix<A>, expected: &Matrix<B>) -> f64 {
    if actual.size() != expected.size() {
        return f64::INFINITY;
    }

    let mut max_diff = 0.0f64;
    let mut max_expected = 0.0f64;
    for (a, e) in actual.data().iter().zip(expected.data()) {
        let (a, e) = (a.to_f64(), e.to_f64());
        if !a.is_finite() || !e.is_finite() {
            return f64::INFINITY;
        }
        max_diff = max_diff.max((a - e).abs());
        max_expected = max_expected.max(e.abs());
    }

    if max_diff == 0.0 {
        0.0
    } else {
        max_diff / max_expected
    }
}

/// Generate, compile and run a kernel on random inputs and compare it with the host product.
///
/// The execution is timed. Any failure along the way is returned as is, so a caller iterating
/// over configurations can skip the failing one.
pub fn check_kernel<R: Runtime, E: Element>(
    context: &R::Context,
    config: KernelConfig,
    template: &Template,
    size: usize,
    options: &CompileOptions,
) -> Result<KernelCheck, KernelError> {
    let kernel = MatmulKernel::new(config, template)?.compile::<R>(context, options)?;

    let lhs = random_matrix::<E>(size, LHS_SEED);
    let rhs = random_matrix::<E>(size, RHS_SEED);
    let expected = matmul_reference(&lhs, &rhs)?;

    let result = kernel.execute(context, &lhs, &rhs, true)?;
    let relative_error = relative_error(&result.output, &expected);

    log::info!("Error between host and device result for {config} (n = {size}): {relative_error:e}");

    Ok(KernelCheck {
        relative_error,
        elapsed_ms: result.elapsed_ms,
    })
}
