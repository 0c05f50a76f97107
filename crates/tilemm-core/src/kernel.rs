use tilemm_runtime::{
    compiler::{CompilationError, CompileOptions},
    logging::with_kernel_logger,
    server::ExecutionError,
    Runtime,
};

use crate::{
    config::KernelConfig,
    element::Element,
    error::GenerateError,
    execute::{execute, MatmulOutput},
    generator::generate,
    matrix::Matrix,
    template::Template,
};

/// Name of the entry point every tiled matmul template must define.
pub const ENTRYPOINT: &str = "matmul";

/// A generated, not yet compiled, tiled matmul kernel.
///
/// The source is generated once at construction and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatmulKernel {
    config: KernelConfig,
    source: String,
}

impl MatmulKernel {
    /// Generate the kernel source from the given template.
    pub fn new(config: KernelConfig, template: &Template) -> Result<Self, GenerateError> {
        let source = generate(&config, template)?;

        Ok(Self { config, source })
    }

    /// Generate the kernel source from the bundled template.
    pub fn tiled(config: KernelConfig) -> Result<Self, GenerateError> {
        Self::new(config, &Template::tiled_matmul())
    }

    /// The configuration the source was generated from.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// The generated source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Compile the source on the context's device.
    ///
    /// The kernel is consumed; on failure, the toolchain diagnostic is returned and nothing is
    /// kept.
    pub fn compile<R: Runtime>(
        self,
        context: &R::Context,
        options: &CompileOptions,
    ) -> Result<CompiledMatmul<R>, CompilationError> {
        with_kernel_logger(|logger| logger.log_compilation(&self.config, &self.source, options));
        log::debug!("Compiling {} on {}", self.config, R::name());

        let function = R::compile(context, &self.source, ENTRYPOINT, options).inspect_err(|err| {
            log::warn!("Compilation of {} failed: {err}", self.config);
        })?;

        Ok(CompiledMatmul {
            kernel: self,
            function,
        })
    }
}

/// A tiled matmul kernel loaded on a device, ready to be executed any number of times.
///
/// The launch geometry is always derived from the configuration the function was compiled
/// from, so a function can't be launched with the tile width of another kernel.
#[derive(Debug)]
pub struct CompiledMatmul<R: Runtime> {
    kernel: MatmulKernel,
    function: R::Function,
}

impl<R: Runtime> CompiledMatmul<R> {
    /// The configuration the kernel was generated from.
    pub fn config(&self) -> &KernelConfig {
        &self.kernel.config
    }

    /// The compiled source.
    pub fn source(&self) -> &str {
        &self.kernel.source
    }

    /// The device function.
    pub fn function(&self) -> &R::Function {
        &self.function
    }

    /// Multiply `lhs` by `rhs`, see [execute].
    pub fn execute<E: Element>(
        &self,
        context: &R::Context,
        lhs: &Matrix<E>,
        rhs: &Matrix<E>,
        timed: bool,
    ) -> Result<MatmulOutput<E>, ExecutionError> {
        execute(context, self, lhs, rhs, timed)
    }
}
