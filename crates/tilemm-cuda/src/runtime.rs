use tilemm_runtime::{
    compiler::{CompilationError, CompileOptions},
    server::{DeviceProperties, ExecutionError, LaunchGeometry, MatmulBindings},
    Runtime,
};

use crate::{
    compute::{CudaContext, CudaFunction},
    device::CudaDevice,
};

/// Runtime compiling kernels with NVRTC and launching them with the CUDA driver.
#[derive(Debug)]
pub struct CudaRuntime;

impl Runtime for CudaRuntime {
    type Device = CudaDevice;
    type Context = CudaContext;
    type Function = CudaFunction;

    fn context(device: &Self::Device) -> Result<Self::Context, ExecutionError> {
        CudaContext::new(device)
    }

    fn name() -> &'static str {
        "cuda"
    }

    fn properties(context: &Self::Context) -> DeviceProperties {
        context.properties
    }

    fn compile(
        context: &Self::Context,
        source: &str,
        entrypoint: &str,
        options: &CompileOptions,
    ) -> Result<Self::Function, CompilationError> {
        context.compile(source, entrypoint, options)
    }

    fn launch(
        context: &Self::Context,
        function: &Self::Function,
        geometry: LaunchGeometry,
        bindings: MatmulBindings<'_>,
        timed: bool,
    ) -> Result<Option<f64>, ExecutionError> {
        context.launch(function, geometry, bindings, timed)
    }
}
