use crate::{
    compiler::{CompilationError, CompileOptions},
    server::{DeviceProperties, ExecutionError, LaunchGeometry, MatmulBindings},
};

/// A device backend able to compile generated kernel source and launch it.
///
/// The context is passed explicitly to every operation; a runtime never relies on an implicit
/// current device.
pub trait Runtime: Sized + Send + Sync + 'static + core::fmt::Debug {
    /// The device used to create a context.
    type Device: Default + Clone + core::fmt::Debug;
    /// An initialized device context, owning the stream kernels are launched on.
    type Context: core::fmt::Debug;
    /// A compiled device function, valid as long as its context is alive.
    type Function: core::fmt::Debug;

    /// Create a context on the given device.
    fn context(device: &Self::Device) -> Result<Self::Context, ExecutionError>;

    /// The runtime name.
    fn name() -> &'static str;

    /// Hardware limits of the device behind the context.
    fn properties(context: &Self::Context) -> DeviceProperties;

    /// Compile the source and resolve `entrypoint` in the resulting module.
    fn compile(
        context: &Self::Context,
        source: &str,
        entrypoint: &str,
        options: &CompileOptions,
    ) -> Result<Self::Function, CompilationError>;

    /// Copy the inputs to the device, launch the function with the given geometry, wait for it
    /// to finish and copy the output back into `bindings.out`.
    ///
    /// When `timed` is set, returns the device-measured time in milliseconds between the
    /// start and the end of the kernel, transfers excluded.
    fn launch(
        context: &Self::Context,
        function: &Self::Function,
        geometry: LaunchGeometry,
        bindings: MatmulBindings<'_>,
        timed: bool,
    ) -> Result<Option<f64>, ExecutionError>;
}
