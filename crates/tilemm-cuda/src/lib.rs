#[macro_use]
extern crate derive_new;

mod compute;
mod device;
mod runtime;

pub use compute::{CudaContext, CudaFunction};
pub use device::*;
pub use runtime::*;

#[cfg(test)]
mod tests {
    use tilemm_core::runtime::{
        compiler::{CompilationError, CompileOptions},
        Runtime,
    };

    pub type TestRuntime = crate::CudaRuntime;

    // Tests are skipped on machines without a driver or a device.
    fn test_context() -> Option<<TestRuntime as Runtime>::Context> {
        if crate::CudaDevice::count() == 0 {
            return None;
        }
        TestRuntime::context(&Default::default()).ok()
    }

    tilemm_core::testgen_matmul!();

    #[test]
    fn syntax_errors_carry_the_nvrtc_log() {
        let Some(context) = test_context() else {
            return;
        };
        let source = "extern \"C\" __global__ void matmul(float* out) { out[0] = }";

        let err = TestRuntime::compile(&context, source, "matmul", &CompileOptions::default())
            .unwrap_err();

        match err {
            CompilationError::Toolchain { log } => assert!(log.contains("error"), "{log}"),
            err => panic!("Unexpected error {err:?}"),
        }
    }

    #[test]
    fn function_keeps_the_context_alive() {
        let Some(context) = test_context() else {
            return;
        };
        let source = "extern \"C\" __global__ void matmul(float* out) { out[0] = 1.0f; }";

        let function = TestRuntime::compile(&context, source, "matmul", &CompileOptions::default())
            .unwrap();
        assert_eq!(std::sync::Arc::strong_count(&function.context), 2);

        drop(context);

        assert_eq!(std::sync::Arc::strong_count(&function.context), 1);
        assert!(function.context.bind().is_ok());
    }

    #[test]
    fn unknown_entrypoint_is_reported() {
        let Some(context) = test_context() else {
            return;
        };
        let source = "extern \"C\" __global__ void other(float* out) { out[0] = 1.0f; }";

        let err = TestRuntime::compile(&context, source, "matmul", &CompileOptions::default())
            .unwrap_err();

        assert!(
            matches!(&err, CompilationError::MissingEntrypoint { name, .. } if name == "matmul"),
            "{err:?}"
        );
    }
}
