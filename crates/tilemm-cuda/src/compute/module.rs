use cudarc::driver::sys::{CUfunction, CUmodule};
use std::{
    ffi::{c_char, CStr, CString},
    sync::Arc,
};
use tilemm_runtime::compiler::{CompilationError, CompileOptions};

use super::{context::PrimaryContext, CudaContext};

/// A function resolved in a module loaded on a [CudaContext].
///
/// The module is unloaded when the function is dropped. The function keeps the primary context
/// retained, so it may outlive the [CudaContext] it was compiled on.
#[derive(Debug)]
pub struct CudaFunction {
    module: CUmodule,
    pub(crate) func: CUfunction,
    entrypoint: String,
    pub(crate) context: Arc<PrimaryContext>,
}

impl CudaFunction {
    /// Name of the entry point.
    pub fn entrypoint(&self) -> &str {
        &self.entrypoint
    }
}

impl Drop for CudaFunction {
    fn drop(&mut self) {
        let unloaded = self
            .context
            .bind()
            .and_then(|_| unsafe { cudarc::driver::result::module::unload(self.module) });
        if let Err(err) = unloaded {
            log::warn!("Unable to unload module of {}: {err:?}", self.entrypoint);
        }
    }
}

impl CudaContext {
    /// Compile the source to PTX with NVRTC, load it and resolve the entry point.
    pub(crate) fn compile(
        &self,
        source: &str,
        entrypoint: &str,
        options: &CompileOptions,
    ) -> Result<CudaFunction, CompilationError> {
        let mut args = options.to_args();
        if !options.iter().any(|(key, _)| key.contains("arch")) {
            args.push(format!("--gpu-architecture=sm_{}", self.arch));
        }

        log::trace!("Compiling kernel with {args:?}");

        let ptx = compile_ptx(source, &args)?;
        self.load_ptx(ptx, entrypoint)
    }

    fn load_ptx(
        &self,
        ptx: Vec<c_char>,
        entrypoint: &str,
    ) -> Result<CudaFunction, CompilationError> {
        self.bind().map_err(|err| CompilationError::Load {
            reason: format!("Unable to bind the context: {err:?}"),
        })?;

        let func_name =
            CString::new(entrypoint).map_err(|_| CompilationError::MissingEntrypoint {
                name: entrypoint.to_string(),
                reason: "the name contains a nul byte".to_string(),
            })?;

        unsafe {
            let module = cudarc::driver::result::module::load_data(ptx.as_ptr() as *const _)
                .map_err(|err| CompilationError::Load {
                    reason: format!("{err:?}"),
                })?;

            match cudarc::driver::result::module::get_function(module, func_name) {
                Ok(func) => Ok(CudaFunction {
                    module,
                    func,
                    entrypoint: entrypoint.to_string(),
                    context: self.primary.clone(),
                }),
                Err(err) => {
                    cudarc::driver::result::module::unload(module).ok();
                    Err(CompilationError::MissingEntrypoint {
                        name: entrypoint.to_string(),
                        reason: format!("{err:?}"),
                    })
                }
            }
        }
    }
}

fn compile_ptx(source: &str, args: &[String]) -> Result<Vec<c_char>, CompilationError> {
    let source = CString::new(source).map_err(|_| CompilationError::Toolchain {
        log: "The kernel source contains a nul byte".to_string(),
    })?;
    let toolchain_error = |err: cudarc::nvrtc::result::NvrtcError| CompilationError::Toolchain {
        log: format!("{err:?}"),
    };

    unsafe {
        let program = cudarc::nvrtc::result::create_program(source.as_c_str(), None)
            .map_err(toolchain_error)?;

        let ptx = match cudarc::nvrtc::result::compile_program(program, args) {
            Ok(()) => cudarc::nvrtc::result::get_ptx(program).map_err(toolchain_error),
            Err(err) => Err(CompilationError::Toolchain {
                log: program_log(program).unwrap_or_else(|| format!("{err:?}")),
            }),
        };

        cudarc::nvrtc::result::destroy_program(program).ok();
        ptx
    }
}

unsafe fn program_log(program: cudarc::nvrtc::sys::nvrtcProgram) -> Option<String> {
    let log = cudarc::nvrtc::result::get_program_log(program).ok()?;
    let log = CStr::from_ptr(log.as_ptr()).to_string_lossy();

    Some(log.trim_end().to_string())
}
