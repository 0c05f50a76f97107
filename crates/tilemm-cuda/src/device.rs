#[derive(new, Clone, PartialEq, Eq, Default, Hash)]
pub struct CudaDevice {
    pub index: usize,
}

impl CudaDevice {
    /// Number of CUDA devices, zero when the driver can't be loaded.
    pub fn count() -> usize {
        std::panic::catch_unwind(cudarc::driver::CudaContext::device_count)
            .ok()
            .and_then(Result::ok)
            .unwrap_or(0) as usize
    }
}

impl core::fmt::Debug for CudaDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cuda({})", self.index)
    }
}
