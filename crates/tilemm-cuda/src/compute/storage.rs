use cudarc::driver::sys::{CUdeviceptr, CUstream};
use tilemm_runtime::server::ExecutionError;

/// Device memory owned for the duration of a single launch.
///
/// The memory is freed on the stream it was allocated on when the buffer is dropped, which
/// requires the owning context to still be current.
#[derive(Debug)]
pub(crate) struct DeviceBuffer {
    pub ptr: CUdeviceptr,
    size: usize,
    stream: CUstream,
}

impl DeviceBuffer {
    /// Reserve `size` bytes without initializing them.
    pub fn empty(size: usize, stream: CUstream) -> Result<Self, ExecutionError> {
        let ptr = unsafe { cudarc::driver::result::malloc_async(stream, size) }.map_err(|err| {
            ExecutionError::Transfer {
                reason: format!("Unable to allocate {size} bytes: {err:?}"),
            }
        })?;

        Ok(Self { ptr, size, stream })
    }

    /// Reserve device memory and enqueue a copy of `data` into it.
    pub fn from_host(data: &[u8], stream: CUstream) -> Result<Self, ExecutionError> {
        let buffer = Self::empty(data.len(), stream)?;

        unsafe { cudarc::driver::result::memcpy_htod_async(buffer.ptr, data, stream) }.map_err(
            |err| ExecutionError::Transfer {
                reason: format!("Unable to copy {} bytes to the device: {err:?}", data.len()),
            },
        )?;

        Ok(buffer)
    }

    /// Copy the buffer back to the host and wait for every task enqueued on the stream.
    pub fn read_into(&self, data: &mut [u8]) -> Result<(), ExecutionError> {
        if data.len() != self.size {
            return Err(ExecutionError::Transfer {
                reason: format!(
                    "Can't read {} device bytes into a buffer of {} bytes",
                    self.size,
                    data.len()
                ),
            });
        }

        unsafe {
            cudarc::driver::result::memcpy_dtoh_async(data, self.ptr, self.stream).map_err(
                |err| ExecutionError::Transfer {
                    reason: format!("Unable to copy {} bytes to the host: {err:?}", self.size),
                },
            )?;
            cudarc::driver::result::stream::synchronize(self.stream).map_err(|err| {
                ExecutionError::Sync {
                    reason: format!("{err:?}"),
                }
            })
        }
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        if let Err(err) = unsafe { cudarc::driver::result::free_async(self.ptr, self.stream) } {
            log::warn!("Unable to free device buffer: {err:?}");
        }
    }
}
