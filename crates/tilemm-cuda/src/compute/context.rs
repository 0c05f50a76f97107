use cudarc::driver::sys::{CUcontext, CUdevice, CUdevice_attribute, CUstream};
use std::{ffi::c_void, sync::Arc};
use tilemm_runtime::server::{
    CubeCount, CubeDim, DeviceProperties, ExecutionError, LaunchGeometry, MatmulBindings,
};

use super::{storage::DeviceBuffer, sync::TimingEvent, CudaFunction};
use crate::CudaDevice;

/// A retained primary context, released when the last owner is dropped.
///
/// Shared by a [CudaContext] and every [CudaFunction] compiled on it, so modules can always
/// be unloaded with their context alive.
#[derive(Debug)]
pub(crate) struct PrimaryContext {
    cu_device: CUdevice,
    context: CUcontext,
}

impl PrimaryContext {
    /// Make the context current on the calling thread.
    pub(crate) fn bind(&self) -> Result<(), cudarc::driver::DriverError> {
        unsafe { cudarc::driver::result::ctx::set_current(self.context) }
    }
}

impl Drop for PrimaryContext {
    fn drop(&mut self) {
        unsafe {
            cudarc::driver::result::primary_ctx::release(self.cu_device).ok();
        }
    }
}

/// An initialized CUDA context: the device's primary context and a stream to launch on.
///
/// Every operation makes the context current on the calling thread first.
#[derive(Debug)]
pub struct CudaContext {
    device: CudaDevice,
    pub(crate) primary: Arc<PrimaryContext>,
    pub(crate) stream: CUstream,
    pub(crate) arch: u32,
    pub(crate) properties: DeviceProperties,
}

impl CudaContext {
    /// Retain the primary context of the device and create a stream on it.
    pub fn new(device: &CudaDevice) -> Result<Self, ExecutionError> {
        let init_error = |err: cudarc::driver::DriverError| ExecutionError::Launch {
            reason: format!("Unable to initialize {device:?}: {err:?}"),
        };

        let primary = unsafe {
            cudarc::driver::result::init().map_err(init_error)?;
            let cu_device =
                cudarc::driver::result::device::get(device.index as i32).map_err(init_error)?;
            let context =
                cudarc::driver::result::primary_ctx::retain(cu_device).map_err(init_error)?;
            PrimaryContext { cu_device, context }
        };

        // The primary context is released by `primary` if the stream can't be created.
        let stream = unsafe {
            primary
                .bind()
                .and_then(|_| {
                    cudarc::driver::result::stream::create(
                        cudarc::driver::result::stream::StreamKind::NonBlocking,
                    )
                })
                .map_err(init_error)?
        };

        let (arch, properties) = match device_properties(primary.cu_device) {
            Ok(properties) => properties,
            Err(err) => {
                unsafe { cudarc::driver::result::stream::destroy(stream).ok() };
                return Err(init_error(err));
            }
        };

        log::debug!("Initialized {device:?} (sm_{arch}): {properties:?}");

        Ok(Self {
            device: device.clone(),
            primary: Arc::new(primary),
            stream,
            arch,
            properties,
        })
    }

    /// The device the context was created on.
    pub fn device(&self) -> &CudaDevice {
        &self.device
    }

    /// Make the context current on the calling thread.
    pub(crate) fn bind(&self) -> Result<(), cudarc::driver::DriverError> {
        self.primary.bind()
    }

    /// Copy the inputs, launch the function and read the output back.
    ///
    /// Device buffers and events are released when this returns, on success or failure.
    pub(crate) fn launch(
        &self,
        function: &CudaFunction,
        geometry: LaunchGeometry,
        bindings: MatmulBindings<'_>,
        timed: bool,
    ) -> Result<Option<f64>, ExecutionError> {
        self.bind().map_err(|err| ExecutionError::Launch {
            reason: format!("Unable to bind the context: {err:?}"),
        })?;

        let lhs = DeviceBuffer::from_host(bindings.lhs, self.stream)?;
        let rhs = DeviceBuffer::from_host(bindings.rhs, self.stream)?;
        let out = DeviceBuffer::empty(bindings.out.len(), self.stream)?;

        let mut lhs_ptr = lhs.ptr;
        let mut rhs_ptr = rhs.ptr;
        let mut out_ptr = out.ptr;
        let mut size = bindings.size;
        let mut params = [
            &mut lhs_ptr as *mut _ as *mut c_void,
            &mut rhs_ptr as *mut _ as *mut c_void,
            &mut out_ptr as *mut _ as *mut c_void,
            &mut size as *mut i32 as *mut c_void,
        ];

        let cube_count = geometry.cube_count;
        let cube_dim = geometry.cube_dim;

        let start = timed.then(|| TimingEvent::record(self.stream)).transpose()?;
        unsafe {
            cudarc::driver::result::launch_kernel(
                function.func,
                (cube_count.x, cube_count.y, cube_count.z),
                (cube_dim.x, cube_dim.y, cube_dim.z),
                0,
                self.stream,
                &mut params,
            )
        }
        .map_err(|err| ExecutionError::Launch {
            reason: format!("{err:?}"),
        })?;
        let end = timed.then(|| TimingEvent::record(self.stream)).transpose()?;

        let elapsed = match (start, end) {
            (Some(start), Some(end)) => {
                end.wait_sync()?;
                Some(start.elapsed_until(&end)?)
            }
            _ => None,
        };

        out.read_into(bindings.out)?;

        Ok(elapsed)
    }
}

impl Drop for CudaContext {
    fn drop(&mut self) {
        unsafe {
            if self.bind().is_ok() {
                cudarc::driver::result::stream::synchronize(self.stream).ok();
                cudarc::driver::result::stream::destroy(self.stream).ok();
            }
        }
    }
}

fn device_properties(
    device: CUdevice,
) -> Result<(u32, DeviceProperties), cudarc::driver::DriverError> {
    use cudarc::driver::{result::device::get_attribute, sys::CUdevice_attribute::*};

    let attribute = |kind: CUdevice_attribute| -> Result<u32, cudarc::driver::DriverError> {
        unsafe { get_attribute(device, kind) }.map(|value| value as u32)
    };

    let arch = attribute(CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR)? * 10
        + attribute(CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR)?;

    let max_units_per_cube = attribute(CU_DEVICE_ATTRIBUTE_MAX_THREADS_PER_BLOCK)?;
    let max_cube_dim = CubeDim::new(
        attribute(CU_DEVICE_ATTRIBUTE_MAX_BLOCK_DIM_X)?,
        attribute(CU_DEVICE_ATTRIBUTE_MAX_BLOCK_DIM_Y)?,
        attribute(CU_DEVICE_ATTRIBUTE_MAX_BLOCK_DIM_Z)?,
    );
    let max_cube_count = CubeCount::new(
        attribute(CU_DEVICE_ATTRIBUTE_MAX_GRID_DIM_X)?,
        attribute(CU_DEVICE_ATTRIBUTE_MAX_GRID_DIM_Y)?,
        attribute(CU_DEVICE_ATTRIBUTE_MAX_GRID_DIM_Z)?,
    );

    Ok((
        arch,
        DeviceProperties::new(max_units_per_cube, max_cube_dim, max_cube_count),
    ))
}
