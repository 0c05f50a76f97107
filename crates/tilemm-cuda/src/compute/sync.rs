use cudarc::driver::sys::{CUevent, CUevent_flags, CUstream};
use tilemm_runtime::server::ExecutionError;

/// An [event](CUevent) recorded on a stream, used to time the tasks enqueued between two of them.
///
/// The event is destroyed when dropped.
#[derive(Debug)]
pub(crate) struct TimingEvent {
    event: CUevent,
}

impl TimingEvent {
    /// Create a new event and record it on the given stream.
    pub fn record(stream: CUstream) -> Result<Self, ExecutionError> {
        let event =
            unsafe { cudarc::driver::result::event::create(CUevent_flags::CU_EVENT_DEFAULT) }
                .map_err(sync_error)?;
        let this = Self { event };

        unsafe { cudarc::driver::result::event::record(this.event, stream) }.map_err(sync_error)?;

        Ok(this)
    }

    /// Wait for the event to be reached, ensuring every task enqueued before it is completed.
    pub fn wait_sync(&self) -> Result<(), ExecutionError> {
        unsafe { cudarc::driver::result::event::synchronize(self.event) }.map_err(sync_error)
    }

    /// Milliseconds elapsed between `self` and `end`, both must be completed.
    pub fn elapsed_until(&self, end: &TimingEvent) -> Result<f64, ExecutionError> {
        let elapsed = unsafe { cudarc::driver::result::event::elapsed(self.event, end.event) }
            .map_err(sync_error)?;

        Ok(elapsed as f64)
    }
}

impl Drop for TimingEvent {
    fn drop(&mut self) {
        if let Err(err) = unsafe { cudarc::driver::result::event::destroy(self.event) } {
            log::warn!("Unable to destroy event: {err:?}");
        }
    }
}

fn sync_error(err: cudarc::driver::DriverError) -> ExecutionError {
    ExecutionError::Sync {
        reason: format!("{err:?}"),
    }
}
