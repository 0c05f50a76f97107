pub use tilemm_core::*;

#[cfg(feature = "cuda")]
pub use tilemm_cuda as cuda;
