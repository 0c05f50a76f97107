mod context;
mod module;
mod storage;
mod sync;

pub use context::*;
pub use module::*;
