#![warn(missing_docs)]

//! Runtime interfaces shared by every tilemm backend: configuration, logging, the
//! compiler contract and the launch contract.

#[macro_use]
extern crate derive_new;

/// Compiler module.
pub mod compiler;
/// Global configuration module.
pub mod config;
/// Kernel logging module.
pub mod logging;
/// Launch geometry and execution errors.
pub mod server;

mod runtime;

pub use runtime::*;
