#![warn(missing_docs)]

//! Generation, compilation and execution of shared memory tiled matmul kernels, parametrized
//! by precision, tile width and inner loop unrolling.
//!
//! ```ignore
//! let config = KernelConfig::new(Precision::Double, 16, true);
//! let kernel = MatmulKernel::tiled(config)?.compile::<R>(&context, &CompileOptions::global())?;
//! let result = kernel.execute(&context, &lhs, &rhs, true)?;
//! ```

#[macro_use]
extern crate derive_new;

mod config;
mod element;
mod error;
mod execute;
mod generator;
mod kernel;
mod matrix;
mod template;

/// Host-side correctness checks.
pub mod harness;


pub use config::*;
pub use element::*;
pub use error::*;
pub use execute::*;
pub use generator::*;
pub use kernel::*;
pub use matrix::*;
pub use template::*;

pub use tilemm_runtime as runtime;
