//! Accelerator plumbing shared by the correction operations: device setup,
//! compiled-kernel caching, buffer transfer and backend selection.

mod backend;
mod buffers;
mod context;
mod error;
mod gpu;
mod kernel;
mod kernel_cache;

pub use backend::{select_backend, Backend, BackendPreference};
pub use buffers::{output_buffer, padded_size, read_buffer, uniform_buffer, upload_buffer};
pub use context::ProcessingContext;
pub use error::{Error, Result};
pub use gpu::{dispatch_dims, Gpu};
pub use kernel::{BindingKind, ComputeKernel};
pub use kernel_cache::KernelCache;

/// Threads per workgroup along x for the volume kernels.
pub const WORKGROUP_WIDTH: u32 = 128;
