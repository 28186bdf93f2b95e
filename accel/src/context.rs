use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::gpu::Gpu;

/// Execution context handed to every operation.
///
/// Holds the GPU when one could be initialised; operations fall back to the
/// host implementation otherwise.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    gpu: Option<Gpu>,
}

impl ProcessingContext {
    /// Attempts to initialise a GPU, falling back to CPU-only on failure.
    pub fn new() -> Self {
        match Gpu::new() {
            Ok(gpu) => Self { gpu: Some(gpu) },
            Err(e) => {
                tracing::warn!("GPU initialization failed, falling back to CPU: {}", e);
                Self { gpu: None }
            }
        }
    }

    /// Process-wide context, initialised on first use.
    pub fn shared() -> &'static ProcessingContext {
        static SHARED: OnceLock<ProcessingContext> = OnceLock::new();
        SHARED.get_or_init(ProcessingContext::new)
    }

    pub fn cpu_only() -> Self {
        Self { gpu: None }
    }

    pub fn with_gpu(gpu: Gpu) -> Self {
        Self { gpu: Some(gpu) }
    }

    pub fn has_gpu(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn gpu(&self) -> Option<&Gpu> {
        self.gpu.as_ref()
    }

    pub fn require_gpu(&self) -> Result<&Gpu> {
        self.gpu.as_ref().ok_or(Error::NoGpuContext)
    }
}

impl Default for ProcessingContext {
    fn default() -> Self {
        Self::new()
    }
}
