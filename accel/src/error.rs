#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("GPU context not available")]
    NoGpuContext,

    #[error("dispatch of {size} workgroups along {axis} exceeds device limit {limit}")]
    DispatchLimit { axis: char, size: u64, limit: u32 },

    #[error("buffer '{label}' needs {size} bytes, device allows {limit}")]
    BufferLimit {
        label: String,
        size: u64,
        limit: u64,
    },

    #[error("failed to compile kernel '{label}': {message}")]
    Compile { label: String, message: String },
}

impl Error {
    /// Resource limits of the device were exceeded; the work can still run on the host.
    pub fn is_device_limit(&self) -> bool {
        matches!(self, Error::DispatchLimit { .. } | Error::BufferLimit { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
