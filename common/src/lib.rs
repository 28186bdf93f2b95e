pub mod buffer2;
pub mod float_ext;
pub mod log_setup;
pub mod test_utils;

pub use buffer2::Buffer2;
pub use float_ext::{max_abs_diff, FloatExt};
pub use log_setup::{setup_logging, LogConfig, LogSetupError};

pub const EPSILON: f64 = 1e-6;
