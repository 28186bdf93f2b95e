use std::path::PathBuf;

use thiserror::Error;

use crate::metadata::MetadataError;
use crate::volume::DType;

/// Errors reported by the correction operations.
///
/// Every variant except `GeometryDegenerate` and `Accelerator` is raised
/// before any device work is scheduled.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{op} does not support element type {dtype}; expected {expected}")]
    InvalidInputType {
        op: &'static str,
        dtype: DType,
        expected: &'static str,
    },

    #[error("invalid volume shape {shape:?}: {reason}")]
    InvalidShape {
        shape: Vec<usize>,
        reason: &'static str,
    },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("can't load distortion coefficients from '{path}'")]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: MetadataError,
    },

    #[error("distortion field spans {spread} pixels vertically (needs 1); enlarge the preview")]
    GeometryDegenerate { spread: f32 },

    #[error(transparent)]
    Accelerator(#[from] accel::Error),
}

impl Error {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
