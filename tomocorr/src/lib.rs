//! Chunked corrections for tomographic image stacks.
//!
//! Each operation comes as a pair: a slice estimator that tells an
//! orchestrator how many slices of a given shape fit into a memory budget
//! ([`budget`], looked up through [`registry`]), and an `apply` entry point
//! that corrects one chunk of at most that many slices.

pub mod budget;
pub mod distortion;
mod error;
pub mod interpolation;
pub mod median;
pub mod metadata;
pub mod preview;
pub mod registry;
mod shader;
pub mod volume;

pub use accel::{BackendPreference, ProcessingContext};
pub use budget::{SliceEstimate, WorkingSet};
pub use distortion::{DiscorpyParams, DistortionCorrector, DistortionField, DistortionParams};
pub use error::{Error, Result};
pub use interpolation::{map_coordinates, BoundaryMode, InterpolationOrder};
pub use median::{KernelSize, MedianDezinger, MedianParams};
pub use metadata::{DistortionModel, MetadataError};
pub use preview::Preview;
pub use registry::{OperationDescriptor, OperationRegistry, Pattern};
pub use volume::{AnyVolume, DType, Volume, Voxel};
