//! 3D median filter and dezinger.
//!
//! Every output voxel is the median of its `k³` neighbourhood, with
//! neighbour indices clamped to the volume. With `dif > 0` a voxel is only
//! replaced when it deviates from that median by more than `dif`; outlier
//! removal is the same filter with a non-zero default threshold.
//!
//! The GPU path generates one kernel per `(element type, kernel size)` and
//! keeps it in the filter's [`KernelCache`]; the CPU path monomorphises the
//! same variants.

mod cpu;
mod gpu;

use std::fmt;

use accel::{
    select_backend, Backend, BackendPreference, ComputeKernel, Gpu, KernelCache,
    ProcessingContext,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::volume::{AnyVolume, DType, Volume, Voxel};

pub const MEDIAN_OP: &str = "median_filter3d";
pub const REMOVE_OUTLIER_OP: &str = "remove_outlier3d";

/// Threshold used by [`MedianParams::remove_outlier`].
pub const DEFAULT_OUTLIER_DIF: f32 = 0.1;

/// Edge length of the cubic neighbourhood.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum KernelSize {
    #[default]
    K3,
    K5,
    K7,
    K9,
    K11,
    K13,
}

impl KernelSize {
    pub const ALL: [KernelSize; 6] = [
        KernelSize::K3,
        KernelSize::K5,
        KernelSize::K7,
        KernelSize::K9,
        KernelSize::K11,
        KernelSize::K13,
    ];

    pub const fn size(self) -> usize {
        match self {
            KernelSize::K3 => 3,
            KernelSize::K5 => 5,
            KernelSize::K7 => 7,
            KernelSize::K9 => 9,
            KernelSize::K11 => 11,
            KernelSize::K13 => 13,
        }
    }

    pub const fn radius(self) -> usize {
        self.size() / 2
    }

    /// Number of voxels in the neighbourhood.
    pub const fn window(self) -> usize {
        let k = self.size();
        k * k * k
    }
}

impl TryFrom<u32> for KernelSize {
    type Error = Error;

    fn try_from(size: u32) -> Result<Self> {
        KernelSize::ALL
            .into_iter()
            .find(|k| k.size() == size as usize)
            .ok_or_else(|| {
                Error::invalid_parameter(
                    "kernel_size",
                    format!("{size} is not one of 3, 5, 7, 9, 11, 13"),
                )
            })
    }
}

impl From<KernelSize> for u32 {
    fn from(size: KernelSize) -> Self {
        size.size() as u32
    }
}

impl fmt::Display for KernelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.size())
    }
}

/// Parameters of [`MedianDezinger::apply`].
///
/// `kernel_size` stays a plain integer so it is validated after the input's
/// element type and shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedianParams {
    pub kernel_size: u32,
    /// `0` gives a classic median filter.
    pub dif: f32,
    pub backend: BackendPreference,
}

impl Default for MedianParams {
    fn default() -> Self {
        Self {
            kernel_size: 3,
            dif: 0.0,
            backend: BackendPreference::default(),
        }
    }
}

impl MedianParams {
    pub fn new(kernel_size: u32, dif: f32) -> Self {
        Self {
            kernel_size,
            dif,
            ..Self::default()
        }
    }

    /// Defaults of the outlier-removal entry point.
    pub fn remove_outlier() -> Self {
        Self::new(3, DEFAULT_OUTLIER_DIF)
    }

    pub fn with_backend(mut self, backend: BackendPreference) -> Self {
        self.backend = backend;
        self
    }

    /// Resolves the kernel size and checks the threshold.
    pub fn validate(&self) -> Result<KernelSize> {
        let size = KernelSize::try_from(self.kernel_size)?;
        if !self.dif.is_finite() || self.dif < 0.0 {
            return Err(Error::invalid_parameter(
                "dif",
                format!("must be finite and non-negative, got {}", self.dif),
            ));
        }
        Ok(size)
    }
}

/// Median / dezinger filter with a per-instance kernel cache.
#[derive(Debug)]
pub struct MedianDezinger {
    ctx: ProcessingContext,
    kernels: KernelCache<(DType, KernelSize), ComputeKernel>,
}

impl Default for MedianDezinger {
    fn default() -> Self {
        Self::new(ProcessingContext::shared().clone())
    }
}

impl MedianDezinger {
    pub fn new(ctx: ProcessingContext) -> Self {
        Self {
            ctx,
            kernels: KernelCache::new(),
        }
    }

    pub fn context(&self) -> &ProcessingContext {
        &self.ctx
    }

    /// Number of kernel variants compiled so far.
    pub fn compiled_variants(&self) -> usize {
        self.kernels.len()
    }

    /// Filters `volume` into a new volume of the same shape and element type.
    pub fn apply<T: Voxel>(&self, volume: &Volume<T>, params: &MedianParams) -> Result<Volume<T>> {
        let dims = volume.dims3()?;
        let size = params.validate()?;
        let filtered = self.filter(volume.data(), dims, size, params.dif, params.backend)?;

        tracing::debug!(
            shape = ?dims,
            kernel_size = size.size(),
            dif = params.dif,
            "median filter applied"
        );
        Volume::new(dims.to_vec(), filtered)
    }

    /// [`apply`](Self::apply) for a type-erased chunk; only `float32` and
    /// `uint16` are accepted.
    pub fn apply_any(&self, volume: &AnyVolume, params: &MedianParams) -> Result<AnyVolume> {
        match volume {
            AnyVolume::F32(v) => self.apply(v, params).map(AnyVolume::from),
            AnyVolume::U16(v) => self.apply(v, params).map(AnyVolume::from),
            other => Err(Error::InvalidInputType {
                op: MEDIAN_OP,
                dtype: other.dtype(),
                expected: "float32 or uint16",
            }),
        }
    }

    /// Outlier removal: [`apply`](Self::apply) with [`MedianParams::remove_outlier`] defaults.
    pub fn remove_outlier<T: Voxel>(&self, volume: &Volume<T>) -> Result<Volume<T>> {
        self.apply(volume, &MedianParams::remove_outlier())
    }

    fn filter<T: Voxel>(
        &self,
        src: &[T],
        dims: [usize; 3],
        size: KernelSize,
        dif: f32,
        preference: BackendPreference,
    ) -> Result<Vec<T>> {
        if select_backend(&self.ctx, preference, true, MEDIAN_OP)? == Backend::Gpu {
            let gpu = self.ctx.require_gpu()?;
            match self.filter_gpu(gpu, src, dims, size, dif) {
                Ok(filtered) => return Ok(filtered),
                Err(e) if e.is_device_limit() => {
                    tracing::warn!(error = %e, "chunk exceeds device limits, filtering on CPU");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(cpu::median_filter(src, dims, size, dif))
    }

    fn filter_gpu<T: Voxel>(
        &self,
        gpu: &Gpu,
        src: &[T],
        dims: [usize; 3],
        size: KernelSize,
        dif: f32,
    ) -> accel::Result<Vec<T>> {
        let kernel = self
            .kernels
            .get_or_compile(&(T::DTYPE, size), |&(_, size)| gpu::compile::<T>(gpu, size))?;
        gpu::median_filter(gpu, &kernel, src, dims, dif)
    }
}
