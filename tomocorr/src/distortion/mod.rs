//! Radial lens-distortion correction by backward mapping.
//!
//! The distortion center and polynomial come from a coefficient file or
//! explicit parameters and are moved into chunk-local coordinates with the
//! preview offset. Every output pixel is resampled from the source position
//! the model maps it to.
//!
//! Two variants share the geometry:
//! * [`DistortionCorrector::correct`] resamples with order 1 / `reflect`,
//!   rejects degenerate fields and crops a margin afterwards.
//! * [`DistortionCorrector::correct_discorpy`] takes order and boundary
//!   mode from the caller and keeps the full frame.

mod cpu;
mod field;
mod gpu;

use std::path::PathBuf;

use accel::{
    select_backend, Backend, BackendPreference, ComputeKernel, Gpu, KernelCache,
    ProcessingContext,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::interpolation::{BoundaryMode, InterpolationOrder};
use crate::metadata::{self, DistortionModel};
use crate::preview::{Preview, SpatialOffset};
use crate::volume::{AnyVolume, DType, Volume, Voxel};

pub use field::DistortionField;

pub const DISTORTION_OP: &str = "distortion_correction_proj";
pub const DISCORPY_OP: &str = "distortion_correction_proj_discorpy";

const SUPPORTED_TYPES: &str = "float32 or uint16";

/// Parameters of the crop-after correction.
///
/// The model is read from `metadata_path` when set; otherwise
/// `center_from_left`, `center_from_top` and `polynomial_coeffs` must all be given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistortionParams {
    pub metadata_path: Option<PathBuf>,
    pub preview: Preview,
    pub center_from_left: Option<f64>,
    pub center_from_top: Option<f64>,
    pub polynomial_coeffs: Option<Vec<f64>>,
    /// Margin removed from each of the four edges after resampling.
    pub crop: usize,
    pub backend: BackendPreference,
}

impl DistortionParams {
    pub fn from_file(metadata_path: impl Into<PathBuf>, preview: Preview) -> Self {
        Self {
            metadata_path: Some(metadata_path.into()),
            preview,
            ..Self::default()
        }
    }

    pub fn from_model(
        center_from_left: f64,
        center_from_top: f64,
        polynomial_coeffs: Vec<f64>,
        preview: Preview,
    ) -> Self {
        Self {
            center_from_left: Some(center_from_left),
            center_from_top: Some(center_from_top),
            polynomial_coeffs: Some(polynomial_coeffs),
            preview,
            ..Self::default()
        }
    }

    pub fn with_crop(mut self, crop: usize) -> Self {
        self.crop = crop;
        self
    }

    pub fn with_backend(mut self, backend: BackendPreference) -> Self {
        self.backend = backend;
        self
    }

    /// Checks the preview and the model source without touching the file system.
    pub fn validate(&self) -> Result<SpatialOffset> {
        let offset = self.preview.spatial_offset()?;
        if self.metadata_path.is_none() {
            self.explicit_model()?;
        }
        Ok(offset)
    }

    fn explicit_model(&self) -> Result<DistortionModel> {
        let required = "required when metadata_path is not set";
        let x = self
            .center_from_left
            .ok_or_else(|| Error::invalid_parameter("center_from_left", required))?;
        let y = self
            .center_from_top
            .ok_or_else(|| Error::invalid_parameter("center_from_top", required))?;
        let coefficients = self
            .polynomial_coeffs
            .clone()
            .ok_or_else(|| Error::invalid_parameter("polynomial_coeffs", required))?;
        Ok(DistortionModel::new(x, y, coefficients))
    }

    fn resolve_model(&self, offset: SpatialOffset) -> Result<DistortionModel> {
        let model = match &self.metadata_path {
            Some(path) => metadata::load(path)?,
            None => self.explicit_model()?,
        };
        Ok(model.shifted(offset.x as f64, offset.y as f64))
    }
}

/// Parameters of the full-frame correction with configurable resampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscorpyParams {
    pub metadata_path: PathBuf,
    #[serde(default)]
    pub preview: Preview,
    #[serde(default)]
    pub order: InterpolationOrder,
    #[serde(default)]
    pub mode: BoundaryMode,
    #[serde(default)]
    pub backend: BackendPreference,
}

impl DiscorpyParams {
    pub fn new(metadata_path: impl Into<PathBuf>, preview: Preview) -> Self {
        Self {
            metadata_path: metadata_path.into(),
            preview,
            order: InterpolationOrder::default(),
            mode: BoundaryMode::default(),
            backend: BackendPreference::default(),
        }
    }

    pub fn with_order(mut self, order: InterpolationOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_mode(mut self, mode: BoundaryMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_backend(mut self, backend: BackendPreference) -> Self {
        self.backend = backend;
        self
    }

    pub fn validate(&self) -> Result<SpatialOffset> {
        self.preview.spatial_offset()
    }
}

/// Applies distortion correction to chunks, on the GPU when one is available.
///
/// Compiled resampling kernels are kept per element type for the lifetime
/// of the corrector.
#[derive(Debug)]
pub struct DistortionCorrector {
    ctx: ProcessingContext,
    kernels: KernelCache<DType, ComputeKernel>,
}

impl Default for DistortionCorrector {
    fn default() -> Self {
        Self::new(ProcessingContext::shared().clone())
    }
}

impl DistortionCorrector {
    pub fn new(ctx: ProcessingContext) -> Self {
        Self {
            ctx,
            kernels: KernelCache::new(),
        }
    }

    pub fn context(&self) -> &ProcessingContext {
        &self.ctx
    }

    /// Crop-after correction. A 2D input is treated as one slice; the result
    /// has shape `[S, H - 2·crop, W - 2·crop]`.
    pub fn correct<T: Voxel>(
        &self,
        volume: Volume<T>,
        params: &DistortionParams,
    ) -> Result<Volume<T>> {
        let offset = params.validate()?;
        let mut volume = volume.promote_2d();
        let [slices, height, width] = volume.dims3()?;

        let crop = params.crop;
        let span = crop.saturating_mul(2);
        if span >= height || span >= width {
            return Err(Error::invalid_parameter(
                "crop",
                format!("crop {crop} leaves nothing of a {height}x{width} slice"),
            ));
        }

        let model = params.resolve_model(offset)?;
        let field = DistortionField::build(&model, height, width);
        let spread = field.spread_y();
        if spread.is_nan() || spread < 1.0 {
            return Err(Error::GeometryDegenerate { spread });
        }

        self.resample(
            &mut volume,
            &field,
            InterpolationOrder::Linear,
            BoundaryMode::Reflect,
            params.backend,
            DISTORTION_OP,
        )?;
        volume.crop_in_place(crop);

        tracing::info!(
            slices,
            height,
            width,
            crop,
            x_center = model.x_center,
            y_center = model.y_center,
            "distortion corrected"
        );
        Ok(volume)
    }

    /// Full-frame correction with the caller's spline order and boundary mode.
    pub fn correct_discorpy<T: Voxel>(
        &self,
        volume: Volume<T>,
        params: &DiscorpyParams,
    ) -> Result<Volume<T>> {
        let offset = params.validate()?;
        let mut volume = volume.promote_2d();
        let [slices, height, width] = volume.dims3()?;

        let model =
            metadata::load(&params.metadata_path)?.shifted(offset.x as f64, offset.y as f64);
        let field = DistortionField::build(&model, height, width);

        self.resample(
            &mut volume,
            &field,
            params.order,
            params.mode,
            params.backend,
            DISCORPY_OP,
        )?;

        tracing::info!(
            slices,
            height,
            width,
            order = params.order.degree(),
            mode = %params.mode,
            "distortion corrected"
        );
        Ok(volume)
    }

    /// [`correct`](Self::correct) for a type-erased chunk.
    pub fn apply(&self, volume: AnyVolume, params: &DistortionParams) -> Result<AnyVolume> {
        match volume {
            AnyVolume::F32(v) => self.correct(v, params).map(AnyVolume::from),
            AnyVolume::U16(v) => self.correct(v, params).map(AnyVolume::from),
            other => Err(Error::InvalidInputType {
                op: DISTORTION_OP,
                dtype: other.dtype(),
                expected: SUPPORTED_TYPES,
            }),
        }
    }

    /// [`correct_discorpy`](Self::correct_discorpy) for a type-erased chunk.
    pub fn apply_discorpy(&self, volume: AnyVolume, params: &DiscorpyParams) -> Result<AnyVolume> {
        match volume {
            AnyVolume::F32(v) => self.correct_discorpy(v, params).map(AnyVolume::from),
            AnyVolume::U16(v) => self.correct_discorpy(v, params).map(AnyVolume::from),
            other => Err(Error::InvalidInputType {
                op: DISCORPY_OP,
                dtype: other.dtype(),
                expected: SUPPORTED_TYPES,
            }),
        }
    }

    fn resample<T: Voxel>(
        &self,
        volume: &mut Volume<T>,
        field: &DistortionField,
        order: InterpolationOrder,
        mode: BoundaryMode,
        preference: BackendPreference,
        op: &'static str,
    ) -> Result<()> {
        let gpu_supported = order.degree() <= 1;
        if select_backend(&self.ctx, preference, gpu_supported, op)? == Backend::Gpu {
            let gpu = self.ctx.require_gpu()?;
            match self.resample_gpu(gpu, volume, field, order) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_device_limit() => {
                    tracing::warn!(
                        op,
                        error = %e,
                        "chunk exceeds device limits, resampling on CPU"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        cpu::resample_volume(volume, field, order, mode)
    }

    fn resample_gpu<T: Voxel>(
        &self,
        gpu: &Gpu,
        volume: &mut Volume<T>,
        field: &DistortionField,
        order: InterpolationOrder,
    ) -> accel::Result<()> {
        let kernel = self
            .kernels
            .get_or_compile(&T::DTYPE, |_| gpu::compile::<T>(gpu))?;
        gpu::resample_volume(gpu, &kernel, volume, field, order)
    }
}
