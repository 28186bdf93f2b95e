use rayon::prelude::*;

use super::field::DistortionField;
use crate::error::Result;
use crate::interpolation::{BoundaryMode, InterpolationOrder, Resampler};
use crate::volume::{Volume, Voxel};

/// Resamples every slice of `volume` at the field's coordinates in place.
pub(super) fn resample_volume<T: Voxel>(
    volume: &mut Volume<T>,
    field: &DistortionField,
    order: InterpolationOrder,
    mode: BoundaryMode,
) -> Result<()> {
    let (height, width) = (field.height(), field.width());
    let plane = height * width;

    volume
        .data_mut()
        .par_chunks_mut(plane)
        .try_for_each(|slice| {
            let resampler = Resampler::new(slice, height, width, order, mode)?;
            resampler.resample_into(field.yd(), field.xd(), slice)
        })
}
