use accel::{
    output_buffer, padded_size, read_buffer, uniform_buffer, upload_buffer, BindingKind,
    ComputeKernel, Gpu, WORKGROUP_WIDTH,
};
use bytemuck::{Pod, Zeroable};

use super::field::DistortionField;
use crate::interpolation::InterpolationOrder;
use crate::shader;
use crate::volume::{Volume, Voxel};

const TEMPLATE: &str = include_str!("resample.wgsl");

const BINDINGS: [BindingKind; 4] = [
    BindingKind::Uniform,
    BindingKind::ReadOnlyStorage,
    BindingKind::ReadOnlyStorage,
    BindingKind::Storage,
];

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct ResampleParams {
    height: u32,
    width: u32,
    slices: u32,
    order: u32,
}

pub(super) fn shader_source<T: Voxel>() -> String {
    shader::render::<T>(TEMPLATE, &[("WORKGROUP_WIDTH", WORKGROUP_WIDTH.to_string())])
}

pub(super) fn compile<T: Voxel>(gpu: &Gpu) -> accel::Result<ComputeKernel> {
    let label = format!("resample_{}", T::DTYPE);
    ComputeKernel::build(gpu, &label, &shader_source::<T>(), &BINDINGS)
}

/// Resamples every slice on the device with order 0 or 1 and writes the result back.
pub(super) fn resample_volume<T: Voxel>(
    gpu: &Gpu,
    kernel: &ComputeKernel,
    volume: &mut Volume<T>,
    field: &DistortionField,
    order: InterpolationOrder,
) -> accel::Result<()> {
    debug_assert!(order.degree() <= 1);
    let (height, width) = (field.height(), field.width());
    let slices = volume.len() / (height * width);

    let volume_bytes = std::mem::size_of_val(volume.data()) as u64;
    let coords = field.stacked();
    let coords_bytes = std::mem::size_of_val(coords.as_slice()) as u64;
    gpu.check_storage_size("volume_in", padded_size(volume_bytes))?;
    gpu.check_storage_size("coords_device", coords_bytes)?;
    let workgroups = gpu.dispatch_dims([
        (width as u64).div_ceil(WORKGROUP_WIDTH as u64),
        height as u64,
        slices as u64,
    ])?;

    let params = ResampleParams {
        height: height as u32,
        width: width as u32,
        slices: slices as u32,
        order: order.degree() as u32,
    };

    let params_buffer = uniform_buffer(gpu, "resample_params", &params);
    let src = upload_buffer(gpu, "volume_in", bytemuck::cast_slice(volume.data()));
    let coords_buffer = upload_buffer(gpu, "coords_device", bytemuck::cast_slice(&coords));
    let dst = output_buffer(gpu, "volume_out", volume_bytes);

    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("resample_encoder"),
        });
    kernel.record(
        gpu,
        &mut encoder,
        &[&params_buffer, &src, &coords_buffer, &dst],
        workgroups,
    );

    let corrected: Vec<T> = read_buffer(gpu, encoder, &dst, volume_bytes)?;
    volume.data_mut().copy_from_slice(&corrected);

    tracing::debug!(
        slices,
        height,
        width,
        order = order.degree(),
        "resampled on GPU"
    );
    Ok(())
}
