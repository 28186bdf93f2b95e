use accel::{
    output_buffer, padded_size, read_buffer, uniform_buffer, upload_buffer, BindingKind,
    ComputeKernel, Gpu, WORKGROUP_WIDTH,
};
use bytemuck::{Pod, Zeroable};

use super::KernelSize;
use crate::shader;
use crate::volume::Voxel;

const TEMPLATE: &str = include_str!("median.wgsl");

const BINDINGS: [BindingKind; 3] = [
    BindingKind::Uniform,
    BindingKind::ReadOnlyStorage,
    BindingKind::Storage,
];

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct MedianParams {
    depth: u32,
    height: u32,
    width: u32,
    dif: f32,
}

/// WGSL for one `(element type, kernel size)` variant; the window size is a
/// compile-time constant of the generated source.
pub(super) fn shader_source<T: Voxel>(size: KernelSize) -> String {
    shader::render::<T>(
        TEMPLATE,
        &[
            ("WORKGROUP_WIDTH", WORKGROUP_WIDTH.to_string()),
            ("RADIUS", size.radius().to_string()),
            ("WINDOW", size.window().to_string()),
            ("MID", (size.window() / 2).to_string()),
        ],
    )
}

pub(super) fn compile<T: Voxel>(gpu: &Gpu, size: KernelSize) -> accel::Result<ComputeKernel> {
    let label = format!("median_{}_k{}", T::DTYPE, size.size());
    ComputeKernel::build(gpu, &label, &shader_source::<T>(size), &BINDINGS)
}

/// Workgroup counts for a `[depth, height, width]` volume: `ceil(width / 128)`
/// along x, one row per y and one slice per z.
pub(super) fn workgroup_grid([depth, height, width]: [usize; 3]) -> [u64; 3] {
    [
        (width as u64).div_ceil(WORKGROUP_WIDTH as u64),
        height as u64,
        depth as u64,
    ]
}

pub(super) fn median_filter<T: Voxel>(
    gpu: &Gpu,
    kernel: &ComputeKernel,
    src: &[T],
    [depth, height, width]: [usize; 3],
    dif: f32,
) -> accel::Result<Vec<T>> {
    let bytes = std::mem::size_of_val(src) as u64;
    gpu.check_storage_size("volume_in", padded_size(bytes))?;
    let workgroups = gpu.dispatch_dims(workgroup_grid([depth, height, width]))?;

    let params = MedianParams {
        depth: depth as u32,
        height: height as u32,
        width: width as u32,
        dif,
    };
    let params_buffer = uniform_buffer(gpu, "median_params", &params);
    let input = upload_buffer(gpu, "volume_in", bytemuck::cast_slice(src));
    let output = output_buffer(gpu, "volume_out", bytes);

    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("median_encoder"),
        });
    kernel.record(gpu, &mut encoder, &[&params_buffer, &input, &output], workgroups);

    let filtered = read_buffer(gpu, encoder, &output, bytes)?;
    tracing::debug!(kernel = kernel.label(), ?workgroups, "median dispatched");
    Ok(filtered)
}
