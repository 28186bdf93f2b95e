use std::sync::mpsc;

use wgpu::util::DeviceExt;

use crate::error::{Error, Result};
use crate::gpu::Gpu;

/// Rounds `bytes` up to the 4-byte granularity required for buffer copies.
pub fn padded_size(bytes: u64) -> u64 {
    bytes.div_ceil(wgpu::COPY_BUFFER_ALIGNMENT) * wgpu::COPY_BUFFER_ALIGNMENT
}

/// Creates a uniform buffer holding `value`.
pub fn uniform_buffer<T: bytemuck::Pod>(gpu: &Gpu, label: &str, value: &T) -> wgpu::Buffer {
    gpu.device()
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(value),
            usage: wgpu::BufferUsages::UNIFORM,
        })
}

/// Creates a read-only storage buffer and writes `bytes` into it through the
/// queue's staging memory. The device buffer is padded to 4 bytes.
pub fn upload_buffer(gpu: &Gpu, label: &str, bytes: &[u8]) -> wgpu::Buffer {
    let size = padded_size(bytes.len() as u64);
    let buffer = gpu.device().create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });

    if bytes.len() as u64 == size {
        gpu.queue().write_buffer(&buffer, 0, bytes);
    } else {
        let mut padded = bytes.to_vec();
        padded.resize(size as usize, 0);
        gpu.queue().write_buffer(&buffer, 0, &padded);
    }
    buffer
}

/// Creates a zero-initialised storage buffer that kernels write and the host reads back.
pub fn output_buffer(gpu: &Gpu, label: &str, size: u64) -> wgpu::Buffer {
    gpu.device().create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: padded_size(size),
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    })
}

/// Submits `encoder` with an extra copy of `src` into a mappable staging
/// buffer, waits for completion and returns the first `size` bytes
/// reinterpreted as `T`.
pub fn read_buffer<T: bytemuck::Pod>(
    gpu: &Gpu,
    mut encoder: wgpu::CommandEncoder,
    src: &wgpu::Buffer,
    size: u64,
) -> Result<Vec<T>> {
    let copy_size = padded_size(size);
    let staging = gpu.device().create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback_staging"),
        size: copy_size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    encoder.copy_buffer_to_buffer(src, 0, &staging, 0, copy_size);
    gpu.queue().submit(std::iter::once(encoder.finish()));

    let (sender, receiver) = mpsc::channel();
    let slice = staging.slice(..);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    gpu.wait()?;

    receiver
        .recv()
        .map_err(|_| Error::Gpu("readback callback was dropped".to_string()))?
        .map_err(|e| Error::Gpu(format!("failed to map readback buffer: {}", e)))?;

    let count = size as usize / std::mem::size_of::<T>();
    let mut values = vec![T::zeroed(); count];
    {
        let data = slice.get_mapped_range();
        let byte_len = count * std::mem::size_of::<T>();
        bytemuck::cast_slice_mut::<T, u8>(&mut values).copy_from_slice(&data[..byte_len]);
    }
    staging.unmap();

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_size() {
        assert_eq!(padded_size(0), 0);
        assert_eq!(padded_size(1), 4);
        assert_eq!(padded_size(4), 4);
        assert_eq!(padded_size(6), 8);
    }

    #[test]
    fn test_upload_and_read_back_odd_length() {
        let gpu = match Gpu::new() {
            Ok(gpu) => gpu,
            Err(e) => {
                eprintln!("Skipping GPU test: no GPU available: {}", e);
                return;
            }
        };

        let values: Vec<u16> = vec![1, 2, 3];
        let src = upload_buffer(&gpu, "odd_src", bytemuck::cast_slice(&values));
        assert_eq!(src.size(), 8);

        let encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        let back: Vec<u16> = read_buffer(&gpu, encoder, &src, 6).unwrap();
        assert_eq!(back, values);
    }
}
