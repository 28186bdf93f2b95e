use std::sync::Arc;

use crate::error::{Error, Result};

/// wgpu device and queue used for compute work.
///
/// Cloning is cheap: both handles are reference counted.
#[derive(Debug, Clone)]
pub struct Gpu {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    limits: wgpu::Limits,
    adapter_name: Arc<str>,
}

impl Gpu {
    /// Requests a high-performance adapter and a device exposing the adapter's full limits.
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| Error::Gpu(format!("failed to find suitable GPU adapter: {}", e)))?;

        let info = adapter.get_info();
        let limits = adapter.limits();

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("accel_device"),
            required_limits: limits.clone(),
            ..Default::default()
        }))
        .map_err(|e| Error::Gpu(format!("failed to create device: {}", e)))?;

        tracing::info!(
            adapter = %info.name,
            backend = ?info.backend,
            max_buffer_size = limits.max_buffer_size,
            max_storage_binding = limits.max_storage_buffer_binding_size,
            "GPU device created"
        );

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            limits,
            adapter_name: info.name.into(),
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn limits(&self) -> &wgpu::Limits {
        &self.limits
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Blocks until all submitted work has completed.
    pub fn wait(&self) -> Result<()> {
        self.device
            .poll(wgpu::PollType::Wait)
            .map(|_| ())
            .map_err(|e| Error::Gpu(format!("device poll failed: {}", e)))
    }

    /// Largest buffer that can be bound as a storage buffer on this device.
    pub fn max_storage_bytes(&self) -> u64 {
        (self.limits.max_storage_buffer_binding_size as u64).min(self.limits.max_buffer_size)
    }

    /// Fails with [`Error::BufferLimit`] when `size` cannot be bound as one storage buffer.
    pub fn check_storage_size(&self, label: &str, size: u64) -> Result<()> {
        let limit = self.max_storage_bytes();
        if size > limit {
            return Err(Error::BufferLimit {
                label: label.to_string(),
                size,
                limit,
            });
        }
        Ok(())
    }

    /// Validates a workgroup grid against this device's per-dimension limit.
    pub fn dispatch_dims(&self, groups: [u64; 3]) -> Result<[u32; 3]> {
        dispatch_dims(groups, self.limits.max_compute_workgroups_per_dimension)
    }
}

/// Converts a workgroup grid to `u32`, rejecting any axis above `limit`.
pub fn dispatch_dims(groups: [u64; 3], limit: u32) -> Result<[u32; 3]> {
    let mut out = [0u32; 3];
    for ((dst, &size), axis) in out.iter_mut().zip(&groups).zip(['x', 'y', 'z']) {
        if size > limit as u64 {
            return Err(Error::DispatchLimit { axis, size, limit });
        }
        *dst = size as u32;
    }
    Ok(out)
}
