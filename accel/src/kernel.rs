use crate::error::{Error, Result};
use crate::gpu::Gpu;

/// Binding slot type in a compute kernel's single bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Uniform,
    ReadOnlyStorage,
    Storage,
}

impl BindingKind {
    fn buffer_type(self) -> wgpu::BufferBindingType {
        match self {
            BindingKind::Uniform => wgpu::BufferBindingType::Uniform,
            BindingKind::ReadOnlyStorage => wgpu::BufferBindingType::Storage { read_only: true },
            BindingKind::Storage => wgpu::BufferBindingType::Storage { read_only: false },
        }
    }
}

/// Compiled compute pipeline with its bind group layout.
///
/// Bindings are numbered in the order given to [`ComputeKernel::build`],
/// all in group 0; the entry point is `main`.
#[derive(Debug)]
pub struct ComputeKernel {
    label: String,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    binding_count: usize,
}

impl ComputeKernel {
    /// Compiles `source` (WGSL). Validation errors are captured and returned as
    /// [`Error::Compile`] instead of reaching the device's uncaptured-error handler.
    pub fn build(gpu: &Gpu, label: &str, source: &str, bindings: &[BindingKind]) -> Result<Self> {
        let device = gpu.device();
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let entries: Vec<wgpu::BindGroupLayoutEntry> = bindings
            .iter()
            .enumerate()
            .map(|(i, kind)| wgpu::BindGroupLayoutEntry {
                binding: i as u32,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: kind.buffer_type(),
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label}_bind_group_layout")),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label}_pipeline_layout")),
            bind_group_layouts: &[&bind_group_layout],
            ..Default::default()
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(Error::Compile {
                label: label.to_string(),
                message: err.to_string(),
            });
        }

        tracing::debug!(label, bindings = bindings.len(), "compute kernel compiled");

        Ok(Self {
            label: label.to_string(),
            pipeline,
            bind_group_layout,
            binding_count: bindings.len(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Records one compute pass into `encoder`, binding `buffers` in order.
    pub fn record(
        &self,
        gpu: &Gpu,
        encoder: &mut wgpu::CommandEncoder,
        buffers: &[&wgpu::Buffer],
        workgroups: [u32; 3],
    ) {
        assert_eq!(
            buffers.len(),
            self.binding_count,
            "kernel '{}' expects {} bindings",
            self.label,
            self.binding_count
        );

        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(i, buffer)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        let bind_group = gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{}_bind_group", self.label)),
            layout: &self.bind_group_layout,
            entries: &entries,
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(&format!("{}_pass", self.label)),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(workgroups[0], workgroups[1], workgroups[2]);
    }
}
