//! Grid-rule rendering pipeline.

use bytemuck::Zeroable;

use crate::gpu_types::{GridLineGpu, GridUniforms};
use crate::pipeline::shared::PipelineFactory;
use crate::pipeline::traits::Pipeline;

/// Maximum grid rules held in the storage buffer.
pub const MAX_GRID_LINES: usize = 128;

/// Pipeline drawing screen-space rules from a storage buffer of positions.
/// Geometry is generated from the vertex index; no vertex buffers.
pub struct GridPipeline {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    line_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    line_count: u32,
}

impl GridPipeline {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grid shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/grid.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                PipelineFactory::uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ),
                PipelineFactory::storage_entry(1, wgpu::ShaderStages::VERTEX),
            ],
            label: Some("grid_bind_group_layout"),
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("grid pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = PipelineFactory::create_render_pipeline(
            device,
            "grid pipeline",
            &layout,
            &shader,
            format,
            wgpu::BlendState::ALPHA_BLENDING,
            wgpu::PrimitiveTopology::TriangleList,
            &[],
        );

        let uniform_buffer =
            PipelineFactory::create_uniform_buffer(device, "grid uniforms", &GridUniforms::zeroed());
        let line_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grid lines"),
            size: (MAX_GRID_LINES * std::mem::size_of::<GridLineGpu>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = PipelineFactory::create_bind_group(
            device,
            "grid_bind_group",
            &bind_group_layout,
            &[&uniform_buffer, &line_buffer],
        );

        Self {
            pipeline,
            uniform_buffer,
            line_buffer,
            bind_group,
            line_count: 0,
        }
    }

    /// Upload the rule positions (already in NDC) and refresh the uniforms.
    pub fn write_lines(
        &mut self,
        queue: &wgpu::Queue,
        lines: &[GridLineGpu],
        color: [f32; 4],
        resolution: [f32; 2],
    ) {
        let count = lines.len().min(MAX_GRID_LINES);
        self.line_count = count as u32;
        if count > 0 {
            queue.write_buffer(
                &self.line_buffer,
                0,
                bytemuck::cast_slice(&lines[..count]),
            );
        }
        let uniforms = GridUniforms {
            color,
            resolution,
            thickness_px: 1.0,
            line_count: self.line_count,
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }

    /// Record the grid draw: one 6-vertex quad per rule.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.line_count == 0 {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..6, 0..self.line_count);
    }

    pub fn line_count(&self) -> u32 {
        self.line_count
    }
}

impl Pipeline for GridPipeline {
    fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
