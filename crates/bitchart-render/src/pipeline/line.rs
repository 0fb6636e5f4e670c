//! Polyline rendering pipeline for indicator overlays.

use crate::gpu_types::{LineUniforms, LineVertex};
use crate::pipeline::shared::PipelineFactory;

/// Pipeline drawing thickness-expanded polylines as triangle strips.
///
/// Each overlay owns its own uniform buffer and bind group (created through
/// [`LinePipeline::create_overlay_resources`]) so several overlays with
/// different colors can draw inside one render pass.
pub struct LinePipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl LinePipeline {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("line shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/line.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[PipelineFactory::uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
            label: Some("line_bind_group_layout"),
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("line pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = PipelineFactory::create_render_pipeline(
            device,
            "line pipeline",
            &layout,
            &shader,
            format,
            wgpu::BlendState::ALPHA_BLENDING,
            wgpu::PrimitiveTopology::TriangleStrip,
            &[LineVertex::LAYOUT],
        );

        Self {
            pipeline,
            bind_group_layout,
        }
    }

    /// Allocate the per-overlay uniform buffer and bind group.
    pub fn create_overlay_resources(
        &self,
        device: &wgpu::Device,
        label: &str,
        uniforms: &LineUniforms,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = PipelineFactory::create_uniform_buffer(device, label, uniforms);
        let bind_group = PipelineFactory::create_bind_group(
            device,
            label,
            &self.bind_group_layout,
            &[&buffer],
        );
        (buffer, bind_group)
    }

    /// Record one overlay strip draw.
    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        bind_group: &wgpu::BindGroup,
        strip: &wgpu::Buffer,
        vertex_count: u32,
    ) {
        if vertex_count < 4 {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_vertex_buffer(0, strip.slice(..));
        pass.draw(0..vertex_count, 0..1);
    }
}
