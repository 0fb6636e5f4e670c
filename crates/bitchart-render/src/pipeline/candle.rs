//! Candlestick rendering pipeline.

use bytemuck::Zeroable;

use crate::gpu_types::{CandleUniforms, CandleVertex, BAR_INSTANCE_LAYOUT};
use crate::pipeline::shared::PipelineFactory;
use crate::pipeline::traits::{InstancedPipeline, Pipeline};
use crate::VERTICES_PER_CANDLE;

/// Pipeline drawing the 18-vertex unit candle per bar instance.
pub struct CandlePipeline {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl CandlePipeline {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("candle shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/candle.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[PipelineFactory::uniform_entry(0, wgpu::ShaderStages::VERTEX)],
            label: Some("candle_bind_group_layout"),
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("candle pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = PipelineFactory::create_render_pipeline(
            device,
            "candle pipeline",
            &layout,
            &shader,
            format,
            wgpu::BlendState::REPLACE,
            wgpu::PrimitiveTopology::TriangleList,
            &[CandleVertex::LAYOUT, BAR_INSTANCE_LAYOUT],
        );

        let uniform_buffer = PipelineFactory::create_uniform_buffer(
            device,
            "candle uniforms",
            &CandleUniforms::zeroed(),
        );
        let bind_group = PipelineFactory::create_bind_group(
            device,
            "candle_bind_group",
            &bind_group_layout,
            &[&uniform_buffer],
        );

        Self {
            pipeline,
            uniform_buffer,
            bind_group,
        }
    }

    pub fn write_uniforms(&self, queue: &wgpu::Queue, uniforms: &CandleUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[*uniforms]));
    }
}

impl Pipeline for CandlePipeline {
    fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

impl InstancedPipeline for CandlePipeline {
    const VERTICES_PER_INSTANCE: u32 = VERTICES_PER_CANDLE;
}
