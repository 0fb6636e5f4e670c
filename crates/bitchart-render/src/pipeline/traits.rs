//! Common traits for the chart render pipelines.

/// A GPU rendering pipeline with its uniform bind group at slot 0.
pub trait Pipeline {
    /// The underlying wgpu render pipeline.
    fn pipeline(&self) -> &wgpu::RenderPipeline;

    /// The pipeline's bind group (uniforms and any auxiliary buffers).
    fn bind_group(&self) -> &wgpu::BindGroup;
}

/// Pipelines that draw a fixed static geometry once per instance: a unit
/// geometry vertex buffer at slot 0 and the bar instance buffer at slot 1.
pub trait InstancedPipeline: Pipeline {
    /// Vertices in the static geometry.
    const VERTICES_PER_INSTANCE: u32;

    /// Record the instanced draw.
    fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        geometry: &wgpu::Buffer,
        instances: &wgpu::Buffer,
        instance_count: u32,
    ) {
        if instance_count == 0 {
            return;
        }
        pass.set_pipeline(self.pipeline());
        pass.set_bind_group(0, self.bind_group(), &[]);
        pass.set_vertex_buffer(0, geometry.slice(..));
        pass.set_vertex_buffer(1, instances.slice(..));
        pass.draw(0..Self::VERTICES_PER_INSTANCE, 0..instance_count);
    }
}
