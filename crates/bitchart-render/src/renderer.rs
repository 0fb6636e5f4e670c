//! Frame production: owns the pipelines, the managed buffers and the
//! per-frame state, and records one frame per tick.

use std::sync::Arc;

use bitchart_core::{Bar, Theme, Viewport};
use bitchart_store::SharedBarStore;

use crate::buffers::BufferManager;
use crate::gpu_context::GpuContext;
use crate::gpu_types::{
    candle_geometry, expand_polyline, volume_geometry, CandleUniforms, GridLineGpu, LineUniforms,
    VolumeUniforms,
};
use crate::pipeline::{
    CandlePipeline, GridPipeline, InstancedPipeline, LinePipeline, VolumePipeline,
};
use crate::worker::{GridSpec, SeriesKind};

const CANDLE_GEOMETRY: &str = "candle_geometry";
const VOLUME_GEOMETRY: &str = "volume_geometry";
const CANDLE_INSTANCES: &str = "candle_instances";
const VOLUME_INSTANCES: &str = "volume_instances";

/// Per-frame statistics for the slow-frame report.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub draw_calls: u32,
    pub instances: u32,
}

struct OverlayLine {
    id: u32,
    color: [f32; 4],
    visible: bool,
    vertex_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// The UI layer painted on the UI thread, awaiting composition.
struct UiPaint {
    primitives: Vec<egui::ClippedPrimitive>,
    pixels_per_point: f32,
}

/// Coordinates the four pipelines and all GPU-side chart state.
pub struct ChartRenderer {
    candle_pipeline: CandlePipeline,
    volume_pipeline: VolumePipeline,
    grid_pipeline: GridPipeline,
    line_pipeline: LinePipeline,

    buffers: BufferManager,
    store: Option<Arc<SharedBarStore>>,

    theme: Theme,
    viewport: Viewport,
    grid: GridSpec,
    instance_count: u32,
    candle_visible: bool,
    volume_visible: bool,
    overlays: Vec<OverlayLine>,

    ui_renderer: egui_wgpu::Renderer,
    ui_paint: Option<UiPaint>,
    ui_textures_to_free: Vec<egui::TextureId>,
}

impl ChartRenderer {
    pub fn new(ctx: &GpuContext, theme: Theme, store: Option<Arc<SharedBarStore>>) -> Self {
        let device = &ctx.device;
        let format = ctx.surface_format();

        let candle_pipeline = CandlePipeline::new(device, format);
        let volume_pipeline = VolumePipeline::new(device, format);
        let grid_pipeline = GridPipeline::new(device, format);
        let line_pipeline = LinePipeline::new(device, format);

        let mut buffers = BufferManager::new();
        buffers.create_init(
            device,
            CANDLE_GEOMETRY,
            bytemuck::cast_slice(&candle_geometry()),
            wgpu::BufferUsages::VERTEX,
        );
        buffers.create_init(
            device,
            VOLUME_GEOMETRY,
            bytemuck::cast_slice(&volume_geometry()),
            wgpu::BufferUsages::VERTEX,
        );
        buffers.create_empty(device, CANDLE_INSTANCES, 0, wgpu::BufferUsages::VERTEX);
        buffers.create_empty(device, VOLUME_INSTANCES, 0, wgpu::BufferUsages::VERTEX);

        let ui_renderer = egui_wgpu::Renderer::new(device, format, None, 1, false);

        Self {
            candle_pipeline,
            volume_pipeline,
            grid_pipeline,
            line_pipeline,
            buffers,
            store,
            theme,
            viewport: Viewport::default(),
            grid: GridSpec::default(),
            instance_count: 0,
            candle_visible: true,
            volume_visible: true,
            overlays: Vec::new(),
            ui_renderer,
            ui_paint: None,
            ui_textures_to_free: Vec::new(),
        }
    }

    /// Accept a UI layer tessellated on the UI thread: apply its texture
    /// deltas now, composite its primitives on every following frame until
    /// the next paint arrives.
    pub fn set_ui_paint(
        &mut self,
        ctx: &GpuContext,
        primitives: Vec<egui::ClippedPrimitive>,
        textures_delta: egui::TexturesDelta,
        pixels_per_point: f32,
    ) {
        for (id, delta) in &textures_delta.set {
            self.ui_renderer
                .update_texture(&ctx.device, &ctx.queue, *id, delta);
        }
        self.ui_textures_to_free.extend(textures_delta.free);
        self.ui_paint = Some(UiPaint {
            primitives,
            pixels_per_point,
        });
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn set_viewport(&mut self, viewport: Viewport, grid: GridSpec) {
        self.viewport = viewport;
        self.grid = grid;
    }

    pub fn set_series_visibility(&mut self, series: SeriesKind, visible: bool) {
        match series {
            SeriesKind::Candlestick => self.candle_visible = visible,
            SeriesKind::Volume => self.volume_visible = visible,
        }
    }

    /// Upload a transferred copy of the visible bars. Streaming data always
    /// goes through `replace` so in-flight reads of the previous frame's
    /// instances are never aliased.
    pub fn upload_bars(&mut self, ctx: &GpuContext, bars: &[Bar]) {
        let bytes: &[u8] = bytemuck::cast_slice(bars);
        self.buffers.replace(&ctx.device, CANDLE_INSTANCES, bytes);
        self.buffers.replace(&ctx.device, VOLUME_INSTANCES, bytes);
        self.instance_count = bars.len() as u32;
    }

    /// Upload a logical window of the shared store.
    pub fn upload_shared(
        &mut self,
        ctx: &GpuContext,
        offset: usize,
        count: usize,
    ) -> Result<(), String> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| "no shared mapping established".to_string())?;
        let bars = store.read_range(offset, count).map_err(|e| e.to_string())?;
        self.upload_bars(ctx, &bars);
        Ok(())
    }

    /// Create or refresh an indicator overlay polyline. Points are in data
    /// space (time, price).
    pub fn set_overlay(&mut self, ctx: &GpuContext, id: u32, color: [f32; 4], points: &[[f32; 2]]) {
        let strip = expand_polyline(points);
        let buffer_id = overlay_buffer_id(id);
        if self.buffers.contains(&buffer_id) {
            self.buffers
                .replace(&ctx.device, &buffer_id, bytemuck::cast_slice(&strip));
        } else {
            self.buffers.create_init(
                &ctx.device,
                &buffer_id,
                bytemuck::cast_slice(&strip),
                wgpu::BufferUsages::VERTEX,
            );
        }

        if let Some(overlay) = self.overlays.iter_mut().find(|o| o.id == id) {
            overlay.color = color;
            overlay.vertex_count = strip.len() as u32;
        } else {
            let (uniform_buffer, bind_group) = self.line_pipeline.create_overlay_resources(
                &ctx.device,
                &buffer_id,
                &LineUniforms {
                    color,
                    ..Default::default()
                },
            );
            self.overlays.push(OverlayLine {
                id,
                color,
                visible: true,
                vertex_count: strip.len() as u32,
                uniform_buffer,
                bind_group,
            });
        }
    }

    pub fn set_overlay_visibility(&mut self, id: u32, visible: bool) {
        if let Some(overlay) = self.overlays.iter_mut().find(|o| o.id == id) {
            overlay.visible = visible;
        }
    }

    pub fn remove_overlay(&mut self, id: u32) {
        self.buffers.remove(&overlay_buffer_id(id));
        self.overlays.retain(|o| o.id != id);
    }

    pub fn clear_overlays(&mut self) {
        for overlay in &self.overlays {
            self.buffers.remove(&overlay_buffer_id(overlay.id));
        }
        self.overlays.clear();
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn total_buffer_bytes(&self) -> u64 {
        self.buffers.total_bytes()
    }

    /// Record and present one frame.
    pub fn render(&mut self, ctx: &GpuContext) -> Result<FrameStats, wgpu::SurfaceError> {
        let frame = ctx.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let (width, height) = ctx.dimensions();
        let resolution = [width as f32, height as f32];
        self.write_frame_uniforms(ctx, resolution);

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("chart frame"),
            });

        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: self.ui_paint.as_ref().map_or(1.0, |p| p.pixels_per_point),
        };
        let ui_cmd_bufs = match &self.ui_paint {
            Some(paint) => self.ui_renderer.update_buffers(
                &ctx.device,
                &ctx.queue,
                &mut encoder,
                &paint.primitives,
                &screen,
            ),
            None => Vec::new(),
        };

        let mut stats = FrameStats::default();
        {
            let bg = self.theme.background;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("chart pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: bg[0] as f64,
                            g: bg[1] as f64,
                            b: bg[2] as f64,
                            a: bg[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime();

            if self.volume_visible && self.instance_count > 0 {
                if let (Some(geometry), Some(instances)) = (
                    self.buffers.get(VOLUME_GEOMETRY),
                    self.buffers.get(VOLUME_INSTANCES),
                ) {
                    self.volume_pipeline
                        .draw(&mut pass, geometry, instances, self.instance_count);
                    stats.draw_calls += 1;
                    stats.instances += self.instance_count;
                }
            }

            if self.candle_visible && self.instance_count > 0 {
                if let (Some(geometry), Some(instances)) = (
                    self.buffers.get(CANDLE_GEOMETRY),
                    self.buffers.get(CANDLE_INSTANCES),
                ) {
                    self.candle_pipeline
                        .draw(&mut pass, geometry, instances, self.instance_count);
                    stats.draw_calls += 1;
                    stats.instances += self.instance_count;
                }
            }

            if self.grid_pipeline.line_count() > 0 {
                self.grid_pipeline.draw(&mut pass);
                stats.draw_calls += 1;
            }

            for overlay in self.overlays.iter().filter(|o| o.visible) {
                if let Some(strip) = self.buffers.get(&overlay_buffer_id(overlay.id)) {
                    self.line_pipeline.draw(
                        &mut pass,
                        &overlay.bind_group,
                        strip,
                        overlay.vertex_count,
                    );
                    stats.draw_calls += 1;
                }
            }

            if let Some(paint) = &self.ui_paint {
                self.ui_renderer.render(&mut pass, &paint.primitives, &screen);
                stats.draw_calls += 1;
            }
        }

        ctx.queue
            .submit(ui_cmd_bufs.into_iter().chain(Some(encoder.finish())));
        frame.present();

        for id in self.ui_textures_to_free.drain(..) {
            self.ui_renderer.free_texture(&id);
        }
        Ok(stats)
    }

    /// Refresh every uniform buffer for the current viewport and theme.
    fn write_frame_uniforms(&mut self, ctx: &GpuContext, resolution: [f32; 2]) {
        let queue = &ctx.queue;

        self.candle_pipeline.write_uniforms(
            queue,
            &CandleUniforms::from_viewport(&self.viewport, &self.theme, resolution, self.instance_count),
        );
        self.volume_pipeline.write_uniforms(
            queue,
            &VolumeUniforms::from_viewport(&self.viewport, &self.theme, self.instance_count),
        );

        let lines = self.grid_lines_ndc();
        self.grid_pipeline
            .write_lines(queue, &lines, self.theme.grid, resolution);

        for overlay in &self.overlays {
            let uniforms = LineUniforms {
                color: overlay.color,
                resolution,
                time_from: self.viewport.time.from as f32,
                time_to: self.viewport.time.to as f32,
                price_min: self.viewport.price.min,
                price_max: self.viewport.price.max,
                thickness_px: 2.0,
                _pad: 0.0,
            };
            queue.write_buffer(
                &overlay.uniform_buffer,
                0,
                bytemuck::cast_slice(&[uniforms]),
            );
        }
    }

    /// Convert the scale-supplied grid positions into NDC rules.
    fn grid_lines_ndc(&self) -> Vec<GridLineGpu> {
        let time_span = self.viewport.time.span();
        let price_span = (self.viewport.price.max - self.viewport.price.min).max(f32::EPSILON);

        let mut out = Vec::with_capacity(self.grid.time_ticks.len() + self.grid.price_ticks.len());
        for &t in &self.grid.time_ticks {
            let x = ((t - self.viewport.time.from) / time_span) * 2.0 - 1.0;
            out.push(GridLineGpu {
                position: x as f32,
                axis: 0,
                _pad: [0.0; 2],
            });
        }
        for &p in &self.grid.price_ticks {
            let y = ((p as f32 - self.viewport.price.min) / price_span) * 2.0 - 1.0;
            out.push(GridLineGpu {
                position: y,
                axis: 1,
                _pad: [0.0; 2],
            });
        }
        out
    }
}

fn overlay_buffer_id(id: u32) -> String {
    format!("overlay_{id}")
}
