//! The render worker thread and its message protocol.
//!
//! The worker owns the surface and the frame loop. Inbound messages are
//! drained non-blocking at the top of every tick, so a `SetViewport` sent
//! after an `UpdateData*` is always observed in that order before the next
//! frame. Outbound events carry initialization results, fatal errors and
//! slow-frame statistics.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use tokio::sync::mpsc;
use winit::window::Window;

use bitchart_core::{Bar, Theme, Viewport};
use bitchart_store::SharedBarStore;

use crate::gpu_context::GpuContext;
use crate::renderer::ChartRenderer;
use crate::ticker::{FrameTicker, IntervalTicker};
use crate::SLOW_FRAME_MS;

/// Series toggled through `SetSeriesVisibility`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Candlestick,
    Volume,
}

/// Grid rule positions in data space, supplied by the scales.
#[derive(Debug, Clone, Default)]
pub struct GridSpec {
    pub time_ticks: Vec<f64>,
    pub price_ticks: Vec<f64>,
}

/// Messages accepted by the render worker.
pub enum RenderMessage {
    Resize {
        width: u32,
        height: u32,
    },
    /// Transferred copy of the visible bars (copy mode).
    UpdateData { bars: Vec<Bar> },
    /// Logical window into the shared store (shared mode).
    UpdateDataShared { offset: usize, count: usize },
    SetViewport {
        viewport: Viewport,
        grid: GridSpec,
    },
    SetTheme(Theme),
    SetSeriesVisibility {
        series: SeriesKind,
        visible: bool,
    },
    /// Create or refresh an indicator overlay polyline (data-space points).
    SetOverlay {
        id: u32,
        color: [f32; 4],
        points: Vec<[f32; 2]>,
    },
    SetOverlayVisibility {
        id: u32,
        visible: bool,
    },
    RemoveOverlay {
        id: u32,
    },
    ClearOverlays,
    /// Composite the UI layer painted on the UI thread (grid labels,
    /// crosshair, tooltip). Primitives are tessellated egui shapes.
    PaintUi {
        primitives: Vec<egui::ClippedPrimitive>,
        textures_delta: egui::TexturesDelta,
        pixels_per_point: f32,
    },
    /// Exit the frame loop and release all GPU resources.
    Destroy,
}

/// Events emitted by the render worker.
#[derive(Debug, Clone)]
pub enum RenderEvent {
    /// Initialization succeeded; the frame loop is running.
    Ready {
        backend: String,
        adapter: String,
        max_texture_size: u32,
    },
    /// Emitted only for slow frames (above [`SLOW_FRAME_MS`]).
    FrameComplete {
        frame_time_ms: f32,
        draw_calls: u32,
        instances: u32,
    },
    Error { message: String },
}

/// Render worker spawn parameters.
pub struct RenderInit {
    pub width: u32,
    pub height: u32,
    /// Shared store view, or `None` for copy mode.
    pub store: Option<Arc<SharedBarStore>>,
    pub theme: Theme,
    pub target_fps: u32,
}

/// Handle to the running render worker.
pub struct RenderWorker {
    tx: mpsc::UnboundedSender<RenderMessage>,
    join: Option<JoinHandle<()>>,
}

impl RenderWorker {
    /// Spawn the render thread. The surface is created on that thread from
    /// the window handle; GPU resources never cross back.
    pub fn spawn(
        window: Arc<Window>,
        init: RenderInit,
    ) -> (Self, mpsc::UnboundedReceiver<RenderEvent>) {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let join = std::thread::Builder::new()
            .name("bitchart-render".into())
            .spawn(move || run(window, init, msg_rx, event_tx))
            .expect("spawn render worker thread");

        (
            Self {
                tx: msg_tx,
                join: Some(join),
            },
            event_rx,
        )
    }

    /// Queue a message. Returns `false` if the worker has exited.
    pub fn send(&self, message: RenderMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    /// Stop the frame loop and wait for the thread to exit.
    pub fn destroy(mut self) {
        let _ = self.tx.send(RenderMessage::Destroy);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        let _ = self.tx.send(RenderMessage::Destroy);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn run(
    window: Arc<Window>,
    init: RenderInit,
    mut messages: mpsc::UnboundedReceiver<RenderMessage>,
    events: mpsc::UnboundedSender<RenderEvent>,
) {
    // GPU acquisition failure is fatal: report and never enter the loop.
    let mut ctx = match pollster::block_on(GpuContext::new(window, init.width, init.height)) {
        Ok(ctx) => ctx,
        Err(e) => {
            log::error!("render worker init failed: {e}");
            let _ = events.send(RenderEvent::Error {
                message: e.to_string(),
            });
            return;
        }
    };

    let mut renderer = ChartRenderer::new(&ctx, init.theme, init.store);
    let _ = events.send(RenderEvent::Ready {
        backend: ctx.backend_name(),
        adapter: ctx.adapter_name().to_string(),
        max_texture_size: ctx.max_texture_size(),
    });

    let mut ticker = IntervalTicker::new(init.target_fps);
    log::debug!("render worker up at {:?}/frame", ticker.frame_time());

    loop {
        // Messages are processed synchronously at the top of each tick.
        while let Ok(message) = messages.try_recv() {
            match message {
                RenderMessage::Destroy => {
                    log::debug!("render worker destroyed");
                    return;
                }
                other => handle_message(&mut ctx, &mut renderer, &events, other),
            }
        }

        let start = Instant::now();
        match renderer.render(&ctx) {
            Ok(stats) => {
                let frame_time_ms = start.elapsed().as_secs_f32() * 1000.0;
                if frame_time_ms > SLOW_FRAME_MS {
                    let _ = events.send(RenderEvent::FrameComplete {
                        frame_time_ms,
                        draw_calls: stats.draw_calls,
                        instances: stats.instances,
                    });
                }
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                ctx.configure_surface();
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface frame timeout");
            }
            Err(e) => {
                let _ = events.send(RenderEvent::Error {
                    message: e.to_string(),
                });
                return;
            }
        }

        ticker.wait();
    }
}

fn handle_message(
    ctx: &mut GpuContext,
    renderer: &mut ChartRenderer,
    events: &mpsc::UnboundedSender<RenderEvent>,
    message: RenderMessage,
) {
    match message {
        RenderMessage::Resize { width, height } => ctx.resize(width, height),
        RenderMessage::UpdateData { bars } => renderer.upload_bars(ctx, &bars),
        RenderMessage::UpdateDataShared { offset, count } => {
            if let Err(message) = renderer.upload_shared(ctx, offset, count) {
                let _ = events.send(RenderEvent::Error { message });
            }
        }
        RenderMessage::SetViewport { viewport, grid } => renderer.set_viewport(viewport, grid),
        RenderMessage::SetTheme(theme) => renderer.set_theme(theme),
        RenderMessage::SetSeriesVisibility { series, visible } => {
            renderer.set_series_visibility(series, visible)
        }
        RenderMessage::SetOverlay { id, color, points } => {
            renderer.set_overlay(ctx, id, color, &points)
        }
        RenderMessage::SetOverlayVisibility { id, visible } => {
            renderer.set_overlay_visibility(id, visible)
        }
        RenderMessage::RemoveOverlay { id } => renderer.remove_overlay(id),
        RenderMessage::ClearOverlays => renderer.clear_overlays(),
        RenderMessage::PaintUi {
            primitives,
            textures_delta,
            pixels_per_point,
        } => renderer.set_ui_paint(ctx, primitives, textures_delta, pixels_per_point),
        RenderMessage::Destroy => unreachable!("Destroy is handled by the frame loop"),
    }
}
