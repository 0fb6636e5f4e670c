//! GPU rendering for BitChart.
//!
//! The render worker owns the surface, the device and the frame loop on a
//! dedicated thread; the UI context talks to it exclusively through the
//! message protocol in [`worker`]. Candlesticks and volume bars draw via
//! instancing: a static unit geometry (18 vertices per candle, 6 per volume
//! bar) stepped per vertex, and the raw 24-byte bar records stepped per
//! instance.

pub mod buffers;
pub mod gpu_context;
pub mod gpu_types;
pub mod pipeline;
pub mod renderer;
pub mod ticker;
pub mod worker;

pub use buffers::BufferManager;
pub use gpu_context::{GpuContext, RenderError};
pub use renderer::ChartRenderer;
pub use ticker::{FrameTicker, IntervalTicker};
pub use worker::{GridSpec, RenderEvent, RenderInit, RenderMessage, RenderWorker, SeriesKind};

/// Vertices in the static candle geometry: body, upper wick, lower wick.
pub const VERTICES_PER_CANDLE: u32 = 18;
/// Vertices in the static volume-bar geometry.
pub const VERTICES_PER_VOLUME_BAR: u32 = 6;
/// Frames slower than this are reported via `RenderEvent::FrameComplete`.
pub const SLOW_FRAME_MS: f32 = 16.0;
