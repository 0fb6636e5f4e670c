//! The chart controller: UI-thread conductor for the whole engine.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use winit::window::Window;

use bitchart_compute::IndicatorSpec;
use bitchart_config::Config;
use bitchart_core::{validate_bar, Bar, Theme, TimeRange, ValueRange, Viewport};
use bitchart_ingest::{FeedEvent, LiveFeed};
use bitchart_render::{
    GridSpec, RenderEvent, RenderInit, RenderMessage, RenderWorker, SeriesKind,
};
use bitchart_scale::{upper_bound, PriceScale, TimeScale};
use bitchart_store::{SharedBarStore, StoreConfig, StoreHandle, StoreMode};

use crate::bridge::ComputeBridge;
use crate::culling::{CullConfig, FrustumCuller, VisibleRange};
use crate::error::ChartError;
use crate::events::{ChartEvent, Crosshair, ListenerId, ListenerRegistry};
use crate::interaction::{Gesture, Interaction};
use crate::lod::LodManager;

/// Grid density passed to the scales.
const GRID_TICK_TARGET: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Initialized,
    Destroyed,
}

/// Orchestrates the shared store, the scales, both workers and the feed.
///
/// All methods must be called from the UI thread; the async methods await
/// compute-worker responses but never block it. Construction requires an
/// ambient tokio runtime (the bridge pump and the feed task spawn onto it).
pub struct ChartController {
    config: Config,
    state: Lifecycle,

    store: Arc<SharedBarStore>,
    bridge: Arc<ComputeBridge>,
    render: Option<RenderWorker>,
    render_events: Option<mpsc::UnboundedReceiver<RenderEvent>>,

    time_scale: TimeScale,
    price_scale: PriceScale,
    theme: Theme,

    culler: FrustumCuller,
    lod: LodManager,
    /// Decimation rebuilds land here from their spawned tasks.
    lod_results: (
        mpsc::UnboundedSender<(usize, Vec<Bar>)>,
        mpsc::UnboundedReceiver<(usize, Vec<Bar>)>,
    ),
    lod_rebuilding: Vec<usize>,

    interaction: Interaction,
    listeners: ListenerRegistry,
    crosshair: Option<Crosshair>,

    /// Controller-side logical copy for culling and crosshair resolution.
    snapshot: Vec<Bar>,
    times: Vec<f32>,

    feed: Option<LiveFeed>,
    feed_events: Option<mpsc::Receiver<FeedEvent>>,

    content_size: (f32, f32),
    first_data: bool,
}

impl ChartController {
    pub fn new(config: Config) -> Self {
        let store = Arc::new(SharedBarStore::new(StoreConfig {
            mode: match config.store.mode.as_str() {
                "ring" => StoreMode::Ring,
                _ => StoreMode::Growable,
            },
            initial_capacity: config.store.initial_capacity,
            max_capacity: config.store.max_capacity,
            shared: config.store.shared,
        }));
        let bridge = Arc::new(ComputeBridge::new(store.shared_handle()));
        let lod = LodManager::new(&config.lod.thresholds, config.lod.hysteresis);

        let time_scale = TimeScale::new(800.0).with_right_padding(config.render.right_padding);
        let price_scale = PriceScale::new(600.0);

        Self {
            theme: config.theme,
            store,
            bridge,
            render: None,
            render_events: None,
            time_scale,
            price_scale,
            culler: FrustumCuller::new(CullConfig::default()),
            lod,
            lod_results: mpsc::unbounded_channel(),
            lod_rebuilding: Vec::new(),
            interaction: Interaction::new(),
            listeners: ListenerRegistry::new(),
            crosshair: None,
            snapshot: Vec::new(),
            times: Vec::new(),
            feed: None,
            feed_events: None,
            content_size: (800.0, 600.0),
            first_data: true,
            state: Lifecycle::Created,
            config,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Spawn the render worker against the host window. Call once.
    pub fn init(&mut self, window: Arc<Window>) -> Result<(), ChartError> {
        self.ensure_alive()?;
        if self.state == Lifecycle::Initialized {
            return Err(ChartError::AlreadyInitialized);
        }

        let size = window.inner_size();
        let (render, render_events) = RenderWorker::spawn(
            window,
            RenderInit {
                width: size.width,
                height: size.height,
                store: self.store.shared_handle(),
                theme: self.theme,
                target_fps: self.config.render.target_fps,
            },
        );
        self.render = Some(render);
        self.render_events = Some(render_events);
        self.state = Lifecycle::Initialized;
        self.resize(size.width as f32, size.height as f32);
        Ok(())
    }

    /// Tear everything down: reject pending compute requests, stop the feed,
    /// stop the frame loop and join the workers. Idempotent.
    pub fn destroy(&mut self) {
        if self.state == Lifecycle::Destroyed {
            return;
        }
        self.state = Lifecycle::Destroyed;
        self.bridge.destroy();
        if let Some(mut feed) = self.feed.take() {
            // The command channel wakes the task; it exits on Close.
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move { feed.close().await });
            }
        }
        self.feed_events = None;
        if let Some(render) = self.render.take() {
            render.destroy();
        }
        self.render_events = None;
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == Lifecycle::Destroyed
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub fn add_listener(&mut self, listener: impl Fn(&ChartEvent) + Send + 'static) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    // =========================================================================
    // Data plane
    // =========================================================================

    /// Replace the whole data set.
    pub fn set_data(&mut self, bars: Vec<Bar>) -> Result<(), ChartError> {
        self.ensure_alive()?;
        if bars.is_empty() {
            return Err(ChartError::InvalidData("empty data set".into()));
        }
        if let Some(bad) = bars.iter().find(|b| !validate_bar(b)) {
            return Err(ChartError::InvalidData(format!("malformed bar: {bad:?}")));
        }
        self.store.set_all(&bars)?;
        self.after_data_mutation();
        Ok(())
    }

    /// Append bars. Returns `false` when the append was dropped (capacity
    /// cap in growable mode).
    pub fn append_data(&mut self, bars: &[Bar]) -> Result<bool, ChartError> {
        self.ensure_alive()?;
        if let Some(bad) = bars.iter().find(|b| !validate_bar(b)) {
            return Err(ChartError::InvalidData(format!("malformed bar: {bad:?}")));
        }
        let accepted = self.store.append(bars);
        if accepted {
            self.after_data_mutation();
        }
        Ok(accepted)
    }

    /// Overwrite the currently forming bar.
    pub fn update_last_candle(&mut self, bar: Bar) -> Result<(), ChartError> {
        self.ensure_alive()?;
        if !validate_bar(&bar) {
            return Err(ChartError::InvalidData(format!("malformed bar: {bar:?}")));
        }
        if !self.store.update_last(bar) {
            return Err(ChartError::InvalidData("no bar to update".into()));
        }
        self.after_data_mutation();
        Ok(())
    }

    pub fn bar_count(&self) -> usize {
        self.store.len()
    }

    pub fn store(&self) -> &Arc<SharedBarStore> {
        &self.store
    }

    // =========================================================================
    // Appearance and viewport
    // =========================================================================

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.send_render(RenderMessage::SetTheme(theme));
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn set_series_visibility(&mut self, series: SeriesKind, visible: bool) {
        self.send_render(RenderMessage::SetSeriesVisibility { series, visible });
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.content_size = (width.max(1.0), height.max(1.0));
        self.time_scale.set_pixel_width(self.content_size.0);
        self.price_scale.set_pixel_height(self.content_size.1);
        self.send_render(RenderMessage::Resize {
            width: width as u32,
            height: height as u32,
        });
        self.culler.invalidate();
        self.sync_viewport(false);
    }

    pub fn time_scale(&self) -> &TimeScale {
        &self.time_scale
    }

    pub fn price_scale(&self) -> &PriceScale {
        &self.price_scale
    }

    pub fn crosshair(&self) -> Option<&Crosshair> {
        self.crosshair.as_ref()
    }

    pub fn content_size(&self) -> (f32, f32) {
        self.content_size
    }

    /// Show the full data range on both axes.
    pub fn fit_content(&mut self) {
        self.time_scale.fit_content();
        self.price_scale.fit_content();
        self.culler.invalidate();
        self.sync_viewport(false);
    }

    // =========================================================================
    // Indicators
    // =========================================================================

    /// Compute an indicator over the whole stored series.
    pub async fn compute_indicator(&self, spec: IndicatorSpec) -> Result<Vec<f32>, ChartError> {
        self.ensure_alive()?;
        self.bridge.indicator(spec, 0, self.store.len()).await
    }

    /// Compute an indicator and show it as a line overlay. Multi-line
    /// indicators overlay their first component.
    pub async fn indicator_overlay(
        &self,
        id: u32,
        spec: IndicatorSpec,
        color: [f32; 4],
    ) -> Result<(), ChartError> {
        let values = self.compute_indicator(spec).await?;
        let stride = spec.values_per_bar();
        let points: Vec<[f32; 2]> = self
            .snapshot
            .iter()
            .enumerate()
            .filter_map(|(i, bar)| {
                let v = *values.get(i * stride)?;
                v.is_finite().then_some([bar.time, v])
            })
            .collect();
        self.send_render(RenderMessage::SetOverlay { id, color, points });
        Ok(())
    }

    pub fn remove_indicator_overlay(&mut self, id: u32) {
        self.send_render(RenderMessage::RemoveOverlay { id });
    }

    /// Ship a tessellated UI layer to the render worker for composition.
    pub fn paint_ui(
        &self,
        primitives: Vec<egui::ClippedPrimitive>,
        textures_delta: egui::TexturesDelta,
        pixels_per_point: f32,
    ) {
        self.send_render(RenderMessage::PaintUi {
            primitives,
            textures_delta,
            pixels_per_point,
        });
    }

    // =========================================================================
    // Realtime feed
    // =========================================================================

    /// Connect a live feed and route its candles into the store. Must be
    /// called within the runtime context.
    pub fn attach_feed(&mut self, mut feed: LiveFeed) -> Result<(), ChartError> {
        self.ensure_alive()?;
        self.feed_events = Some(feed.connect());
        self.feed = Some(feed);
        Ok(())
    }

    /// Drain pending feed events. Call from the UI loop's idle handler.
    pub fn pump_feed(&mut self) {
        let Some(mut rx) = self.feed_events.take() else {
            return;
        };
        let mut mutated = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                FeedEvent::Candle { bar, .. } => {
                    if validate_bar(&bar) {
                        self.apply_live_bar(bar);
                        mutated = true;
                    }
                }
                FeedEvent::Error(message) => {
                    self.listeners.emit(&ChartEvent::Error { message });
                }
                FeedEvent::Connected => log::info!("feed connected"),
                FeedEvent::Disconnected => log::info!("feed disconnected"),
                FeedEvent::Tick(_) | FeedEvent::Batch(_) => {}
            }
        }
        self.feed_events = Some(rx);
        if mutated {
            self.after_data_mutation();
        }
    }

    /// Drain render worker events (ready, slow frames, fatal errors).
    pub fn pump_render_events(&mut self) {
        let Some(rx) = self.render_events.as_mut() else {
            return;
        };
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        for event in events {
            match event {
                RenderEvent::Ready {
                    backend,
                    adapter,
                    max_texture_size,
                } => {
                    log::info!("render worker ready: {adapter} ({backend}), max texture {max_texture_size}");
                    self.listeners.emit(&ChartEvent::Ready { backend, adapter });
                }
                RenderEvent::FrameComplete {
                    frame_time_ms,
                    draw_calls,
                    instances,
                } => {
                    log::debug!(
                        "slow frame: {frame_time_ms:.1}ms, {draw_calls} draws, {instances} instances"
                    );
                }
                RenderEvent::Error { message } => {
                    log::error!("render worker error: {message}");
                    self.listeners.emit(&ChartEvent::Error { message });
                }
            }
        }
    }

    /// Collect finished decimation rebuilds. Call from the UI loop's idle
    /// handler.
    pub fn pump_lod_results(&mut self) {
        let mut landed = false;
        while let Ok((level_id, bars)) = self.lod_results.1.try_recv() {
            self.lod.set_cache(level_id, bars);
            self.lod_rebuilding.retain(|&id| id != level_id);
            landed = true;
        }
        if landed {
            self.culler.invalidate();
            self.sync_viewport(false);
        }
    }

    // =========================================================================
    // Input
    // =========================================================================

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        let gestures = self.interaction.pointer_down(x, y, Instant::now());
        self.apply_gestures(gestures);
    }

    pub fn pointer_up(&mut self, x: f32, y: f32) {
        let gestures = self.interaction.pointer_up(x, y);
        self.apply_gestures(gestures);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let gestures = self.interaction.pointer_move(x, y);
        self.apply_gestures(gestures);
    }

    pub fn pointer_leave(&mut self) {
        let gestures = self.interaction.pointer_leave();
        self.apply_gestures(gestures);
    }

    pub fn wheel(&mut self, delta_y: f32, x: f32) {
        let gestures = self.interaction.wheel(delta_y, x);
        self.apply_gestures(gestures);
    }

    pub fn touch_start(&mut self, id: u64, x: f32, y: f32) {
        let gestures = self.interaction.touch_start(id, x, y);
        self.apply_gestures(gestures);
    }

    pub fn touch_move(&mut self, id: u64, x: f32, y: f32) {
        let gestures = self.interaction.touch_move(id, x, y);
        self.apply_gestures(gestures);
    }

    pub fn touch_end(&mut self, id: u64) {
        let gestures = self.interaction.touch_end(id);
        self.apply_gestures(gestures);
    }

    fn apply_gestures(&mut self, gestures: Vec<Gesture>) {
        for gesture in gestures {
            match gesture {
                Gesture::PanStart | Gesture::PanEnd => {}
                Gesture::PanBy { dx, dy } => {
                    self.time_scale.pan_by_pixels(-dx);
                    self.price_scale.pan_by_pixels(dy);
                    self.sync_viewport(false);
                }
                Gesture::Zoom { factor, center_x } => {
                    let center = self.time_scale.pixel_to_data(center_x);
                    self.time_scale.zoom(factor, Some(center));
                    self.sync_viewport(false);
                }
                Gesture::DoubleClick => self.fit_content(),
                Gesture::Click { x, y } => {
                    let time = self.time_scale.pixel_to_data(x);
                    let price = self.price_scale.pixel_to_data(y);
                    self.listeners.emit(&ChartEvent::Click { time, price });
                }
                Gesture::CrosshairMoved { x, y } => {
                    let crosshair = self.resolve_crosshair(x, y);
                    self.crosshair = Some(crosshair);
                    self.listeners.emit(&ChartEvent::Crosshair(Some(crosshair)));
                }
                Gesture::CrosshairCleared => {
                    if self.crosshair.take().is_some() {
                        self.listeners.emit(&ChartEvent::Crosshair(None));
                    }
                }
            }
        }
    }

    fn resolve_crosshair(&self, x: f32, y: f32) -> Crosshair {
        let time = self.time_scale.pixel_to_data(x);
        let price = self.price_scale.pixel_to_data(y);
        // The bar whose bucket starts at or before `time`.
        let bar = match upper_bound(&self.times, time as f32) {
            0 => None,
            idx => self.snapshot.get(idx - 1).copied(),
        };
        Crosshair {
            x,
            y,
            time,
            price,
            bar,
        }
    }

    // =========================================================================
    // Data sync
    // =========================================================================

    fn ensure_alive(&self) -> Result<(), ChartError> {
        if self.state == Lifecycle::Destroyed {
            return Err(ChartError::Destroyed);
        }
        Ok(())
    }

    fn send_render(&self, message: RenderMessage) {
        if let Some(render) = &self.render {
            render.send(message);
        }
    }

    /// Route a live candle: same bucket overwrites the forming bar, a new
    /// bucket appends. The comparison reads the store (not the controller
    /// snapshot) so several candles drained in one pump stay consistent.
    fn apply_live_bar(&mut self, bar: Bar) {
        let len = self.store.len();
        let last_time = if len == 0 {
            None
        } else {
            self.store
                .read_range(len - 1, 1)
                .ok()
                .and_then(|bars| bars.first().map(|b| b.time))
        };
        let is_new_bucket = last_time.map_or(true, |t| bar.time > t);
        if is_new_bucket {
            if !self.store.append(&[bar]) {
                log::warn!("live bar dropped: store at capacity");
            }
        } else {
            self.store.update_last(bar);
        }
    }

    /// Refresh controller-side state and both workers after any mutation.
    fn after_data_mutation(&mut self) {
        self.snapshot = self.store.snapshot();
        self.times = self.snapshot.iter().map(|b| b.time).collect();

        if let (Some(first), Some(last)) = (self.times.first(), self.times.last()) {
            self.time_scale
                .set_data_range(f64::from(*first), f64::from(*last));
        }
        let (price_min, price_max) = self
            .snapshot
            .iter()
            .fold((f32::MAX, f32::MIN), |(min, max), b| {
                (min.min(b.low), max.max(b.high))
            });
        if price_min <= price_max {
            self.price_scale
                .set_data_range(f64::from(price_min), f64::from(price_max));
        }

        if self.first_data && !self.snapshot.is_empty() {
            self.first_data = false;
            self.time_scale.fit_content();
            self.price_scale.fit_content();
        }

        // Copy mode: the compute worker needs its own snapshot.
        if self.store.shared_handle().is_none() {
            self.bridge.set_data(self.snapshot.clone());
        }

        self.lod.invalidate();
        self.culler.invalidate();
        self.sync_viewport(true);
        self.listeners.emit(&ChartEvent::DataChange {
            count: self.snapshot.len(),
        });
    }

    /// Upload the visible slice and the viewport, in that order, over the
    /// render worker's FIFO channel.
    fn sync_viewport(&mut self, data_changed: bool) {
        let visible = self.time_scale.visible_range();
        let needs_recull = self.culler.needs_update(visible);

        let full_range = self.culler.cull(&self.times, visible);
        let level_id = self.lod.select(full_range.count);
        let factor = self.lod.active_level().factor;

        if data_changed || needs_recull {
            if factor == 1 {
                self.upload_full_resolution(full_range);
            } else {
                self.upload_decimated(level_id, factor, visible, full_range);
            }
        }

        let viewport = self.current_viewport(full_range);
        let grid = GridSpec {
            time_ticks: self.time_scale.grid_ticks(GRID_TICK_TARGET),
            price_ticks: self.price_scale.grid_ticks(GRID_TICK_TARGET),
        };
        self.send_render(RenderMessage::SetViewport { viewport, grid });
        self.listeners
            .emit(&ChartEvent::ViewportChange { viewport });
    }

    fn upload_full_resolution(&mut self, range: VisibleRange) {
        if self.store.shared_handle().is_some() {
            self.send_render(RenderMessage::UpdateDataShared {
                offset: range.start,
                count: range.count,
            });
        } else {
            let bars = self.snapshot[range.start..range.end()].to_vec();
            self.send_render(RenderMessage::UpdateData { bars });
        }
    }

    /// Upload from the level's decimated cache, or kick off a rebuild and
    /// keep full resolution until it lands.
    fn upload_decimated(
        &mut self,
        level_id: usize,
        factor: usize,
        visible: TimeRange,
        fallback: VisibleRange,
    ) {
        if let Some(cache) = self.lod.cache(level_id) {
            let cache_times: Vec<f32> = cache.iter().map(|b| b.time).collect();
            let range = self.culler.cull(&cache_times, visible);
            let bars = cache[range.start..range.end()].to_vec();
            self.send_render(RenderMessage::UpdateData { bars });
            return;
        }

        if !self.lod_rebuilding.contains(&level_id) {
            self.lod_rebuilding.push(level_id);
            let bridge = Arc::clone(&self.bridge);
            let results = self.lod_results.0.clone();
            let count = self.snapshot.len();
            let target = LodManager::target_count(count, factor);
            tokio::spawn(async move {
                match bridge.decimate(0, count, target).await {
                    Ok(bars) => {
                        let _ = results.send((level_id, bars));
                    }
                    Err(e) => log::warn!("decimation rebuild failed: {e}"),
                }
            });
        }
        self.upload_full_resolution(fallback);
    }

    fn current_viewport(&self, visible: VisibleRange) -> Viewport {
        let time = self.time_scale.visible_range();
        let price = self.price_scale.visible_range();

        // Volume axis: zero to the maximum volume in the visible window.
        let max_volume = self.snapshot[visible.start..visible.end().min(self.snapshot.len())]
            .iter()
            .map(|b| b.volume)
            .fold(0.0f32, f32::max)
            .max(1e-9);

        Viewport {
            time,
            price,
            volume: ValueRange::new(0.0, max_volume),
        }
    }
}

impl Drop for ChartController {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let c = 100.0 + (i % 10) as f32;
                Bar::new(i as f32 * 60_000.0, c, c + 2.0, c - 2.0, c + 1.0, 5.0)
            })
            .collect()
    }

    fn controller() -> ChartController {
        ChartController::new(Config::default())
    }

    #[tokio::test]
    async fn test_set_data_updates_scales_and_emits() {
        let mut chart = controller();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        chart.add_listener(move |event| {
            if matches!(event, ChartEvent::DataChange { count: 100 }) {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            }
        });

        chart.set_data(bars(100)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(chart.bar_count(), 100);

        let (min, max) = chart.time_scale().data_range();
        assert_eq!(min, 0.0);
        assert_eq!(max, 99.0 * 60_000.0);

        // First data set fits the view.
        let visible = chart.time_scale().visible_range();
        assert!(visible.from <= min);
        assert!(visible.to >= max);
    }

    #[tokio::test]
    async fn test_set_data_rejects_bad_bars() {
        let mut chart = controller();
        assert!(matches!(
            chart.set_data(vec![]),
            Err(ChartError::InvalidData(_))
        ));

        let bad = vec![Bar::new(0.0, 100.0, 90.0, 95.0, 100.0, 1.0)];
        assert!(matches!(
            chart.set_data(bad),
            Err(ChartError::InvalidData(_))
        ));
        assert_eq!(chart.bar_count(), 0);
    }

    #[tokio::test]
    async fn test_pan_and_zoom_emit_viewport_change() {
        let mut chart = controller();
        chart.set_data(bars(500)).unwrap();

        let viewports = Arc::new(AtomicUsize::new(0));
        let viewports_clone = Arc::clone(&viewports);
        chart.add_listener(move |event| {
            if matches!(event, ChartEvent::ViewportChange { .. }) {
                viewports_clone.fetch_add(1, Ordering::SeqCst);
            }
        });

        chart.wheel(-1.0, 400.0);
        let zoomed = chart.time_scale().visible_range();
        assert!(zoomed.span() < 500.0 * 60_000.0 * 1.05 + 1.0);

        chart.pointer_down(400.0, 300.0);
        chart.pointer_move(300.0, 300.0);
        chart.pointer_up(300.0, 300.0);

        assert!(viewports.load(Ordering::SeqCst) >= 2);
        // Panning right (pointer left) moves the window toward later data
        // unless already absorbed at the right bound.
        let panned = chart.time_scale().visible_range();
        assert!(panned.from >= zoomed.from);
    }

    #[tokio::test]
    async fn test_double_click_fits_content() {
        let mut chart = controller();
        chart.set_data(bars(200)).unwrap();

        for _ in 0..5 {
            chart.wheel(-1.0, 400.0);
        }
        let zoomed_span = chart.time_scale().visible_range().span();

        chart.pointer_down(100.0, 100.0);
        chart.pointer_up(100.0, 100.0);
        chart.pointer_down(100.0, 100.0); // double click

        let fitted = chart.time_scale().visible_range();
        assert!(fitted.span() > zoomed_span);
        let (min, max) = chart.time_scale().data_range();
        assert!(fitted.from <= min && fitted.to >= max);
    }

    #[tokio::test]
    async fn test_crosshair_resolves_bar() {
        let mut chart = controller();
        chart.set_data(bars(10)).unwrap();
        chart.fit_content();

        let events = Arc::new(std::sync::Mutex::new(Vec::new()));
        let events_clone = Arc::clone(&events);
        chart.add_listener(move |event| {
            if let ChartEvent::Crosshair(c) = event {
                events_clone.lock().unwrap().push(*c);
            }
        });

        chart.pointer_move(400.0, 300.0);
        chart.pointer_leave();

        let seen = events.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let hit = seen[0].expect("crosshair set");
        let bar = hit.bar.expect("bar resolved");
        // The resolved bar's bucket contains the pointer time.
        assert!(f64::from(bar.time) <= hit.time);
        assert!(seen[1].is_none());
    }

    #[tokio::test]
    async fn test_update_last_candle() {
        let mut chart = controller();
        chart.set_data(bars(3)).unwrap();

        let mut last = chart.store().snapshot()[2];
        last.close = last.high;
        chart.update_last_candle(last).unwrap();
        assert_eq!(chart.store().snapshot()[2], last);

        let empty = controller();
        let mut empty = empty;
        assert!(matches!(
            empty.update_last_candle(last),
            Err(ChartError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_compute_indicator_through_controller() {
        let mut chart = controller();
        let closes: Vec<Bar> = (0..5)
            .map(|i| {
                let c = (i + 1) as f32;
                Bar::new(i as f32 * 60_000.0, c, c + 1.0, c - 1.0, c, 1.0)
            })
            .collect();
        chart.set_data(closes).unwrap();

        let values = chart
            .compute_indicator(IndicatorSpec::Sma { period: 3 })
            .await
            .unwrap();
        assert_eq!(&values[2..], &[2.0, 3.0, 4.0]);
    }

    #[tokio::test]
    async fn test_destroyed_controller_rejects_calls() {
        let mut chart = controller();
        chart.set_data(bars(5)).unwrap();
        chart.destroy();

        assert!(matches!(chart.set_data(bars(5)), Err(ChartError::Destroyed)));
        assert!(matches!(
            chart.append_data(&bars(1)),
            Err(ChartError::Destroyed)
        ));
        assert!(matches!(
            chart.compute_indicator(IndicatorSpec::Sma { period: 3 }).await,
            Err(ChartError::Destroyed)
        ));
        // Destroy is idempotent.
        chart.destroy();
    }

    #[tokio::test]
    async fn test_live_bar_routing() {
        let mut chart = controller();
        chart.set_data(bars(3)).unwrap();

        // Same bucket as the last bar: overwrite in place.
        let mut forming = chart.store().snapshot()[2];
        forming.close += 1.0;
        forming.high += 1.0;
        chart.apply_live_bar(forming);
        assert_eq!(chart.bar_count(), 3);
        assert_eq!(chart.store().snapshot()[2], forming);

        // Next bucket: append.
        let next = Bar::new(forming.time + 60_000.0, 1.0, 2.0, 0.5, 1.5, 1.0);
        chart.apply_live_bar(next);
        assert_eq!(chart.bar_count(), 4);
    }
}
