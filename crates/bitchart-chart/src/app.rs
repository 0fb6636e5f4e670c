//! Application handler for winit events: the demo host around the
//! controller.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent},
    event_loop::ActiveEventLoop,
    window::Window,
};

use bitchart_config::Config;
use bitchart_core::Bar;

use crate::controller::ChartController;
use crate::ui::{paint_overlay, OverlaySnapshot};

pub struct App {
    config: Config,
    window: Option<Arc<Window>>,
    controller: Option<ChartController>,
    egui_ctx: egui::Context,
    egui_state: Option<egui_winit::State>,
    last_cursor: (f32, f32),
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            window: None,
            controller: None,
            egui_ctx: egui::Context::default(),
            egui_state: None,
            last_cursor: (0.0, 0.0),
        }
    }

    /// Run one overlay pass and ship the tessellated layer to the render
    /// worker.
    fn paint_overlay_layer(&mut self) {
        let (Some(window), Some(state), Some(controller)) = (
            self.window.as_ref(),
            self.egui_state.as_mut(),
            self.controller.as_ref(),
        ) else {
            return;
        };

        let raw_input = state.take_egui_input(window);
        let output = self.egui_ctx.run(raw_input, |ctx| {
            let ppp = ctx.pixels_per_point();
            let (width, height) = controller.content_size();
            let snapshot = OverlaySnapshot {
                time_scale: controller.time_scale(),
                price_scale: controller.price_scale(),
                theme: controller.theme(),
                crosshair: controller.crosshair(),
                width: width / ppp,
                height: height / ppp,
                pixels_per_point: ppp,
            };
            paint_overlay(ctx, &snapshot);
        });
        state.handle_platform_output(window, output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(output.shapes, output.pixels_per_point);
        controller.paint_ui(primitives, output.textures_delta, output.pixels_per_point);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match event_loop
            .create_window(Window::default_attributes().with_title("BitChart"))
        {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("window creation failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let egui_state = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window.as_ref(),
            None,
            None,
            None,
        );

        let mut controller = ChartController::new(self.config.clone());
        if let Err(e) = controller.init(Arc::clone(&window)) {
            log::error!("controller init failed: {e}");
            event_loop.exit();
            return;
        }
        controller.add_listener(|event| {
            if let crate::events::ChartEvent::Error { message } = event {
                log::error!("chart error: {message}");
            }
        });

        if let Err(e) = controller.set_data(demo_series(5_000, self.config.general.timeframe_ms)) {
            log::error!("seeding demo data failed: {e}");
        }

        // Live streaming is opt-in for the demo.
        if std::env::var_os("BITCHART_LIVE").is_some() {
            let feed = bitchart_ingest::LiveFeed::new(bitchart_ingest::FeedConfig {
                url: format!(
                    "{}/{}@{}",
                    self.config.feed.ws_url, self.config.general.symbol, self.config.feed.channel
                ),
                symbol: self.config.general.symbol.clone(),
                channel: self.config.feed.channel.clone(),
                timeframe_ms: self.config.general.timeframe_ms,
                batch_interval: std::time::Duration::from_millis(
                    self.config.feed.batch_interval_ms,
                ),
                auto_reconnect: self.config.feed.auto_reconnect,
                max_reconnect_attempts: self.config.feed.max_reconnect_attempts,
                reconnect_delay: std::time::Duration::from_millis(
                    self.config.feed.reconnect_delay_ms,
                ),
                ..bitchart_ingest::FeedConfig::default()
            });
            if let Err(e) = controller.attach_feed(feed) {
                log::error!("feed attach failed: {e}");
            }
        }

        self.window = Some(window);
        self.controller = Some(controller);
        self.egui_state = Some(egui_state);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let (Some(window), Some(state)) = (self.window.as_ref(), self.egui_state.as_mut()) else {
            return;
        };
        // Let egui track input state for the overlay layer first.
        let _ = state.on_window_event(window, &event);

        let Some(controller) = self.controller.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                controller.destroy();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                controller.resize(size.width as f32, size.height as f32);
            }
            WindowEvent::RedrawRequested => {
                self.paint_overlay_layer();
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.last_cursor = (position.x as f32, position.y as f32);
                controller.pointer_move(self.last_cursor.0, self.last_cursor.1);
            }
            WindowEvent::CursorLeft { .. } => controller.pointer_leave(),
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } => match button_state {
                ElementState::Pressed => {
                    controller.pointer_down(self.last_cursor.0, self.last_cursor.1)
                }
                ElementState::Released => {
                    controller.pointer_up(self.last_cursor.0, self.last_cursor.1)
                }
            },
            WindowEvent::MouseWheel { delta, .. } => {
                // Scrolling up (positive winit delta) zooms in.
                let dy = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y,
                    MouseScrollDelta::PixelDelta(p) => -p.y as f32,
                };
                controller.wheel(dy, self.last_cursor.0);
            }
            WindowEvent::Touch(Touch {
                id,
                location,
                phase,
                ..
            }) => {
                let (x, y) = (location.x as f32, location.y as f32);
                match phase {
                    TouchPhase::Started => controller.touch_start(id, x, y),
                    TouchPhase::Moved => controller.touch_move(id, x, y),
                    TouchPhase::Ended | TouchPhase::Cancelled => controller.touch_end(id),
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(controller) = self.controller.as_mut() {
            controller.pump_render_events();
            controller.pump_feed();
            controller.pump_lod_results();
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Deterministic synthetic OHLCV series for the demo binary.
fn demo_series(count: usize, timeframe_ms: u64) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(count);
    let mut price = 30_000.0f32;
    let mut seed = 0x2545_f491u32;

    for i in 0..count {
        // xorshift noise on top of a slow sine drift
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        let noise = (seed as f32 / u32::MAX as f32) - 0.5;
        let drift = ((i as f32) * 0.013).sin() * 12.0;

        let open = price;
        let close = (open + drift * 0.3 + noise * 80.0).max(1.0);
        let high = open.max(close) + noise.abs() * 40.0;
        let low = (open.min(close) - noise.abs() * 40.0).max(0.5);
        let volume = 1.0 + noise.abs() * 50.0;

        bars.push(Bar::new(
            (i as u64 * timeframe_ms) as f32,
            open,
            high,
            low,
            close,
            volume,
        ));
        price = close;
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitchart_core::validate_bar;

    #[test]
    fn test_demo_series_is_valid() {
        let bars = demo_series(1_000, 60_000);
        assert_eq!(bars.len(), 1_000);
        assert!(bars.iter().all(validate_bar));
        assert!(bars.windows(2).all(|w| w[0].time < w[1].time));
    }
}
