//! Pointer, wheel and touch interpretation.
//!
//! Raw input is folded into semantic [`Gesture`]s; the controller applies
//! them to the scales. Interpretation is stateful (drag tracking, double
//! click timing, pinch distance) but has no access to the scales itself.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Two pointer-downs within this window make a double click.
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(350);
/// Pointer travel below this (squared pixels) still counts as a click.
const CLICK_SLOP_SQ: f32 = 25.0;

/// Semantic gestures produced from raw input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    PanStart,
    /// Pointer drag delta in pixels.
    PanBy { dx: f32, dy: f32 },
    PanEnd,
    /// A press-release without significant travel.
    Click { x: f32, y: f32 },
    /// Two pointer-downs in quick succession.
    DoubleClick,
    /// The pointer moved without a button held.
    CrosshairMoved { x: f32, y: f32 },
    /// The pointer left the content area.
    CrosshairCleared,
    /// Zoom about a content x position. Factor below one zooms in.
    Zoom { factor: f64, center_x: f32 },
}

/// Stateful input interpreter.
#[derive(Debug, Default)]
pub struct Interaction {
    panning: bool,
    last_pos: Option<(f32, f32)>,
    press_pos: Option<(f32, f32)>,
    last_press: Option<Instant>,
    touches: HashMap<u64, (f32, f32)>,
    pinch_distance: Option<f32>,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_panning(&self) -> bool {
        self.panning
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, now: Instant) -> Vec<Gesture> {
        let mut gestures = Vec::new();
        if let Some(last) = self.last_press {
            if now.duration_since(last) <= DOUBLE_CLICK_WINDOW {
                gestures.push(Gesture::DoubleClick);
                self.last_press = None;
                return gestures;
            }
        }
        self.last_press = Some(now);
        self.panning = true;
        self.last_pos = Some((x, y));
        self.press_pos = Some((x, y));
        gestures.push(Gesture::PanStart);
        gestures
    }

    pub fn pointer_up(&mut self, x: f32, y: f32) -> Vec<Gesture> {
        let mut gestures = Vec::new();
        if self.panning {
            self.panning = false;
            gestures.push(Gesture::PanEnd);
            if let Some((px, py)) = self.press_pos.take() {
                let travel = (x - px) * (x - px) + (y - py) * (y - py);
                if travel <= CLICK_SLOP_SQ {
                    gestures.push(Gesture::Click { x, y });
                }
            }
        }
        gestures
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) -> Vec<Gesture> {
        if self.panning {
            let (lx, ly) = self.last_pos.unwrap_or((x, y));
            self.last_pos = Some((x, y));
            vec![Gesture::PanBy {
                dx: x - lx,
                dy: y - ly,
            }]
        } else {
            vec![Gesture::CrosshairMoved { x, y }]
        }
    }

    pub fn pointer_leave(&mut self) -> Vec<Gesture> {
        self.panning = false;
        self.last_pos = None;
        vec![Gesture::CrosshairCleared]
    }

    /// Wheel zoom: scrolling down zooms out (factor 1.1), up zooms in (0.9).
    pub fn wheel(&mut self, delta_y: f32, x: f32) -> Vec<Gesture> {
        let factor = if delta_y > 0.0 { 1.1 } else { 0.9 };
        vec![Gesture::Zoom {
            factor,
            center_x: x,
        }]
    }

    pub fn touch_start(&mut self, id: u64, x: f32, y: f32) -> Vec<Gesture> {
        self.touches.insert(id, (x, y));
        if self.touches.len() == 2 {
            self.pinch_distance = self.current_touch_distance();
            // Entering a pinch cancels any single-finger pan.
            self.panning = false;
            vec![]
        } else if self.touches.len() == 1 {
            self.panning = true;
            self.last_pos = Some((x, y));
            vec![Gesture::PanStart]
        } else {
            vec![]
        }
    }

    pub fn touch_move(&mut self, id: u64, x: f32, y: f32) -> Vec<Gesture> {
        self.touches.insert(id, (x, y));
        if self.touches.len() == 2 {
            let Some(new_distance) = self.current_touch_distance() else {
                return vec![];
            };
            let Some(old_distance) = self.pinch_distance else {
                self.pinch_distance = Some(new_distance);
                return vec![];
            };
            if new_distance < 1.0 {
                return vec![];
            }
            self.pinch_distance = Some(new_distance);
            // Spreading fingers (ratio < 1) zooms in.
            let factor = f64::from(old_distance / new_distance);
            let center_x = self
                .touches
                .values()
                .map(|(tx, _)| tx)
                .sum::<f32>()
                / self.touches.len() as f32;
            vec![Gesture::Zoom { factor, center_x }]
        } else if self.panning {
            self.pointer_move(x, y)
        } else {
            vec![]
        }
    }

    pub fn touch_end(&mut self, id: u64) -> Vec<Gesture> {
        self.touches.remove(&id);
        if self.touches.len() < 2 {
            self.pinch_distance = None;
        }
        if self.touches.is_empty() && self.panning {
            self.panning = false;
            return vec![Gesture::PanEnd];
        }
        vec![]
    }

    fn current_touch_distance(&self) -> Option<f32> {
        if self.touches.len() != 2 {
            return None;
        }
        let mut points = self.touches.values();
        let (ax, ay) = *points.next()?;
        let (bx, by) = *points.next()?;
        Some(((ax - bx) * (ax - bx) + (ay - by) * (ay - by)).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pan_sequence() {
        let mut input = Interaction::new();
        let t0 = Instant::now();

        assert_eq!(input.pointer_down(100.0, 100.0, t0), vec![Gesture::PanStart]);
        assert!(input.is_panning());
        assert_eq!(
            input.pointer_move(110.0, 95.0),
            vec![Gesture::PanBy { dx: 10.0, dy: -5.0 }]
        );
        assert_eq!(
            input.pointer_move(105.0, 100.0),
            vec![Gesture::PanBy { dx: -5.0, dy: 5.0 }]
        );
        let up = input.pointer_up(105.0, 100.0);
        assert_eq!(up[0], Gesture::PanEnd);
        assert!(!input.is_panning());
    }

    #[test]
    fn test_click_requires_small_travel() {
        let mut input = Interaction::new();
        let t0 = Instant::now();

        input.pointer_down(100.0, 100.0, t0);
        let up = input.pointer_up(102.0, 101.0);
        assert!(up.contains(&Gesture::Click { x: 102.0, y: 101.0 }));

        // A long drag is not a click.
        input.pointer_down(100.0, 100.0, t0 + Duration::from_secs(1));
        input.pointer_move(200.0, 100.0);
        let up = input.pointer_up(200.0, 100.0);
        assert!(!up.iter().any(|g| matches!(g, Gesture::Click { .. })));
    }

    #[test]
    fn test_double_click_timing() {
        let mut input = Interaction::new();
        let t0 = Instant::now();

        input.pointer_down(100.0, 100.0, t0);
        input.pointer_up(100.0, 100.0);
        let second = input.pointer_down(100.0, 100.0, t0 + Duration::from_millis(200));
        assert_eq!(second, vec![Gesture::DoubleClick]);

        // Too slow: a fresh pan instead.
        input.pointer_up(100.0, 100.0);
        let third = input.pointer_down(100.0, 100.0, t0 + Duration::from_secs(2));
        assert_eq!(third, vec![Gesture::PanStart]);
    }

    #[test]
    fn test_crosshair_when_not_panning() {
        let mut input = Interaction::new();
        assert_eq!(
            input.pointer_move(40.0, 50.0),
            vec![Gesture::CrosshairMoved { x: 40.0, y: 50.0 }]
        );
        assert_eq!(input.pointer_leave(), vec![Gesture::CrosshairCleared]);
    }

    #[test]
    fn test_wheel_factors() {
        let mut input = Interaction::new();
        assert_eq!(
            input.wheel(3.0, 200.0),
            vec![Gesture::Zoom {
                factor: 1.1,
                center_x: 200.0
            }]
        );
        assert_eq!(
            input.wheel(-3.0, 200.0),
            vec![Gesture::Zoom {
                factor: 0.9,
                center_x: 200.0
            }]
        );
    }

    #[test]
    fn test_pinch_ratio_zooms() {
        let mut input = Interaction::new();
        input.touch_start(1, 100.0, 100.0);
        input.touch_start(2, 200.0, 100.0);

        // Fingers spread from 100 px apart to 200 px: factor 0.5 (zoom in).
        let gestures = input.touch_move(2, 300.0, 100.0);
        assert_eq!(gestures.len(), 1);
        match gestures[0] {
            Gesture::Zoom { factor, .. } => assert!((factor - 0.5).abs() < 1e-6),
            other => panic!("expected zoom, got {other:?}"),
        }

        input.touch_end(1);
        input.touch_end(2);
        assert!(!input.is_panning());
    }
}
