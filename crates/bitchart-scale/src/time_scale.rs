//! Horizontal (time) scale.

use bitchart_core::TimeRange;

use crate::ticks::{tick_positions, time_step_for_span};

const MINUTE_MS: f64 = 60_000.0;

/// Maps bar timestamps to normalized and pixel coordinates.
///
/// The visible range is kept inside
/// `[data_min, data_max + right_padding * data_span]` and never shrinks
/// below the minimum span (1 % of the data span, or one minute, whichever is
/// larger). Panning past a bound is absorbed: the window shifts only as far
/// as the bound allows, so the opposite edge moves by the same amount.
#[derive(Debug, Clone)]
pub struct TimeScale {
    data_min: f64,
    data_max: f64,
    visible: TimeRange,
    pixel_width: f32,
    right_padding: f64,
}

impl TimeScale {
    pub fn new(pixel_width: f32) -> Self {
        Self {
            data_min: 0.0,
            data_max: MINUTE_MS,
            visible: TimeRange::new(0.0, MINUTE_MS),
            pixel_width: pixel_width.max(1.0),
            right_padding: 0.05,
        }
    }

    pub fn with_right_padding(mut self, fraction: f64) -> Self {
        self.right_padding = fraction.max(0.0);
        self
    }

    /// Update the full data extent. The visible range is re-clamped against
    /// the new bounds. A degenerate extent (a single bar) still yields a
    /// usable one-minute window.
    pub fn set_data_range(&mut self, min: f64, max: f64) {
        self.data_min = min;
        self.data_max = if max > min { max } else { min + MINUTE_MS };
        self.clamp_visible();
    }

    pub fn set_pixel_width(&mut self, width: f32) {
        self.pixel_width = width.max(1.0);
    }

    pub fn data_range(&self) -> (f64, f64) {
        (self.data_min, self.data_max)
    }

    pub fn visible_range(&self) -> TimeRange {
        self.visible
    }

    pub fn pixel_width(&self) -> f32 {
        self.pixel_width
    }

    /// Milliseconds visible per pixel.
    pub fn ms_per_pixel(&self) -> f64 {
        self.visible.span() / self.pixel_width as f64
    }

    pub fn data_to_normalized(&self, t: f64) -> f64 {
        (t - self.visible.from) / self.visible.span()
    }

    pub fn normalized_to_data(&self, n: f64) -> f64 {
        self.visible.from + n * self.visible.span()
    }

    pub fn data_to_pixel(&self, t: f64) -> f32 {
        (self.data_to_normalized(t) * self.pixel_width as f64) as f32
    }

    pub fn pixel_to_data(&self, px: f32) -> f64 {
        self.normalized_to_data(px as f64 / self.pixel_width as f64)
    }

    /// Zoom about `center` (defaults to the window midpoint). A factor below
    /// one zooms in.
    pub fn zoom(&mut self, factor: f64, center: Option<f64>) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let c = center.unwrap_or_else(|| (self.visible.from + self.visible.to) / 2.0);
        self.visible.from = c - (c - self.visible.from) * factor;
        self.visible.to = c + (self.visible.to - c) * factor;
        self.clamp_visible();
    }

    /// Shift the visible window by a time delta, absorbing at the bounds.
    pub fn pan(&mut self, delta: f64) {
        let (lo, hi) = self.bounds();
        let delta = delta
            .max(lo - self.visible.from)
            .min(hi - self.visible.to);
        self.visible.from += delta;
        self.visible.to += delta;
    }

    /// Shift by a pixel delta (positive moves the window toward later data).
    pub fn pan_by_pixels(&mut self, delta_px: f32) {
        self.pan(delta_px as f64 * self.ms_per_pixel());
    }

    /// Show the whole data extent plus the right padding.
    pub fn fit_content(&mut self) {
        let (lo, hi) = self.bounds();
        self.visible = TimeRange::new(lo, hi);
        self.clamp_visible();
    }

    /// Grid tick positions for the current window.
    pub fn grid_ticks(&self, target_count: usize) -> Vec<f64> {
        let step = time_step_for_span(self.visible.span(), target_count);
        tick_positions(self.visible.from, self.visible.to, step)
    }

    fn data_span(&self) -> f64 {
        self.data_max - self.data_min
    }

    /// Valid window bounds: `[data_min, data_max + right_padding * span]`.
    fn bounds(&self) -> (f64, f64) {
        (
            self.data_min,
            self.data_max + self.right_padding * self.data_span(),
        )
    }

    fn min_span(&self) -> f64 {
        let (lo, hi) = self.bounds();
        (0.01 * self.data_span()).max(MINUTE_MS).min(hi - lo).max(1.0)
    }

    fn clamp_visible(&mut self) {
        let (lo, hi) = self.bounds();

        // Enforce the minimum span around the window center first.
        let min_span = self.min_span();
        if self.visible.span() < min_span {
            let center = (self.visible.from + self.visible.to) / 2.0;
            self.visible.from = center - min_span / 2.0;
            self.visible.to = center + min_span / 2.0;
        }
        // A window wider than the bounds collapses to them.
        if self.visible.span() > hi - lo {
            self.visible = TimeRange::new(lo, hi);
            return;
        }
        // Slide back inside the bounds without changing the span.
        if self.visible.from < lo {
            let shift = lo - self.visible.from;
            self.visible.from += shift;
            self.visible.to += shift;
        }
        if self.visible.to > hi {
            let shift = self.visible.to - hi;
            self.visible.from -= shift;
            self.visible.to -= shift;
        }
    }
}

/// Index of the first element `>= t` in a sorted timestamp slice.
pub fn lower_bound(times: &[f32], t: f32) -> usize {
    times.partition_point(|&x| x < t)
}

/// Index of the first element `> t` in a sorted timestamp slice.
pub fn upper_bound(times: &[f32], t: f32) -> usize {
    times.partition_point(|&x| x <= t)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: f64 = 3_600_000.0;

    /// A scale over one day of data, fully zoomed out.
    fn day_scale() -> TimeScale {
        let mut scale = TimeScale::new(1000.0);
        scale.set_data_range(0.0, 24.0 * HOUR_MS);
        scale.fit_content();
        scale
    }

    #[test]
    fn test_pixel_roundtrip() {
        let scale = day_scale();
        for t in [0.0, HOUR_MS, 12.0 * HOUR_MS, 23.0 * HOUR_MS] {
            let back = scale.pixel_to_data(scale.data_to_pixel(t));
            assert!((back - t).abs() < scale.ms_per_pixel());
        }
    }

    #[test]
    fn test_normalized_roundtrip() {
        let scale = day_scale();
        for t in [0.0, 5.0 * HOUR_MS, 20.0 * HOUR_MS] {
            let back = scale.normalized_to_data(scale.data_to_normalized(t));
            assert!((back - t).abs() < 1e-6 * scale.visible_range().span());
        }
    }

    #[test]
    fn test_zoom_is_reversible() {
        let mut scale = day_scale();
        scale.zoom(0.5, Some(6.0 * HOUR_MS));
        let zoomed = scale.visible_range();
        scale.zoom(0.8, Some(4.0 * HOUR_MS));
        scale.zoom(1.0 / 0.8, Some(4.0 * HOUR_MS));
        let back = scale.visible_range();
        assert!((back.from - zoomed.from).abs() < 1.0);
        assert!((back.to - zoomed.to).abs() < 1.0);
    }

    #[test]
    fn test_zoom_in_keeps_center_fixed() {
        let mut scale = day_scale();
        let c = 12.0 * HOUR_MS;
        let before = scale.data_to_normalized(c);
        let span_before = scale.visible_range().span();
        scale.zoom(0.5, Some(c));
        // The zoom center stays put on screen; the span halves.
        assert!((scale.data_to_normalized(c) - before).abs() < 1e-9);
        assert!((scale.visible_range().span() - span_before * 0.5).abs() < 1.0);
    }

    #[test]
    fn test_pan_absorbed_at_right_edge() {
        // Data [0, 1000] with 5% right padding; window already at the right
        // bound [900, 1050]. A +200ms pan must be fully absorbed.
        let mut scale = TimeScale::new(100.0);
        scale.set_data_range(0.0, 1000.0);
        scale.visible = TimeRange::new(900.0, 1050.0);

        scale.pan(200.0);
        let v = scale.visible_range();
        assert_eq!(v.from, 900.0);
        assert_eq!(v.to, 1050.0);
    }

    #[test]
    fn test_pan_partially_absorbed() {
        let mut scale = TimeScale::new(100.0);
        scale.set_data_range(0.0, 1000.0);
        scale.visible = TimeRange::new(800.0, 1000.0);

        // Only 50ms of headroom before the padded bound at 1050.
        scale.pan(200.0);
        let v = scale.visible_range();
        assert_eq!(v.from, 850.0);
        assert_eq!(v.to, 1050.0);
    }

    #[test]
    fn test_pan_absorbed_at_left_edge() {
        let mut scale = day_scale();
        scale.zoom(0.25, Some(2.0 * HOUR_MS));
        scale.pan(-48.0 * HOUR_MS);
        assert_eq!(scale.visible_range().from, 0.0);
    }

    #[test]
    fn test_zoom_out_clamps_to_padded_bounds() {
        let mut scale = day_scale();
        scale.zoom(100.0, None);
        let v = scale.visible_range();
        assert_eq!(v.from, 0.0);
        assert!((v.to - 24.0 * HOUR_MS * 1.05).abs() < 1.0);
    }

    #[test]
    fn test_min_span_enforced() {
        let mut scale = day_scale();
        for _ in 0..60 {
            scale.zoom(0.5, Some(12.0 * HOUR_MS));
        }
        // 1% of 24h = 14.4 min, larger than the one-minute floor.
        let min_span = 0.01 * 24.0 * HOUR_MS;
        assert!(scale.visible_range().span() >= min_span - 1.0);
    }

    #[test]
    fn test_min_span_floor_is_one_minute() {
        let mut scale = TimeScale::new(1000.0);
        // Tiny data set: 1% of span is far below a minute.
        scale.set_data_range(0.0, 120_000.0);
        scale.fit_content();
        for _ in 0..40 {
            scale.zoom(0.5, None);
        }
        assert!(scale.visible_range().span() >= 60_000.0 - 1.0);
    }

    #[test]
    fn test_pan_by_pixels_direction() {
        let mut scale = day_scale();
        scale.zoom(0.5, None);
        let before = scale.visible_range();
        scale.pan_by_pixels(100.0);
        let after = scale.visible_range();
        assert!(after.from > before.from);
        assert!((after.span() - before.span()).abs() < 1e-6);
    }

    #[test]
    fn test_grid_ticks_inside_window() {
        let scale = day_scale();
        let ticks = scale.grid_ticks(10);
        assert!(!ticks.is_empty());
        assert!(ticks.len() <= 11);
        let v = scale.visible_range();
        assert!(ticks.iter().all(|&t| t >= v.from && t <= v.to));
    }

    #[test]
    fn test_bounds_search() {
        let times = [1.0, 2.0, 4.0, 4.0, 7.0];
        assert_eq!(lower_bound(&times, 4.0), 2);
        assert_eq!(upper_bound(&times, 4.0), 4);
        assert_eq!(lower_bound(&times, 0.0), 0);
        assert_eq!(upper_bound(&times, 9.0), 5);
    }
}
