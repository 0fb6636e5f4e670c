//! Vertical (price) scale.

use bitchart_core::ValueRange;

use crate::ticks::{nice_price_step, tick_positions};

/// Smallest representable positive price under log scale.
const LOG_FLOOR: f64 = 1e-9;

/// Maps prices to normalized and pixel coordinates.
///
/// The axis is inverted: pixel 0 is the top of the chart, which corresponds
/// to the maximum visible price. With log scale active the visible range is
/// clamped positive and all transforms run in log10 space. The minimum
/// visible span is 0.1 % of the data span.
#[derive(Debug, Clone)]
pub struct PriceScale {
    data_min: f64,
    data_max: f64,
    visible: (f64, f64),
    pixel_height: f32,
    log_scale: bool,
}

impl PriceScale {
    pub fn new(pixel_height: f32) -> Self {
        Self {
            data_min: 0.0,
            data_max: 1.0,
            visible: (0.0, 1.0),
            pixel_height: pixel_height.max(1.0),
            log_scale: false,
        }
    }

    pub fn set_data_range(&mut self, min: f64, max: f64) {
        self.data_min = min;
        self.data_max = max.max(min);
        self.clamp_visible();
    }

    pub fn set_pixel_height(&mut self, height: f32) {
        self.pixel_height = height.max(1.0);
    }

    pub fn set_log_scale(&mut self, enabled: bool) {
        self.log_scale = enabled;
        self.clamp_visible();
    }

    pub fn is_log_scale(&self) -> bool {
        self.log_scale
    }

    pub fn visible_range(&self) -> ValueRange {
        ValueRange::new(self.visible.0 as f32, self.visible.1 as f32)
    }

    pub fn pixel_height(&self) -> f32 {
        self.pixel_height
    }

    fn transform(&self, p: f64) -> f64 {
        if self.log_scale {
            p.max(LOG_FLOOR).log10()
        } else {
            p
        }
    }

    fn untransform(&self, v: f64) -> f64 {
        if self.log_scale {
            10f64.powf(v)
        } else {
            v
        }
    }

    /// Normalized position of a price: 0 at the bottom of the visible range,
    /// 1 at the top.
    pub fn data_to_normalized(&self, price: f64) -> f64 {
        let lo = self.transform(self.visible.0);
        let hi = self.transform(self.visible.1);
        (self.transform(price) - lo) / (hi - lo)
    }

    pub fn normalized_to_data(&self, n: f64) -> f64 {
        let lo = self.transform(self.visible.0);
        let hi = self.transform(self.visible.1);
        self.untransform(lo + n * (hi - lo))
    }

    /// Pixel position of a price. Pixel 0 is the top (maximum price).
    pub fn data_to_pixel(&self, price: f64) -> f32 {
        ((1.0 - self.data_to_normalized(price)) * self.pixel_height as f64) as f32
    }

    pub fn pixel_to_data(&self, px: f32) -> f64 {
        self.normalized_to_data(1.0 - px as f64 / self.pixel_height as f64)
    }

    /// Zoom about `center` (defaults to the midpoint). A factor below one
    /// zooms in. The zoom runs in transform space so log mode zooms evenly.
    pub fn zoom(&mut self, factor: f64, center: Option<f64>) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let lo = self.transform(self.visible.0);
        let hi = self.transform(self.visible.1);
        let c = center.map(|p| self.transform(p)).unwrap_or((lo + hi) / 2.0);
        let new_lo = c - (c - lo) * factor;
        let new_hi = c + (hi - c) * factor;
        self.visible = (self.untransform(new_lo), self.untransform(new_hi));
        self.clamp_visible();
    }

    /// Shift the visible range by a price delta.
    pub fn pan(&mut self, delta: f64) {
        self.visible.0 += delta;
        self.visible.1 += delta;
        self.clamp_visible();
    }

    /// Shift by a pixel delta: dragging down (positive delta) raises the
    /// visible range, matching the inverted axis.
    pub fn pan_by_pixels(&mut self, delta_px: f32) {
        let span = self.visible.1 - self.visible.0;
        self.pan(delta_px as f64 * span / self.pixel_height as f64);
    }

    /// Show the full data range with 5 % headroom on both sides.
    pub fn fit_content(&mut self) {
        let span = (self.data_max - self.data_min).max(f64::EPSILON);
        self.visible = (
            self.data_min - span * 0.05,
            self.data_max + span * 0.05,
        );
        self.clamp_visible();
    }

    /// Grid tick positions (1-2-5 steps) for the current window.
    pub fn grid_ticks(&self, target_count: usize) -> Vec<f64> {
        let step = nice_price_step(self.visible.1 - self.visible.0, target_count);
        tick_positions(self.visible.0, self.visible.1, step)
    }

    fn min_span(&self) -> f64 {
        (0.001 * (self.data_max - self.data_min)).max(f64::EPSILON)
    }

    fn clamp_visible(&mut self) {
        if self.log_scale {
            self.visible.0 = self.visible.0.max(LOG_FLOOR);
            self.visible.1 = self.visible.1.max(self.visible.0 * (1.0 + 1e-6));
        }
        let min_span = self.min_span();
        if self.visible.1 - self.visible.0 < min_span {
            let center = (self.visible.0 + self.visible.1) / 2.0;
            self.visible = (center - min_span / 2.0, center + min_span / 2.0);
            if self.log_scale {
                self.visible.0 = self.visible.0.max(LOG_FLOOR);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale_100_200() -> PriceScale {
        let mut scale = PriceScale::new(800.0);
        scale.set_data_range(100.0, 200.0);
        scale.fit_content();
        scale
    }

    #[test]
    fn test_axis_is_inverted() {
        let scale = scale_100_200();
        let v = scale.visible_range();
        // Top pixel maps to the maximum price.
        assert!((scale.data_to_pixel(v.max as f64) - 0.0).abs() < 0.5);
        assert!((scale.data_to_pixel(v.min as f64) - 800.0).abs() < 0.5);
        assert!(scale.pixel_to_data(0.0) > scale.pixel_to_data(800.0));
    }

    #[test]
    fn test_pixel_roundtrip_linear() {
        let scale = scale_100_200();
        for p in [100.0, 123.4, 150.0, 199.0] {
            let back = scale.pixel_to_data(scale.data_to_pixel(p));
            assert!((back - p).abs() < 0.05);
        }
    }

    #[test]
    fn test_pixel_roundtrip_log() {
        let mut scale = scale_100_200();
        scale.set_log_scale(true);
        for p in [100.0, 123.4, 150.0, 199.0] {
            let back = scale.pixel_to_data(scale.data_to_pixel(p));
            assert!((back - p).abs() < 0.1);
        }
    }

    #[test]
    fn test_zoom_is_reversible() {
        let mut scale = scale_100_200();
        scale.zoom(0.6, Some(150.0));
        let zoomed = scale.visible_range();
        scale.zoom(0.8, Some(120.0));
        scale.zoom(1.0 / 0.8, Some(120.0));
        let back = scale.visible_range();
        assert!((back.min - zoomed.min).abs() < 1e-3);
        assert!((back.max - zoomed.max).abs() < 1e-3);
    }

    #[test]
    fn test_min_span_is_tenth_of_percent() {
        let mut scale = scale_100_200();
        for _ in 0..80 {
            scale.zoom(0.5, Some(150.0));
        }
        let span = scale.visible.1 - scale.visible.0;
        assert!(span >= 0.001 * 100.0 - 1e-9);
    }

    #[test]
    fn test_log_scale_stays_positive() {
        let mut scale = PriceScale::new(800.0);
        scale.set_data_range(0.5, 100.0);
        scale.fit_content();
        scale.set_log_scale(true);
        scale.pan(-1000.0);
        assert!(scale.visible.0 > 0.0);
        assert!(scale.visible.1 > scale.visible.0);
    }

    #[test]
    fn test_pan_by_pixels_direction() {
        let mut scale = scale_100_200();
        let before = scale.visible_range();
        scale.pan_by_pixels(80.0);
        let after = scale.visible_range();
        assert!(after.min > before.min);
        assert!((after.span() - before.span()).abs() < 1e-3);
    }

    #[test]
    fn test_grid_ticks_are_nice() {
        let scale = scale_100_200();
        let ticks = scale.grid_ticks(8);
        assert!(!ticks.is_empty());
        assert!(ticks.len() <= 9);
        // 1-2-5 step over a ~110 span at 8 ticks -> step 20.
        for w in ticks.windows(2) {
            assert!((w[1] - w[0] - 20.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fit_content_covers_data() {
        let scale = scale_100_200();
        let v = scale.visible_range();
        assert!(v.min <= 100.0);
        assert!(v.max >= 200.0);
    }
}
