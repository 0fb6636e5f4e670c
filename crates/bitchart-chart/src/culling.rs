//! Frustum culling: narrowing the payload to the bars the viewport can see.

use bitchart_core::TimeRange;
use bitchart_scale::{lower_bound, upper_bound};

/// Culling parameters.
#[derive(Debug, Clone)]
pub struct CullConfig {
    /// Extra bars kept on each side of the visible window.
    pub padding_bars: usize,
    /// Lower bound on the culled count (when that many bars exist).
    pub min_count: usize,
    /// Upper bound on the culled count; over-full ranges are center-trimmed.
    pub max_count: usize,
    /// Relative zoom/pan change that forces a re-cull.
    pub update_threshold: f64,
}

impl Default for CullConfig {
    fn default() -> Self {
        Self {
            padding_bars: 8,
            min_count: 2,
            max_count: 200_000,
            update_threshold: 0.10,
        }
    }
}

/// A logical-index window into the bar sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRange {
    pub start: usize,
    pub count: usize,
}

impl VisibleRange {
    pub fn end(&self) -> usize {
        self.start + self.count
    }
}

/// Narrows a sorted bar sequence to the visible time window.
#[derive(Debug, Default)]
pub struct FrustumCuller {
    config: CullConfig,
    last_range: Option<TimeRange>,
}

impl FrustumCuller {
    pub fn new(config: CullConfig) -> Self {
        Self {
            config,
            last_range: None,
        }
    }

    /// Bars whose time lies inside `range`, expanded by the padding and
    /// clamped into `[min_count, max_count]` (center-trimmed when over).
    pub fn cull(&self, times: &[f32], range: TimeRange) -> VisibleRange {
        if times.is_empty() {
            return VisibleRange { start: 0, count: 0 };
        }

        let mut start = lower_bound(times, range.from as f32);
        let mut end = upper_bound(times, range.to as f32);

        start = start.saturating_sub(self.config.padding_bars);
        end = (end + self.config.padding_bars).min(times.len());

        // Enforce the minimum by widening toward both sides.
        let min = self.config.min_count.min(times.len());
        while end - start < min {
            if start > 0 {
                start -= 1;
            } else if end < times.len() {
                end += 1;
            } else {
                break;
            }
        }

        // Center-trim over-full ranges.
        if end - start > self.config.max_count {
            let excess = end - start - self.config.max_count;
            start += excess / 2;
            end = start + self.config.max_count;
        }

        VisibleRange {
            start,
            count: end - start,
        }
    }

    /// Whether the view moved enough since the last acknowledged range to
    /// require a re-cull: zoom or pan changed by more than the threshold.
    /// Acknowledges `range` when it answers `true`.
    pub fn needs_update(&mut self, range: TimeRange) -> bool {
        let Some(last) = self.last_range else {
            self.last_range = Some(range);
            return true;
        };

        let last_span = last.span().max(f64::EPSILON);
        let zoom_change = (range.span() - last.span()).abs() / last_span;
        let pan_change = (range.from - last.from).abs() / last_span;

        if zoom_change > self.config.update_threshold || pan_change > self.config.update_threshold
        {
            self.last_range = Some(range);
            true
        } else {
            false
        }
    }

    /// Forget the acknowledged range (forces the next `needs_update`).
    pub fn invalidate(&mut self) {
        self.last_range = None;
    }

    pub fn config(&self) -> &CullConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32 * 1000.0).collect()
    }

    fn culler(padding: usize, min: usize, max: usize) -> FrustumCuller {
        FrustumCuller::new(CullConfig {
            padding_bars: padding,
            min_count: min,
            max_count: max,
            update_threshold: 0.10,
        })
    }

    #[test]
    fn test_cull_narrows_with_padding() {
        let times = times(100);
        let culler = culler(2, 2, 1000);
        let range = culler.cull(&times, TimeRange::new(25_000.0, 74_000.0));
        // lower_bound(25000) = 25, upper_bound(74000) = 75; padded by 2.
        assert_eq!(range.start, 23);
        assert_eq!(range.end(), 77);
    }

    #[test]
    fn test_cull_output_is_contiguous_window() {
        let times = times(1000);
        let culler = culler(4, 2, 10_000);
        let range = culler.cull(&times, TimeRange::new(100_000.0, 200_000.0));
        for i in range.start..range.end() {
            // Every bar inside the window (beyond the padding) is visible.
            if i >= range.start + 4 && i + 4 < range.end() {
                assert!(times[i] >= 100_000.0 && times[i] <= 200_000.0);
            }
        }
    }

    #[test]
    fn test_cull_clamps_to_bounds() {
        let times = times(10);
        let culler = culler(5, 2, 1000);
        let range = culler.cull(&times, TimeRange::new(-50_000.0, 50_000.0));
        assert_eq!(range.start, 0);
        assert!(range.end() <= 10);
    }

    #[test]
    fn test_cull_center_trims_overfull() {
        let times = times(1000);
        let culler = culler(0, 2, 100);
        let range = culler.cull(&times, TimeRange::new(0.0, 999_000.0));
        assert_eq!(range.count, 100);
        // Trimmed from both sides.
        assert_eq!(range.start, 450);
    }

    #[test]
    fn test_cull_enforces_minimum() {
        let times = times(100);
        let culler = culler(0, 10, 1000);
        // Window between two bars.
        let range = culler.cull(&times, TimeRange::new(50_100.0, 50_200.0));
        assert!(range.count >= 10);
    }

    #[test]
    fn test_cull_empty_window_outside_data() {
        let times = times(100);
        let culler = culler(0, 0, 1000);
        let range = culler.cull(&times, TimeRange::new(500_000.0, 600_000.0));
        assert_eq!(range.count, 0);
    }

    #[test]
    fn test_needs_update_thresholds() {
        let mut culler = culler(0, 2, 1000);
        // First call always updates.
        assert!(culler.needs_update(TimeRange::new(0.0, 1000.0)));
        // 5% pan: below threshold.
        assert!(!culler.needs_update(TimeRange::new(50.0, 1050.0)));
        // 15% pan: above threshold.
        assert!(culler.needs_update(TimeRange::new(150.0, 1150.0)));
        // 15% zoom change from the acknowledged range.
        assert!(culler.needs_update(TimeRange::new(150.0, 1300.0)));
        // Small wiggle after acknowledgment.
        assert!(!culler.needs_update(TimeRange::new(160.0, 1310.0)));
    }

    #[test]
    fn test_invalidate_forces_update() {
        let mut culler = culler(0, 2, 1000);
        assert!(culler.needs_update(TimeRange::new(0.0, 1000.0)));
        assert!(!culler.needs_update(TimeRange::new(0.0, 1000.0)));
        culler.invalidate();
        assert!(culler.needs_update(TimeRange::new(0.0, 1000.0)));
    }
}
