//! Validation utilities for incoming market data.

use crate::bar::Bar;
use crate::tick::Tick;

/// Validate a bar against the store invariants:
/// `low <= min(open, close) <= max(open, close) <= high`, non-negative
/// volume, non-negative timestamp, all fields finite.
pub fn validate_bar(bar: &Bar) -> bool {
    bar.time.is_finite()
        && bar.time >= 0.0
        && bar.open.is_finite()
        && bar.high.is_finite()
        && bar.low.is_finite()
        && bar.close.is_finite()
        && bar.volume.is_finite()
        && bar.low <= bar.body_bottom()
        && bar.body_top() <= bar.high
        && bar.volume >= 0.0
}

/// Validate a tick has reasonable values.
pub fn validate_tick(tick: &Tick) -> bool {
    tick.time.is_finite()
        && tick.time >= 0.0
        && tick.price.is_finite()
        && tick.price > 0.0
        && tick.volume.map_or(true, |v| v.is_finite() && v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_bar_valid() {
        let bar = Bar::new(1000.0, 100.0, 105.0, 95.0, 102.0, 10.0);
        assert!(validate_bar(&bar));
    }

    #[test]
    fn test_validate_bar_high_below_body() {
        let bar = Bar::new(1000.0, 100.0, 101.0, 95.0, 102.0, 10.0);
        assert!(!validate_bar(&bar));
    }

    #[test]
    fn test_validate_bar_low_above_body() {
        let bar = Bar::new(1000.0, 100.0, 105.0, 101.0, 102.0, 10.0);
        assert!(!validate_bar(&bar));
    }

    #[test]
    fn test_validate_bar_negative_volume() {
        let bar = Bar::new(1000.0, 100.0, 105.0, 95.0, 102.0, -1.0);
        assert!(!validate_bar(&bar));
    }

    #[test]
    fn test_validate_bar_nan() {
        let bar = Bar::new(1000.0, f32::NAN, 105.0, 95.0, 102.0, 10.0);
        assert!(!validate_bar(&bar));
    }

    #[test]
    fn test_validate_tick() {
        assert!(validate_tick(&Tick::new(1000.0, 42.0)));
        assert!(!validate_tick(&Tick::new(1000.0, 0.0)));
        assert!(!validate_tick(&Tick::new(1000.0, f32::NAN)));
        assert!(!validate_tick(&Tick::new(-1.0, 42.0)));
        assert!(!validate_tick(&Tick::new(1000.0, 42.0).with_volume(-2.0)));
    }
}
