//! Viewport types describing the visible data window.

/// A half-open time window in milliseconds since the data epoch.
///
/// Stored as f64 so that pixel math stays exact for large epochs; the bar
/// payload itself carries f32 timestamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub from: f64,
    pub to: f64,
}

impl TimeRange {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    pub fn span(&self) -> f64 {
        self.to - self.from
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.from && t <= self.to
    }

    pub fn is_valid(&self) -> bool {
        self.from.is_finite() && self.to.is_finite() && self.from < self.to
    }
}

/// A closed value interval (price or volume).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// The visible window the render worker maps to the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub time: TimeRange,
    pub price: ValueRange,
    pub volume: ValueRange,
}

impl Viewport {
    pub fn new(time: TimeRange, price: ValueRange, volume: ValueRange) -> Self {
        Self {
            time,
            price,
            volume,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.time.is_valid() && self.price.is_valid() && self.volume.is_valid()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            time: TimeRange::new(0.0, 1.0),
            price: ValueRange::new(0.0, 1.0),
            volume: ValueRange::new(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range() {
        let r = TimeRange::new(100.0, 200.0);
        assert_eq!(r.span(), 100.0);
        assert!(r.contains(100.0));
        assert!(r.contains(200.0));
        assert!(!r.contains(200.1));
        assert!(r.is_valid());
        assert!(!TimeRange::new(200.0, 100.0).is_valid());
        assert!(!TimeRange::new(100.0, 100.0).is_valid());
    }

    #[test]
    fn test_viewport_valid() {
        assert!(Viewport::default().is_valid());

        let bad = Viewport {
            price: ValueRange::new(10.0, 5.0),
            ..Viewport::default()
        };
        assert!(!bad.is_valid());
    }
}
