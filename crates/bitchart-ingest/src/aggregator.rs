//! Tick-to-bar aggregation.

use bitchart_core::{Bar, Tick};

/// Folds a tick stream into fixed-timeframe bars.
///
/// Each tick lands in the bucket `floor(t / timeframe) * timeframe`. A tick
/// for a new bucket completes and returns the previous bar; ticks in the
/// current bucket fold into its high/low/close and accumulate volume.
#[derive(Debug)]
pub struct BarAggregator {
    timeframe_ms: u64,
    current: Option<Bar>,
}

impl BarAggregator {
    pub fn new(timeframe_ms: u64) -> Self {
        Self {
            timeframe_ms: timeframe_ms.max(1),
            current: None,
        }
    }

    /// Fold one tick. Returns the completed bar when the tick opens a new
    /// bucket.
    pub fn push(&mut self, tick: &Tick) -> Option<Bar> {
        let bucket = self.bucket_of(tick.time);
        match &mut self.current {
            Some(bar) if bar.time == bucket => {
                bar.high = bar.high.max(tick.price);
                bar.low = bar.low.min(tick.price);
                bar.close = tick.price;
                bar.volume += tick.volume_or_zero();
                None
            }
            current => {
                let completed = current.take();
                *current = Some(Bar::new(
                    bucket,
                    tick.price,
                    tick.price,
                    tick.price,
                    tick.price,
                    tick.volume_or_zero(),
                ));
                completed
            }
        }
    }

    /// The bar currently being formed, if any.
    pub fn current(&self) -> Option<Bar> {
        self.current
    }

    /// Drop the forming bar (e.g. when the data set is replaced).
    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn timeframe_ms(&self) -> u64 {
        self.timeframe_ms
    }

    fn bucket_of(&self, time_ms: f32) -> f32 {
        let tf = self.timeframe_ms as f64;
        ((time_ms as f64 / tf).floor() * tf) as f32
    }
}
