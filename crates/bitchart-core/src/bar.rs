//! OHLCV bar data structures.

/// Size of one bar record in bytes (six f32 scalars).
pub const BAR_SIZE: usize = std::mem::size_of::<Bar>();

/// One OHLCV record at a timeframe.
///
/// `time` is milliseconds since an arbitrary epoch. The field order and
/// `repr(C)` layout are load-bearing: the same 24-byte record is written
/// into the shared data store payload and fed to the GPU as per-instance
/// vertex data (`time` at offset 0, OHLC at offset 4, `volume` at 20).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Bar {
    pub time: f32,
    pub open: f32,
    pub high: f32,
    pub low: f32,
    pub close: f32,
    pub volume: f32,
}

impl Bar {
    pub fn new(time: f32, open: f32, high: f32, low: f32, close: f32, volume: f32) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Whether the bar closed at or above its open.
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }

    /// The higher of open and close.
    pub fn body_top(&self) -> f32 {
        self.open.max(self.close)
    }

    /// The lower of open and close.
    pub fn body_bottom(&self) -> f32 {
        self.open.min(self.close)
    }
}

/// Trait for types that expose OHLCV fields.
pub trait Ohlcv {
    fn open(&self) -> f32;
    fn high(&self) -> f32;
    fn low(&self) -> f32;
    fn close(&self) -> f32;
    fn volume(&self) -> f32;
}

impl Ohlcv for Bar {
    fn open(&self) -> f32 {
        self.open
    }

    fn high(&self) -> f32 {
        self.high
    }

    fn low(&self) -> f32 {
        self.low
    }

    fn close(&self) -> f32 {
        self.close
    }

    fn volume(&self) -> f32 {
        self.volume
    }
}
