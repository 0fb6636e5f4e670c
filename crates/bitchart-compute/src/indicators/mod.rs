//! Technical indicator kernels.
//!
//! Every kernel returns a sequence aligned with its input: one value per bar
//! for single-line indicators, three interleaved values per bar for MACD
//! (macd, signal, hist) and Bollinger (upper, middle, lower). Entries that
//! fall inside the warm-up window are NaN.

mod bollinger;
mod ema;
mod macd;
mod rsi;
mod sma;

pub use bollinger::bollinger;
pub use ema::ema;
pub use macd::macd;
pub use rsi::rsi;
pub use sma::sma;

/// Which indicator to compute, with its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorSpec {
    Sma { period: usize },
    Ema { period: usize },
    Rsi { period: usize },
    Macd { fast: usize, slow: usize, signal: usize },
    Bollinger { period: usize, k: f32 },
}

impl IndicatorSpec {
    /// Number of output values per input bar.
    pub fn values_per_bar(&self) -> usize {
        match self {
            IndicatorSpec::Macd { .. } | IndicatorSpec::Bollinger { .. } => 3,
            _ => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            IndicatorSpec::Sma { .. } => "SMA",
            IndicatorSpec::Ema { .. } => "EMA",
            IndicatorSpec::Rsi { .. } => "RSI",
            IndicatorSpec::Macd { .. } => "MACD",
            IndicatorSpec::Bollinger { .. } => "BB",
        }
    }
}

/// Compute an indicator over a close-price series.
pub fn compute_indicator(spec: IndicatorSpec, closes: &[f32]) -> Vec<f32> {
    match spec {
        IndicatorSpec::Sma { period } => sma(closes, period),
        IndicatorSpec::Ema { period } => ema(closes, period),
        IndicatorSpec::Rsi { period } => rsi(closes, period),
        IndicatorSpec::Macd { fast, slow, signal } => macd(closes, fast, slow, signal),
        IndicatorSpec::Bollinger { period, k } => bollinger(closes, period, k),
    }
}
