//! Bollinger bands.

use super::sma::sma;

/// Bollinger bands over `period` values with a band width of `k` standard
/// deviations around the SMA middle line.
///
/// Output is interleaved, three values per input bar:
/// `[upper, middle, lower, ...]`; the first `period - 1` triples are NaN.
pub fn bollinger(data: &[f32], period: usize, k: f32) -> Vec<f32> {
    let n = data.len();
    let mut out = vec![f32::NAN; n * 3];
    if period == 0 || n < period {
        return out;
    }

    let middle = sma(data, period);
    for i in period - 1..n {
        let mean = middle[i];
        let window = &data[i + 1 - period..=i];
        let variance =
            window.iter().map(|&x| (x - mean) * (x - mean)).sum::<f32>() / period as f32;
        let sigma = variance.sqrt();
        out[i * 3] = mean + k * sigma;
        out[i * 3 + 1] = mean;
        out[i * 3 + 2] = mean - k * sigma;
    }
    out
}
