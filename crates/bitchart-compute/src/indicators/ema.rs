//! Exponential moving average.

use super::sma::sma;

/// EMA with smoothing `alpha = 2 / (period + 1)`, seeded with the SMA of the
/// first `period` values. Entries before the seed are NaN.
pub fn ema(data: &[f32], period: usize) -> Vec<f32> {
    let n = data.len();
    let mut out = vec![f32::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    let alpha = 2.0 / (period as f32 + 1.0);
    out[period - 1] = sma(&data[..period], period)[period - 1];
    for i in period..n {
        out[i] = alpha * data[i] + (1.0 - alpha) * out[i - 1];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema3() {
        // alpha = 0.5: seed at index 2 = 2, then 3, then 4.
        let out = ema(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_eq!(&out[2..], &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_ema_converges_to_constant() {
        let data = vec![7.0; 50];
        let out = ema(&data, 5);
        assert!((out[49] - 7.0).abs() < 1e-6);
    }
}
