//! Relative strength index with Wilder smoothing.

/// RSI over `period` intervals. The first `period` entries are NaN; the
/// first value lands at index `period`, computed from the simple average of
/// the first `period` gains/losses, after which averages follow Wilder's
/// recurrence `avg = (avg * (period - 1) + x) / period`. A zero average loss
/// maps to RSI = 100.
pub fn rsi(data: &[f32], period: usize) -> Vec<f32> {
    let n = data.len();
    let mut out = vec![f32::NAN; n];
    if period == 0 || n <= period {
        return out;
    }

    let mut avg_gain = 0.0f32;
    let mut avg_loss = 0.0f32;
    for i in 1..=period {
        let change = data[i] - data[i - 1];
        if change >= 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= period as f32;
    avg_loss /= period as f32;
    out[period] = rsi_value(avg_gain, avg_loss);

    for i in period + 1..n {
        let change = data[i] - data[i - 1];
        let (gain, loss) = if change >= 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (period as f32 - 1.0) + gain) / period as f32;
        avg_loss = (avg_loss * (period as f32 - 1.0) + loss) / period as f32;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    out
}

fn rsi_value(avg_gain: f32, avg_loss: f32) -> f32 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}
