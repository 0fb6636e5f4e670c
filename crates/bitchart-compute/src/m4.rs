//! M4 temporal decimation.
//!
//! Partitions the source bars into equal floating-point buckets and keeps,
//! per bucket, the first open, last close, maximum high, minimum low and the
//! summed volume. This preserves the visible extrema of any zoomed-out view
//! and conserves total volume.

use bitchart_core::Bar;

/// Decimate `bars` down to at most `target` output bars.
///
/// Returns the source unchanged when it already fits in `target`.
pub fn decimate_m4(bars: &[Bar], target: usize) -> Vec<Bar> {
    let n = bars.len();
    if target == 0 || n <= target {
        return bars.to_vec();
    }

    let bucket_size = n as f64 / target as f64;
    let mut out = Vec::with_capacity(target);
    for b in 0..target {
        let start = (b as f64 * bucket_size) as usize;
        let end = (((b + 1) as f64 * bucket_size) as usize).min(n);
        // Float rounding never empties a bucket, but keep the slice honest.
        let end = end.max(start + 1);
        let chunk = &bars[start..end];

        let first = chunk[0];
        let last = chunk[chunk.len() - 1];
        out.push(Bar {
            time: first.time,
            open: first.open,
            high: chunk.iter().map(|c| c.high).fold(f32::MIN, f32::max),
            low: chunk.iter().map(|c| c.low).fold(f32::MAX, f32::min),
            close: last.close,
            volume: chunk.iter().map(|c| c.volume).sum(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars_from(highs: &[f32], lows: &[f32]) -> Vec<Bar> {
        highs
            .iter()
            .zip(lows)
            .enumerate()
            .map(|(i, (&high, &low))| Bar {
                time: i as f32 * 1000.0,
                open: (high + low) / 2.0,
                high,
                low,
                close: (high + low) / 2.0,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn test_m4_buckets_of_three() {
        let bars = bars_from(&[1.0, 3.0, 2.0, 5.0, 4.0, 6.0], &[1.0, 0.0, 2.0, 3.0, 1.0, 4.0]);
        let out = decimate_m4(&bars, 2);
        assert_eq!(out.len(), 2);

        assert_eq!(out[0].high, 3.0);
        assert_eq!(out[0].low, 0.0);
        assert_eq!(out[0].volume, 3.0);
        assert_eq!(out[0].time, bars[0].time);
        assert_eq!(out[0].open, bars[0].open);
        assert_eq!(out[0].close, bars[2].close);

        assert_eq!(out[1].high, 6.0);
        assert_eq!(out[1].low, 1.0);
        assert_eq!(out[1].volume, 3.0);
        assert_eq!(out[1].time, bars[3].time);
        assert_eq!(out[1].open, bars[3].open);
        assert_eq!(out[1].close, bars[5].close);
    }

    #[test]
    fn test_m4_identity_when_target_covers_source() {
        let bars = bars_from(&[1.0, 2.0, 3.0], &[0.5, 1.5, 2.5]);
        assert_eq!(decimate_m4(&bars, 3), bars);
        assert_eq!(decimate_m4(&bars, 10), bars);
    }

    #[test]
    fn test_m4_conserves_volume() {
        let bars: Vec<Bar> = (0..997)
            .map(|i| Bar {
                time: i as f32,
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.0,
                volume: (i % 7) as f32 + 0.25,
            })
            .collect();
        let total: f32 = bars.iter().map(|b| b.volume).sum();
        for target in [1, 2, 13, 100, 996] {
            let out = decimate_m4(&bars, target);
            assert!(out.len() <= target);
            let decimated: f32 = out.iter().map(|b| b.volume).sum();
            assert!((decimated - total).abs() < total * 1e-5);
        }
    }

    #[test]
    fn test_m4_preserves_extrema() {
        let bars: Vec<Bar> = (0..500)
            .map(|i| {
                let wave = ((i as f32) * 0.37).sin() * 5.0;
                Bar {
                    time: i as f32,
                    open: 100.0 + wave,
                    high: 102.0 + wave,
                    low: 98.0 + wave,
                    close: 100.0 + wave,
                    volume: 1.0,
                }
            })
            .collect();

        let out = decimate_m4(&bars, 37);
        let src_high = bars.iter().map(|b| b.high).fold(f32::MIN, f32::max);
        let src_low = bars.iter().map(|b| b.low).fold(f32::MAX, f32::min);
        let out_high = out.iter().map(|b| b.high).fold(f32::MIN, f32::max);
        let out_low = out.iter().map(|b| b.low).fold(f32::MAX, f32::min);
        assert_eq!(out_high, src_high);
        assert_eq!(out_low, src_low);
    }

    #[test]
    fn test_m4_bucket_times_are_monotonic() {
        let bars = bars_from(&[1.0; 100], &[0.0; 100]);
        let out = decimate_m4(&bars, 9);
        assert!(out.windows(2).all(|w| w[0].time < w[1].time));
    }
}
