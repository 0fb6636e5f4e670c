//! End-to-end tests of the data pipeline without a GPU: store, compute
//! worker, scales, culling and LOD selection working together through the
//! controller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bitchart_chart::{ChartController, ChartEvent};
use bitchart_compute::IndicatorSpec;
use bitchart_config::Config;
use bitchart_core::Bar;
use bitchart_store::StoreHandle;

fn series(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let base = 100.0 + ((i as f32) * 0.05).sin() * 10.0;
            Bar::new(
                i as f32 * 60_000.0,
                base,
                base + 1.5,
                base - 1.5,
                base + 0.5,
                2.0 + (i % 7) as f32,
            )
        })
        .collect()
}

#[tokio::test]
async fn test_stream_of_mutations_keeps_invariants() {
    let mut chart = ChartController::new(Config::default());
    chart.set_data(series(100)).unwrap();

    // Simulate a live session: update the forming bar, then roll buckets.
    for i in 100..200 {
        let mut forming = *chart.store().snapshot().last().unwrap();
        forming.close += 0.25;
        forming.high = forming.high.max(forming.close);
        chart.update_last_candle(forming).unwrap();

        let next = Bar::new(i as f32 * 60_000.0, 100.0, 101.0, 99.0, 100.5, 1.0);
        assert!(chart.append_data(&[next]).unwrap());
    }

    assert_eq!(chart.bar_count(), 200);
    let snapshot = chart.store().snapshot();
    assert!(snapshot.windows(2).all(|w| w[0].time < w[1].time));

    // The scales track the mutated extent.
    let (min, max) = chart.time_scale().data_range();
    assert_eq!(min, 0.0);
    assert_eq!(max, f64::from(snapshot.last().unwrap().time));
}

#[tokio::test]
async fn test_indicators_align_with_store_contents() {
    let mut chart = ChartController::new(Config::default());
    chart.set_data(series(300)).unwrap();

    let sma = chart
        .compute_indicator(IndicatorSpec::Sma { period: 20 })
        .await
        .unwrap();
    assert_eq!(sma.len(), 300);

    // Recompute by hand from the snapshot.
    let closes: Vec<f32> = chart.store().snapshot().iter().map(|b| b.close).collect();
    let expected: f32 = closes[280..300].iter().sum::<f32>() / 20.0;
    assert!((sma[299] - expected).abs() < 1e-3);

    let macd = chart
        .compute_indicator(IndicatorSpec::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        })
        .await
        .unwrap();
    assert_eq!(macd.len(), 900);
}

#[tokio::test]
async fn test_decimated_upload_after_deep_zoom_out() {
    // A data set large enough that the fitted view crosses the first LOD
    // threshold.
    let mut config = Config::default();
    config.lod.thresholds = vec![0, 1_000];
    let mut chart = ChartController::new(config);
    chart.set_data(series(5_000)).unwrap();

    // The fitted view sees all 5,000 bars; the LOD rebuild was kicked off
    // on the compute worker. Wait for it to land.
    for _ in 0..200 {
        chart.pump_lod_results();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    // Zooming does not panic and viewport events keep flowing.
    let views = Arc::new(AtomicUsize::new(0));
    let views_clone = Arc::clone(&views);
    chart.add_listener(move |event| {
        if matches!(event, ChartEvent::ViewportChange { .. }) {
            views_clone.fetch_add(1, Ordering::SeqCst);
        }
    });
    for _ in 0..10 {
        chart.wheel(1.0, 400.0);
    }
    assert!(views.load(Ordering::SeqCst) >= 10);
}

#[tokio::test]
async fn test_copy_mode_end_to_end() {
    let mut config = Config::default();
    config.store.shared = false;
    let mut chart = ChartController::new(config);
    chart.set_data(series(50)).unwrap();

    assert!(chart.store().shared_handle().is_none());

    // Indicators still work: the worker computes over transferred copies.
    let ema = chart
        .compute_indicator(IndicatorSpec::Ema { period: 5 })
        .await
        .unwrap();
    assert_eq!(ema.len(), 50);
    assert!(ema[3].is_nan());
    assert!(ema[4].is_finite());
}

#[tokio::test]
async fn test_ring_mode_through_controller() {
    let mut config = Config::default();
    config.store.mode = "ring".to_string();
    config.store.initial_capacity = 64;
    config.store.max_capacity = 64;
    let mut chart = ChartController::new(config);

    chart.set_data(series(64)).unwrap();
    // Streaming past capacity overwrites the oldest bars.
    for i in 64..100 {
        let bar = Bar::new(i as f32 * 60_000.0, 100.0, 101.0, 99.0, 100.5, 1.0);
        assert!(chart.append_data(&[bar]).unwrap());
    }

    assert_eq!(chart.bar_count(), 64);
    let snapshot = chart.store().snapshot();
    assert_eq!(snapshot.first().unwrap().time, 36.0 * 60_000.0);
    assert_eq!(snapshot.last().unwrap().time, 99.0 * 60_000.0);
}
