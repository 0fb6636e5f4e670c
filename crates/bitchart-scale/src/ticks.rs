//! Nice tick-step selection for grid lines and axis labels.

const SECOND_MS: f64 = 1_000.0;
const MINUTE_MS: f64 = 60.0 * SECOND_MS;
const HOUR_MS: f64 = 60.0 * MINUTE_MS;
const DAY_MS: f64 = 24.0 * HOUR_MS;

/// Fixed ladder of time steps, in milliseconds: 1 s up to 1 yr.
pub const TIME_STEP_LADDER_MS: [f64; 21] = [
    SECOND_MS,
    5.0 * SECOND_MS,
    10.0 * SECOND_MS,
    30.0 * SECOND_MS,
    MINUTE_MS,
    5.0 * MINUTE_MS,
    15.0 * MINUTE_MS,
    30.0 * MINUTE_MS,
    HOUR_MS,
    2.0 * HOUR_MS,
    4.0 * HOUR_MS,
    6.0 * HOUR_MS,
    12.0 * HOUR_MS,
    DAY_MS,
    2.0 * DAY_MS,
    7.0 * DAY_MS,
    14.0 * DAY_MS,
    30.0 * DAY_MS,
    91.0 * DAY_MS,
    182.0 * DAY_MS,
    365.0 * DAY_MS,
];

/// Smallest ladder step that yields at most `target_count` ticks over `span`.
/// Spans wider than a year per tick fall back to whole-year multiples.
pub fn time_step_for_span(span_ms: f64, target_count: usize) -> f64 {
    let target = target_count.max(1) as f64;
    for step in TIME_STEP_LADDER_MS {
        if span_ms / step <= target {
            return step;
        }
    }
    let year = TIME_STEP_LADDER_MS[20];
    let years = (span_ms / (target * year)).ceil().max(1.0);
    years * year
}

/// Smallest step of the form `m * 10^e` with `m` in {1, 2, 5} that yields at
/// most `target_count` ticks over `span`.
pub fn nice_price_step(span: f64, target_count: usize) -> f64 {
    let target = target_count.max(1) as f64;
    let raw = span / target;
    if !raw.is_finite() || raw <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    for m in [1.0, 2.0, 5.0, 10.0] {
        let step = m * magnitude;
        if span / step <= target {
            return step;
        }
    }
    10.0 * magnitude
}

/// Tick positions covering `[from, to]` at the given step, aligned to
/// multiples of the step.
pub fn tick_positions(from: f64, to: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || !from.is_finite() || !to.is_finite() || to <= from {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut i = (from / step).ceil();
    // Guard against float drift landing one step below `from`.
    if i * step < from {
        i += 1.0;
    }
    while i * step <= to {
        out.push(i * step);
        i += 1.0;
    }
    out
}
