//! Scale math for BitChart.
//!
//! This crate is the single source of truth for data ⇄ normalized ⇄ pixel
//! conversions. Everything here is pure: no GPU handles, no window handles,
//! no side effects. The controller owns one [`TimeScale`] and one
//! [`PriceScale`] and derives viewports and grid positions from them.

pub mod price_scale;
pub mod ticks;
pub mod time_scale;

pub use price_scale::PriceScale;
pub use ticks::{nice_price_step, time_step_for_span, TIME_STEP_LADDER_MS};
pub use time_scale::{lower_bound, upper_bound, TimeScale};
