//! Core types for the BitChart engine.
//!
//! This crate provides the fundamental data structures shared by every other
//! crate in the workspace:
//! - `Bar` - one OHLCV record (the 24-byte unit of the data plane)
//! - `Tick` - a single trade event prior to bar aggregation
//! - `Viewport` - the visible time/price/volume window
//! - `Theme` - chart colors

pub mod bar;
pub mod theme;
pub mod tick;
pub mod validation;
pub mod viewport;

pub use bar::{Bar, Ohlcv, BAR_SIZE};
pub use theme::Theme;
pub use tick::{Side, Tick};
pub use validation::{validate_bar, validate_tick};
pub use viewport::{TimeRange, ValueRange, Viewport};
