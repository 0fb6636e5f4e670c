//! Indicator math and temporal decimation for BitChart.
//!
//! The kernels in [`indicators`] and [`m4`] are pure functions over close
//! prices / bar slices; [`worker`] wraps them in a dedicated thread driven by
//! an id-correlated request/response protocol. Indicator output is a dense
//! `Vec<f32>` aligned with the input bars, with the warm-up prefix encoded as
//! NaN so it can be uploaded to the GPU as-is.

pub mod indicators;
pub mod m4;
pub mod worker;

pub use indicators::{compute_indicator, IndicatorSpec};
pub use m4::decimate_m4;
pub use worker::{ComputeRequest, ComputeResponse, ComputeWorker};
