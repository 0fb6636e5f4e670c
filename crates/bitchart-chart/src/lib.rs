//! BitChart controller and UI-thread interaction layer.
//!
//! The [`ChartController`] is the conductor: it owns the shared bar store,
//! the time/price scales, the compute and render workers and the optional
//! live feed, and translates user input into viewport changes. Everything
//! here runs on the UI thread; the workers are reached only through their
//! message channels.

pub mod app;
pub mod bridge;
pub mod controller;
pub mod culling;
pub mod error;
pub mod events;
pub mod interaction;
pub mod lod;
pub mod ui;

pub use bridge::ComputeBridge;
pub use controller::ChartController;
pub use culling::{CullConfig, FrustumCuller, VisibleRange};
pub use error::ChartError;
pub use events::{ChartEvent, Crosshair, ListenerId, ListenerRegistry};
pub use interaction::{Gesture, Interaction};
pub use lod::LodManager;
