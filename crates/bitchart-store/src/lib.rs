//! Shared binary bar store.
//!
//! The active data set lives in a single contiguous region jointly mapped by
//! the controller, the render worker and the compute worker:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Header: count, head, last_update_low, last_update_high   │  16 bytes
//! ├──────────────────────────────────────────────────────────┤
//! │ Bar[0] Bar[1] ... Bar[capacity-1]                        │  24 bytes each
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Header fields are four little-endian i32 accessed through atomics.
//! Writers store payload first and publish `count`/`head` with `Release`;
//! readers `Acquire` the header before touching the payload, so a reader
//! that observes `count = N` can safely read exactly the first `N` logical
//! bars.

pub mod store;

pub use store::{SharedBarStore, StoreConfig, StoreError, StoreHandle, StoreMode, HEADER_SIZE};
