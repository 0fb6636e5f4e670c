//! The shared bar store implementation.

use std::alloc::{self, Layout};
use std::ptr;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bitchart_core::{Bar, BAR_SIZE};

/// Size of the atomic header in bytes.
pub const HEADER_SIZE: usize = std::mem::size_of::<StoreHeader>();

const _: () = assert!(HEADER_SIZE == 16);

/// Header at the start of the shared region. Field order is part of the
/// binary layout and must not change.
#[repr(C)]
struct StoreHeader {
    /// Number of valid bars in the buffer.
    count: AtomicI32,
    /// Ring-buffer write head (always 0 in growable mode).
    head: AtomicI32,
    /// Low 32 bits of the last-update timestamp (milliseconds).
    last_update_low: AtomicI32,
    /// High 32 bits of the last-update timestamp.
    last_update_high: AtomicI32,
}

/// Operating mode of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Capacity doubles on overflow, up to the configured cap.
    Growable,
    /// Writes wrap; the oldest bar is overwritten once full.
    Ring,
}

/// Store construction parameters.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub mode: StoreMode,
    /// Initial logical capacity in bars.
    pub initial_capacity: usize,
    /// Absolute capacity cap in bars. The backing region is reserved at this
    /// size so the mapping never moves while workers hold views over it.
    pub max_capacity: usize,
    /// Whether `shared_handle` hands out views. When false the store behaves
    /// as a thread-local buffer and workers receive owned copies per update.
    pub shared: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            mode: StoreMode::Growable,
            initial_capacity: 1024,
            max_capacity: 1 << 20,
            shared: true,
        }
    }
}

/// Errors surfaced by store operations that take arguments.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("data set of {requested} bars exceeds the capacity cap of {max}")]
    CapacityExceeded { requested: usize, max: usize },
    #[error("range {offset}..{} is outside the {len} stored bars", .offset + .count)]
    InvalidRange {
        offset: usize,
        count: usize,
        len: usize,
    },
}

/// The shared bar store.
///
/// Interior mutability over a raw region: all mutation goes through `&self`
/// so the same `Arc` can be held by the controller (writer) and both workers
/// (readers). Writes must come from a single thread; this mirrors the
/// engine-wide rule that only the controller context mutates the data plane.
pub struct SharedBarStore {
    base: *mut u8,
    /// Current logical capacity in bars (<= config.max_capacity).
    capacity: AtomicUsize,
    config: StoreConfig,
}

// SAFETY: the region outlives the struct (owned allocation, freed in Drop).
// Payload slots are published to readers only through Release stores of
// `count`/`head`, and there is a single writer, so readers never observe a
// slot before the writer's payload stores to it.
unsafe impl Send for SharedBarStore {}
unsafe impl Sync for SharedBarStore {}

impl SharedBarStore {
    /// Allocate a store with the given configuration.
    pub fn new(config: StoreConfig) -> Self {
        let max = config.max_capacity.max(1);
        let initial = config.initial_capacity.clamp(1, max);

        let layout = Self::region_layout(max);
        // SAFETY: layout has non-zero size; zeroing gives a valid header
        // (count = 0, head = 0) and a defined payload.
        let base = unsafe { alloc::alloc_zeroed(layout) };
        if base.is_null() {
            alloc::handle_alloc_error(layout);
        }

        Self {
            base,
            capacity: AtomicUsize::new(initial),
            config: StoreConfig {
                initial_capacity: initial,
                max_capacity: max,
                ..config
            },
        }
    }

    fn region_layout(max_capacity: usize) -> Layout {
        Layout::from_size_align(HEADER_SIZE + max_capacity * BAR_SIZE, 8)
            .expect("store region layout")
    }

    fn header(&self) -> &StoreHeader {
        // SAFETY: base points at a live, 8-aligned allocation whose first 16
        // bytes were zero-initialized; StoreHeader is repr(C) atomics only.
        unsafe { &*(self.base as *const StoreHeader) }
    }

    fn payload(&self) -> *mut Bar {
        // SAFETY: the payload starts right after the header and is 4-aligned.
        unsafe { self.base.add(HEADER_SIZE) as *mut Bar }
    }

    /// Number of valid bars (`Acquire`: pairs with writer publication).
    pub fn len(&self) -> usize {
        self.header().count.load(Ordering::Acquire) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ring-buffer head index. Always 0 in growable mode.
    pub fn head(&self) -> usize {
        self.header().head.load(Ordering::Acquire) as usize
    }

    /// Current logical capacity in bars.
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Acquire)
    }

    pub fn mode(&self) -> StoreMode {
        self.config.mode
    }

    /// Millisecond timestamp of the last mutation.
    ///
    /// The timestamp is split across two 32-bit words; the reader retries
    /// when it observes the words mid-update.
    pub fn last_update_ms(&self) -> u64 {
        let hdr = self.header();
        loop {
            let high = hdr.last_update_high.load(Ordering::Acquire);
            let low = hdr.last_update_low.load(Ordering::Acquire);
            if hdr.last_update_high.load(Ordering::Acquire) == high {
                return ((high as u32 as u64) << 32) | low as u32 as u64;
            }
        }
    }

    /// Whether this store hands out shared views (vs. copy mode).
    pub fn is_shared(&self) -> bool {
        self.config.shared
    }

    /// Atomic replacement of the whole data set.
    ///
    /// Writes the payload densely from offset 0, then publishes
    /// `head = 0` and `count = bars.len()`. Grows the logical capacity to the
    /// next power of two if needed.
    pub fn set_all(&self, bars: &[Bar]) -> Result<(), StoreError> {
        if !self.ensure_capacity(bars.len()) {
            return Err(StoreError::CapacityExceeded {
                requested: bars.len(),
                max: self.config.max_capacity,
            });
        }

        let payload = self.payload();
        for (i, bar) in bars.iter().enumerate() {
            // SAFETY: i < capacity <= max_capacity, single writer.
            unsafe { ptr::write(payload.add(i), *bar) };
        }

        let hdr = self.header();
        hdr.head.store(0, Ordering::Release);
        hdr.count.store(bars.len() as i32, Ordering::Release);
        self.touch();
        Ok(())
    }

    /// Append bars after the current data set.
    ///
    /// In growable mode the capacity doubles as needed; a refused grow (cap
    /// reached) drops the append and returns `false` without mutating. In
    /// ring mode writes wrap and overwrite the oldest bars.
    pub fn append(&self, bars: &[Bar]) -> bool {
        if bars.is_empty() {
            return true;
        }
        match self.config.mode {
            StoreMode::Growable => self.append_growable(bars),
            StoreMode::Ring => {
                self.append_ring(bars);
                true
            }
        }
    }

    fn append_growable(&self, bars: &[Bar]) -> bool {
        let hdr = self.header();
        let count = hdr.count.load(Ordering::Relaxed) as usize;
        if !self.ensure_capacity(count + bars.len()) {
            log::warn!(
                "append of {} bars refused: cap {} reached",
                bars.len(),
                self.config.max_capacity
            );
            return false;
        }

        let payload = self.payload();
        for (i, bar) in bars.iter().enumerate() {
            // SAFETY: count + i < capacity, single writer.
            unsafe { ptr::write(payload.add(count + i), *bar) };
        }
        hdr.count.store((count + bars.len()) as i32, Ordering::Release);
        self.touch();
        true
    }

    fn append_ring(&self, bars: &[Bar]) {
        let hdr = self.header();
        let cap = self.capacity();
        let payload = self.payload();

        for bar in bars {
            let count = hdr.count.load(Ordering::Relaxed) as usize;
            let head = hdr.head.load(Ordering::Relaxed) as usize;
            if count < cap {
                // Still filling: the slot after the last logical bar.
                let slot = (head + count) % cap;
                // SAFETY: slot < capacity, single writer; published below.
                unsafe { ptr::write(payload.add(slot), *bar) };
                hdr.count.store((count + 1) as i32, Ordering::Release);
            } else {
                // Full: overwrite the oldest bar and advance the head.
                // SAFETY: head < capacity, single writer.
                unsafe { ptr::write(payload.add(head), *bar) };
                hdr.head.store(((head + 1) % cap) as i32, Ordering::Release);
            }
        }
        self.touch();
    }

    /// Overwrite the last logical bar. Returns `false` when the store is
    /// empty. `count` and `head` are preserved.
    pub fn update_last(&self, bar: Bar) -> bool {
        let hdr = self.header();
        let count = hdr.count.load(Ordering::Relaxed) as usize;
        if count == 0 {
            return false;
        }
        let head = hdr.head.load(Ordering::Relaxed) as usize;
        let slot = (head + count - 1) % self.capacity();
        // SAFETY: slot < capacity, single writer.
        unsafe { ptr::write(self.payload().add(slot), bar) };
        self.touch();
        true
    }

    /// Reset to an empty store. Capacity is retained.
    pub fn clear(&self) {
        let hdr = self.header();
        hdr.count.store(0, Ordering::Release);
        hdr.head.store(0, Ordering::Release);
        self.touch();
    }

    /// Logical-order copy of all stored bars.
    pub fn snapshot(&self) -> Vec<Bar> {
        let len = self.len();
        self.read_range(0, len).unwrap_or_default()
    }

    /// Logical-order copy of `count` bars starting at logical `offset`.
    pub fn read_range(&self, offset: usize, count: usize) -> Result<Vec<Bar>, StoreError> {
        let hdr = self.header();
        let len = hdr.count.load(Ordering::Acquire) as usize;
        let head = hdr.head.load(Ordering::Acquire) as usize;
        if offset + count > len {
            return Err(StoreError::InvalidRange { offset, count, len });
        }

        let cap = self.capacity();
        let payload = self.payload();
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let slot = (head + offset + i) % cap;
            // SAFETY: slot < capacity and slot holds a published bar
            // (logical index < count observed with Acquire).
            out.push(unsafe { ptr::read(payload.add(slot)) });
        }
        Ok(out)
    }

    /// Grow the logical capacity to hold `needed` bars. Returns `false` when
    /// the cap would be exceeded.
    fn ensure_capacity(&self, needed: usize) -> bool {
        let cap = self.capacity();
        if needed <= cap {
            return true;
        }
        if needed > self.config.max_capacity {
            return false;
        }
        let new_cap = needed
            .next_power_of_two()
            .min(self.config.max_capacity);
        self.capacity.store(new_cap, Ordering::Release);
        log::debug!("store capacity grown {} -> {}", cap, new_cap);
        true
    }

    /// Stamp the split last-update timestamp: low word first, high second.
    fn touch(&self) {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let hdr = self.header();
        hdr.last_update_low
            .store(ms as u32 as i32, Ordering::Release);
        hdr.last_update_high
            .store((ms >> 32) as u32 as i32, Ordering::Release);
    }
}

impl Drop for SharedBarStore {
    fn drop(&mut self) {
        // SAFETY: base was allocated with this exact layout in `new`.
        unsafe { alloc::dealloc(self.base, Self::region_layout(self.config.max_capacity)) };
    }
}

/// Extension for handing out worker views of an `Arc`'d store.
pub trait StoreHandle {
    /// A reference suitable for passing to a worker (the same memory
    /// mapping on the other side), or `None` when the store was configured
    /// non-shared and workers must receive owned copies per update.
    fn shared_handle(&self) -> Option<Arc<SharedBarStore>>;
}

impl StoreHandle for Arc<SharedBarStore> {
    fn shared_handle(&self) -> Option<Arc<SharedBarStore>> {
        self.config.shared.then(|| Arc::clone(self))
    }
}

impl std::fmt::Debug for SharedBarStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedBarStore")
            .field("mode", &self.config.mode)
            .field("len", &self.len())
            .field("head", &self.head())
            .field("capacity", &self.capacity())
            .finish()
    }
}
