//! Tick batching between dispatch intervals.

use bitchart_core::Tick;

/// Accumulates ticks between batch intervals.
///
/// The connection loop drains the batcher on every interval tick; a capacity
/// bound forces an early drain under bursty feeds so the buffer stays small.
#[derive(Debug)]
pub struct TickBatcher {
    buffer: Vec<Tick>,
    capacity: usize,
}

impl TickBatcher {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Buffer one tick. Returns `true` when the capacity bound was hit and
    /// the batch should be dispatched early.
    pub fn push(&mut self, tick: Tick) -> bool {
        self.buffer.push(tick);
        self.buffer.len() >= self.capacity
    }

    /// Drain all buffered ticks.
    pub fn take(&mut self) -> Vec<Tick> {
        std::mem::take(&mut self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for TickBatcher {
    fn default() -> Self {
        Self::new(10_000)
    }
}
