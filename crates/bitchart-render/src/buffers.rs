//! Named GPU buffer lifecycle management.
//!
//! Two update paths with different GPU-side behavior:
//!
//! - [`BufferManager::update`] writes into existing storage, reallocating
//!   only when the write would overflow it.
//! - [`BufferManager::replace`] *orphans* the buffer: the old buffer object
//!   is dropped and a fresh one is created at the new size and uploaded in
//!   one step. Streaming data that changes every frame must use `replace`,
//!   which decouples CPU writes from draw calls still reading the previous
//!   contents.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

struct ManagedBuffer {
    buffer: wgpu::Buffer,
    size: u64,
    usage: wgpu::BufferUsages,
}

/// Tracks named vertex/storage buffers and a total-bytes account across all
/// of them.
#[derive(Default)]
pub struct BufferManager {
    buffers: HashMap<String, ManagedBuffer>,
    total_bytes: u64,
}

impl BufferManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or orphan-replace) a named buffer with initial contents.
    pub fn create_init(
        &mut self,
        device: &wgpu::Device,
        id: &str,
        data: &[u8],
        usage: wgpu::BufferUsages,
    ) {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(id),
            contents: data,
            usage: usage | wgpu::BufferUsages::COPY_DST,
        });
        self.insert(
            id,
            ManagedBuffer {
                buffer,
                size: data.len() as u64,
                usage,
            },
        );
    }

    /// Create a named buffer of the given size with undefined contents.
    pub fn create_empty(
        &mut self,
        device: &wgpu::Device,
        id: &str,
        size: u64,
        usage: wgpu::BufferUsages,
    ) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(id),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.insert(id, ManagedBuffer { buffer, size, usage });
    }

    /// Write into an existing buffer at a byte offset. If the storage is too
    /// small the buffer is reallocated to `offset + data.len()`; previous
    /// contents outside the written range are lost on reallocation.
    pub fn update(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        id: &str,
        data: &[u8],
        offset: u64,
    ) -> bool {
        let Some(entry) = self.buffers.get(id) else {
            return false;
        };
        let needed = offset + data.len() as u64;
        if needed > entry.size {
            let usage = entry.usage;
            self.create_empty(device, id, needed, usage);
        }
        let entry = &self.buffers[id];
        queue.write_buffer(&entry.buffer, offset, data);
        true
    }

    /// Orphan the buffer: allocate a fresh buffer object sized to `data` and
    /// upload in one step. The required path for per-frame streaming data.
    pub fn replace(&mut self, device: &wgpu::Device, id: &str, data: &[u8]) -> bool {
        let Some(entry) = self.buffers.get(id) else {
            return false;
        };
        let usage = entry.usage;
        self.create_init(device, id, data, usage);
        true
    }

    pub fn get(&self, id: &str) -> Option<&wgpu::Buffer> {
        self.buffers.get(id).map(|e| &e.buffer)
    }

    pub fn size_of(&self, id: &str) -> Option<u64> {
        self.buffers.get(id).map(|e| e.size)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.buffers.contains_key(id)
    }

    /// Drop a named buffer, releasing its bytes from the account.
    pub fn remove(&mut self, id: &str) {
        if let Some(old) = self.buffers.remove(id) {
            self.total_bytes -= old.size;
        }
    }

    /// Total bytes across all live buffers.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    fn insert(&mut self, id: &str, entry: ManagedBuffer) {
        if let Some(old) = self.buffers.remove(id) {
            self.total_bytes -= old.size;
        }
        self.total_bytes += entry.size;
        self.buffers.insert(id.to_string(), entry);
    }
}
