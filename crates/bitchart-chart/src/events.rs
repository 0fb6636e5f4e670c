//! Typed chart events and the listener registry.

use bitchart_core::{Bar, Viewport};

/// Crosshair position resolved against the data set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crosshair {
    /// Content-space pixel position.
    pub x: f32,
    pub y: f32,
    /// Data-space position under the pointer.
    pub time: f64,
    pub price: f64,
    /// The bar whose bucket contains `time`, if any.
    pub bar: Option<Bar>,
}

/// Events emitted by the chart controller.
#[derive(Debug, Clone)]
pub enum ChartEvent {
    /// The render worker is up and producing frames.
    Ready { backend: String, adapter: String },
    /// The data set changed (replace, append or last-bar update).
    DataChange { count: usize },
    /// The visible window changed (pan, zoom, fit, resize).
    ViewportChange { viewport: Viewport },
    /// The crosshair moved (`Some`) or left the chart (`None`).
    Crosshair(Option<Crosshair>),
    /// A click resolved to a data-space position.
    Click { time: f64, price: f64 },
    Error { message: String },
}

/// Listener handle returned by [`ListenerRegistry::add`].
pub type ListenerId = u64;

/// Registry of chart event listeners with explicit ids.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Vec<(ListenerId, Box<dyn Fn(&ChartEvent) + Send>)>,
    next_id: ListenerId,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: impl Fn(&ChartEvent) + Send + 'static) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` when the id is unknown.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn emit(&self, event: &ChartEvent) {
        for (_, listener) in &self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
