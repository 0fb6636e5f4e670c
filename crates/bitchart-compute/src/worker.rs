//! The compute worker thread.
//!
//! CPU-bound indicator and decimation work runs on a dedicated thread so the
//! UI context never blocks on it. The worker consumes one request at a time
//! to completion; requests carry a caller-generated id which every response
//! echoes back.
//!
//! The worker reads bars either through a shared store handle (zero-copy
//! over the mapped payload) or, in copy mode, from the last data set
//! transferred to it with [`ComputeRequest::SetData`].

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use bitchart_core::Bar;
use bitchart_store::SharedBarStore;

use crate::indicators::{compute_indicator, IndicatorSpec};
use crate::m4::decimate_m4;

/// Requests accepted by the compute worker.
#[derive(Debug)]
pub enum ComputeRequest {
    /// Compute an indicator over `count` bars starting at logical `offset`.
    Indicator {
        id: u64,
        spec: IndicatorSpec,
        offset: usize,
        count: usize,
    },
    /// M4-decimate `count` bars starting at `offset` down to `target` bars.
    Decimate {
        id: u64,
        offset: usize,
        count: usize,
        target: usize,
    },
    /// Replace the worker-local data set (copy mode only).
    SetData { bars: Vec<Bar> },
    /// Exit the worker loop.
    Shutdown,
}

/// Responses produced by the compute worker. Each echoes the request id.
#[derive(Debug)]
pub enum ComputeResponse {
    Indicator {
        id: u64,
        spec: IndicatorSpec,
        values: Vec<f32>,
    },
    Decimated { id: u64, bars: Vec<Bar> },
    Error { id: u64, message: String },
}

/// Handle to a running compute worker.
pub struct ComputeWorker {
    tx: mpsc::UnboundedSender<ComputeRequest>,
    join: Option<JoinHandle<()>>,
}

impl ComputeWorker {
    /// Spawn the worker thread.
    ///
    /// `store` is the shared mapping, or `None` for copy mode where the
    /// caller pushes data sets with [`ComputeRequest::SetData`].
    pub fn spawn(
        store: Option<Arc<SharedBarStore>>,
    ) -> (Self, mpsc::UnboundedReceiver<ComputeResponse>) {
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();

        let join = std::thread::Builder::new()
            .name("bitchart-compute".into())
            .spawn(move || run(store, req_rx, resp_tx))
            .expect("spawn compute worker thread");

        (
            Self {
                tx: req_tx,
                join: Some(join),
            },
            resp_rx,
        )
    }

    /// Queue a request. Returns `false` if the worker has exited.
    pub fn send(&self, request: ComputeRequest) -> bool {
        self.tx.send(request).is_ok()
    }

    /// Ask the worker to exit and wait for it.
    pub fn shutdown(mut self) {
        let _ = self.tx.send(ComputeRequest::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for ComputeWorker {
    fn drop(&mut self) {
        let _ = self.tx.send(ComputeRequest::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn run(
    store: Option<Arc<SharedBarStore>>,
    mut requests: mpsc::UnboundedReceiver<ComputeRequest>,
    responses: mpsc::UnboundedSender<ComputeResponse>,
) {
    log::debug!(
        "compute worker up ({} mode)",
        if store.is_some() { "shared" } else { "copy" }
    );
    let mut local: Vec<Bar> = Vec::new();

    while let Some(request) = requests.blocking_recv() {
        match request {
            ComputeRequest::SetData { bars } => local = bars,
            ComputeRequest::Shutdown => break,
            ComputeRequest::Indicator {
                id,
                spec,
                offset,
                count,
            } => {
                let response = match read_window(&store, &local, offset, count) {
                    Ok(bars) => {
                        let closes: Vec<f32> = bars.iter().map(|b| b.close).collect();
                        ComputeResponse::Indicator {
                            id,
                            spec,
                            values: compute_indicator(spec, &closes),
                        }
                    }
                    Err(message) => ComputeResponse::Error { id, message },
                };
                if responses.send(response).is_err() {
                    break;
                }
            }
            ComputeRequest::Decimate {
                id,
                offset,
                count,
                target,
            } => {
                let response = match read_window(&store, &local, offset, count) {
                    Ok(bars) => ComputeResponse::Decimated {
                        id,
                        bars: decimate_m4(&bars, target),
                    },
                    Err(message) => ComputeResponse::Error { id, message },
                };
                if responses.send(response).is_err() {
                    break;
                }
            }
        }
    }
    log::debug!("compute worker exiting");
}

/// Resolve a `(offset, count)` window against the shared store or the
/// worker-local copy.
fn read_window(
    store: &Option<Arc<SharedBarStore>>,
    local: &[Bar],
    offset: usize,
    count: usize,
) -> Result<Vec<Bar>, String> {
    match store {
        Some(store) => store
            .read_range(offset, count)
            .map_err(|e| e.to_string()),
        None if offset > 0 => Err("no shared mapping: offsets require a shared store".into()),
        None => {
            if count > local.len() {
                Err(format!(
                    "range 0..{count} is outside the {} transferred bars",
                    local.len()
                ))
            } else {
                Ok(local[..count].to_vec())
            }
        }
    }
}
