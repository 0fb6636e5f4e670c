//! Async request bridge to the compute worker.
//!
//! Requests carry a generated id; a pump task resolves the matching pending
//! oneshot when the worker's response arrives. Every request is bounded by
//! a timeout, and controller teardown rejects all outstanding requests with
//! [`ChartError::Destroyed`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use bitchart_compute::{ComputeRequest, ComputeResponse, ComputeWorker, IndicatorSpec};
use bitchart_core::Bar;
use bitchart_store::SharedBarStore;

use crate::error::ChartError;

/// Default per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<ComputeResponse>>>>;

/// Bridges the UI context to the compute worker thread.
pub struct ComputeBridge {
    worker: ComputeWorker,
    pending: Pending,
    next_id: AtomicU64,
    destroyed: Arc<AtomicBool>,
    timeout: Duration,
    pump: tokio::task::JoinHandle<()>,
}

impl ComputeBridge {
    /// Spawn the worker and the response pump. Must be called within a tokio
    /// runtime context.
    pub fn new(store: Option<Arc<SharedBarStore>>) -> Self {
        Self::with_timeout(store, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(store: Option<Arc<SharedBarStore>>, timeout: Duration) -> Self {
        let (worker, responses) = ComputeWorker::spawn(store);
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));

        let pump = tokio::spawn(pump_responses(responses, Arc::clone(&pending)));

        Self {
            worker,
            pending,
            next_id: AtomicU64::new(1),
            destroyed: Arc::new(AtomicBool::new(false)),
            timeout,
            pump,
        }
    }

    /// Push a data set to the worker (copy mode only).
    pub fn set_data(&self, bars: Vec<Bar>) {
        self.worker.send(ComputeRequest::SetData { bars });
    }

    /// Compute an indicator over `count` bars starting at `offset`.
    pub async fn indicator(
        &self,
        spec: IndicatorSpec,
        offset: usize,
        count: usize,
    ) -> Result<Vec<f32>, ChartError> {
        let (id, rx) = self.register()?;
        if !self.worker.send(ComputeRequest::Indicator {
            id,
            spec,
            offset,
            count,
        }) {
            self.pending.lock().unwrap().remove(&id);
            return Err(ChartError::WorkerGone);
        }
        match self.await_response(id, rx).await? {
            ComputeResponse::Indicator { values, .. } => Ok(values),
            ComputeResponse::Error { message, .. } => Err(ChartError::InvalidData(message)),
            other => Err(ChartError::InvalidData(format!(
                "mismatched response: {other:?}"
            ))),
        }
    }

    /// Decimate `count` bars starting at `offset` down to `target`.
    pub async fn decimate(
        &self,
        offset: usize,
        count: usize,
        target: usize,
    ) -> Result<Vec<Bar>, ChartError> {
        let (id, rx) = self.register()?;
        if !self.worker.send(ComputeRequest::Decimate {
            id,
            offset,
            count,
            target,
        }) {
            self.pending.lock().unwrap().remove(&id);
            return Err(ChartError::WorkerGone);
        }
        match self.await_response(id, rx).await? {
            ComputeResponse::Decimated { bars, .. } => Ok(bars),
            ComputeResponse::Error { message, .. } => Err(ChartError::InvalidData(message)),
            other => Err(ChartError::InvalidData(format!(
                "mismatched response: {other:?}"
            ))),
        }
    }

    /// Reject every outstanding request and refuse new ones. Idempotent.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        self.pump.abort();
        // Dropping the senders resolves the pending awaits with Destroyed.
        self.pending.lock().unwrap().clear();
    }

    fn register(&self) -> Result<(u64, oneshot::Receiver<ComputeResponse>), ChartError> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(ChartError::Destroyed);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);
        Ok((id, rx))
    }

    async fn await_response(
        &self,
        id: u64,
        rx: oneshot::Receiver<ComputeResponse>,
    ) -> Result<ComputeResponse, ChartError> {
        match tokio::time::timeout(self.timeout, rx).await {
            Err(_) => {
                self.pending.lock().unwrap().remove(&id);
                Err(ChartError::Timeout)
            }
            // Sender dropped: the bridge was destroyed under us.
            Ok(Err(_)) => Err(ChartError::Destroyed),
            Ok(Ok(response)) => Ok(response),
        }
    }
}

impl Drop for ComputeBridge {
    fn drop(&mut self) {
        self.destroy();
    }
}

async fn pump_responses(
    mut responses: mpsc::UnboundedReceiver<ComputeResponse>,
    pending: Pending,
) {
    while let Some(response) = responses.recv().await {
        let id = match &response {
            ComputeResponse::Indicator { id, .. }
            | ComputeResponse::Decimated { id, .. }
            | ComputeResponse::Error { id, .. } => *id,
        };
        let waiter = pending.lock().unwrap().remove(&id);
        match waiter {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => log::warn!("compute response for unknown request id {id}"),
        }
    }
}
