//! Controller error types.

use bitchart_store::StoreError;

/// Errors surfaced synchronously by the chart controller.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("controller is already initialized")]
    AlreadyInitialized,
    #[error("controller is not initialized")]
    NotInitialized,
    #[error("destroyed")]
    Destroyed,
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("compute worker is gone")]
    WorkerGone,
    #[error("request timed out")]
    Timeout,
    #[error(transparent)]
    Store(#[from] StoreError),
}
