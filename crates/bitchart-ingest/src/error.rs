//! Error types for the ingest crate.

/// Errors surfaced by the live feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("feed is not connected")]
    NotConnected,
    #[error("channel send error: {0}")]
    ChannelSend(String),
    #[error("connection closed unexpectedly")]
    ConnectionClosed,
    #[error("reconnect attempts exhausted after {attempts} tries")]
    ReconnectExhausted { attempts: u32 },
}
