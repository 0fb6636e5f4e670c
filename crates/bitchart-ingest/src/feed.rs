//! Live feed connection management.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::time::interval;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use bitchart_core::{validate_tick, Bar, Tick};

use crate::aggregator::BarAggregator;
use crate::batch::TickBatcher;
use crate::error::FeedError;
use crate::parser::{DefaultParser, TickParser};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected.
    Disconnected,
    /// Connection attempt in flight.
    Connecting,
    /// Connected and streaming.
    Connected,
    /// Waiting out a backoff delay before the next attempt.
    Reconnecting,
    /// Terminally failed (reconnect attempts exhausted).
    Error,
}

/// Live feed configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// WebSocket URL.
    pub url: String,
    /// Symbol placed in subscribe frames.
    pub symbol: String,
    /// Channel placed in subscribe frames.
    pub channel: String,
    /// Bar bucket width for tick aggregation.
    pub timeframe_ms: u64,
    /// Interval between `Batch` dispatches.
    pub batch_interval: Duration,
    /// Socket keepalive ping interval.
    pub ping_interval: Duration,
    /// Reconnect on disconnect.
    pub auto_reconnect: bool,
    /// Maximum reconnect attempts before the feed gives up.
    pub max_reconnect_attempts: u32,
    /// Base reconnect delay; doubled per attempt, capped at 30 s.
    pub reconnect_delay: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "wss://stream.binance.com:9443/ws".to_string(),
            symbol: "btcusdt".to_string(),
            channel: "trade".to_string(),
            timeframe_ms: 60_000,
            batch_interval: Duration::from_millis(100),
            ping_interval: Duration::from_secs(30),
            auto_reconnect: true,
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

/// Events delivered to feed subscribers.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    Connected,
    Disconnected,
    Error(String),
    /// One validated tick.
    Tick(Tick),
    /// A completed bar, or the forming bar re-emitted on each batch interval
    /// (`partial = true`).
    Candle { bar: Bar, partial: bool },
    /// All ticks received since the previous batch interval.
    Batch(Vec<Tick>),
}

/// Outbound subscription frame: `{"type": ..., "symbol": ..., "channel": ...}`.
#[derive(Debug, Serialize)]
struct SubscribeFrame<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    symbol: &'a str,
    channel: &'a str,
}

/// Commands for the connection task.
#[derive(Debug)]
enum FeedCommand {
    Subscribe { symbol: String, channel: String },
    Unsubscribe { symbol: String, channel: String },
    Close,
}

/// Owns one streaming connection and its reconnect lifecycle.
pub struct LiveFeed {
    config: FeedConfig,
    parser: Arc<dyn TickParser>,
    state: Arc<Mutex<ConnectionState>>,
    command_tx: Option<mpsc::Sender<FeedCommand>>,
}

impl LiveFeed {
    /// Create a feed with the default dual-shape parser.
    pub fn new(config: FeedConfig) -> Self {
        Self::with_parser(config, Arc::new(DefaultParser))
    }

    /// Create a feed with a custom message parser.
    pub fn with_parser(config: FeedConfig, parser: Arc<dyn TickParser>) -> Self {
        Self {
            config,
            parser,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            command_tx: None,
        }
    }

    /// Start the connection task and subscribe to the configured channel.
    ///
    /// Returns the event receiver. Lifecycle transitions arrive as
    /// [`FeedEvent::Connected`] / [`FeedEvent::Disconnected`] /
    /// [`FeedEvent::Error`] in delivery order.
    pub fn connect(&mut self) -> mpsc::Receiver<FeedEvent> {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = mpsc::channel(1024);
        self.command_tx = Some(command_tx);

        let config = self.config.clone();
        let parser = Arc::clone(&self.parser);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            run_connection(config, parser, state, command_rx, event_tx).await;
        });

        event_rx
    }

    /// Subscribe to an additional symbol/channel pair.
    pub async fn subscribe(&self, symbol: &str, channel: &str) -> Result<(), FeedError> {
        self.send_command(FeedCommand::Subscribe {
            symbol: symbol.to_string(),
            channel: channel.to_string(),
        })
        .await
    }

    /// Unsubscribe from a symbol/channel pair.
    pub async fn unsubscribe(&self, symbol: &str, channel: &str) -> Result<(), FeedError> {
        self.send_command(FeedCommand::Unsubscribe {
            symbol: symbol.to_string(),
            channel: channel.to_string(),
        })
        .await
    }

    /// Close the connection and stop the task.
    pub async fn close(&mut self) {
        if let Some(tx) = self.command_tx.take() {
            let _ = tx.send(FeedCommand::Close).await;
        }
        *self.state.lock().await = ConnectionState::Disconnected;
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.lock().await
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    async fn send_command(&self, command: FeedCommand) -> Result<(), FeedError> {
        let tx = self.command_tx.as_ref().ok_or(FeedError::NotConnected)?;
        tx.send(command)
            .await
            .map_err(|e| FeedError::ChannelSend(e.to_string()))
    }
}

/// Backoff for the given 1-based attempt: base doubled per attempt, 30 s cap.
pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let cap = Duration::from_secs(30);
    let doubled = base.saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
    doubled.min(cap)
}

/// The connection task: connect, stream, reconnect.
async fn run_connection(
    config: FeedConfig,
    parser: Arc<dyn TickParser>,
    state: Arc<Mutex<ConnectionState>>,
    mut command_rx: mpsc::Receiver<FeedCommand>,
    event_tx: mpsc::Sender<FeedEvent>,
) {
    let mut reconnect_attempts = 0u32;
    // The aggregator outlives individual connections so a reconnect does not
    // lose the forming bar.
    let mut aggregator = BarAggregator::new(config.timeframe_ms);

    loop {
        *state.lock().await = ConnectionState::Connecting;

        let ws_stream = match connect_async(&config.url).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                tracing::warn!("feed connection failed: {e}");
                if !config.auto_reconnect || reconnect_attempts >= config.max_reconnect_attempts {
                    *state.lock().await = ConnectionState::Error;
                    let _ = event_tx.send(FeedEvent::Error(e.to_string())).await;
                    return;
                }
                reconnect_attempts += 1;
                *state.lock().await = ConnectionState::Reconnecting;
                tokio::time::sleep(backoff_delay(config.reconnect_delay, reconnect_attempts)).await;
                continue;
            }
        };

        reconnect_attempts = 0;
        *state.lock().await = ConnectionState::Connected;
        let _ = event_tx.send(FeedEvent::Connected).await;

        let (mut write, mut read) = ws_stream.split();

        // (Re)subscribe to the configured channel.
        let frame = SubscribeFrame {
            kind: "subscribe",
            symbol: &config.symbol,
            channel: &config.channel,
        };
        if let Ok(json) = serde_json::to_string(&frame) {
            let _ = write.send(Message::Text(json.into())).await;
        }

        let mut batcher = TickBatcher::default();
        let mut batch_tick = interval(config.batch_interval);
        let mut ping_tick = interval(config.ping_interval);

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            handle_payload(
                                &text,
                                parser.as_ref(),
                                &mut aggregator,
                                &mut batcher,
                                &event_tx,
                            )
                            .await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Pong(_))) => {}
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("feed closed by server");
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::warn!("feed socket error: {e}");
                            break;
                        }
                        None => {
                            tracing::info!("feed stream ended");
                            break;
                        }
                        _ => {}
                    }
                }

                cmd = command_rx.recv() => {
                    match cmd {
                        Some(FeedCommand::Subscribe { symbol, channel }) => {
                            let frame = SubscribeFrame { kind: "subscribe", symbol: &symbol, channel: &channel };
                            if let Ok(json) = serde_json::to_string(&frame) {
                                let _ = write.send(Message::Text(json.into())).await;
                            }
                        }
                        Some(FeedCommand::Unsubscribe { symbol, channel }) => {
                            let frame = SubscribeFrame { kind: "unsubscribe", symbol: &symbol, channel: &channel };
                            if let Ok(json) = serde_json::to_string(&frame) {
                                let _ = write.send(Message::Text(json.into())).await;
                            }
                        }
                        Some(FeedCommand::Close) | None => {
                            let _ = write.send(Message::Close(None)).await;
                            *state.lock().await = ConnectionState::Disconnected;
                            let _ = event_tx.send(FeedEvent::Disconnected).await;
                            return;
                        }
                    }
                }

                _ = batch_tick.tick() => {
                    if !batcher.is_empty() {
                        let _ = event_tx.send(FeedEvent::Batch(batcher.take())).await;
                        if let Some(bar) = aggregator.current() {
                            let _ = event_tx.send(FeedEvent::Candle { bar, partial: true }).await;
                        }
                    }
                }

                _ = ping_tick.tick() => {
                    if write.send(Message::Ping(Vec::new().into())).await.is_err() {
                        tracing::warn!("feed ping failed");
                        break;
                    }
                }
            }
        }

        // Connection lost.
        let _ = event_tx.send(FeedEvent::Disconnected).await;
        if !config.auto_reconnect {
            *state.lock().await = ConnectionState::Disconnected;
            return;
        }
        if reconnect_attempts >= config.max_reconnect_attempts {
            *state.lock().await = ConnectionState::Error;
            let _ = event_tx
                .send(FeedEvent::Error(
                    FeedError::ReconnectExhausted {
                        attempts: reconnect_attempts,
                    }
                    .to_string(),
                ))
                .await;
            return;
        }
        reconnect_attempts += 1;
        *state.lock().await = ConnectionState::Reconnecting;
        tokio::time::sleep(backoff_delay(config.reconnect_delay, reconnect_attempts)).await;
    }
}

/// Parse one payload and fan the resulting ticks out as events.
async fn handle_payload(
    raw: &str,
    parser: &dyn TickParser,
    aggregator: &mut BarAggregator,
    batcher: &mut TickBatcher,
    event_tx: &mpsc::Sender<FeedEvent>,
) {
    let Some(parsed) = parser.parse(raw) else {
        tracing::warn!(
            "dropping unparseable feed message: {}",
            &raw[..raw.len().min(120)]
        );
        return;
    };

    for tick in parsed.into_vec() {
        if !validate_tick(&tick) {
            tracing::warn!("dropping malformed tick: {tick:?}");
            continue;
        }
        if let Some(done) = aggregator.push(&tick) {
            let _ = event_tx
                .send(FeedEvent::Candle {
                    bar: done,
                    partial: false,
                })
                .await;
        }
        batcher.push(tick);
        let _ = event_tx.send(FeedEvent::Tick(tick)).await;
    }
}
