//! Integration tests for the live feed against a local WebSocket server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use bitchart_ingest::{ConnectionState, FeedConfig, FeedEvent, LiveFeed};

/// Start a one-shot server that waits for the subscribe frame, streams the
/// given payloads, then closes.
async fn spawn_server(payloads: Vec<String>) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        // First inbound frame must be the subscription.
        let subscribe = loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => break text.to_string(),
                Message::Ping(data) => {
                    let _ = ws.send(Message::Pong(data)).await;
                }
                other => panic!("unexpected pre-subscribe frame: {other:?}"),
            }
        };

        for payload in payloads {
            ws.send(Message::Text(payload.into())).await.unwrap();
        }
        let _ = ws.send(Message::Close(None)).await;
        subscribe
    });

    (format!("ws://{addr}"), handle)
}

fn test_config(url: String) -> FeedConfig {
    FeedConfig {
        url,
        symbol: "btcusdt".to_string(),
        channel: "trade".to_string(),
        timeframe_ms: 60_000,
        batch_interval: Duration::from_millis(20),
        ping_interval: Duration::from_secs(30),
        auto_reconnect: false,
        max_reconnect_attempts: 0,
        reconnect_delay: Duration::from_millis(10),
    }
}

async fn next_event(rx: &mut tokio::sync::mpsc::Receiver<FeedEvent>) -> FeedEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for feed event")
        .expect("feed event channel closed")
}

#[tokio::test]
async fn test_connect_stream_and_disconnect() {
    let (url, server) = spawn_server(vec![
        r#"{"time": 1000.0, "price": 100.0, "volume": 1.0}"#.to_string(),
        r#"{"time": 2000.0, "price": 101.0, "volume": 2.0}"#.to_string(),
        // Next bucket: completes the first bar.
        r#"{"time": 61000.0, "price": 102.0, "volume": 1.0}"#.to_string(),
    ])
    .await;

    let mut feed = LiveFeed::new(test_config(url));
    let mut rx = feed.connect();

    assert!(matches!(next_event(&mut rx).await, FeedEvent::Connected));

    let mut ticks = 0;
    let mut completed_bars = Vec::new();
    let mut saw_batch = false;
    loop {
        match next_event(&mut rx).await {
            FeedEvent::Tick(_) => ticks += 1,
            FeedEvent::Candle { bar, partial: false } => completed_bars.push(bar),
            FeedEvent::Candle { partial: true, .. } => {}
            FeedEvent::Batch(batch) => saw_batch = !batch.is_empty() || saw_batch,
            FeedEvent::Disconnected => break,
            FeedEvent::Error(e) => panic!("unexpected feed error: {e}"),
            FeedEvent::Connected => panic!("duplicate Connected"),
        }
    }

    assert_eq!(ticks, 3);
    assert_eq!(completed_bars.len(), 1);
    let bar = completed_bars[0];
    assert_eq!(bar.time, 0.0);
    assert_eq!(bar.open, 100.0);
    assert_eq!(bar.close, 101.0);
    assert_eq!(bar.volume, 3.0);
    assert!(saw_batch);

    // The server saw the documented subscribe frame.
    let subscribe = server.await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&subscribe).unwrap();
    assert_eq!(value["type"], "subscribe");
    assert_eq!(value["symbol"], "btcusdt");
    assert_eq!(value["channel"], "trade");

    assert_eq!(feed.state().await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_malformed_messages_do_not_kill_the_stream() {
    let (url, _server) = spawn_server(vec![
        "garbage".to_string(),
        r#"{"unrelated": true}"#.to_string(),
        r#"{"time": 1000.0, "price": 100.0}"#.to_string(),
    ])
    .await;

    let mut feed = LiveFeed::new(test_config(url));
    let mut rx = feed.connect();

    assert!(matches!(next_event(&mut rx).await, FeedEvent::Connected));
    // The only event before disconnect is the one valid tick.
    loop {
        match next_event(&mut rx).await {
            FeedEvent::Tick(tick) => {
                assert_eq!(tick.price, 100.0);
            }
            FeedEvent::Disconnected => break,
            FeedEvent::Candle { partial: true, .. } | FeedEvent::Batch(_) => {}
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_unreachable_host_without_reconnect_is_terminal_error() {
    // Nothing listens on this port.
    let mut config = test_config("ws://127.0.0.1:1".to_string());
    config.auto_reconnect = false;

    let mut feed = LiveFeed::new(config);
    let mut rx = feed.connect();

    assert!(matches!(next_event(&mut rx).await, FeedEvent::Error(_)));
    assert_eq!(feed.state().await, ConnectionState::Error);
}

#[tokio::test]
async fn test_reconnect_after_server_close() {
    // First connection: server closes immediately after subscribe. The feed
    // reconnects to the same address; a second server instance then streams.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // Session one: accept and close.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let _ = ws.next().await; // subscribe frame
        let _ = ws.send(Message::Close(None)).await;
        drop(ws);

        // Session two: accept and stream one tick.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let _ = ws.next().await; // subscribe frame
        ws.send(Message::Text(
            r#"{"time": 1000.0, "price": 55.0}"#.to_string().into(),
        ))
        .await
        .unwrap();
        let _ = ws.send(Message::Close(None)).await;
    });

    let mut config = test_config(format!("ws://{addr}"));
    config.auto_reconnect = true;
    config.max_reconnect_attempts = 3;
    config.reconnect_delay = Duration::from_millis(10);

    let mut feed = LiveFeed::new(config);
    let mut rx = feed.connect();

    let mut connects = 0;
    let mut got_tick = false;
    loop {
        match next_event(&mut rx).await {
            FeedEvent::Connected => connects += 1,
            FeedEvent::Tick(tick) => {
                assert_eq!(tick.price, 55.0);
                got_tick = true;
                break;
            }
            FeedEvent::Disconnected | FeedEvent::Batch(_) | FeedEvent::Candle { .. } => {}
            FeedEvent::Error(e) => panic!("unexpected feed error: {e}"),
        }
    }
    assert_eq!(connects, 2);
    assert!(got_tick);

    feed.close().await;
    server.await.unwrap();
}
