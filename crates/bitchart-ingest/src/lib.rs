//! Realtime market-data ingest.
//!
//! One streaming connection, a pluggable message parser, tick-to-bar
//! aggregation and interval batching. The connection task owns the socket
//! and forwards [`FeedEvent`]s to the subscriber over a channel; everything
//! transient (drops, malformed payloads) is recovered or ignored locally and
//! only terminal conditions surface as errors.

pub mod aggregator;
pub mod batch;
pub mod error;
pub mod feed;
pub mod parser;

pub use aggregator::BarAggregator;
pub use batch::TickBatcher;
pub use error::FeedError;
pub use feed::{ConnectionState, FeedConfig, FeedEvent, LiveFeed};
pub use parser::{BinanceTradeParser, DefaultParser, Parsed, TickParser};
