//! Pluggable tick parsers.
//!
//! A parser maps one protocol-specific payload to zero, one or many ticks.
//! The default parser accepts two shapes, dispatching on a field
//! fingerprint: a plain `{time, price, volume?, side?}` object, or the
//! Binance `trade`/`aggTrade` form `{e, T, p, q, m}` where prices and
//! quantities are decimal strings and `m = true` marks a seller-initiated
//! trade. Arrays of either shape parse element-wise.

use serde::Deserialize;

use bitchart_core::{Side, Tick};

/// Parse result: a single tick or a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    One(Tick),
    Many(Vec<Tick>),
}

impl Parsed {
    pub fn into_vec(self) -> Vec<Tick> {
        match self {
            Parsed::One(tick) => vec![tick],
            Parsed::Many(ticks) => ticks,
        }
    }
}

/// Strategy interface for protocol-specific message parsing.
pub trait TickParser: Send + Sync {
    /// Map a raw text payload to ticks. `None` means the message carries no
    /// tick data (acks, heartbeats, unknown shapes).
    fn parse(&self, raw: &str) -> Option<Parsed>;
}

/// Binance `trade` / `aggTrade` stream payload.
#[derive(Debug, Deserialize)]
struct BinanceTrade {
    e: String,
    #[serde(rename = "T")]
    time: i64,
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "q")]
    quantity: String,
    /// Buyer is the maker, i.e. the trade was seller-initiated.
    #[serde(rename = "m")]
    buyer_is_maker: bool,
}

impl BinanceTrade {
    fn into_tick(self) -> Option<Tick> {
        if self.e != "trade" && self.e != "aggTrade" {
            return None;
        }
        let price: f32 = self.price.parse().ok()?;
        let quantity: f32 = self.quantity.parse().ok()?;
        Some(
            Tick::new(self.time as f32, price)
                .with_volume(quantity)
                .with_side(if self.buyer_is_maker {
                    Side::Sell
                } else {
                    Side::Buy
                }),
        )
    }
}

/// Parser for the Binance trade stream only.
#[derive(Debug, Default)]
pub struct BinanceTradeParser;

impl TickParser for BinanceTradeParser {
    fn parse(&self, raw: &str) -> Option<Parsed> {
        let trade: BinanceTrade = serde_json::from_str(raw).ok()?;
        trade.into_tick().map(Parsed::One)
    }
}

/// Default parser accepting both the plain tick shape and the Binance trade
/// shape, single objects or arrays.
#[derive(Debug, Default)]
pub struct DefaultParser;

impl DefaultParser {
    fn parse_value(value: &serde_json::Value) -> Option<Tick> {
        let obj = value.as_object()?;
        if obj.contains_key("e") {
            let trade: BinanceTrade = serde_json::from_value(value.clone()).ok()?;
            return trade.into_tick();
        }
        if obj.contains_key("time") && obj.contains_key("price") {
            return serde_json::from_value(value.clone()).ok();
        }
        None
    }
}

impl TickParser for DefaultParser {
    fn parse(&self, raw: &str) -> Option<Parsed> {
        let value: serde_json::Value = serde_json::from_str(raw).ok()?;
        match &value {
            serde_json::Value::Array(items) => {
                let ticks: Vec<Tick> = items.iter().filter_map(Self::parse_value).collect();
                if ticks.is_empty() {
                    None
                } else {
                    Some(Parsed::Many(ticks))
                }
            }
            _ => Self::parse_value(&value).map(Parsed::One),
        }
    }
}
