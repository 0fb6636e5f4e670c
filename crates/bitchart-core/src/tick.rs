//! Trade tick types used transiently before bar aggregation.

use serde::{Deserialize, Serialize};

/// Which side initiated a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

/// A single trade event prior to bar aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Milliseconds since the data epoch.
    pub time: f32,
    pub price: f32,
    /// Traded quantity; feeds that do not report size omit it.
    #[serde(default)]
    pub volume: Option<f32>,
    #[serde(default)]
    pub side: Option<Side>,
}

impl Tick {
    pub fn new(time: f32, price: f32) -> Self {
        Self {
            time,
            price,
            volume: None,
            side: None,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    /// Traded quantity, treating an absent volume as zero.
    pub fn volume_or_zero(&self) -> f32 {
        self.volume.unwrap_or(0.0)
    }
}
