//! Configuration management for BitChart.
//!
//! Loads configuration from TOML files. Every section and field has a
//! default, so a partial (or absent) file always yields a usable config.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use bitchart_core::Theme;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub feed: FeedSection,
    pub store: StoreSection,
    pub render: RenderSection,
    pub lod: LodSection,
    pub theme: Theme,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from default locations.
    ///
    /// Searches in order:
    /// 1. `./bitchart.toml`
    /// 2. `~/.config/bitchart/bitchart.toml`
    ///
    /// Returns defaults if no file is found.
    pub fn load_default() -> Self {
        if let Ok(config) = Self::load("bitchart.toml") {
            return config;
        }
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("bitchart").join("bitchart.toml");
            if let Ok(config) = Self::load(&path) {
                return config;
            }
        }
        Self::default()
    }

    /// Save configuration to a file path.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("bitchart.toml")
    }
}

/// General application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Symbol to subscribe to on startup.
    pub symbol: String,
    /// Bar timeframe in milliseconds.
    pub timeframe_ms: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            symbol: "btcusdt".to_string(),
            timeframe_ms: 60_000,
        }
    }
}

/// Realtime feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSection {
    pub ws_url: String,
    pub channel: String,
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
    pub batch_interval_ms: u64,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            ws_url: "wss://stream.binance.com:9443/ws".to_string(),
            channel: "trade".to_string(),
            auto_reconnect: true,
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 1_000,
            batch_interval_ms: 100,
        }
    }
}

/// Shared data store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// `"growable"` or `"ring"`.
    pub mode: String,
    pub initial_capacity: usize,
    pub max_capacity: usize,
    /// When false, workers receive owned copies instead of a shared view.
    pub shared: bool,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            mode: "growable".to_string(),
            initial_capacity: 1024,
            max_capacity: 1 << 20,
            shared: true,
        }
    }
}

/// Render worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSection {
    pub target_fps: u32,
    /// Fraction of the data span kept as headroom right of the last bar.
    pub right_padding: f64,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            target_fps: 60,
            right_padding: 0.05,
        }
    }
}

/// Level-of-detail configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LodSection {
    /// Visible-bar thresholds at which each decimation level engages.
    pub thresholds: Vec<usize>,
    /// Hysteresis band as a fraction of the visible count.
    pub hysteresis: f64,
}

impl Default for LodSection {
    fn default() -> Self {
        Self {
            thresholds: vec![0, 4_000, 8_000, 16_000, 32_000, 64_000],
            hysteresis: 0.10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.symbol, "btcusdt");
        assert_eq!(config.general.timeframe_ms, 60_000);
        assert!(config.feed.auto_reconnect);
        assert_eq!(config.store.mode, "growable");
        assert_eq!(config.render.target_fps, 60);
        assert_eq!(config.lod.thresholds.len(), 6);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml = r#"
[general]
symbol = "ethusdt"

[feed]
max_reconnect_attempts = 10

[store]
mode = "ring"
max_capacity = 4096
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.general.symbol, "ethusdt");
        // Unspecified fields fall back to defaults.
        assert_eq!(config.general.timeframe_ms, 60_000);
        assert_eq!(config.feed.max_reconnect_attempts, 10);
        assert_eq!(config.feed.reconnect_delay_ms, 1_000);
        assert_eq!(config.store.mode, "ring");
        assert_eq!(config.store.max_capacity, 4096);
        assert_eq!(config.render.target_fps, 60);
    }

    #[test]
    fn test_roundtrip() {
        let mut config = Config::default();
        config.general.symbol = "solusdt".to_string();
        config.render.target_fps = 144;

        let serialized = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(back.general.symbol, "solusdt");
        assert_eq!(back.render.target_fps, 144);
    }

    #[test]
    fn test_theme_in_config() {
        let toml = r#"
[theme]
up = [0.0, 1.0, 0.0, 1.0]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.theme.up, [0.0, 1.0, 0.0, 1.0]);
        // Other theme fields keep the dark defaults.
        assert_eq!(config.theme.down, Theme::dark().down);
    }
}
