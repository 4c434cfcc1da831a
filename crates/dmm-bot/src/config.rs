//! Application configuration.

use std::path::Path;

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use dmm_core::{InstrumentSpec, Price, Qty};
use dmm_quote::QuoteConfig;

use crate::error::{AppError, AppResult};

/// Feed source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Path to a captured JSONL feed, replayed in arrival order.
    #[serde(default = "default_replay_path")]
    pub replay_path: String,

    /// Bound of the ordered feed event queue.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Pause between replayed frames, in milliseconds. Zero replays as fast
    /// as the loop consumes.
    #[serde(default)]
    pub replay_delay_ms: u64,
}

fn default_replay_path() -> String {
    "data/replay.jsonl".to_string()
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            replay_path: default_replay_path(),
            channel_capacity: default_channel_capacity(),
            replay_delay_ms: 0,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Instrument the engine quotes.
    #[serde(default = "default_instrument")]
    pub instrument: InstrumentSpec,

    /// Quoting parameters.
    #[serde(default)]
    pub quote: QuoteConfig,

    /// Feed source settings.
    #[serde(default)]
    pub feed: FeedConfig,
}

fn default_instrument() -> InstrumentSpec {
    // Deribit BTC perpetual contract terms.
    InstrumentSpec {
        name: "BTC-PERPETUAL".to_string(),
        tick_size: Price::new(dec!(0.5)),
        lot_size: Qty::new(dec!(10)),
        contract_size: dec!(10),
        min_order_qty: Qty::new(dec!(10)),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            instrument: default_instrument(),
            quote: QuoteConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `DMM_CONFIG` (or `config/default.toml`), falling back to
    /// defaults when no file exists.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var("DMM_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Validate instrument and quoting parameters. Failures are fatal at
    /// startup.
    pub fn validate(&self) -> AppResult<()> {
        self.instrument.validate()?;
        self.quote.validate()?;
        if self.feed.channel_capacity == 0 {
            return Err(AppError::Config(
                "feed.channel_capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.instrument.name, "BTC-PERPETUAL");
        assert_eq!(config.instrument.tick_size, Price::new(dec!(0.5)));
        assert_eq!(config.feed.channel_capacity, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[instrument]
name = "ETH-PERPETUAL"
tick_size = "0.05"
lot_size = "1"
min_order_qty = "1"

[quote]
gamma = 0.2
order_qty = "5"

[feed]
replay_path = "captures/eth.jsonl"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.instrument.name, "ETH-PERPETUAL");
        assert_eq!(config.instrument.tick_size, Price::new(dec!(0.05)));
        // Omitted contract_size falls back to 1.
        assert_eq!(config.instrument.contract_size, dec!(1));
        assert!((config.quote.gamma - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.quote.order_qty, dec!(5));
        assert_eq!(config.feed.replay_path, "captures/eth.jsonl");
        // Omitted sections fall back to defaults.
        assert_eq!(config.feed.channel_capacity, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_instrument() {
        let mut config = AppConfig::default();
        config.instrument.tick_size = Price::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_quote_params() {
        let mut config = AppConfig::default();
        config.quote.gamma = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = AppConfig::default();
        config.feed.channel_capacity = 0;
        assert!(config.validate().is_err());
    }
}
