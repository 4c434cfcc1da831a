//! Quoting configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{QuoteError, QuoteResult};

/// Which reservation-price / spread formula set to use.
///
/// The model is configurable because the two parameterizations produce
/// different quotes and there is no single obviously-correct choice.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PricingModel {
    /// Parameterized by quoting time horizon `T`.
    #[default]
    TimeHorizon,
    /// Parameterized by order arrival intensity `kappa`.
    ArrivalIntensity,
}

/// Adaptive risk-aversion settings.
///
/// Gamma is scaled by the volatility regime: below the rolling band it
/// shrinks (tighter spreads), above it grows (wider spreads).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveGammaConfig {
    /// Enable gamma adaptation.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Lower clamp for the effective gamma.
    #[serde(default = "default_gamma_min")]
    pub gamma_min: f64,

    /// Upper clamp for the effective gamma.
    #[serde(default = "default_gamma_max")]
    pub gamma_max: f64,

    /// Width of the volatility band in standard deviations.
    #[serde(default = "default_band_num_std")]
    pub band_num_std: f64,
}

impl Default for AdaptiveGammaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gamma_min: default_gamma_min(),
            gamma_max: default_gamma_max(),
            band_num_std: default_band_num_std(),
        }
    }
}

/// Quoting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// Pricing model variant.
    #[serde(default)]
    pub model: PricingModel,

    /// Risk-aversion coefficient. Must be > 0 (division and log argument).
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    /// Quoting time horizon `T` for the time-horizon model.
    #[serde(default = "default_time_horizon")]
    pub time_horizon: f64,

    /// Order arrival intensity `kappa` for the arrival-intensity model.
    /// Must be > 0.
    #[serde(default = "default_kappa")]
    pub kappa: f64,

    /// Quantity per quote, in contracts.
    #[serde(default = "default_order_qty")]
    pub order_qty: Decimal,

    /// Maximum absolute net position, in contracts. Quoting on a side is
    /// skipped when a fill there would exceed this.
    #[serde(default = "default_max_position")]
    pub max_position: Decimal,

    /// Quote refresh interval in milliseconds.
    #[serde(default = "default_quote_interval_ms")]
    pub quote_interval_ms: u64,

    /// Mid-price drift (bps from the last quoted mid) that triggers an early
    /// re-quote before the interval elapses. Zero disables the trigger.
    #[serde(default = "default_requote_drift_bps")]
    pub requote_drift_bps: Decimal,

    /// Minimum time between re-quotes in milliseconds, applied to the drift
    /// trigger so a fast market cannot churn orders.
    #[serde(default = "default_min_requote_interval_ms")]
    pub min_requote_interval_ms: u64,

    /// Samples required before Bollinger gating bands form.
    #[serde(default = "default_bollinger_period")]
    pub bollinger_period: usize,

    /// Width of the gating bands in standard deviations.
    #[serde(default = "default_bollinger_num_std")]
    pub bollinger_num_std: f64,

    /// Capacity of the rolling volatility window.
    #[serde(default = "default_vol_window_capacity")]
    pub vol_window_capacity: usize,

    /// Net position (contracts) beyond which a reduce-only flatten order is
    /// submitted after a fill.
    #[serde(default = "default_flatten_threshold")]
    pub flatten_threshold: Decimal,

    /// How many ticks inside the touch the flatten order is priced.
    #[serde(default = "default_flatten_offset_ticks")]
    pub flatten_offset_ticks: u32,

    /// Adaptive risk-aversion settings.
    #[serde(default)]
    pub adaptive_gamma: AdaptiveGammaConfig,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            model: PricingModel::default(),
            gamma: default_gamma(),
            time_horizon: default_time_horizon(),
            kappa: default_kappa(),
            order_qty: default_order_qty(),
            max_position: default_max_position(),
            quote_interval_ms: default_quote_interval_ms(),
            requote_drift_bps: default_requote_drift_bps(),
            min_requote_interval_ms: default_min_requote_interval_ms(),
            bollinger_period: default_bollinger_period(),
            bollinger_num_std: default_bollinger_num_std(),
            vol_window_capacity: default_vol_window_capacity(),
            flatten_threshold: default_flatten_threshold(),
            flatten_offset_ticks: default_flatten_offset_ticks(),
            adaptive_gamma: AdaptiveGammaConfig::default(),
        }
    }
}

impl QuoteConfig {
    /// Validate model parameters. Called once at startup; failures are fatal.
    pub fn validate(&self) -> QuoteResult<()> {
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(QuoteError::InvalidConfiguration(format!(
                "gamma must be positive, got {}",
                self.gamma
            )));
        }
        if !self.time_horizon.is_finite() || self.time_horizon <= 0.0 {
            return Err(QuoteError::InvalidConfiguration(format!(
                "time_horizon must be positive, got {}",
                self.time_horizon
            )));
        }
        if !self.kappa.is_finite() || self.kappa <= 0.0 {
            return Err(QuoteError::InvalidConfiguration(format!(
                "kappa must be positive, got {}",
                self.kappa
            )));
        }
        if self.order_qty <= Decimal::ZERO {
            return Err(QuoteError::InvalidConfiguration(format!(
                "order_qty must be positive, got {}",
                self.order_qty
            )));
        }
        if self.max_position <= Decimal::ZERO {
            return Err(QuoteError::InvalidConfiguration(format!(
                "max_position must be positive, got {}",
                self.max_position
            )));
        }
        if self.quote_interval_ms == 0 {
            return Err(QuoteError::InvalidConfiguration(
                "quote_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.bollinger_period < 2 {
            return Err(QuoteError::InvalidConfiguration(format!(
                "bollinger_period must be at least 2, got {}",
                self.bollinger_period
            )));
        }
        if !self.bollinger_num_std.is_finite() || self.bollinger_num_std <= 0.0 {
            return Err(QuoteError::InvalidConfiguration(format!(
                "bollinger_num_std must be positive, got {}",
                self.bollinger_num_std
            )));
        }
        if self.vol_window_capacity < self.bollinger_period {
            return Err(QuoteError::InvalidConfiguration(format!(
                "vol_window_capacity ({}) must be at least bollinger_period ({})",
                self.vol_window_capacity, self.bollinger_period
            )));
        }
        if self.requote_drift_bps < Decimal::ZERO {
            return Err(QuoteError::InvalidConfiguration(format!(
                "requote_drift_bps must not be negative, got {}",
                self.requote_drift_bps
            )));
        }
        if self.flatten_threshold < Decimal::ZERO {
            return Err(QuoteError::InvalidConfiguration(format!(
                "flatten_threshold must not be negative, got {}",
                self.flatten_threshold
            )));
        }
        let ag = &self.adaptive_gamma;
        if !ag.gamma_min.is_finite() || ag.gamma_min <= 0.0 || ag.gamma_max < ag.gamma_min {
            return Err(QuoteError::InvalidConfiguration(format!(
                "adaptive gamma bounds must satisfy 0 < gamma_min <= gamma_max, got [{}, {}]",
                ag.gamma_min, ag.gamma_max
            )));
        }
        if !ag.band_num_std.is_finite() || ag.band_num_std <= 0.0 {
            return Err(QuoteError::InvalidConfiguration(format!(
                "adaptive gamma band_num_std must be positive, got {}",
                ag.band_num_std
            )));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
fn default_gamma() -> f64 {
    0.1
}
fn default_time_horizon() -> f64 {
    1.0
}
fn default_kappa() -> f64 {
    1.5
}
fn default_order_qty() -> Decimal {
    Decimal::new(10, 0) // 10 contracts per quote
}
fn default_max_position() -> Decimal {
    Decimal::new(100, 0) // 100 contracts
}
fn default_quote_interval_ms() -> u64 {
    5000 // 5 seconds
}
fn default_requote_drift_bps() -> Decimal {
    Decimal::new(10, 0) // 10 bps
}
fn default_min_requote_interval_ms() -> u64 {
    1000 // 1 second
}
fn default_bollinger_period() -> usize {
    16
}
fn default_bollinger_num_std() -> f64 {
    3.0
}
fn default_vol_window_capacity() -> usize {
    16
}
fn default_flatten_threshold() -> Decimal {
    Decimal::new(20, 0) // 20 contracts
}
fn default_flatten_offset_ticks() -> u32 {
    1
}
fn default_gamma_min() -> f64 {
    0.05
}
fn default_gamma_max() -> f64 {
    0.5
}
fn default_band_num_std() -> f64 {
    2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = QuoteConfig::default();
        assert_eq!(config.model, PricingModel::TimeHorizon);
        assert!((config.gamma - 0.1).abs() < f64::EPSILON);
        assert!((config.time_horizon - 1.0).abs() < f64::EPSILON);
        assert!((config.kappa - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.order_qty, dec!(10));
        assert_eq!(config.quote_interval_ms, 5000);
        assert_eq!(config.bollinger_period, 16);
        assert!((config.bollinger_num_std - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.vol_window_capacity, 16);
        assert!(config.adaptive_gamma.enabled);
        assert!((config.adaptive_gamma.gamma_min - 0.05).abs() < f64::EPSILON);
        assert!((config.adaptive_gamma.gamma_max - 0.5).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serde_defaults() {
        let toml_str = r#"
model = "arrival-intensity"
gamma = 0.2
"#;
        let config: QuoteConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.model, PricingModel::ArrivalIntensity);
        assert!((config.gamma - 0.2).abs() < f64::EPSILON);
        // Everything else falls back to defaults.
        assert_eq!(config.order_qty, dec!(10));
        assert_eq!(config.bollinger_period, 16);
    }

    #[test]
    fn test_validate_rejects_bad_gamma() {
        let config = QuoteConfig {
            gamma: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = QuoteConfig {
            gamma: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_kappa() {
        let config = QuoteConfig {
            kappa: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_window_smaller_than_period() {
        let config = QuoteConfig {
            bollinger_period: 16,
            vol_window_capacity: 8,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_gamma_bounds() {
        let config = QuoteConfig {
            adaptive_gamma: AdaptiveGammaConfig {
                gamma_min: 0.5,
                gamma_max: 0.1,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
