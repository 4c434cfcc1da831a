//! Adaptive risk aversion.
//!
//! Scales gamma with the volatility regime observed in the rolling window:
//! samples below the band tighten spreads, samples above widen them.

use tracing::debug;

use crate::config::AdaptiveGammaConfig;
use crate::volatility::VolatilityWindow;

/// Holds the effective gamma and adjusts it per volatility observation.
#[derive(Debug)]
pub struct GammaController {
    current: f64,
    enabled: bool,
    gamma_min: f64,
    gamma_max: f64,
    band_num_std: f64,
}

impl GammaController {
    pub fn new(base_gamma: f64, config: &AdaptiveGammaConfig) -> Self {
        Self {
            current: base_gamma,
            enabled: config.enabled,
            gamma_min: config.gamma_min,
            gamma_max: config.gamma_max,
            band_num_std: config.band_num_std,
        }
    }

    /// Effective gamma for the current cycle.
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Compare a volatility sample against the window's band and scale gamma.
    ///
    /// The band is `mean ± band_num_std * stddev` and only forms once the
    /// window is full; until then gamma is left untouched.
    pub fn observe(&mut self, sample: f64, window: &VolatilityWindow) {
        if !self.enabled || !window.is_full() {
            return;
        }

        let mean = window.mean();
        let band = self.band_num_std * window.stddev();
        let previous = self.current;

        if sample < mean - band {
            // Calm regime: quote tighter.
            self.current *= 0.9;
        } else if sample > mean + band {
            // Turbulent regime: quote wider.
            self.current *= 1.1;
        }
        self.current = self.current.clamp(self.gamma_min, self.gamma_max);

        if (self.current - previous).abs() > f64::EPSILON {
            debug!(
                gamma = self.current,
                previous, sample, "adjusted risk aversion"
            );
        }
    }
}
