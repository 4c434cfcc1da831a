//! Quote price calculation engine.
//!
//! Computes bid/ask prices from:
//! - Top of the local order book (mid price and raw spread)
//! - Signed inventory (skews the reservation price away from exposure)
//! - Current volatility estimate and risk aversion
//! - Order-flow imbalance (shifts both quotes with flow pressure)
//!
//! All output prices are rounded to the instrument tick with
//! round-half-to-even, so repeated runs over the same inputs are
//! exactly reproducible. The computation performs no I/O.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dmm_core::{Price, Qty};

use crate::config::{PricingModel, QuoteConfig};
use crate::error::{QuoteError, QuoteResult};

/// Inputs to one quote computation.
#[derive(Debug, Clone)]
pub struct QuoteInputs {
    /// Best bid on the local book.
    pub best_bid: Price,
    /// Best ask on the local book.
    pub best_ask: Price,
    /// Depth imbalance in [-1, 1] (positive = bid-heavy).
    pub imbalance: Decimal,
    /// Signed net position (positive = long).
    pub inventory: Qty,
    /// Current volatility estimate.
    pub sigma: f64,
}

/// One computed two-sided quote.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteDecision {
    /// Book mid, tick-rounded.
    pub mid_price: Price,
    /// Book spread (ask - bid), tick-rounded.
    pub spread: Decimal,
    /// Best bid, tick-rounded.
    pub best_bid: Price,
    /// Best ask, tick-rounded.
    pub best_ask: Price,
    /// Price to quote on the buy side.
    pub optimal_bid: Price,
    /// Price to quote on the sell side.
    pub optimal_ask: Price,
    /// Inventory-skewed reservation price, unrounded.
    pub reservation_price: Decimal,
}

/// Calculate a two-sided quote.
///
/// # Arguments
/// * `inputs` - Current book top, imbalance, inventory, and volatility
/// * `config` - Model selection and parameters
/// * `gamma` - Effective risk aversion for this cycle (the adaptive
///   controller may have scaled it away from the configured base)
/// * `tick` - Instrument tick size, must be positive
///
/// # Models
/// Time-horizon form:
/// `reservation = mid - q*gamma*sigma^2*T`,
/// `optimal_spread = gamma*sigma^2*T + (2/gamma)*ln(1 + gamma/2)`.
///
/// Arrival-intensity form:
/// `reservation = mid - q*gamma*sigma^2/kappa`,
/// `optimal_spread = gamma*sigma^2/kappa + (2/gamma)*ln(1 + gamma/kappa)`.
pub fn compute_quotes(
    inputs: &QuoteInputs,
    config: &QuoteConfig,
    gamma: f64,
    tick: Price,
) -> QuoteResult<QuoteDecision> {
    if !inputs.best_bid.is_positive() {
        return Err(QuoteError::InsufficientLiquidity("bid"));
    }
    if !inputs.best_ask.is_positive() {
        return Err(QuoteError::InsufficientLiquidity("ask"));
    }
    if !gamma.is_finite() || gamma <= 0.0 {
        return Err(QuoteError::InvalidConfiguration(format!(
            "gamma must be positive, got {gamma}"
        )));
    }

    let bid = inputs.best_bid.inner();
    let ask = inputs.best_ask.inner();
    let mid = (bid + ask) / Decimal::TWO;
    let raw_spread = ask - bid;

    // Model terms run in f64: the spread formulas need ln(). The skew and
    // half-spread come back into Decimal before touching book prices.
    let q = decimal_to_f64(inputs.inventory.inner(), "inventory")?;
    if !inputs.sigma.is_finite() {
        return Err(QuoteError::NonFinite("sigma"));
    }
    let sigma2 = inputs.sigma * inputs.sigma;

    let (skew, optimal_spread) = match config.model {
        PricingModel::TimeHorizon => {
            let t = config.time_horizon;
            let skew = q * gamma * sigma2 * t;
            let spread = gamma * sigma2 * t + (2.0 / gamma) * (1.0 + gamma / 2.0).ln();
            (skew, spread)
        }
        PricingModel::ArrivalIntensity => {
            let k = config.kappa;
            let skew = q * gamma * sigma2 / k;
            let spread = gamma * sigma2 / k + (2.0 / gamma) * (1.0 + gamma / k).ln();
            (skew, spread)
        }
    };

    let reservation = mid - f64_to_decimal(skew, "reservation skew")?;
    let half_spread = f64_to_decimal(optimal_spread / 2.0, "optimal spread")?;

    // Shift both quotes with flow pressure; the quoted spread is unchanged.
    let imbalance_factor = dec!(0.1); // fixed sensitivity
    let clamped_imb = inputs.imbalance.max(dec!(-1)).min(dec!(1));
    let adjustment = imbalance_factor * clamped_imb * raw_spread;

    let raw_bid = reservation - half_spread + adjustment;
    let raw_ask = reservation + half_spread + adjustment;

    Ok(QuoteDecision {
        mid_price: Price::new(mid).round_to_tick(tick),
        spread: Price::new(raw_spread).round_to_tick(tick).inner(),
        best_bid: inputs.best_bid.round_to_tick(tick),
        best_ask: inputs.best_ask.round_to_tick(tick),
        optimal_bid: Price::new(raw_bid).round_to_tick(tick),
        optimal_ask: Price::new(raw_ask).round_to_tick(tick),
        reservation_price: reservation,
    })
}

fn decimal_to_f64(value: Decimal, what: &'static str) -> QuoteResult<f64> {
    value.to_f64().ok_or(QuoteError::NonFinite(what))
}

fn f64_to_decimal(value: f64, what: &'static str) -> QuoteResult<Decimal> {
    if !value.is_finite() {
        return Err(QuoteError::NonFinite(what));
    }
    Decimal::from_f64_retain(value).ok_or(QuoteError::NonFinite(what))
}
