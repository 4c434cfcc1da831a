//! Instrument specification.
//!
//! Static metadata the quoting loop validates its orders against. Loaded
//! from configuration; a live deployment would refresh it from the venue's
//! instrument endpoint at startup.

use crate::error::{CoreError, Result};
use crate::{Price, Qty};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instrument metadata: tick/lot constraints and contract multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    /// Venue instrument name (e.g. "BTC-PERPETUAL").
    pub name: String,

    /// Minimum price increment. Quoted prices must be multiples of it.
    pub tick_size: Price,

    /// Minimum quantity increment.
    pub lot_size: Qty,

    /// Contract multiplier (quote units per contract).
    #[serde(default = "default_contract_size")]
    pub contract_size: Decimal,

    /// Smallest accepted order quantity.
    pub min_order_qty: Qty,
}

fn default_contract_size() -> Decimal {
    Decimal::ONE
}

impl InstrumentSpec {
    /// Validate the spec. Non-positive tick or lot sizes are configuration
    /// errors and fatal at startup.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(CoreError::InvalidInstrument("empty instrument name".into()));
        }
        if !self.tick_size.is_positive() {
            return Err(CoreError::InvalidInstrument(format!(
                "{}: tick_size must be positive, got {}",
                self.name, self.tick_size
            )));
        }
        if !self.lot_size.is_positive() {
            return Err(CoreError::InvalidInstrument(format!(
                "{}: lot_size must be positive, got {}",
                self.name, self.lot_size
            )));
        }
        if self.contract_size <= Decimal::ZERO {
            return Err(CoreError::InvalidInstrument(format!(
                "{}: contract_size must be positive, got {}",
                self.name, self.contract_size
            )));
        }
        if self.min_order_qty.is_negative() {
            return Err(CoreError::InvalidInstrument(format!(
                "{}: min_order_qty must not be negative, got {}",
                self.name, self.min_order_qty
            )));
        }
        Ok(())
    }

    /// Round a quote price onto the instrument grid (half-to-even).
    pub fn round_price(&self, price: Price) -> Price {
        price.round_to_tick(self.tick_size)
    }

    /// Round an order quantity down onto the lot grid.
    pub fn round_qty(&self, qty: Qty) -> Qty {
        qty.floor_to_lot(self.lot_size)
    }

    /// Whether a rounded quantity is large enough to submit.
    pub fn meets_min_qty(&self, qty: Qty) -> bool {
        qty >= self.min_order_qty && qty.is_positive()
    }
}

impl fmt::Display for InstrumentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (tick {}, lot {})", self.name, self.tick_size, self.lot_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn spec() -> InstrumentSpec {
        InstrumentSpec {
            name: "BTC-PERPETUAL".to_string(),
            tick_size: Price::new(dec!(0.5)),
            lot_size: Qty::new(dec!(10)),
            contract_size: dec!(10),
            min_order_qty: Qty::new(dec!(10)),
        }
    }

    #[test]
    fn test_valid_spec() {
        assert!(spec().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_tick() {
        let mut s = spec();
        s.tick_size = Price::ZERO;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_lot() {
        let mut s = spec();
        s.lot_size = Qty::new(dec!(-1));
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_round_price_to_grid() {
        let s = spec();
        assert_eq!(s.round_price(Price::new(dec!(100.3))), Price::new(dec!(100.5)));
    }

    #[test]
    fn test_qty_rounds_down_and_min_check() {
        let s = spec();
        let q = s.round_qty(Qty::new(dec!(25)));
        assert_eq!(q, Qty::new(dec!(20)));
        assert!(s.meets_min_qty(q));
        assert!(!s.meets_min_qty(Qty::new(dec!(0))));
    }
}
