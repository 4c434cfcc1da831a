//! Precision-safe decimal types for quoting.
//!
//! Wraps `rust_decimal` so prices and quantities cannot be mixed up in
//! calculations and so every rounding site states its policy. Quote prices
//! are rounded to tick with round-half-to-even (bankers' rounding): the
//! half-tick case must resolve the same way on every run because downstream
//! checks compare quotes for exact equality.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

/// Price with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Round to the nearest multiple of `tick`, half-to-even.
    ///
    /// A zero tick leaves the price unchanged.
    #[inline]
    pub fn round_to_tick(&self, tick: Price) -> Self {
        if tick.is_zero() {
            return *self;
        }
        let ticks = (self.0 / tick.0).round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        Self(ticks * tick.0)
    }

    /// Round down to the previous multiple of `tick`.
    #[inline]
    pub fn floor_to_tick(&self, tick: Price) -> Self {
        if tick.is_zero() {
            return *self;
        }
        Self((self.0 / tick.0).floor() * tick.0)
    }

    /// Basis points of `self` relative to `other`, `None` if `other` is zero.
    #[inline]
    pub fn bps_from(&self, other: Price) -> Option<Decimal> {
        if other.is_zero() {
            return None;
        }
        Some((self.0 - other.0) / other.0 * Decimal::from(10_000))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Price {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

/// Quantity with exact decimal precision.
///
/// Signed: a negative `Qty` is a net short position. Order quantities are
/// always positive; inventory arithmetic uses the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qty(pub Decimal);

impl Qty {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    #[inline]
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Round down to the previous multiple of `lot`.
    ///
    /// Quantities never round up: an over-rounded order could exceed the
    /// intended exposure.
    #[inline]
    pub fn floor_to_lot(&self, lot: Qty) -> Self {
        if lot.is_zero() {
            return *self;
        }
        Self((self.0 / lot.0).floor() * lot.0)
    }

    /// Notional value: quantity * price.
    #[inline]
    pub fn notional(&self, price: Price) -> Decimal {
        self.0 * price.0
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Qty {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Qty {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Qty {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Qty {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Qty {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Qty {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

impl Neg for Qty {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_to_tick_nearest() {
        let tick = Price::new(dec!(0.5));

        // 100.2 / 0.5 = 200.4 -> 200 ticks -> 100.0
        assert_eq!(Price::new(dec!(100.2)).round_to_tick(tick).0, dec!(100.0));
        // 100.3 / 0.5 = 200.6 -> 201 ticks -> 100.5
        assert_eq!(Price::new(dec!(100.3)).round_to_tick(tick).0, dec!(100.5));
    }

    #[test]
    fn test_round_to_tick_half_to_even() {
        let tick = Price::new(dec!(0.5));

        // 100.25 / 0.5 = 200.5: midpoint, rounds to the even 200 -> 100.0
        assert_eq!(Price::new(dec!(100.25)).round_to_tick(tick).0, dec!(100.0));
        // 100.75 / 0.5 = 201.5: midpoint, rounds to the even 202 -> 101.0
        assert_eq!(Price::new(dec!(100.75)).round_to_tick(tick).0, dec!(101.0));
    }

    #[test]
    fn test_round_to_tick_zero_tick_is_identity() {
        let p = Price::new(dec!(123.456));
        assert_eq!(p.round_to_tick(Price::ZERO), p);
    }

    #[test]
    fn test_floor_to_tick() {
        let tick = Price::new(dec!(0.01));
        assert_eq!(Price::new(dec!(12345.6789)).floor_to_tick(tick).0, dec!(12345.67));
    }

    #[test]
    fn test_price_bps() {
        let p1 = Price::new(dec!(100));
        let p2 = Price::new(dec!(101));
        assert_eq!(p2.bps_from(p1).unwrap(), dec!(100)); // 1% = 100 bps
        assert_eq!(p1.bps_from(Price::ZERO), None);
    }

    #[test]
    fn test_qty_floor_to_lot() {
        let lot = Qty::new(dec!(0.001));
        assert_eq!(Qty::new(dec!(1.2345)).floor_to_lot(lot).0, dec!(1.234));
    }

    #[test]
    fn test_qty_sign_helpers() {
        let long = Qty::new(dec!(2.5));
        let short = -long;
        assert!(long.is_positive());
        assert!(short.is_negative());
        assert_eq!(short.abs(), long);
        assert!(Qty::ZERO.abs().is_zero());
    }

    #[test]
    fn test_notional() {
        let qty = Qty::new(dec!(0.5));
        let price = Price::new(dec!(50000));
        assert_eq!(qty.notional(price), dec!(25000));
    }
}
