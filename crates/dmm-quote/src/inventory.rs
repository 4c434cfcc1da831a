//! Inventory tracking.
//!
//! Tracks signed net position per instrument and realized PnL against the
//! volume-weighted average entry price. The net position feeds the engine's
//! reservation-price skew; the ratio feeds position-limit checks.

use std::collections::HashMap;

use rust_decimal::prelude::Signed;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dmm_core::{Price, Qty, Side};

/// Inventory state for a single instrument.
#[derive(Debug, Clone, Default)]
pub struct InstrumentInventory {
    /// Net position (positive = long, negative = short).
    pub net_position: Decimal,
    /// Average entry price of the current position.
    pub avg_entry: Decimal,
    /// Total number of fills processed.
    pub fill_count: u64,
    /// Realized PnL.
    pub realized_pnl: Decimal,
}

/// Manages inventory across instruments.
#[derive(Debug)]
pub struct InventoryManager {
    inventories: HashMap<String, InstrumentInventory>,
    /// Maximum allowed absolute net position per instrument, in contracts.
    max_position: Decimal,
}

impl InventoryManager {
    pub fn new(max_position: Decimal) -> Self {
        Self {
            inventories: HashMap::new(),
            max_position,
        }
    }

    /// Record a fill and update position, average entry, and realized PnL.
    pub fn record_fill(&mut self, instrument: &str, side: Side, price: Price, qty: Qty) {
        let inv = self.inventories.entry(instrument.to_string()).or_default();
        let fill_qty = qty.abs().inner();
        let fill_price = price.inner();

        let signed_qty = match side {
            Side::Buy => fill_qty,
            Side::Sell => -fill_qty,
        };

        let old_position = inv.net_position;
        let new_position = old_position + signed_qty;

        // Reducing the position realizes PnL against the average entry.
        if (old_position > Decimal::ZERO && signed_qty < Decimal::ZERO)
            || (old_position < Decimal::ZERO && signed_qty > Decimal::ZERO)
        {
            let reduce_amount = signed_qty.abs().min(old_position.abs());
            let pnl = if old_position > Decimal::ZERO {
                // Was long, selling.
                (fill_price - inv.avg_entry) * reduce_amount
            } else {
                // Was short, buying.
                (inv.avg_entry - fill_price) * reduce_amount
            };
            inv.realized_pnl += pnl;
        }

        if new_position.is_zero() {
            inv.avg_entry = Decimal::ZERO;
        } else if new_position.signum() != old_position.signum() && !old_position.is_zero() {
            // Position flipped: the remainder was opened at the fill price.
            inv.avg_entry = fill_price;
        } else if new_position.signum() == signed_qty.signum() || old_position.is_zero() {
            // Adding to the position: volume-weighted average entry.
            let old_notional = old_position.abs() * inv.avg_entry;
            let new_notional = fill_qty * fill_price;
            let total = new_position.abs();
            if !total.is_zero() {
                inv.avg_entry = (old_notional + new_notional) / total;
            }
        }
        // else: reducing without flipping, avg_entry stays.

        inv.net_position = new_position;
        inv.fill_count += 1;
    }

    /// Inventory for an instrument, if any fill has been recorded.
    pub fn get(&self, instrument: &str) -> Option<&InstrumentInventory> {
        self.inventories.get(instrument)
    }

    /// Signed net position; zero for unknown instruments.
    pub fn net_position(&self, instrument: &str) -> Qty {
        Qty::new(
            self.inventories
                .get(instrument)
                .map(|inv| inv.net_position)
                .unwrap_or(Decimal::ZERO),
        )
    }

    /// Net position as a fraction of the maximum, clamped to [-1, 1].
    pub fn inventory_ratio(&self, instrument: &str) -> Decimal {
        if self.max_position.is_zero() {
            return Decimal::ZERO;
        }
        let net = self.net_position(instrument).inner();
        (net / self.max_position).max(dec!(-1)).min(dec!(1))
    }

    /// Whether a fill of `qty` on `side` would push the position past the
    /// configured maximum.
    pub fn would_exceed_max(&self, instrument: &str, side: Side, qty: Qty) -> bool {
        let current = self.net_position(instrument).inner();
        let delta = match side {
            Side::Buy => qty.abs().inner(),
            Side::Sell => -qty.abs().inner(),
        };
        (current + delta).abs() > self.max_position
    }

    /// Whether the absolute net position is within `threshold`.
    pub fn is_delta_neutral(&self, instrument: &str, threshold: Qty) -> bool {
        self.net_position(instrument).abs().inner() <= threshold.abs().inner()
    }

    /// The reduce-only order that would flatten the position, when the net
    /// exceeds `threshold`: long positions sell, short positions buy.
    pub fn flatten_order(&self, instrument: &str, threshold: Qty) -> Option<(Side, Qty)> {
        let net = self.net_position(instrument);
        if self.is_delta_neutral(instrument, threshold) {
            return None;
        }
        let side = if net.is_positive() {
            Side::Sell
        } else {
            Side::Buy
        };
        Some((side, net.abs()))
    }

    /// Realized PnL summed over all instruments.
    pub fn total_realized_pnl(&self) -> Decimal {
        self.inventories.values().map(|inv| inv.realized_pnl).sum()
    }
}
