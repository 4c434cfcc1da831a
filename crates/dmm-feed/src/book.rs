//! Local mirror of the exchange order book.
//!
//! Rebuilt from a snapshot and kept in sync by sequenced diffs. A diff whose
//! `prev_sequence_id` does not match the last applied sequence id marks the
//! book stale; every further diff is rejected until a fresh snapshot is
//! applied. A merely-logged gap would leave the mirror silently inconsistent
//! forever, so staleness is enforced here rather than left to callers.

use crate::error::{FeedError, FeedResult};
use crate::messages::{BookLevel, LevelAction, LevelOp};
use dmm_core::{Price, Qty};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::warn;

/// Two-sided price-indexed book with sequence tracking.
#[derive(Debug, Default)]
pub struct OrderBook {
    bids: BTreeMap<Price, Qty>,
    asks: BTreeMap<Price, Qty>,
    last_sequence_id: Option<u64>,
    stale: bool,
}

impl OrderBook {
    /// Create an empty, never-snapshotted book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole book. Always succeeds and clears staleness; this is
    /// the only operation allowed to discard prior state.
    ///
    /// Levels with zero quantity are not inserted.
    pub fn apply_snapshot(&mut self, bids: &[BookLevel], asks: &[BookLevel], sequence_id: u64) {
        self.bids.clear();
        self.asks.clear();
        for level in bids {
            if !level.qty.is_zero() {
                self.bids.insert(level.price, level.qty);
            }
        }
        for level in asks {
            if !level.qty.is_zero() {
                self.asks.insert(level.price, level.qty);
            }
        }
        self.last_sequence_id = Some(sequence_id);
        self.stale = false;

        if self.is_crossed() {
            warn!(sequence_id, "snapshot produced a crossed book");
        }
    }

    /// Apply a sequenced diff.
    ///
    /// Fails with `SequenceGap` (leaving all levels untouched) when
    /// `prev_sequence_id` does not match the tracked sequence id, when the
    /// book has never been snapshotted, or when a previous gap has not yet
    /// been healed by a snapshot. On success, ops are applied in the order
    /// given: bid ops first, then ask ops.
    pub fn apply_diff(
        &mut self,
        prev_sequence_id: u64,
        sequence_id: u64,
        bid_ops: &[LevelOp],
        ask_ops: &[LevelOp],
    ) -> FeedResult<()> {
        if self.stale || self.last_sequence_id != Some(prev_sequence_id) {
            self.stale = true;
            return Err(FeedError::SequenceGap {
                expected: self.last_sequence_id,
                got: prev_sequence_id,
            });
        }

        for op in bid_ops {
            Self::apply_op(&mut self.bids, op);
        }
        for op in ask_ops {
            Self::apply_op(&mut self.asks, op);
        }
        self.last_sequence_id = Some(sequence_id);

        if self.is_crossed() {
            warn!(sequence_id, "diff produced a crossed book");
        }
        Ok(())
    }

    fn apply_op(side: &mut BTreeMap<Price, Qty>, op: &LevelOp) {
        match op.action {
            LevelAction::Upsert => {
                if op.qty.is_zero() {
                    // An upsert to zero quantity is a removal.
                    side.remove(&op.price);
                } else {
                    side.insert(op.price, op.qty);
                }
            }
            LevelAction::Delete => {
                // Removing an absent level is not an error.
                side.remove(&op.price);
            }
        }
    }

    /// Highest-priced resting bid.
    pub fn best_bid(&self) -> Option<BookLevel> {
        self.bids
            .iter()
            .next_back()
            .map(|(p, q)| BookLevel::new(*p, *q))
    }

    /// Lowest-priced resting ask.
    pub fn best_ask(&self) -> Option<BookLevel> {
        self.asks.iter().next().map(|(p, q)| BookLevel::new(*p, *q))
    }

    /// Midpoint of the best bid and ask. `None` unless both sides rest.
    pub fn mid_price(&self) -> Option<Price> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some((bid.price + ask.price) / Decimal::TWO)
    }

    /// Best ask minus best bid. `None` unless both sides rest.
    pub fn spread(&self) -> Option<Price> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some(ask.price - bid.price)
    }

    /// Volume-weighted mid over the top of book:
    /// `(bid*bid_qty + ask*ask_qty) / (bid_qty + ask_qty)`.
    pub fn weighted_mid(&self) -> Option<Price> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        let total = bid.qty + ask.qty;
        if total.is_zero() {
            return None;
        }
        let weighted = bid.qty.notional(bid.price) + ask.qty.notional(ask.price);
        Some(Price::new(weighted / total.inner()))
    }

    /// `(buy_volume - sell_volume) / (buy_volume + sell_volume)` over all
    /// resting quantity. Zero when both sides are empty.
    pub fn imbalance(&self) -> Decimal {
        let buy_volume: Decimal = self.bids.values().map(|q| q.inner()).sum();
        let sell_volume: Decimal = self.asks.values().map(|q| q.inner()).sum();
        let total = buy_volume + sell_volume;
        if total.is_zero() {
            return Decimal::ZERO;
        }
        (buy_volume - sell_volume) / total
    }

    /// Last applied sequence id; `None` before the first snapshot.
    pub fn last_sequence_id(&self) -> Option<u64> {
        self.last_sequence_id
    }

    /// True after a detected gap, until the next snapshot.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// True when both sides rest and pricing is usable.
    pub fn has_both_sides(&self) -> bool {
        !self.bids.is_empty() && !self.asks.is_empty()
    }

    /// Resting level counts, `(bids, asks)`.
    pub fn depth(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }

    fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: Decimal, qty: Decimal) -> BookLevel {
        BookLevel::new(Price::new(price), Qty::new(qty))
    }

    fn seeded_book() -> OrderBook {
        let mut book = OrderBook::new();
        book.apply_snapshot(
            &[level(dec!(99.5), dec!(10)), level(dec!(99.0), dec!(5))],
            &[level(dec!(100.5), dec!(4)), level(dec!(101.0), dec!(8))],
            7,
        );
        book
    }

    #[test]
    fn test_snapshot_and_best_levels() {
        let book = seeded_book();
        assert_eq!(book.best_bid().unwrap().price, Price::new(dec!(99.5)));
        assert_eq!(book.best_ask().unwrap().price, Price::new(dec!(100.5)));
        assert_eq!(book.last_sequence_id(), Some(7));
        assert_eq!(book.mid_price().unwrap(), Price::new(dec!(100.0)));
        assert_eq!(book.spread().unwrap(), Price::new(dec!(1.0)));
    }

    #[test]
    fn test_snapshot_idempotent() {
        let mut book = seeded_book();
        let before = (book.best_bid(), book.best_ask(), book.depth(), book.imbalance());
        book.apply_snapshot(
            &[level(dec!(99.5), dec!(10)), level(dec!(99.0), dec!(5))],
            &[level(dec!(100.5), dec!(4)), level(dec!(101.0), dec!(8))],
            7,
        );
        let after = (book.best_bid(), book.best_ask(), book.depth(), book.imbalance());
        assert_eq!(before, after);
    }

    #[test]
    fn test_diff_chain_matches_direct_replay() {
        let mut book = seeded_book();

        // seq 7 -> 8: improve the bid, eat into the ask.
        book.apply_diff(
            7,
            8,
            &[LevelOp::upsert(Price::new(dec!(99.8)), Qty::new(dec!(3)))],
            &[LevelOp::upsert(Price::new(dec!(100.5)), Qty::new(dec!(2)))],
        )
        .unwrap();

        // seq 8 -> 9: drop the old best bid, remove an ask outright.
        book.apply_diff(
            8,
            9,
            &[LevelOp::delete(Price::new(dec!(99.5)))],
            &[LevelOp::upsert(Price::new(dec!(101.0)), Qty::ZERO)],
        )
        .unwrap();

        assert_eq!(book.best_bid().unwrap(), level(dec!(99.8), dec!(3)));
        assert_eq!(book.best_ask().unwrap(), level(dec!(100.5), dec!(2)));
        assert_eq!(book.depth(), (2, 1));
        assert_eq!(book.last_sequence_id(), Some(9));
    }

    #[test]
    fn test_gap_rejected_and_book_unchanged() {
        let mut book = seeded_book();
        let before = (book.best_bid(), book.best_ask(), book.depth());

        let err = book
            .apply_diff(
                12, // book is at 7
                13,
                &[LevelOp::upsert(Price::new(dec!(50.0)), Qty::new(dec!(1)))],
                &[],
            )
            .unwrap_err();

        match err {
            FeedError::SequenceGap { expected, got } => {
                assert_eq!(expected, Some(7));
                assert_eq!(got, 12);
            }
            other => panic!("expected SequenceGap, got {other:?}"),
        }
        assert_eq!((book.best_bid(), book.best_ask(), book.depth()), before);
        assert!(book.is_stale());
    }

    #[test]
    fn test_stale_book_rejects_even_chaining_diffs() {
        let mut book = seeded_book();
        let _ = book.apply_diff(12, 13, &[], &[]);
        assert!(book.is_stale());

        // prev matches the last applied id, but the gap has not been healed.
        assert!(book.apply_diff(7, 8, &[], &[]).is_err());

        // A snapshot heals it.
        book.apply_snapshot(&[level(dec!(99.5), dec!(10))], &[level(dec!(100.5), dec!(4))], 20);
        assert!(!book.is_stale());
        book.apply_diff(20, 21, &[], &[]).unwrap();
        assert_eq!(book.last_sequence_id(), Some(21));
    }

    #[test]
    fn test_never_snapshotted_book_rejects_diffs() {
        let mut book = OrderBook::new();
        let err = book.apply_diff(0, 1, &[], &[]).unwrap_err();
        assert!(matches!(err, FeedError::SequenceGap { expected: None, got: 0 }));
    }

    #[test]
    fn test_delete_absent_level_is_noop() {
        let mut book = seeded_book();
        book.apply_diff(7, 8, &[LevelOp::delete(Price::new(dec!(42.0)))], &[])
            .unwrap();
        assert_eq!(book.depth(), (2, 2));
    }

    #[test]
    fn test_pricing_unavailable_with_empty_side() {
        let mut book = OrderBook::new();
        book.apply_snapshot(&[level(dec!(99.5), dec!(10))], &[], 1);
        assert!(book.best_ask().is_none());
        assert!(book.mid_price().is_none());
        assert!(book.spread().is_none());
        assert!(book.weighted_mid().is_none());
        assert!(!book.has_both_sides());
    }

    #[test]
    fn test_imbalance_bounds_and_empty_book() {
        let empty = OrderBook::new();
        assert_eq!(empty.imbalance(), Decimal::ZERO);

        let book = seeded_book();
        // bids 15, asks 12 -> (15-12)/27 = 1/9
        let imb = book.imbalance();
        assert!(imb > Decimal::ZERO);
        assert!(imb <= Decimal::ONE);

        let mut bid_only = OrderBook::new();
        bid_only.apply_snapshot(&[level(dec!(99.0), dec!(10))], &[], 1);
        assert_eq!(bid_only.imbalance(), Decimal::ONE);

        let mut ask_only = OrderBook::new();
        ask_only.apply_snapshot(&[], &[level(dec!(100.0), dec!(10))], 1);
        assert_eq!(ask_only.imbalance(), Decimal::NEGATIVE_ONE);
    }

    #[test]
    fn test_weighted_mid() {
        let mut book = OrderBook::new();
        book.apply_snapshot(
            &[level(dec!(100), dec!(3))],
            &[level(dec!(102), dec!(1))],
            1,
        );
        // (100*3 + 102*1) / 4 = 100.5
        assert_eq!(book.weighted_mid().unwrap(), Price::new(dec!(100.5)));
    }

    #[test]
    fn test_snapshot_skips_zero_qty_levels() {
        let mut book = OrderBook::new();
        book.apply_snapshot(
            &[level(dec!(99.0), dec!(0)), level(dec!(98.0), dec!(1))],
            &[level(dec!(100.0), dec!(2))],
            1,
        );
        assert_eq!(book.depth(), (1, 1));
        assert_eq!(book.best_bid().unwrap().price, Price::new(dec!(98.0)));
    }
}
