//! Prometheus metrics for the market maker.
//!
//! Covers the loop's health at a glance:
//! - Feed integrity (sequence gaps, resnapshots, parse failures)
//! - Quote cycle outcomes and placed quotes
//! - Order lifecycle (fills, cancels, open-order gauge)
//! - Market and model state (mid, quoted spread, position, gamma)
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_int_counter,
    register_int_gauge, CounterVec, Gauge, GaugeVec, IntCounter, IntGauge,
};

/// Sequence gaps detected on the book feed.
pub static SEQUENCE_GAPS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "dmm_sequence_gaps_total",
        "Total sequence gaps detected on the book feed"
    )
    .unwrap()
});

/// Snapshot re-requests issued after a gap.
pub static RESNAPSHOTS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "dmm_resnapshots_total",
        "Total snapshot re-requests issued after a sequence gap"
    )
    .unwrap()
});

/// Feed frames or levels dropped by the parser.
pub static PARSE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "dmm_feed_parse_failures_total",
        "Total feed frames or levels dropped by the parser"
    )
    .unwrap()
});

/// Quote cycle outcomes.
/// Labels: outcome (quoted/gated/no_liquidity/stale_book/position_cap/error)
pub static QUOTE_CYCLES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dmm_quote_cycles_total",
        "Total quote cycles by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Quotes submitted to the gateway.
pub static QUOTES_PLACED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dmm_quotes_placed_total",
        "Total quotes submitted to the gateway",
        &["side"]
    )
    .unwrap()
});

/// Fills observed on the order feed.
pub static ORDERS_FILLED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dmm_orders_filled_total",
        "Total tracked orders filled",
        &["side"]
    )
    .unwrap()
});

/// Cancels issued through the gateway.
pub static ORDERS_CANCELLED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "dmm_orders_cancelled_total",
        "Total cancels issued through the gateway"
    )
    .unwrap()
});

/// Flatten orders submitted by the delta-neutrality check.
pub static FLATTEN_ORDERS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "dmm_flatten_orders_total",
        "Total reduce-only flatten orders submitted"
    )
    .unwrap()
});

/// Orders currently live in the tracker.
pub static OPEN_ORDERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("dmm_open_orders", "Orders currently live in the tracker").unwrap()
});

/// Last observed mid price.
pub static MID_PRICE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!("dmm_mid_price", "Last observed mid price", &["instrument"]).unwrap()
});

/// Last quoted full spread.
pub static QUOTED_SPREAD: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "dmm_quoted_spread",
        "Last quoted full spread in price units",
        &["instrument"]
    )
    .unwrap()
});

/// Net position per instrument.
pub static NET_POSITION: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "dmm_net_position",
        "Signed net position per instrument",
        &["instrument"]
    )
    .unwrap()
});

/// Realized PnL per instrument.
pub static REALIZED_PNL: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "dmm_realized_pnl",
        "Cumulative realized PnL per instrument",
        &["instrument"]
    )
    .unwrap()
});

/// Last volatility sample per index.
pub static VOLATILITY: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "dmm_volatility",
        "Last volatility sample per index",
        &["index"]
    )
    .unwrap()
});

/// Effective risk aversion after adaptation.
pub static EFFECTIVE_GAMMA: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "dmm_effective_gamma",
        "Effective risk aversion after adaptation"
    )
    .unwrap()
});

/// Convenience facade. Call sites use these instead of touching the
/// statics directly.
pub struct Metrics;

impl Metrics {
    /// Record a sequence gap.
    pub fn sequence_gap() {
        SEQUENCE_GAPS.inc();
    }

    /// Record a snapshot re-request.
    pub fn resnapshot_requested() {
        RESNAPSHOTS.inc();
    }

    /// Record a feed frame or level dropped by the parser.
    pub fn parse_failure() {
        PARSE_FAILURES.inc();
    }

    /// Record a quote cycle outcome.
    pub fn quote_cycle(outcome: &str) {
        QUOTE_CYCLES.with_label_values(&[outcome]).inc();
    }

    /// Record a quote submitted to the gateway.
    pub fn quote_placed(side: &str) {
        QUOTES_PLACED.with_label_values(&[side]).inc();
    }

    /// Record a fill.
    pub fn order_filled(side: &str) {
        ORDERS_FILLED.with_label_values(&[side]).inc();
    }

    /// Record a cancel.
    pub fn order_cancelled() {
        ORDERS_CANCELLED.inc();
    }

    /// Record a flatten order submission.
    pub fn flatten_order() {
        FLATTEN_ORDERS.inc();
    }

    /// Update the live-order gauge.
    pub fn open_orders_set(count: i64) {
        OPEN_ORDERS.set(count);
    }

    /// Update the observed mid.
    pub fn mid_price(instrument: &str, mid: f64) {
        MID_PRICE.with_label_values(&[instrument]).set(mid);
    }

    /// Update the quoted spread.
    pub fn quoted_spread(instrument: &str, spread: f64) {
        QUOTED_SPREAD.with_label_values(&[instrument]).set(spread);
    }

    /// Update the net position.
    pub fn net_position(instrument: &str, position: f64) {
        NET_POSITION.with_label_values(&[instrument]).set(position);
    }

    /// Update realized PnL.
    pub fn realized_pnl(instrument: &str, pnl: f64) {
        REALIZED_PNL.with_label_values(&[instrument]).set(pnl);
    }

    /// Update the last volatility sample.
    pub fn volatility(index: &str, value: f64) {
        VOLATILITY.with_label_values(&[index]).set(value);
    }

    /// Update the effective gamma.
    pub fn effective_gamma(gamma: f64) {
        EFFECTIVE_GAMMA.set(gamma);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statics_register_once_and_update() {
        Metrics::sequence_gap();
        Metrics::sequence_gap();
        assert!(SEQUENCE_GAPS.get() >= 2);

        Metrics::quote_cycle("quoted");
        Metrics::quote_cycle("gated");
        assert!(QUOTE_CYCLES.with_label_values(&["quoted"]).get() >= 1.0);

        Metrics::open_orders_set(2);
        assert_eq!(OPEN_ORDERS.get(), 2);

        Metrics::mid_price("BTC-PERPETUAL", 50000.5);
        assert_eq!(
            MID_PRICE.with_label_values(&["BTC-PERPETUAL"]).get(),
            50000.5
        );
    }
}
