//! Order records and submission types.
//!
//! `Order` is the tracker's authoritative record of one working order.
//! `SubmitRequest` is the structured submission the gateway consumes; it
//! replaces ad-hoc per-field call arguments so every submission site states
//! its intent (type, time in force, post-only, reduce-only) explicitly.

use chrono::Utc;
use dmm_core::{OrderId, OrderStatus, OrderType, Price, Qty, Side, TimeInForce};
use serde::{Deserialize, Serialize};

/// One tracked order.
///
/// Lifecycle: `Pending` (submitted, not yet acknowledged) -> `Open`
/// (resting) -> one of the terminal states. Terminal records are dropped
/// from the tracker once their fill has been fanned out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Venue-assigned id; the only key other components hold.
    pub id: OrderId,
    /// Instrument the order works.
    pub instrument: String,
    pub side: Side,
    pub price: Price,
    pub quantity: Qty,
    /// Cumulative filled quantity reported so far.
    pub filled_quantity: Qty,
    pub status: OrderStatus,
    /// Submission timestamp (Unix ms); tie-breaker for equal-priced orders.
    pub created_at_ms: i64,
}

impl Order {
    /// Build a `Pending` record for a just-submitted order.
    pub fn new_pending(
        id: OrderId,
        instrument: impl Into<String>,
        side: Side,
        price: Price,
        quantity: Qty,
    ) -> Self {
        Self {
            id,
            instrument: instrument.into(),
            side,
            price,
            quantity,
            filled_quantity: Qty::ZERO,
            status: OrderStatus::Pending,
            created_at_ms: Utc::now().timestamp_millis(),
        }
    }

    /// Quantity still working.
    pub fn remaining(&self) -> Qty {
        self.quantity - self.filled_quantity
    }

    /// True while the order can still rest on or reach the book.
    pub fn is_live(&self) -> bool {
        self.status.is_active()
    }
}

/// Structured order submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub instrument: String,
    pub side: Side,
    pub quantity: Qty,
    pub order_type: OrderType,
    /// Required for limit orders; ignored for market orders.
    pub price: Option<Price>,
    pub time_in_force: TimeInForce,
    /// Reject instead of crossing the spread.
    pub post_only: bool,
    /// Only reduce an existing position; used by the flatten path.
    pub reduce_only: bool,
}

impl SubmitRequest {
    /// A good-til-cancelled limit order, the shape every quote uses.
    pub fn limit(instrument: impl Into<String>, side: Side, quantity: Qty, price: Price) -> Self {
        Self {
            instrument: instrument.into(),
            side,
            quantity,
            order_type: OrderType::Limit,
            price: Some(price),
            time_in_force: TimeInForce::GoodTilCancelled,
            post_only: false,
            reduce_only: false,
        }
    }

    /// An immediate-or-cancel market order.
    pub fn market(instrument: impl Into<String>, side: Side, quantity: Qty) -> Self {
        Self {
            instrument: instrument.into(),
            side,
            quantity,
            order_type: OrderType::Market,
            price: None,
            time_in_force: TimeInForce::ImmediateOrCancel,
            post_only: false,
            reduce_only: false,
        }
    }

    pub fn with_post_only(mut self) -> Self {
        self.post_only = true;
        self
    }

    pub fn with_reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }
}

/// Gateway acknowledgement of a submission.
#[derive(Debug, Clone)]
pub struct OrderHandle {
    /// Venue order id the submission was assigned.
    pub id: OrderId,
    /// When the venue accepted it (Unix ms).
    pub accepted_at_ms: i64,
}
