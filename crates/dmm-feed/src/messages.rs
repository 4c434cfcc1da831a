//! Typed feed events and the commands the consumer can send back upstream.

use dmm_core::{OrderId, OrderStatus, Price, Qty, Side};

/// One resting level in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookLevel {
    pub price: Price,
    pub qty: Qty,
}

impl BookLevel {
    pub fn new(price: Price, qty: Qty) -> Self {
        Self { price, qty }
    }
}

/// Diff operation kind. The wire's `new` and `change` are both upserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelAction {
    Upsert,
    Delete,
}

/// One diff operation against a book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelOp {
    pub action: LevelAction,
    pub price: Price,
    pub qty: Qty,
}

impl LevelOp {
    pub fn upsert(price: Price, qty: Qty) -> Self {
        Self {
            action: LevelAction::Upsert,
            price,
            qty,
        }
    }

    pub fn delete(price: Price) -> Self {
        Self {
            action: LevelAction::Delete,
            price,
            qty: Qty::ZERO,
        }
    }
}

/// Reconciliation event for one of our orders.
#[derive(Debug, Clone)]
pub struct OrderUpdateEvent {
    pub order_id: OrderId,
    pub instrument: String,
    pub side: Side,
    pub price: Price,
    pub quantity: Qty,
    pub filled_quantity: Qty,
    pub status: OrderStatus,
    pub creation_timestamp_ms: i64,
}

/// A fully parsed feed message, ready to apply.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Whole-book replacement.
    Snapshot {
        sequence_id: u64,
        bids: Vec<BookLevel>,
        asks: Vec<BookLevel>,
    },
    /// Incremental book update, valid only against `prev_sequence_id`.
    Diff {
        prev_sequence_id: u64,
        sequence_id: u64,
        bid_ops: Vec<LevelOp>,
        ask_ops: Vec<LevelOp>,
    },
    /// Volatility index sample.
    Volatility {
        value: f64,
        timestamp_ms: i64,
        index_name: String,
    },
    /// Order lifecycle update from the venue.
    OrderUpdate(OrderUpdateEvent),
}

/// Commands the consumer sends back to the feed side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCommand {
    /// Ask for a fresh snapshot after a sequence gap. The snapshot arrives
    /// as a regular `FeedEvent::Snapshot` on the ordered feed queue.
    Resnapshot { instrument: String },
}
