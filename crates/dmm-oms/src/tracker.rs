//! Order store with lazy-deletion priority queues.
//!
//! The tracker keeps every working order in an id-keyed map plus one binary
//! heap per side: buys ranked best-price-first (highest), sells ranked
//! best-price-first (lowest), ties broken by earliest submission. Removal
//! only deletes from the map; heap entries left behind go stale and are
//! popped the next time a best-order read walks the head. That keeps
//! removal O(log n) amortized instead of rebuilding a sorted structure on
//! every cancel.
//!
//! Invariant: an id present in a heap AND in the map always refers to the
//! same record, because `add_order` is the only entry point and pushes both.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use dmm_core::{OrderId, OrderStatus, Price, Qty, Side};
use tracing::{debug, warn};

use crate::order::Order;

/// Heap entry for the buy side: max-heap on price, earliest first on ties.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BuyRank {
    price: Price,
    created_at_ms: i64,
    id: OrderId,
}

impl Ord for BuyRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.price
            .cmp(&other.price)
            .then_with(|| other.created_at_ms.cmp(&self.created_at_ms))
            .then_with(|| other.id.as_str().cmp(self.id.as_str()))
    }
}

impl PartialOrd for BuyRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Heap entry for the sell side: min-heap on price, earliest first on ties.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SellRank {
    price: Price,
    created_at_ms: i64,
    id: OrderId,
}

impl Ord for SellRank {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .price
            .cmp(&self.price)
            .then_with(|| other.created_at_ms.cmp(&self.created_at_ms))
            .then_with(|| other.id.as_str().cmp(self.id.as_str()))
    }
}

impl PartialOrd for SellRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Synchronous order store. Single-owner; the actor in [`crate::actor`]
/// wraps it for concurrent use.
#[derive(Debug, Default)]
pub struct OrderTracker {
    orders: HashMap<OrderId, Order>,
    buy_queue: BinaryHeap<BuyRank>,
    sell_queue: BinaryHeap<SellRank>,
}

impl OrderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new order into the store and its side's queue.
    pub fn add_order(&mut self, order: Order) {
        match order.side {
            Side::Buy => self.buy_queue.push(BuyRank {
                price: order.price,
                created_at_ms: order.created_at_ms,
                id: order.id.clone(),
            }),
            Side::Sell => self.sell_queue.push(SellRank {
                price: order.price,
                created_at_ms: order.created_at_ms,
                id: order.id.clone(),
            }),
        }

        debug!(
            id = %order.id,
            instrument = %order.instrument,
            side = ?order.side,
            price = %order.price,
            qty = %order.quantity,
            "tracking order"
        );

        self.orders.insert(order.id.clone(), order);
    }

    /// Apply a state event to a tracked order.
    ///
    /// Unknown ids are reported and ignored: the venue replays events for
    /// orders from previous runs and for records already drained here, and
    /// reconciliation must never die on one.
    pub fn update_order(&mut self, id: &OrderId, status: OrderStatus, filled_quantity: Qty) -> bool {
        match self.orders.get_mut(id) {
            Some(order) => {
                debug!(%id, old = %order.status, new = %status, filled = %filled_quantity, "order update");
                order.status = status;
                order.filled_quantity = filled_quantity;
                true
            }
            None => {
                warn!(%id, %status, "update for untracked order, ignoring");
                false
            }
        }
    }

    /// Drop an order from the store. Its queue entry goes stale and is
    /// skipped on the next best-order read.
    pub fn remove_order(&mut self, id: &OrderId) -> Option<Order> {
        let removed = self.orders.remove(id);
        if removed.is_some() {
            debug!(%id, "untracked order");
        }
        removed
    }

    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    /// Highest-priced live buy, earliest on ties.
    pub fn best_buy(&mut self) -> Option<&Order> {
        while let Some(head) = self.buy_queue.peek() {
            let live = self
                .orders
                .get(&head.id)
                .map(|o| o.status.is_active())
                .unwrap_or(false);
            if live {
                break;
            }
            self.buy_queue.pop();
        }
        let id = self.buy_queue.peek()?.id.clone();
        self.orders.get(&id)
    }

    /// Lowest-priced live sell, earliest on ties.
    pub fn best_sell(&mut self) -> Option<&Order> {
        while let Some(head) = self.sell_queue.peek() {
            let live = self
                .orders
                .get(&head.id)
                .map(|o| o.status.is_active())
                .unwrap_or(false);
            if live {
                break;
            }
            self.sell_queue.pop();
        }
        let id = self.sell_queue.peek()?.id.clone();
        self.orders.get(&id)
    }

    /// Every order still in the store, any side, any status.
    pub fn pending_orders(&self) -> Vec<Order> {
        self.orders.values().cloned().collect()
    }

    /// Count of orders that can still rest on or reach the book.
    pub fn active_count(&self) -> usize {
        self.orders.values().filter(|o| o.status.is_active()).count()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
