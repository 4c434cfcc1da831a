//! Tracker actor: single-owner task wrapping [`OrderTracker`].
//!
//! The tracker itself is synchronous and single-owner. Concurrent users go
//! through this actor: mutations and queries arrive as typed messages over
//! an mpsc channel and are applied sequentially, so no lock exists to hold
//! across an await.
//!
//! Two side channels complete the picture:
//! - a DashMap cache of live orders, updated eagerly by the handle before
//!   the message is sent, for synchronous snapshots off the hot path;
//! - a fill fan-out channel carrying every transition to `Filled`, consumed
//!   by the quoting loop's inventory path.
//!
//! Terminal orders are removed from the store right after their fill has
//! been fanned out; nothing accumulates across a long session.

use std::sync::Arc;

use dashmap::DashMap;
use dmm_core::{OrderId, OrderStatus, Price, Qty, Side};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::order::Order;
use crate::tracker::OrderTracker;

/// Emitted on the fan-out channel when a tracked order fills.
#[derive(Debug, Clone)]
pub struct FillEvent {
    pub order_id: OrderId,
    pub instrument: String,
    pub side: Side,
    pub price: Price,
    /// Filled quantity; falls back to the order quantity when the venue
    /// omits the cumulative figure on the terminal event.
    pub quantity: Qty,
}

/// Messages for the tracker actor.
#[derive(Debug)]
pub enum TrackerMsg {
    /// Start tracking a just-submitted order.
    Add(Order),

    /// Apply a state event from the order feed.
    Update {
        id: OrderId,
        status: OrderStatus,
        filled_quantity: Qty,
    },

    /// Stop tracking an order.
    Remove(OrderId),

    /// Best live buy (highest price, earliest on ties).
    BestBuy(oneshot::Sender<Option<Order>>),

    /// Best live sell (lowest price, earliest on ties).
    BestSell(oneshot::Sender<Option<Order>>),

    /// Every order still tracked.
    Pending(oneshot::Sender<Vec<Order>>),

    /// Graceful shutdown.
    Shutdown,
}

/// Actor task. Runs in its own tokio task and applies messages in arrival
/// order against the authoritative [`OrderTracker`].
pub struct TrackerTask {
    rx: mpsc::Receiver<TrackerMsg>,
    tracker: OrderTracker,
    /// Shared with the handle for synchronous lookups.
    live_orders: Arc<DashMap<OrderId, Order>>,
    /// Fill fan-out; the inventory path listens on the other end.
    fills_tx: mpsc::Sender<FillEvent>,
}

impl TrackerTask {
    /// Process messages until `Shutdown` or all handles are dropped.
    pub async fn run(mut self) {
        debug!("tracker task started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                TrackerMsg::Shutdown => {
                    debug!("tracker task shutting down");
                    break;
                }
                msg => self.handle_message(msg).await,
            }
        }

        debug!("tracker task terminated");
    }

    async fn handle_message(&mut self, msg: TrackerMsg) {
        match msg {
            TrackerMsg::Add(order) => {
                trace!(id = %order.id, "actor: add");
                self.live_orders.insert(order.id.clone(), order.clone());
                self.tracker.add_order(order);
            }
            TrackerMsg::Update {
                id,
                status,
                filled_quantity,
            } => self.on_update(id, status, filled_quantity).await,
            TrackerMsg::Remove(id) => {
                trace!(%id, "actor: remove");
                self.live_orders.remove(&id);
                self.tracker.remove_order(&id);
            }
            TrackerMsg::BestBuy(reply) => {
                let _ = reply.send(self.tracker.best_buy().cloned());
            }
            TrackerMsg::BestSell(reply) => {
                let _ = reply.send(self.tracker.best_sell().cloned());
            }
            TrackerMsg::Pending(reply) => {
                let _ = reply.send(self.tracker.pending_orders());
            }
            TrackerMsg::Shutdown => unreachable!("handled in run()"),
        }
    }

    async fn on_update(&mut self, id: OrderId, status: OrderStatus, filled_quantity: Qty) {
        if !self.tracker.update_order(&id, status, filled_quantity) {
            // Untracked id; already logged by the tracker.
            return;
        }

        let updated = match self.tracker.get(&id) {
            Some(order) => order.clone(),
            None => return,
        };

        if status == OrderStatus::Filled {
            let quantity = if updated.filled_quantity.is_zero() {
                updated.quantity
            } else {
                updated.filled_quantity
            };
            let _ = self
                .fills_tx
                .send(FillEvent {
                    order_id: updated.id.clone(),
                    instrument: updated.instrument.clone(),
                    side: updated.side,
                    price: updated.price,
                    quantity,
                })
                .await;
        }

        if status.is_terminal() {
            self.live_orders.remove(&id);
            self.tracker.remove_order(&id);
        } else {
            self.live_orders.insert(id, updated);
        }
    }
}

/// Cloneable handle to the tracker actor.
///
/// Async methods send messages; sync methods read the live-order cache.
/// The cache is updated by the handle before each send, so it may briefly
/// lead the actor but never lags behind it.
#[derive(Clone)]
pub struct TrackerHandle {
    tx: mpsc::Sender<TrackerMsg>,
    live_orders: Arc<DashMap<OrderId, Order>>,
}

impl TrackerHandle {
    // === Async methods (send to actor) ===

    /// Start tracking an order.
    pub async fn add_order(&self, order: Order) {
        self.live_orders.insert(order.id.clone(), order.clone());
        let _ = self.tx.send(TrackerMsg::Add(order)).await;
    }

    /// Forward a state event from the order feed.
    pub async fn update_order(&self, id: OrderId, status: OrderStatus, filled_quantity: Qty) {
        if status.is_terminal() {
            self.live_orders.remove(&id);
        } else if let Some(mut entry) = self.live_orders.get_mut(&id) {
            entry.status = status;
            entry.filled_quantity = filled_quantity;
        }

        let _ = self
            .tx
            .send(TrackerMsg::Update {
                id,
                status,
                filled_quantity,
            })
            .await;
    }

    /// Stop tracking an order.
    pub async fn remove_order(&self, id: OrderId) {
        self.live_orders.remove(&id);
        let _ = self.tx.send(TrackerMsg::Remove(id)).await;
    }

    /// Best live buy, through the actor for a consistent answer.
    pub async fn best_buy(&self) -> Option<Order> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(TrackerMsg::BestBuy(reply_tx)).await.is_err() {
            return None;
        }
        reply_rx.await.ok().flatten()
    }

    /// Best live sell, through the actor for a consistent answer.
    pub async fn best_sell(&self) -> Option<Order> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(TrackerMsg::BestSell(reply_tx)).await.is_err() {
            return None;
        }
        reply_rx.await.ok().flatten()
    }

    /// Every order still tracked by the actor.
    pub async fn pending_orders(&self) -> Vec<Order> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(TrackerMsg::Pending(reply_tx)).await.is_err() {
            return Vec::new();
        }
        reply_rx.await.unwrap_or_default()
    }

    /// Request graceful shutdown.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(TrackerMsg::Shutdown).await;
    }

    // === Sync methods (cache lookups) ===

    /// Snapshot of one live order, if present.
    pub fn live_order(&self, id: &OrderId) -> Option<Order> {
        self.live_orders.get(id).map(|r| r.value().clone())
    }

    /// Number of live orders in the cache.
    pub fn live_order_count(&self) -> usize {
        self.live_orders.len()
    }

    pub fn has_live_orders(&self) -> bool {
        !self.live_orders.is_empty()
    }
}

/// Spawn the tracker actor.
///
/// Returns the handle, the fill fan-out receiver, and the task's join
/// handle.
pub fn spawn_tracker(capacity: usize) -> (TrackerHandle, mpsc::Receiver<FillEvent>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity);
    let (fills_tx, fills_rx) = mpsc::channel(capacity);
    let live_orders = Arc::new(DashMap::new());

    let task = TrackerTask {
        rx,
        tracker: OrderTracker::new(),
        live_orders: live_orders.clone(),
        fills_tx,
    };
    let handle = TrackerHandle { tx, live_orders };

    let join_handle = tokio::spawn(task.run());

    (handle, fills_rx, join_handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio::time::{sleep, Duration};

    fn sample_order(id: &str, side: Side, price: rust_decimal::Decimal) -> Order {
        Order::new_pending(
            OrderId::from(id),
            "BTC-PERPETUAL",
            side,
            Price::new(price),
            Qty::new(dec!(10)),
        )
    }

    #[tokio::test]
    async fn test_add_then_query_best() {
        let (handle, _fills, _join) = spawn_tracker(16);

        handle.add_order(sample_order("b1", Side::Buy, dec!(100))).await;
        handle.add_order(sample_order("b2", Side::Buy, dec!(105))).await;

        sleep(Duration::from_millis(10)).await;

        let best = handle.best_buy().await;
        assert_eq!(best.map(|o| o.id), Some(OrderId::from("b2")));
        assert_eq!(handle.live_order_count(), 2);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_fill_fans_out_and_drains_the_order() {
        let (handle, mut fills, _join) = spawn_tracker(16);

        let order = sample_order("b1", Side::Buy, dec!(100));
        handle.add_order(order.clone()).await;
        handle
            .update_order(order.id.clone(), OrderStatus::Filled, Qty::new(dec!(10)))
            .await;

        let fill = fills.recv().await.unwrap();
        assert_eq!(fill.order_id, order.id);
        assert_eq!(fill.side, Side::Buy);
        assert_eq!(fill.quantity, Qty::new(dec!(10)));

        sleep(Duration::from_millis(10)).await;

        // Terminal record dropped after fan-out.
        assert!(handle.pending_orders().await.is_empty());
        assert_eq!(handle.live_order_count(), 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_update_emits_no_fill() {
        let (handle, mut fills, _join) = spawn_tracker(16);

        handle
            .update_order(OrderId::from("ghost"), OrderStatus::Filled, Qty::new(dec!(10)))
            .await;

        sleep(Duration::from_millis(10)).await;
        assert!(fills.try_recv().is_err());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancel_keeps_quiet_and_drains() {
        let (handle, mut fills, _join) = spawn_tracker(16);

        let order = sample_order("s1", Side::Sell, dec!(110));
        handle.add_order(order.clone()).await;
        handle
            .update_order(order.id.clone(), OrderStatus::Cancelled, Qty::ZERO)
            .await;

        sleep(Duration::from_millis(10)).await;

        assert!(fills.try_recv().is_err());
        assert!(handle.best_sell().await.is_none());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_terminates_the_task() {
        let (handle, _fills, join) = spawn_tracker(16);
        handle.shutdown().await;
        assert!(join.await.is_ok());
    }
}
