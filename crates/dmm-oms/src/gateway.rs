//! Order gateway abstraction.
//!
//! The quoting loop talks to the venue through this trait so the core never
//! depends on a transport. The in-tree implementations are a paper gateway
//! (logs intents, fabricates acks, no I/O) and a recording gateway for
//! tests; a live transport would implement the same trait out of tree.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dmm_core::{OrderId, OrderType};
use tracing::info;

use crate::error::{OmsError, OmsResult};
use crate::order::{OrderHandle, SubmitRequest};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Venue-facing order operations.
pub trait OrderGateway: Send + Sync {
    /// Submit an order. The returned handle carries the venue order id.
    fn submit(&self, request: SubmitRequest) -> BoxFuture<'_, OmsResult<OrderHandle>>;

    /// Cancel one order by id.
    fn cancel(&self, id: OrderId) -> BoxFuture<'_, OmsResult<()>>;

    /// Cancel every open order, optionally scoped to one instrument.
    fn cancel_all(&self, instrument: Option<String>) -> BoxFuture<'_, OmsResult<()>>;
}

/// Arc wrapper for gateway trait objects.
pub type DynOrderGateway = Arc<dyn OrderGateway>;

/// Gateway that accepts everything and touches nothing.
///
/// Logs each intent at info and fabricates an ack with a locally generated
/// id, so the rest of the engine runs unchanged without a venue connection.
#[derive(Debug, Default)]
pub struct PaperGateway;

impl PaperGateway {
    pub fn new() -> Self {
        Self
    }
}

impl OrderGateway for PaperGateway {
    fn submit(&self, request: SubmitRequest) -> BoxFuture<'_, OmsResult<OrderHandle>> {
        Box::pin(async move {
            if request.order_type == OrderType::Limit && request.price.is_none() {
                return Err(OmsError::MissingPrice);
            }

            let id = OrderId::generate();
            info!(
                %id,
                instrument = %request.instrument,
                side = ?request.side,
                price = ?request.price,
                qty = %request.quantity,
                post_only = request.post_only,
                reduce_only = request.reduce_only,
                "paper submit"
            );

            Ok(OrderHandle {
                id,
                accepted_at_ms: Utc::now().timestamp_millis(),
            })
        })
    }

    fn cancel(&self, id: OrderId) -> BoxFuture<'_, OmsResult<()>> {
        Box::pin(async move {
            info!(%id, "paper cancel");
            Ok(())
        })
    }

    fn cancel_all(&self, instrument: Option<String>) -> BoxFuture<'_, OmsResult<()>> {
        Box::pin(async move {
            info!(instrument = ?instrument, "paper cancel-all");
            Ok(())
        })
    }
}

/// Recording gateway for tests.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    submits: parking_lot::Mutex<Vec<SubmitRequest>>,
    cancels: parking_lot::Mutex<Vec<OrderId>>,
    cancel_alls: parking_lot::Mutex<Vec<Option<String>>>,
    reject_submits: AtomicBool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent submit fail with `Rejected`.
    pub fn set_reject_submits(&self, reject: bool) {
        self.reject_submits.store(reject, Ordering::SeqCst);
    }

    /// Recorded submissions.
    pub fn submits(&self) -> Vec<SubmitRequest> {
        self.submits.lock().clone()
    }

    /// Recorded single-order cancels.
    pub fn cancels(&self) -> Vec<OrderId> {
        self.cancels.lock().clone()
    }

    /// Recorded cancel-all calls with their instrument scope.
    pub fn cancel_all_calls(&self) -> Vec<Option<String>> {
        self.cancel_alls.lock().clone()
    }

    pub fn clear(&self) {
        self.submits.lock().clear();
        self.cancels.lock().clear();
        self.cancel_alls.lock().clear();
    }
}

impl OrderGateway for RecordingGateway {
    fn submit(&self, request: SubmitRequest) -> BoxFuture<'_, OmsResult<OrderHandle>> {
        Box::pin(async move {
            if request.order_type == OrderType::Limit && request.price.is_none() {
                return Err(OmsError::MissingPrice);
            }
            self.submits.lock().push(request);

            if self.reject_submits.load(Ordering::SeqCst) {
                return Err(OmsError::Rejected("injected rejection".to_string()));
            }

            Ok(OrderHandle {
                id: OrderId::generate(),
                accepted_at_ms: Utc::now().timestamp_millis(),
            })
        })
    }

    fn cancel(&self, id: OrderId) -> BoxFuture<'_, OmsResult<()>> {
        Box::pin(async move {
            self.cancels.lock().push(id);
            Ok(())
        })
    }

    fn cancel_all(&self, instrument: Option<String>) -> BoxFuture<'_, OmsResult<()>> {
        Box::pin(async move {
            self.cancel_alls.lock().push(instrument);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmm_core::{Price, Qty, Side};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_paper_gateway_acks_limit_orders() {
        let gateway = PaperGateway::new();
        let req = SubmitRequest::limit(
            "BTC-PERPETUAL",
            Side::Buy,
            Qty::new(dec!(10)),
            Price::new(dec!(50000)),
        );

        let handle = gateway.submit(req).await.unwrap();
        assert!(!handle.id.as_str().is_empty());

        gateway.cancel(handle.id).await.unwrap();
        gateway.cancel_all(None).await.unwrap();
    }

    #[tokio::test]
    async fn test_limit_without_price_is_rejected() {
        let gateway = PaperGateway::new();
        let mut req = SubmitRequest::limit(
            "BTC-PERPETUAL",
            Side::Buy,
            Qty::new(dec!(10)),
            Price::new(dec!(50000)),
        );
        req.price = None;

        let err = gateway.submit(req).await.unwrap_err();
        assert!(matches!(err, OmsError::MissingPrice));
    }

    #[tokio::test]
    async fn test_recording_gateway_captures_calls() {
        let gateway = RecordingGateway::new();

        let req = SubmitRequest::limit(
            "BTC-PERPETUAL",
            Side::Sell,
            Qty::new(dec!(10)),
            Price::new(dec!(50010)),
        );
        let handle = gateway.submit(req.clone()).await.unwrap();
        gateway.cancel(handle.id.clone()).await.unwrap();
        gateway
            .cancel_all(Some("BTC-PERPETUAL".to_string()))
            .await
            .unwrap();

        assert_eq!(gateway.submits(), vec![req]);
        assert_eq!(gateway.cancels(), vec![handle.id]);
        assert_eq!(
            gateway.cancel_all_calls(),
            vec![Some("BTC-PERPETUAL".to_string())]
        );
    }

    #[tokio::test]
    async fn test_recording_gateway_injects_rejections() {
        let gateway = RecordingGateway::new();
        gateway.set_reject_submits(true);

        let req = SubmitRequest::limit(
            "BTC-PERPETUAL",
            Side::Buy,
            Qty::new(dec!(10)),
            Price::new(dec!(50000)),
        );
        let err = gateway.submit(req).await.unwrap_err();
        assert!(matches!(err, OmsError::Rejected(_)));

        // The attempt is still recorded.
        assert_eq!(gateway.submits().len(), 1);
    }
}
