//! Error types for order management.

use dmm_core::OrderId;
use thiserror::Error;

/// Errors raised by the tracker and gateway layers.
#[derive(Debug, Error)]
pub enum OmsError {
    /// A cancel referenced an order id the venue does not know.
    ///
    /// The tracker logs and ignores unknown ids on its own path; this
    /// variant is for gateway implementations.
    #[error("unknown order: {0}")]
    UnknownOrder(OrderId),

    /// A limit submission arrived without a price.
    #[error("limit order requires a price")]
    MissingPrice,

    /// The gateway refused the request.
    #[error("submission rejected: {0}")]
    Rejected(String),

    /// The transport behind a gateway is gone; its channel is closed.
    #[error("order channel closed")]
    ChannelClosed,
}

/// Convenience alias for OMS results.
pub type OmsResult<T> = Result<T, OmsError>;
