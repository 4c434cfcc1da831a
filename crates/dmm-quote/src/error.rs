//! Quote computation errors.

use thiserror::Error;

/// Errors from quote computation and configuration.
#[derive(Debug, Error)]
pub enum QuoteError {
    /// The book has no liquidity on the named side.
    #[error("order book has no {0} liquidity")]
    InsufficientLiquidity(&'static str),

    /// A model term left the representable range.
    #[error("quote computation produced a non-finite {0}")]
    NonFinite(&'static str),

    /// Rejected at startup.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for quote operations.
pub type QuoteResult<T> = Result<T, QuoteError>;
