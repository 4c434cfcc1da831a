use thiserror::Error;

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] dmm_core::CoreError),

    #[error("Feed error: {0}")]
    Feed(#[from] dmm_feed::FeedError),

    #[error("Quote error: {0}")]
    Quote(#[from] dmm_quote::QuoteError),

    #[error("Order error: {0}")]
    Oms(#[from] dmm_oms::OmsError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] dmm_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
