//! Prometheus metrics and structured logging for the market maker.
//!
//! - Structured logging via tracing (JSON in production, pretty otherwise)
//! - Prometheus counters and gauges for feed integrity, quote cycles, and
//!   order lifecycle

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
