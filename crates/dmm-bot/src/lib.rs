//! Derivatives market-making engine.
//!
//! Reconstructs an order book from a sequenced feed, prices two-sided
//! quotes with an inventory-aware model, and manages the resulting order
//! lifecycle. The binary wires a replay feed, the tracker actor, and a
//! paper gateway into the quoting loop.

pub mod app;
pub mod config;
pub mod error;
pub mod replay;

pub use app::{Application, QuotingLoop};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use replay::ReplayFeed;
