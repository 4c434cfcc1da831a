//! Core domain types for the dmm market maker.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `Price`, `Qty`: precision-safe numeric types
//! - `Side`, `OrderType`, `TimeInForce`, `OrderId`: order primitives
//! - `InstrumentSpec`: per-instrument tick/lot constraints

pub mod decimal;
pub mod error;
pub mod instrument;
pub mod order;

pub use decimal::{Price, Qty};
pub use error::{CoreError, Result};
pub use instrument::InstrumentSpec;
pub use order::{OrderId, OrderStatus, OrderType, Side, TimeInForce};
