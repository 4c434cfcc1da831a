//! Market data handling for the market maker.
//!
//! Parses raw feed frames into typed events and maintains a sequence-checked
//! local order book per instrument.

pub mod book;
pub mod error;
pub mod messages;
pub mod parser;

pub use book::OrderBook;
pub use error::{FeedError, FeedResult};
pub use messages::{BookLevel, FeedCommand, FeedEvent, LevelAction, LevelOp, OrderUpdateEvent};
pub use parser::{MessageParser, ParserStats};
