//! Order management for the market maker.
//!
//! Tracks the lifecycle of every working order and abstracts the venue
//! behind a gateway trait:
//! - `OrderTracker`: id-keyed store with per-side priority queues
//!   (lazy deletion, best-order reads skip stale heads)
//! - `TrackerTask` / `TrackerHandle`: actor wrapper for concurrent use,
//!   with a fill fan-out channel and a synchronous live-order cache
//! - `OrderGateway`: submit / cancel / cancel-all, with paper and
//!   recording implementations in tree

pub mod actor;
pub mod error;
pub mod gateway;
pub mod order;
pub mod tracker;

pub use actor::{spawn_tracker, FillEvent, TrackerHandle, TrackerMsg, TrackerTask};
pub use error::{OmsError, OmsResult};
pub use gateway::{BoxFuture, DynOrderGateway, OrderGateway, PaperGateway, RecordingGateway};
pub use order::{Order, OrderHandle, SubmitRequest};
pub use tracker::OrderTracker;
