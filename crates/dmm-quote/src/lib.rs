//! Quote pricing for the market maker.
//!
//! Provides the pieces the quoting loop composes each cycle:
//! - Stoikov-style bid/ask calculation with inventory skew
//! - Rolling volatility window with Bollinger-band gating
//! - Adaptive risk aversion
//! - Inventory tracking with PnL calculation
//!
//! # Architecture
//!
//! ```text
//! Volatility sample → VolatilityWindow ─┬─ bollinger_bands(): gate the cycle
//!                                       └─ GammaController: effective gamma
//! Book top + inventory → compute_quotes() → QuoteDecision (bid, ask)
//! Fill → InventoryManager → net position q for the next cycle
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod gamma;
pub mod inventory;
pub mod volatility;

pub use config::{AdaptiveGammaConfig, PricingModel, QuoteConfig};
pub use engine::{compute_quotes, QuoteDecision, QuoteInputs};
pub use error::{QuoteError, QuoteResult};
pub use gamma::GammaController;
pub use inventory::{InstrumentInventory, InventoryManager};
pub use volatility::{BollingerBands, VolatilityWindow};
