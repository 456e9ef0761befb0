//! # Folio Executor Crate
//!
//! This crate applies trades to the lot ledger and serves the read side of
//! the engine. `TradeExecutor` buys (opening a lot) and sells (consuming lots
//! first-in-first-out), `Portfolio` opens accounts and builds position
//! reports, and `Instruments` is the registry that price feeds write to.
//!
//! ## Architectural Principles
//!
//! - **One session per trade:** every mutation runs inside one
//!   `ledger::LedgerSession`. Validation happens before the first write and
//!   any later failure drops the session, so a trade is applied entirely or
//!   not at all.
//! - **Cached totals are recomputed, never patched:** after every trade the
//!   account's `total_value` is rebuilt from its live lots and current prices
//!   inside the same session.
//! - **Storage Agnostic:** all three services hold an `Arc<dyn LedgerStore>`
//!   and work unchanged over the in-memory store or PostgreSQL.
//!
//! ## Public API
//!
//! - `TradeExecutor`, `BuyReceipt`, `SellReceipt`
//! - `Portfolio`
//! - `Instruments`
//! - `ExecutorError`

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod instruments;
pub mod portfolio;

// Re-export the key components to provide a clean, public-facing API.
pub use engine::{BuyReceipt, SellReceipt, TradeExecutor};
pub use error::ExecutorError;
pub use instruments::Instruments;
pub use portfolio::Portfolio;
