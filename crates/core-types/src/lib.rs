//! # Folio Core Types
//!
//! The shared vocabulary of the position-accounting engine: instruments,
//! purchase lots, transactions and accounts, plus the invariants that govern
//! how lots are opened and consumed.
//!
//! ## Architectural Principles
//!
//! - **Layer 0:** This crate has no knowledge of storage, transport or
//!   configuration. Every other crate depends on it.
//! - **Invariants at the type:** `Lot` and `Account` keep their fields private
//!   so remaining quantities only shrink through `Lot::decrement` and the
//!   cached account total only changes through `Account::revalue`.
//!
//! ## Public API
//!
//! - `Lot`, `Transaction`, `Account`, `Instrument`, `TradeSide`
//! - `fifo::consume`: the oldest-first walk used by every sale.
//! - `CoreError`

pub mod enums;
pub mod error;
pub mod fifo;
pub mod lot;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::TradeSide;
pub use error::CoreError;
pub use fifo::LotFill;
pub use lot::Lot;
pub use structs::{Account, Instrument, Transaction};
