//! # Folio Lot Ledger
//!
//! The storage port of the position-accounting engine and its in-memory
//! implementation.
//!
//! ## Architectural Principles
//!
//! - **Port, not database:** `LedgerStore` describes what the engine needs
//!   from persistence (insert and read lots ordered by purchase time, update a
//!   lot's remaining quantity, record transactions, read and update account
//!   totals). The `database` crate provides the PostgreSQL adapter.
//! - **Sessions are the atomic unit:** every trade runs inside one
//!   `LedgerSession`. Nothing written through a session is visible until
//!   `commit`, and dropping it rolls everything back.
//! - **One FIFO order:** `order_fifo` defines the oldest-first ordering with
//!   insertion-sequence tie-break that every adapter must honour.
//!
//! ## Public API
//!
//! - `LedgerStore`, `LedgerSession`, `AccountSnapshot`, `order_fifo`
//! - `MemoryStore`: process-local store for tests and demos.
//! - `StoreError`

pub mod error;
pub mod memory;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::{order_fifo, AccountSnapshot, LedgerSession, LedgerStore};
