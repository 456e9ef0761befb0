//! # Folio Database Crate
//!
//! The PostgreSQL adapter for the lot ledger.
//!
//! ## Architectural Principles
//!
//! - **Layer 3 Adapter:** This crate implements `ledger::LedgerStore` and
//!   hides every SQL statement behind it. Nothing above this crate knows it
//!   is talking to PostgreSQL.
//! - **Transactions are sessions:** a `LedgerSession` is one database
//!   transaction. The account row is locked with `SELECT ... FOR UPDATE`, so
//!   trades on the same account queue up while other accounts proceed.
//! - **Asynchronous & Pooled:** All operations are asynchronous, and it uses a
//!   connection pool (`PgPool`) for concurrent database access.
//!
//! ## Public API
//!
//! - `connect`: The async function to establish the database connection pool.
//! - `run_migrations`: Applies the embedded schema migrations.
//! - `PgLedgerStore`: The `LedgerStore` implementation.
//! - `DbError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use repository::{PgLedgerSession, PgLedgerStore};
