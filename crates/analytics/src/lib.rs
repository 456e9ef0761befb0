//! # Folio Analytics
//!
//! The position calculator: derives shares held, cost basis, market value and
//! unrealized gain from an instrument's price and its live lots, and rolls
//! those up into an account-level summary.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of
//!   storage. It depends only on `core-types` (Layer 0).
//! - **Stateless Calculation:** `PositionCalculator` reads explicit snapshots
//!   and never mutates them, so it can run concurrently with trades and two
//!   calls over the same snapshot always agree.
//!
//! ## Public API
//!
//! - `PositionCalculator`
//! - `Position`, `LotValuation`, `PortfolioSummary`, `PortfolioReport`
//! - `AnalyticsError`

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use engine::PositionCalculator;
pub use error::AnalyticsError;
pub use report::{LotValuation, PortfolioReport, PortfolioSummary, Position};
