use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Valuation of the shares still held in one lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotValuation {
    pub lot_id: Uuid,
    pub purchased_at: DateTime<Utc>,
    /// Remaining shares in the lot.
    pub shares: i64,
    pub purchase_price: Decimal,
    pub cost: Decimal,
    pub current_value: Decimal,
    pub gain: Decimal,
    pub return_percentage: Decimal,
}

/// Holdings of one instrument within an account.
///
/// With no live lots every numeric field is exactly zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub current_price: Decimal,
    pub shares: i64,
    pub avg_cost: Decimal,
    pub total_cost: Decimal,
    pub current_value: Decimal,
    pub unrealized_gain: Decimal,
    pub return_percentage: Decimal,
    pub lots: Vec<LotValuation>,
}

/// Account-level totals across every held instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub cash_balance: Decimal,
    pub stock_value: Decimal,
    pub total_value: Decimal,
    /// Cost basis of all live lots.
    pub total_cost: Decimal,
    /// Unrealized gain across all positions (`stock_value - total_cost`).
    ///
    /// Gains already realized by sells are not included; they show up in
    /// `cash_balance` and therefore in `total_value` and `return_percentage`.
    pub total_gain: Decimal,
    /// Change of `total_value` relative to the account's initial cash.
    pub return_percentage: Decimal,
}

/// The result of a positions query: one entry per held instrument, ordered
/// by symbol, plus the account summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub account_id: Uuid,
    pub positions: Vec<Position>,
    pub summary: PortfolioSummary,
}
