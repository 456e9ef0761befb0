use analytics::AnalyticsError;
use core_types::CoreError;
use ledger::StoreError;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Quantity must be a positive number of shares, got {0}")]
    InvalidQuantity(i64),

    #[error("Price must not be negative, got {0}")]
    InvalidPrice(Decimal),

    #[error("Insufficient funds. Cost: {cost}, Available: {available}")]
    InsufficientFunds { cost: Decimal, available: Decimal },

    #[error("Instrument not found: {0}")]
    InstrumentNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("Not enough shares. You only have {available} shares available.")]
    InsufficientShares { requested: i64, available: i64 },

    #[error("Instrument already registered: {0}")]
    DuplicateInstrument(String),

    #[error("Ledger rule violated: {0}")]
    Ledger(#[from] CoreError),

    /// The operation was rolled back; nothing it wrote is visible.
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("Valuation failed: {0}")]
    Valuation(#[from] AnalyticsError),
}

impl ExecutorError {
    /// True for errors caused by the request itself rather than the system.
    /// Amounts too large to represent count as rejections.
    pub fn is_rejection(&self) -> bool {
        match self {
            ExecutorError::Ledger(err) => matches!(err, CoreError::Overflow(_)),
            ExecutorError::Valuation(err) => matches!(err, AnalyticsError::Arithmetic(_)),
            ExecutorError::Storage(_) => false,
            _ => true,
        }
    }
}
