use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("Missing market price for symbol: {0}")]
    MissingPrice(String),

    /// A valuation fell outside the range of `Decimal` or `i64`.
    #[error(transparent)]
    Arithmetic(#[from] CoreError),
}
