use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Quantity must be a positive number of shares, got {0}")]
    InvalidQuantity(i64),

    #[error("Price must not be negative, got {0}")]
    InvalidPrice(Decimal),

    #[error("Cash balance {available} cannot cover {required}")]
    InsufficientCash { required: Decimal, available: Decimal },

    #[error("Cannot take {requested} shares, only {remaining} remaining")]
    Overdraw { requested: i64, remaining: i64 },

    #[error("Arithmetic overflow computing {0}")]
    Overflow(&'static str),
}

/// `price * quantity`, refusing results outside `Decimal`'s range.
pub fn checked_amount(price: Decimal, quantity: i64) -> Result<Decimal, CoreError> {
    price
        .checked_mul(Decimal::from(quantity))
        .ok_or(CoreError::Overflow("price x quantity"))
}

