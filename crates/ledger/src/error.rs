use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage backend failure: {0}")]
    Backend(String),

    #[error("Record already exists: {0}")]
    Duplicate(String),

    #[error("Record not found: {0}")]
    Missing(String),

    #[error("Ledger invariant violated: {0}")]
    Invariant(String),

    #[error("Stored record is invalid: {0}")]
    Corrupt(#[from] CoreError),
}
