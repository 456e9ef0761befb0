use crate::error::ExecutorError;
use core_types::Instrument;
use ledger::{LedgerStore, StoreError};
use rust_decimal::Decimal;
use std::sync::Arc;

/// The instrument registry and the entry point for price feeds.
#[derive(Clone)]
pub struct Instruments {
    store: Arc<dyn LedgerStore>,
}

impl Instruments {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn register(
        &self,
        symbol: &str,
        name: &str,
        sector: &str,
        price: Decimal,
    ) -> Result<Instrument, ExecutorError> {
        if price < Decimal::ZERO {
            return Err(ExecutorError::InvalidPrice(price));
        }
        let instrument = Instrument::new(symbol, name, sector, price)?;
        match self.store.insert_instrument(&instrument).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(ExecutorError::DuplicateInstrument(instrument.symbol));
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(symbol = %instrument.symbol, price = %instrument.price, "Instrument registered.");
        Ok(instrument)
    }

    pub async fn list(&self) -> Result<Vec<Instrument>, ExecutorError> {
        Ok(self.store.instruments().await?)
    }

    pub async fn get(&self, symbol: &str) -> Result<Instrument, ExecutorError> {
        self.store
            .instrument(symbol)
            .await?
            .ok_or_else(|| ExecutorError::InstrumentNotFound(symbol.to_string()))
    }

    /// Moves the market price. Cached account totals are left alone until the
    /// account's next trade or revaluation.
    pub async fn update_price(
        &self,
        symbol: &str,
        price: Decimal,
    ) -> Result<Instrument, ExecutorError> {
        if price < Decimal::ZERO {
            return Err(ExecutorError::InvalidPrice(price));
        }
        let instrument = self
            .store
            .set_price(symbol, price)
            .await?
            .ok_or_else(|| ExecutorError::InstrumentNotFound(symbol.to_string()))?;
        tracing::info!(symbol, %price, "Price updated.");
        Ok(instrument)
    }
}
