#![allow(dead_code)]

use async_trait::async_trait;
use configuration::AccountSettings;
use core_types::{Account, Instrument, Lot, Transaction};
use executor::{Instruments, Portfolio, TradeExecutor};
use ledger::{AccountSnapshot, LedgerSession, LedgerStore, MemoryStore, StoreError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub struct Harness {
    pub executor: TradeExecutor,
    pub portfolio: Portfolio,
    pub instruments: Instruments,
    pub account: Account,
}

/// Services over `store` with one account opened at the default 10,000 cash.
pub async fn harness_over(store: Arc<dyn LedgerStore>) -> Harness {
    let portfolio = Portfolio::new(store.clone(), AccountSettings::default());
    let account = portfolio.open_account("alice").await.unwrap();
    Harness {
        executor: TradeExecutor::new(store.clone()),
        instruments: Instruments::new(store),
        portfolio,
        account,
    }
}

pub async fn harness() -> Harness {
    harness_over(Arc::new(MemoryStore::new())).await
}

impl Harness {
    pub fn id(&self) -> Uuid {
        self.account.account_id()
    }

    pub async fn list(&self, symbol: &str, price: Decimal) {
        self.instruments
            .register(symbol, &format!("{symbol} Holdings"), "Technology", price)
            .await
            .unwrap();
    }

    /// cash + market value of live lots, straight from the ledger.
    pub async fn expected_total(&self) -> Decimal {
        let account = self.portfolio.account(self.id()).await.unwrap();
        let mut stock = Decimal::ZERO;
        for lot in self.portfolio.lots(self.id()).await.unwrap() {
            let price = self.instruments.get(lot.symbol()).await.unwrap().price;
            stock += price * Decimal::from(lot.remaining_quantity());
        }
        account.cash_balance() + stock
    }
}

pub fn ten_thousand() -> Decimal {
    dec!(10000)
}

/// A store that fails the N-th `update_lot` call made through any session.
pub struct FailingStore {
    inner: MemoryStore,
    fail_on_update: usize,
    updates: Arc<AtomicUsize>,
}

impl FailingStore {
    pub fn new(inner: MemoryStore, fail_on_update: usize) -> Self {
        Self {
            inner,
            fail_on_update,
            updates: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl LedgerStore for FailingStore {
    async fn begin(&self) -> Result<Box<dyn LedgerSession>, StoreError> {
        Ok(Box::new(FailingSession {
            inner: self.inner.begin().await?,
            fail_on_update: self.fail_on_update,
            updates: self.updates.clone(),
        }))
    }

    async fn snapshot(&self, account_id: Uuid) -> Result<Option<AccountSnapshot>, StoreError> {
        self.inner.snapshot(account_id).await
    }

    async fn transactions(&self, account_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        self.inner.transactions(account_id).await
    }

    async fn lots(&self, account_id: Uuid) -> Result<Vec<Lot>, StoreError> {
        self.inner.lots(account_id).await
    }

    async fn account(&self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        self.inner.account(account_id).await
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        self.inner.insert_account(account).await
    }

    async fn instrument(&self, symbol: &str) -> Result<Option<Instrument>, StoreError> {
        self.inner.instrument(symbol).await
    }

    async fn instruments(&self) -> Result<Vec<Instrument>, StoreError> {
        self.inner.instruments().await
    }

    async fn insert_instrument(&self, instrument: &Instrument) -> Result<(), StoreError> {
        self.inner.insert_instrument(instrument).await
    }

    async fn set_price(
        &self,
        symbol: &str,
        price: Decimal,
    ) -> Result<Option<Instrument>, StoreError> {
        self.inner.set_price(symbol, price).await
    }
}

struct FailingSession {
    inner: Box<dyn LedgerSession>,
    fail_on_update: usize,
    updates: Arc<AtomicUsize>,
}

#[async_trait]
impl LedgerSession for FailingSession {
    async fn lock_account(&mut self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        self.inner.lock_account(account_id).await
    }

    async fn instrument(&mut self, symbol: &str) -> Result<Option<Instrument>, StoreError> {
        self.inner.instrument(symbol).await
    }

    async fn live_lots(&mut self, account_id: Uuid, symbol: &str) -> Result<Vec<Lot>, StoreError> {
        self.inner.live_lots(account_id, symbol).await
    }

    async fn account_live_lots(&mut self, account_id: Uuid) -> Result<Vec<Lot>, StoreError> {
        self.inner.account_live_lots(account_id).await
    }

    async fn insert_lot(&mut self, lot: Lot) -> Result<Lot, StoreError> {
        self.inner.insert_lot(lot).await
    }

    async fn update_lot(&mut self, lot: &Lot) -> Result<(), StoreError> {
        let call = self.updates.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on_update {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }
        self.inner.update_lot(lot).await
    }

    async fn insert_transaction(
        &mut self,
        transaction: Transaction,
    ) -> Result<Transaction, StoreError> {
        self.inner.insert_transaction(transaction).await
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError> {
        self.inner.update_account(account).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.commit().await
    }
}
