use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{Account, Instrument, Lot, Transaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Keeps only live lots and orders them for first-in-first-out consumption:
/// oldest purchase first, ties broken by insertion sequence.
pub fn order_fifo(lots: impl IntoIterator<Item = Lot>) -> Vec<Lot> {
    let mut live: Vec<Lot> = lots.into_iter().filter(Lot::is_live).collect();
    live.sort_by_key(|lot| (lot.purchased_at(), lot.seq()));
    live
}

/// A consistent point-in-time view of one account and everything needed to
/// value it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub account: Account,
    /// Live lots across all instruments, oldest first.
    pub lots: Vec<Lot>,
    /// The instruments referenced by `lots`, ordered by symbol.
    pub instruments: Vec<Instrument>,
    pub taken_at: DateTime<Utc>,
}

/// The durable store behind the ledger.
///
/// Mutations go through a [`LedgerSession`] obtained from [`LedgerStore::begin`];
/// everything else here is a read or an administrative insert that does not
/// touch lots or cash.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Opens a unit of work. Writes made through the session become visible
    /// only when it is committed.
    async fn begin(&self) -> Result<Box<dyn LedgerSession>, StoreError>;

    async fn snapshot(&self, account_id: Uuid) -> Result<Option<AccountSnapshot>, StoreError>;

    /// All transactions for the account, newest first.
    async fn transactions(&self, account_id: Uuid) -> Result<Vec<Transaction>, StoreError>;

    /// Every lot the account ever opened, including exhausted ones, oldest first.
    async fn lots(&self, account_id: Uuid) -> Result<Vec<Lot>, StoreError>;

    async fn account(&self, account_id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    async fn instrument(&self, symbol: &str) -> Result<Option<Instrument>, StoreError>;

    /// All registered instruments, ordered by symbol.
    async fn instruments(&self) -> Result<Vec<Instrument>, StoreError>;

    async fn insert_instrument(&self, instrument: &Instrument) -> Result<(), StoreError>;

    /// Sets the market price of an instrument. Returns `None` for an unknown symbol.
    async fn set_price(
        &self,
        symbol: &str,
        price: Decimal,
    ) -> Result<Option<Instrument>, StoreError>;
}

/// One atomic unit of ledger mutation.
///
/// Dropping a session without calling [`LedgerSession::commit`] discards
/// every write made through it.
#[async_trait]
pub trait LedgerSession: Send {
    /// Loads the account and holds it exclusively until the session ends.
    async fn lock_account(&mut self, account_id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn instrument(&mut self, symbol: &str) -> Result<Option<Instrument>, StoreError>;

    /// Live lots for one (account, instrument) pair in FIFO order.
    async fn live_lots(&mut self, account_id: Uuid, symbol: &str)
    -> Result<Vec<Lot>, StoreError>;

    /// Live lots for the account across every instrument, oldest first.
    async fn account_live_lots(&mut self, account_id: Uuid) -> Result<Vec<Lot>, StoreError>;

    /// Persists a new lot and returns it with its insertion sequence.
    async fn insert_lot(&mut self, lot: Lot) -> Result<Lot, StoreError>;

    /// Persists a lot's reduced remaining quantity.
    async fn update_lot(&mut self, lot: &Lot) -> Result<(), StoreError>;

    async fn insert_transaction(
        &mut self,
        transaction: Transaction,
    ) -> Result<Transaction, StoreError>;

    /// Persists the account's cash balance and cached total value.
    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
