use crate::error::StoreError;
use crate::store::{order_fifo, AccountSnapshot, LedgerSession, LedgerStore};
use async_trait::async_trait;
use chrono::Utc;
use core_types::{Account, Instrument, Lot, Transaction};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    instruments: BTreeMap<String, Instrument>,
    /// Insertion order doubles as the tie-break for equal timestamps.
    lots: Vec<Lot>,
    transactions: Vec<Transaction>,
    next_seq: i64,
}

impl MemoryState {
    fn next_seq(&mut self) -> i64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn account_lots(&self, account_id: Uuid) -> impl Iterator<Item = &Lot> {
        self.lots.iter().filter(move |lot| lot.account_id() == account_id)
    }
}

/// A process-local ledger store.
///
/// All sessions are serialized through one mutex. A session works on a
/// private copy of the state and swaps it in on commit, so an abandoned or
/// failed session leaves nothing behind.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn LedgerSession>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemorySession { guard, staged }))
    }

    async fn snapshot(&self, account_id: Uuid) -> Result<Option<AccountSnapshot>, StoreError> {
        let state = self.state.lock().await;
        let Some(account) = state.accounts.get(&account_id).cloned() else {
            return Ok(None);
        };

        let lots = order_fifo(state.account_lots(account_id).cloned());
        let symbols: BTreeSet<&str> = lots.iter().map(Lot::symbol).collect();
        let instruments = symbols
            .into_iter()
            .filter_map(|symbol| state.instruments.get(symbol).cloned())
            .collect();

        Ok(Some(AccountSnapshot {
            account,
            lots,
            instruments,
            taken_at: Utc::now(),
        }))
    }

    async fn transactions(&self, account_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        let state = self.state.lock().await;
        let mut history: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|tx| tx.account_id == account_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| (b.executed_at, b.seq).cmp(&(a.executed_at, a.seq)));
        Ok(history)
    }

    async fn lots(&self, account_id: Uuid) -> Result<Vec<Lot>, StoreError> {
        let state = self.state.lock().await;
        let mut lots: Vec<Lot> = state.account_lots(account_id).cloned().collect();
        lots.sort_by_key(|lot| (lot.purchased_at(), lot.seq()));
        Ok(lots)
    }

    async fn account(&self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.state.lock().await.accounts.get(&account_id).cloned())
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.accounts.contains_key(&account.account_id()) {
            return Err(StoreError::Duplicate(format!(
                "account {}",
                account.account_id()
            )));
        }
        state.accounts.insert(account.account_id(), account.clone());
        Ok(())
    }

    async fn instrument(&self, symbol: &str) -> Result<Option<Instrument>, StoreError> {
        Ok(self.state.lock().await.instruments.get(symbol).cloned())
    }

    async fn instruments(&self) -> Result<Vec<Instrument>, StoreError> {
        Ok(self.state.lock().await.instruments.values().cloned().collect())
    }

    async fn insert_instrument(&self, instrument: &Instrument) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.instruments.contains_key(&instrument.symbol) {
            return Err(StoreError::Duplicate(format!(
                "instrument {}",
                instrument.symbol
            )));
        }
        state
            .instruments
            .insert(instrument.symbol.clone(), instrument.clone());
        Ok(())
    }

    async fn set_price(
        &self,
        symbol: &str,
        price: Decimal,
    ) -> Result<Option<Instrument>, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.instruments.get_mut(symbol).map(|instrument| {
            instrument.price = price;
            instrument.updated_at = Utc::now();
            instrument.clone()
        }))
    }
}

/// A unit of work over [`MemoryStore`]. Holds the store lock for its whole
/// lifetime.
pub struct MemorySession {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl LedgerSession for MemorySession {
    async fn lock_account(&mut self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.staged.accounts.get(&account_id).cloned())
    }

    async fn instrument(&mut self, symbol: &str) -> Result<Option<Instrument>, StoreError> {
        Ok(self.staged.instruments.get(symbol).cloned())
    }

    async fn live_lots(
        &mut self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<Vec<Lot>, StoreError> {
        Ok(order_fifo(
            self.staged
                .account_lots(account_id)
                .filter(|lot| lot.symbol() == symbol)
                .cloned(),
        ))
    }

    async fn account_live_lots(&mut self, account_id: Uuid) -> Result<Vec<Lot>, StoreError> {
        Ok(order_fifo(self.staged.account_lots(account_id).cloned()))
    }

    async fn insert_lot(&mut self, lot: Lot) -> Result<Lot, StoreError> {
        if self.staged.lots.iter().any(|l| l.lot_id() == lot.lot_id()) {
            return Err(StoreError::Duplicate(format!("lot {}", lot.lot_id())));
        }
        let lot = lot.with_seq(self.staged.next_seq());
        self.staged.lots.push(lot.clone());
        Ok(lot)
    }

    async fn update_lot(&mut self, lot: &Lot) -> Result<(), StoreError> {
        let stored = self
            .staged
            .lots
            .iter_mut()
            .find(|l| l.lot_id() == lot.lot_id())
            .ok_or_else(|| StoreError::Missing(format!("lot {}", lot.lot_id())))?;
        if lot.remaining_quantity() > stored.remaining_quantity() {
            tracing::warn!(lot_id = %lot.lot_id(), "Refusing to grow a lot's remaining quantity.");
            return Err(StoreError::Invariant(format!(
                "remaining quantity of lot {} cannot grow from {} to {}",
                lot.lot_id(),
                stored.remaining_quantity(),
                lot.remaining_quantity()
            )));
        }
        *stored = lot.clone();
        Ok(())
    }

    async fn insert_transaction(
        &mut self,
        transaction: Transaction,
    ) -> Result<Transaction, StoreError> {
        let transaction = transaction.with_seq(self.staged.next_seq());
        self.staged.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError> {
        let stored = self
            .staged
            .accounts
            .get_mut(&account.account_id())
            .ok_or_else(|| StoreError::Missing(format!("account {}", account.account_id())))?;
        *stored = account.clone();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemorySession { mut guard, staged } = *self;
        tracing::trace!(
            lots = staged.lots.len(),
            transactions = staged.transactions.len(),
            "Committing memory session."
        );
        *guard = staged;
        Ok(())
    }
}
