use crate::error::ExecutorError;
use analytics::{PortfolioReport, Position, PositionCalculator};
use configuration::AccountSettings;
use core_types::{Account, Lot, Transaction};
use ledger::LedgerStore;
use std::sync::Arc;
use uuid::Uuid;

/// The read side of the engine: accounts and the reports derived from them.
///
/// Reports are computed from an [`ledger::AccountSnapshot`], so they never
/// observe a half-applied trade and never write anything back.
#[derive(Clone)]
pub struct Portfolio {
    store: Arc<dyn LedgerStore>,
    calculator: PositionCalculator,
    settings: AccountSettings,
}

impl Portfolio {
    pub fn new(store: Arc<dyn LedgerStore>, settings: AccountSettings) -> Self {
        Self {
            store,
            calculator: PositionCalculator::new(),
            settings,
        }
    }

    /// Opens an account funded with the configured initial cash.
    pub async fn open_account(&self, name: &str) -> Result<Account, ExecutorError> {
        let account = Account::open(name, self.settings.initial_cash)?;
        self.store.insert_account(&account).await?;
        tracing::info!(
            account_id = %account.account_id(),
            name,
            initial_cash = %account.initial_cash(),
            "Account opened."
        );
        Ok(account)
    }

    pub async fn account(&self, account_id: Uuid) -> Result<Account, ExecutorError> {
        self.store
            .account(account_id)
            .await?
            .ok_or(ExecutorError::AccountNotFound(account_id))
    }

    /// Every held instrument valued at its current price, plus the account summary.
    pub async fn positions(&self, account_id: Uuid) -> Result<PortfolioReport, ExecutorError> {
        let snapshot = self
            .store
            .snapshot(account_id)
            .await?
            .ok_or(ExecutorError::AccountNotFound(account_id))?;
        let report =
            self.calculator
                .portfolio(&snapshot.account, &snapshot.instruments, &snapshot.lots)?;
        tracing::debug!(%account_id, positions = report.positions.len(), "Built positions report.");
        Ok(report)
    }

    /// The account's position in a single instrument. An instrument with no
    /// live lots yields a position whose numeric fields are all zero.
    pub async fn position(&self, account_id: Uuid, symbol: &str) -> Result<Position, ExecutorError> {
        let snapshot = self
            .store
            .snapshot(account_id)
            .await?
            .ok_or(ExecutorError::AccountNotFound(account_id))?;
        let instrument = match snapshot.instruments.iter().find(|i| i.symbol == symbol) {
            Some(instrument) => instrument.clone(),
            None => self
                .store
                .instrument(symbol)
                .await?
                .ok_or_else(|| ExecutorError::InstrumentNotFound(symbol.to_string()))?,
        };
        Ok(self.calculator.position(&instrument, &snapshot.lots)?)
    }

    /// Transactions newest first.
    pub async fn transaction_history(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<Transaction>, ExecutorError> {
        self.account(account_id).await?;
        Ok(self.store.transactions(account_id).await?)
    }

    /// Every lot the account has opened, exhausted ones included, oldest first.
    pub async fn lots(&self, account_id: Uuid) -> Result<Vec<Lot>, ExecutorError> {
        self.account(account_id).await?;
        Ok(self.store.lots(account_id).await?)
    }
}
