use crate::error::ExecutorError;
use analytics::PositionCalculator;
use chrono::Utc;
use core_types::error::checked_amount;
use core_types::{fifo, Account, CoreError, Instrument, Lot, Transaction};
use ledger::{LedgerSession, LedgerStore, StoreError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of a committed buy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyReceipt {
    pub transaction: Transaction,
    pub lot: Lot,
    pub cash_balance: Decimal,
    pub total_value: Decimal,
}

/// Outcome of a committed sell. One transaction per lot drawn from, oldest lot first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellReceipt {
    pub realized_gain: Decimal,
    pub transactions: Vec<Transaction>,
    pub cash_balance: Decimal,
    pub total_value: Decimal,
}

fn validate_order(quantity: i64, price: Decimal) -> Result<(), ExecutorError> {
    if quantity <= 0 {
        return Err(ExecutorError::InvalidQuantity(quantity));
    }
    if price < Decimal::ZERO {
        return Err(ExecutorError::InvalidPrice(price));
    }
    Ok(())
}

/// Executes buys and sells against the ledger.
///
/// Each operation runs inside a single [`LedgerSession`]. Any error returned
/// before `commit` drops the session, which discards every write made so far,
/// so callers only ever observe a trade in full or not at all.
#[derive(Clone)]
pub struct TradeExecutor {
    store: Arc<dyn LedgerStore>,
    calculator: PositionCalculator,
}

impl TradeExecutor {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            calculator: PositionCalculator::new(),
        }
    }

    async fn locked_account(
        session: &mut dyn LedgerSession,
        account_id: Uuid,
    ) -> Result<Account, ExecutorError> {
        session
            .lock_account(account_id)
            .await?
            .ok_or(ExecutorError::AccountNotFound(account_id))
    }

    async fn resolve_instrument(
        session: &mut dyn LedgerSession,
        symbol: &str,
    ) -> Result<Instrument, ExecutorError> {
        session
            .instrument(symbol)
            .await?
            .ok_or_else(|| ExecutorError::InstrumentNotFound(symbol.to_string()))
    }

    /// Buys `quantity` shares of `symbol` at `price`, opening a new lot.
    pub async fn buy(
        &self,
        account_id: Uuid,
        symbol: &str,
        quantity: i64,
        price: Decimal,
    ) -> Result<BuyReceipt, ExecutorError> {
        validate_order(quantity, price)?;

        let mut session = self.store.begin().await?;
        let mut account = Self::locked_account(session.as_mut(), account_id).await?;
        let instrument = Self::resolve_instrument(session.as_mut(), symbol).await?;

        // A cost too large for `Decimal` can never be covered; it is reported as `Decimal::MAX`.
        let affordable = checked_amount(price, quantity)
            .ok()
            .filter(|cost| *cost <= account.cash_balance());
        let Some(cost) = affordable else {
            let cost = checked_amount(price, quantity).unwrap_or(Decimal::MAX);
            tracing::warn!(
                %account_id,
                symbol,
                %cost,
                available = %account.cash_balance(),
                "Buy rejected: insufficient funds."
            );
            return Err(ExecutorError::InsufficientFunds {
                cost,
                available: account.cash_balance(),
            });
        };

        let held = fifo::available(&session.live_lots(account_id, &instrument.symbol).await?)?;
        if held.checked_add(quantity).is_none() {
            tracing::warn!(
                %account_id,
                symbol,
                held,
                quantity,
                "Buy rejected: position would exceed the share limit."
            );
            return Err(ExecutorError::InvalidQuantity(quantity));
        }

        let lot = Lot::open(account_id, &instrument.symbol, price, quantity, Utc::now())?;
        let lot = session.insert_lot(lot).await?;
        account.debit(cost)?;
        let transaction = session.insert_transaction(Transaction::buy(&lot)).await?;

        self.recompute(session.as_mut(), &mut account).await?;
        session.commit().await?;

        tracing::info!(
            %account_id,
            symbol = %instrument.symbol,
            quantity,
            %price,
            lot_id = %lot.lot_id(),
            cash_balance = %account.cash_balance(),
            "Buy executed."
        );

        Ok(BuyReceipt {
            transaction,
            lot,
            cash_balance: account.cash_balance(),
            total_value: account.total_value(),
        })
    }

    /// Sells `quantity` shares of `symbol` at `price`, drawing from the oldest lots first.
    pub async fn sell(
        &self,
        account_id: Uuid,
        symbol: &str,
        quantity: i64,
        price: Decimal,
    ) -> Result<SellReceipt, ExecutorError> {
        validate_order(quantity, price)?;

        let mut session = self.store.begin().await?;
        let mut account = Self::locked_account(session.as_mut(), account_id).await?;
        let instrument = Self::resolve_instrument(session.as_mut(), symbol).await?;

        let mut lots = session.live_lots(account_id, &instrument.symbol).await?;
        let available = fifo::available(&lots)?;
        if quantity > available {
            tracing::warn!(
                %account_id,
                symbol,
                requested = quantity,
                available,
                "Sell rejected: insufficient shares."
            );
            return Err(ExecutorError::InsufficientShares {
                requested: quantity,
                available,
            });
        }

        let fills = fifo::consume(&mut lots, quantity)?;
        let executed_at = Utc::now();
        let mut realized_gain = Decimal::ZERO;
        let mut transactions = Vec::with_capacity(fills.len());

        for fill in &fills {
            let lot = lots
                .iter()
                .find(|lot| lot.lot_id() == fill.lot_id)
                .ok_or_else(|| StoreError::Missing(format!("lot {}", fill.lot_id)))?;
            session.update_lot(lot).await?;

            realized_gain = realized_gain
                .checked_add(fill.realized_gain(price)?)
                .ok_or(CoreError::Overflow("realized gain"))?;
            account.credit(checked_amount(price, fill.quantity)?)?;

            let transaction = Transaction::sell(
                account_id,
                instrument.symbol.as_str(),
                fill,
                price,
                executed_at,
            );
            transactions.push(session.insert_transaction(transaction).await?);

            tracing::debug!(
                lot_id = %fill.lot_id,
                taken = fill.quantity,
                remaining = lot.remaining_quantity(),
                "Consumed lot."
            );
        }

        self.recompute(session.as_mut(), &mut account).await?;
        session.commit().await?;

        tracing::info!(
            %account_id,
            symbol = %instrument.symbol,
            quantity,
            %price,
            lots = fills.len(),
            %realized_gain,
            cash_balance = %account.cash_balance(),
            "Sell executed."
        );

        Ok(SellReceipt {
            realized_gain,
            transactions,
            cash_balance: account.cash_balance(),
            total_value: account.total_value(),
        })
    }

    /// Recomputes and persists the account's cached total value from current prices.
    pub async fn revalue(&self, account_id: Uuid) -> Result<Account, ExecutorError> {
        let mut session = self.store.begin().await?;
        let mut account = Self::locked_account(session.as_mut(), account_id).await?;
        let before = account.total_value();

        self.recompute(session.as_mut(), &mut account).await?;
        session.commit().await?;

        tracing::info!(
            %account_id,
            %before,
            after = %account.total_value(),
            "Account revalued."
        );
        Ok(account)
    }

    /// Sets `total_value = cash + market value of live lots` inside the session.
    async fn recompute(
        &self,
        session: &mut dyn LedgerSession,
        account: &mut Account,
    ) -> Result<(), ExecutorError> {
        let lots = session.account_live_lots(account.account_id()).await?;

        let mut prices: HashMap<String, Decimal> = HashMap::new();
        for lot in &lots {
            if prices.contains_key(lot.symbol()) {
                continue;
            }
            let instrument = Self::resolve_instrument(session, lot.symbol()).await?;
            prices.insert(instrument.symbol, instrument.price);
        }

        let stock_value = self.calculator.stock_value(&lots, &prices)?;
        account.revalue(stock_value)?;
        session.update_account(account).await?;
        Ok(())
    }
}
