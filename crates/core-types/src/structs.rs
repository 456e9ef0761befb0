use crate::enums::TradeSide;
use crate::error::{checked_amount, CoreError};
use crate::fifo::LotFill;
use crate::lot::Lot;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tradable instrument. The symbol is its identity; only the price moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub price: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl Instrument {
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        sector: impl Into<String>,
        price: Decimal,
    ) -> Result<Self, CoreError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(CoreError::InvalidInput("symbol".to_string(), symbol));
        }
        if price < Decimal::ZERO {
            return Err(CoreError::InvalidPrice(price));
        }
        Ok(Self {
            symbol,
            name: name.into(),
            sector: sector.into(),
            price,
            updated_at: Utc::now(),
        })
    }
}

/// Immutable audit record of one executed buy, or of the part of a sell
/// that drew from one lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: Uuid,
    pub account_id: Uuid,
    pub side: TradeSide,
    pub symbol: String,
    pub quantity: i64,
    pub price: Decimal,
    pub executed_at: DateTime<Utc>,
    pub lot_id: Option<Uuid>,
    /// Store-assigned insertion sequence; orders records sharing a timestamp.
    pub seq: i64,
}

impl Transaction {
    /// The BUY record for a freshly opened lot.
    pub fn buy(lot: &Lot) -> Self {
        Self {
            transaction_id: Uuid::new_v4(),
            account_id: lot.account_id(),
            side: TradeSide::Buy,
            symbol: lot.symbol().to_string(),
            quantity: lot.quantity(),
            price: lot.purchase_price(),
            executed_at: lot.purchased_at(),
            lot_id: Some(lot.lot_id()),
            seq: 0,
        }
    }

    /// The SELL record for the shares taken from one lot.
    pub fn sell(
        account_id: Uuid,
        symbol: impl Into<String>,
        fill: &LotFill,
        price: Decimal,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: Uuid::new_v4(),
            account_id,
            side: TradeSide::Sell,
            symbol: symbol.into(),
            quantity: fill.quantity,
            price,
            executed_at,
            lot_id: Some(fill.lot_id),
            seq: 0,
        }
    }

    pub fn with_seq(mut self, seq: i64) -> Self {
        self.seq = seq;
        self
    }

    /// Cash moved by this record (price x quantity).
    pub fn notional(&self) -> Result<Decimal, CoreError> {
        checked_amount(self.price, self.quantity)
    }
}

/// A trading account: a cash balance plus a cached total valuation.
///
/// `total_value` is a materialized view of `cash_balance + market value of
/// live lots`. The only way to change it is [`Account::revalue`], which the
/// trade executor calls at the end of every trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    account_id: Uuid,
    name: String,
    initial_cash: Decimal,
    cash_balance: Decimal,
    total_value: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Account {
    /// Opens an account funded with `initial_cash` and no holdings.
    pub fn open(name: impl Into<String>, initial_cash: Decimal) -> Result<Self, CoreError> {
        if initial_cash < Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                "initial_cash".to_string(),
                initial_cash.to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            account_id: Uuid::new_v4(),
            name: name.into(),
            initial_cash,
            cash_balance: initial_cash,
            total_value: initial_cash,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds an account from persisted state.
    pub fn restore(
        account_id: Uuid,
        name: String,
        initial_cash: Decimal,
        cash_balance: Decimal,
        total_value: Decimal,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            name,
            initial_cash,
            cash_balance,
            total_value,
            created_at,
            updated_at,
        }
    }

    /// Takes `amount` out of the cash balance.
    pub fn debit(&mut self, amount: Decimal) -> Result<(), CoreError> {
        if amount > self.cash_balance {
            return Err(CoreError::InsufficientCash {
                required: amount,
                available: self.cash_balance,
            });
        }
        self.cash_balance -= amount;
        Ok(())
    }

    pub fn credit(&mut self, amount: Decimal) -> Result<(), CoreError> {
        self.cash_balance = self
            .cash_balance
            .checked_add(amount)
            .ok_or(CoreError::Overflow("cash balance"))?;
        Ok(())
    }

    /// Rebuilds the cached total from the current cash and the supplied
    /// market value of every live lot.
    pub fn revalue(&mut self, stock_value: Decimal) -> Result<(), CoreError> {
        self.total_value = self
            .cash_balance
            .checked_add(stock_value)
            .ok_or(CoreError::Overflow("total value"))?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial_cash(&self) -> Decimal {
        self.initial_cash
    }

    pub fn cash_balance(&self) -> Decimal {
        self.cash_balance
    }

    pub fn total_value(&self) -> Decimal {
        self.total_value
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fresh_account_is_valued_at_its_cash() {
        let account = Account::open("alice", dec!(10000)).unwrap();
        assert_eq!(account.cash_balance(), dec!(10000));
        assert_eq!(account.total_value(), dec!(10000));
        assert!(Account::open("bob", dec!(-1)).is_err());
    }

    #[test]
    fn debit_refuses_to_overdraw() {
        let mut account = Account::open("alice", dec!(100)).unwrap();
        let err = account.debit(dec!(100.01)).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientCash {
                required: dec!(100.01),
                available: dec!(100)
            }
        );
        account.debit(dec!(40)).unwrap();
        account.credit(dec!(15)).unwrap();
        assert_eq!(account.cash_balance(), dec!(75));
    }

    #[test]
    fn revalue_is_cash_plus_stock() {
        let mut account = Account::open("alice", dec!(10000)).unwrap();
        account.debit(dec!(1000)).unwrap();
        // Total is stale until revalued.
        assert_eq!(account.total_value(), dec!(10000));
        account.revalue(dec!(1200)).unwrap();
        assert_eq!(account.total_value(), dec!(10200));
    }

    #[test]
    fn balances_refuse_to_overflow() {
        let mut account = Account::open("alice", Decimal::MAX).unwrap();
        assert!(matches!(account.credit(dec!(1)), Err(CoreError::Overflow(_))));
        assert_eq!(account.cash_balance(), Decimal::MAX);
        assert!(matches!(account.revalue(dec!(1)), Err(CoreError::Overflow(_))));
        assert_eq!(account.total_value(), Decimal::MAX);
    }

    #[test]
    fn buy_record_mirrors_the_lot() {
        let account = Account::open("alice", dec!(10000)).unwrap();
        let lot = Lot::open(account.account_id(), "X", dec!(100), 10, Utc::now()).unwrap();
        let tx = Transaction::buy(&lot);
        assert_eq!(tx.side, TradeSide::Buy);
        assert_eq!(tx.lot_id, Some(lot.lot_id()));
        assert_eq!(tx.notional(), Ok(dec!(1000)));
    }

    #[test]
    fn instrument_requires_symbol_and_non_negative_price() {
        assert!(Instrument::new("", "Empty", "None", dec!(1)).is_err());
        assert!(Instrument::new("X", "Ex", "Tech", dec!(-1)).is_err());
        assert!(Instrument::new("X", "Ex", "Tech", Decimal::ZERO).is_ok());
    }
}
