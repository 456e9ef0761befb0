use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{Account, CoreError, Instrument, Lot, TradeSide, Transaction};
use ledger::{AccountSnapshot, LedgerSession, LedgerStore, StoreError};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::FromRow;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str =
    "account_id, name, initial_cash, cash_balance, total_value, created_at, updated_at";
const LOT_COLUMNS: &str = "lot_id, account_id, symbol, purchased_at, purchase_price, quantity, \
                           remaining_quantity, seq";
const TRANSACTION_COLUMNS: &str =
    "transaction_id, account_id, side, symbol, quantity, price, executed_at, lot_id, seq";
const INSTRUMENT_COLUMNS: &str = "symbol, name, sector, price, updated_at";

/// Translates driver errors into the port's error type. Constraint
/// violations keep their meaning; everything else is a backend failure.
fn store_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Duplicate(db.message().to_string());
        }
        if db.is_check_violation() {
            return StoreError::Invariant(db.message().to_string());
        }
    }
    StoreError::Backend(e.to_string())
}

// Row structs mirror the tables one to one; conversion into the domain
// types re-checks every invariant.

#[derive(Debug, Clone, FromRow)]
struct AccountRow {
    account_id: Uuid,
    name: String,
    initial_cash: Decimal,
    cash_balance: Decimal,
    total_value: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account::restore(
            row.account_id,
            row.name,
            row.initial_cash,
            row.cash_balance,
            row.total_value,
            row.created_at,
            row.updated_at,
        )
    }
}

#[derive(Debug, Clone, FromRow)]
struct LotRow {
    lot_id: Uuid,
    account_id: Uuid,
    symbol: String,
    purchased_at: DateTime<Utc>,
    purchase_price: Decimal,
    quantity: i64,
    remaining_quantity: i64,
    seq: i64,
}

impl TryFrom<LotRow> for Lot {
    type Error = CoreError;

    fn try_from(row: LotRow) -> Result<Self, Self::Error> {
        Lot::restore(
            row.lot_id,
            row.account_id,
            row.symbol,
            row.purchased_at,
            row.purchase_price,
            row.quantity,
            row.remaining_quantity,
            row.seq,
        )
    }
}

#[derive(Debug, Clone, FromRow)]
struct InstrumentRow {
    symbol: String,
    name: String,
    sector: String,
    price: Decimal,
    updated_at: DateTime<Utc>,
}

impl From<InstrumentRow> for Instrument {
    fn from(row: InstrumentRow) -> Self {
        Instrument {
            symbol: row.symbol,
            name: row.name,
            sector: row.sector,
            price: row.price,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct TransactionRow {
    transaction_id: Uuid,
    account_id: Uuid,
    side: String,
    symbol: String,
    quantity: i64,
    price: Decimal,
    executed_at: DateTime<Utc>,
    lot_id: Option<Uuid>,
    seq: i64,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = CoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            transaction_id: row.transaction_id,
            account_id: row.account_id,
            side: row.side.parse::<TradeSide>()?,
            symbol: row.symbol,
            quantity: row.quantity,
            price: row.price,
            executed_at: row.executed_at,
            lot_id: row.lot_id,
            seq: row.seq,
        })
    }
}

fn into_lots(rows: Vec<LotRow>) -> Result<Vec<Lot>, StoreError> {
    rows.into_iter()
        .map(|row| Lot::try_from(row).map_err(StoreError::from))
        .collect()
}

/// `LedgerStore` over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Creates a new store with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerSession>, StoreError> {
        let tx = self.pool.begin().await.map_err(store_err)?;
        Ok(Box::new(PgLedgerSession { tx }))
    }

    async fn snapshot(&self, account_id: Uuid) -> Result<Option<AccountSnapshot>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        let account = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1"
        ))
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_err)?;
        let Some(account) = account else {
            return Ok(None);
        };

        let lots = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {LOT_COLUMNS} FROM lots \
             WHERE account_id = $1 AND remaining_quantity > 0 \
             ORDER BY purchased_at, seq"
        ))
        .bind(account_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(store_err)?;

        let instruments = sqlx::query_as::<_, InstrumentRow>(&format!(
            "SELECT {INSTRUMENT_COLUMNS} FROM instruments \
             WHERE symbol IN (SELECT symbol FROM lots \
                              WHERE account_id = $1 AND remaining_quantity > 0) \
             ORDER BY symbol"
        ))
        .bind(account_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;

        Ok(Some(AccountSnapshot {
            account: account.into(),
            lots: into_lots(lots)?,
            instruments: instruments.into_iter().map(Instrument::from).collect(),
            taken_at: Utc::now(),
        }))
    }

    async fn transactions(&self, account_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE account_id = $1 ORDER BY executed_at DESC, seq DESC"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.into_iter()
            .map(|row| Transaction::try_from(row).map_err(StoreError::from))
            .collect()
    }

    async fn lots(&self, account_id: Uuid) -> Result<Vec<Lot>, StoreError> {
        let rows = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {LOT_COLUMNS} FROM lots WHERE account_id = $1 ORDER BY purchased_at, seq"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        into_lots(rows)
    }

    async fn account(&self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.map(Account::from))
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO accounts ({ACCOUNT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(account.account_id())
        .bind(account.name())
        .bind(account.initial_cash())
        .bind(account.cash_balance())
        .bind(account.total_value())
        .bind(account.created_at())
        .bind(account.updated_at())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn instrument(&self, symbol: &str) -> Result<Option<Instrument>, StoreError> {
        let row = sqlx::query_as::<_, InstrumentRow>(&format!(
            "SELECT {INSTRUMENT_COLUMNS} FROM instruments WHERE symbol = $1"
        ))
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.map(Instrument::from))
    }

    async fn instruments(&self) -> Result<Vec<Instrument>, StoreError> {
        let rows = sqlx::query_as::<_, InstrumentRow>(&format!(
            "SELECT {INSTRUMENT_COLUMNS} FROM instruments ORDER BY symbol"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(rows.into_iter().map(Instrument::from).collect())
    }

    async fn insert_instrument(&self, instrument: &Instrument) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO instruments ({INSTRUMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5)"
        ))
        .bind(&instrument.symbol)
        .bind(&instrument.name)
        .bind(&instrument.sector)
        .bind(instrument.price)
        .bind(instrument.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn set_price(
        &self,
        symbol: &str,
        price: Decimal,
    ) -> Result<Option<Instrument>, StoreError> {
        let row = sqlx::query_as::<_, InstrumentRow>(&format!(
            "UPDATE instruments SET price = $2, updated_at = $3 WHERE symbol = $1 \
             RETURNING {INSTRUMENT_COLUMNS}"
        ))
        .bind(symbol)
        .bind(price)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.map(Instrument::from))
    }
}

/// One database transaction. Dropping it without `commit` rolls back.
pub struct PgLedgerSession {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerSession for PgLedgerSession {
    async fn lock_account(&mut self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1 FOR UPDATE"
        ))
        .bind(account_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(row.map(Account::from))
    }

    async fn instrument(&mut self, symbol: &str) -> Result<Option<Instrument>, StoreError> {
        let row = sqlx::query_as::<_, InstrumentRow>(&format!(
            "SELECT {INSTRUMENT_COLUMNS} FROM instruments WHERE symbol = $1"
        ))
        .bind(symbol)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(row.map(Instrument::from))
    }

    async fn live_lots(&mut self, account_id: Uuid, symbol: &str) -> Result<Vec<Lot>, StoreError> {
        let rows = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {LOT_COLUMNS} FROM lots \
             WHERE account_id = $1 AND symbol = $2 AND remaining_quantity > 0 \
             ORDER BY purchased_at, seq"
        ))
        .bind(account_id)
        .bind(symbol)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_err)?;
        into_lots(rows)
    }

    async fn account_live_lots(&mut self, account_id: Uuid) -> Result<Vec<Lot>, StoreError> {
        let rows = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {LOT_COLUMNS} FROM lots \
             WHERE account_id = $1 AND remaining_quantity > 0 \
             ORDER BY purchased_at, seq"
        ))
        .bind(account_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_err)?;
        into_lots(rows)
    }

    async fn insert_lot(&mut self, lot: Lot) -> Result<Lot, StoreError> {
        let seq: i64 = sqlx::query_scalar(
            "INSERT INTO lots (lot_id, account_id, symbol, purchased_at, purchase_price, \
                               quantity, remaining_quantity) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING seq",
        )
        .bind(lot.lot_id())
        .bind(lot.account_id())
        .bind(lot.symbol())
        .bind(lot.purchased_at())
        .bind(lot.purchase_price())
        .bind(lot.quantity())
        .bind(lot.remaining_quantity())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(lot.with_seq(seq))
    }

    async fn update_lot(&mut self, lot: &Lot) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE lots SET remaining_quantity = $2 \
             WHERE lot_id = $1 AND remaining_quantity >= $2",
        )
        .bind(lot.lot_id())
        .bind(lot.remaining_quantity())
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let stored: Option<i64> =
            sqlx::query_scalar("SELECT remaining_quantity FROM lots WHERE lot_id = $1")
                .bind(lot.lot_id())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(store_err)?;
        match stored {
            None => Err(StoreError::Missing(format!("lot {}", lot.lot_id()))),
            Some(stored) => Err(StoreError::Invariant(format!(
                "remaining quantity of lot {} cannot grow from {} to {}",
                lot.lot_id(),
                stored,
                lot.remaining_quantity()
            ))),
        }
    }

    async fn insert_transaction(
        &mut self,
        transaction: Transaction,
    ) -> Result<Transaction, StoreError> {
        let seq: i64 = sqlx::query_scalar(
            "INSERT INTO transactions (transaction_id, account_id, side, symbol, quantity, \
                                       price, executed_at, lot_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING seq",
        )
        .bind(transaction.transaction_id)
        .bind(transaction.account_id)
        .bind(transaction.side.as_str())
        .bind(&transaction.symbol)
        .bind(transaction.quantity)
        .bind(transaction.price)
        .bind(transaction.executed_at)
        .bind(transaction.lot_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(transaction.with_seq(seq))
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE accounts SET cash_balance = $2, total_value = $3, updated_at = $4 \
             WHERE account_id = $1",
        )
        .bind(account.account_id())
        .bind(account.cash_balance())
        .bind(account.total_value())
        .bind(account.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(format!("account {}", account.account_id())));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let PgLedgerSession { tx } = *self;
        tx.commit().await.map_err(store_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn transaction_row(side: &str) -> TransactionRow {
        TransactionRow {
            transaction_id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            side: side.to_string(),
            symbol: "ACME".to_string(),
            quantity: 3,
            price: dec!(12.5),
            executed_at: Utc::now(),
            lot_id: Some(Uuid::new_v4()),
            seq: 7,
        }
    }

    #[test]
    fn transaction_row_parses_side() {
        let tx = Transaction::try_from(transaction_row("SELL")).unwrap();
        assert_eq!(tx.side, TradeSide::Sell);
        assert_eq!(tx.seq, 7);
        assert_eq!(tx.notional(), Ok(dec!(37.5)));
    }

    #[test]
    fn transaction_row_with_unknown_side_is_corrupt() {
        let err = Transaction::try_from(transaction_row("HOLD")).unwrap_err();
        assert!(matches!(StoreError::from(err), StoreError::Corrupt(_)));
    }

    #[test]
    fn lot_row_with_remaining_above_quantity_is_rejected() {
        let row = LotRow {
            lot_id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            symbol: "ACME".to_string(),
            purchased_at: Utc::now(),
            purchase_price: dec!(1),
            quantity: 5,
            remaining_quantity: 6,
            seq: 1,
        };
        assert!(into_lots(vec![row]).is_err());
    }
}
