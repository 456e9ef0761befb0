use crate::error::{checked_amount, CoreError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One purchase event for one (account, instrument) pair.
///
/// A lot is the unit of cost-basis tracking. It is created by a buy with
/// `remaining_quantity == quantity` and only ever shrinks afterwards, one
/// `decrement` per sale that draws from it. Exhausted lots are kept for
/// the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    lot_id: Uuid,
    account_id: Uuid,
    symbol: String,
    purchased_at: DateTime<Utc>,
    purchase_price: Decimal,
    quantity: i64,
    remaining_quantity: i64,
    seq: i64,
}

impl Lot {
    /// Opens a new lot for a purchase of `quantity` shares at `price`.
    ///
    /// The insertion sequence is left at zero; the store assigns it when the
    /// lot is persisted.
    pub fn open(
        account_id: Uuid,
        symbol: impl Into<String>,
        price: Decimal,
        quantity: i64,
        purchased_at: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity(quantity));
        }
        if price < Decimal::ZERO {
            return Err(CoreError::InvalidPrice(price));
        }

        Ok(Self {
            lot_id: Uuid::new_v4(),
            account_id,
            symbol: symbol.into(),
            purchased_at,
            purchase_price: price,
            quantity,
            remaining_quantity: quantity,
            seq: 0,
        })
    }

    /// Rebuilds a lot from persisted state.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        lot_id: Uuid,
        account_id: Uuid,
        symbol: String,
        purchased_at: DateTime<Utc>,
        purchase_price: Decimal,
        quantity: i64,
        remaining_quantity: i64,
        seq: i64,
    ) -> Result<Self, CoreError> {
        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity(quantity));
        }
        if remaining_quantity < 0 || remaining_quantity > quantity {
            return Err(CoreError::InvalidInput(
                "remaining_quantity".to_string(),
                format!("{remaining_quantity} (original quantity {quantity})"),
            ));
        }

        Ok(Self {
            lot_id,
            account_id,
            symbol,
            purchased_at,
            purchase_price,
            quantity,
            remaining_quantity,
            seq,
        })
    }

    /// Stamps the store-assigned insertion sequence.
    pub fn with_seq(mut self, seq: i64) -> Self {
        self.seq = seq;
        self
    }

    /// Removes `amount` shares from the lot.
    pub fn decrement(&mut self, amount: i64) -> Result<(), CoreError> {
        if amount <= 0 {
            return Err(CoreError::InvalidQuantity(amount));
        }
        if amount > self.remaining_quantity {
            return Err(CoreError::Overdraw {
                requested: amount,
                remaining: self.remaining_quantity,
            });
        }
        self.remaining_quantity -= amount;
        Ok(())
    }

    pub fn lot_id(&self) -> Uuid {
        self.lot_id
    }

    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn purchased_at(&self) -> DateTime<Utc> {
        self.purchased_at
    }

    pub fn purchase_price(&self) -> Decimal {
        self.purchase_price
    }

    /// The original number of shares bought.
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn remaining_quantity(&self) -> i64 {
        self.remaining_quantity
    }

    pub fn seq(&self) -> i64 {
        self.seq
    }

    /// A lot is live while it still holds shares.
    pub fn is_live(&self) -> bool {
        self.remaining_quantity > 0
    }

    /// Cost basis of the shares still held in this lot.
    pub fn cost_basis(&self) -> Result<Decimal, CoreError> {
        checked_amount(self.purchase_price, self.remaining_quantity)
    }
}
