//! First-in-first-out consumption of purchase lots.
//!
//! A sale is assigned to lots strictly in the order they are given, which
//! callers must supply oldest-first. Each lot contributes
//! `min(remaining, still_to_sell)` shares until the sale is covered.

use crate::error::{checked_amount, CoreError};
use crate::lot::Lot;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The portion of a sale drawn from a single lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotFill {
    pub lot_id: Uuid,
    pub purchase_price: Decimal,
    pub quantity: i64,
}

impl LotFill {
    /// Gain booked by selling this fill at `sell_price`.
    pub fn realized_gain(&self, sell_price: Decimal) -> Result<Decimal, CoreError> {
        let spread = sell_price
            .checked_sub(self.purchase_price)
            .ok_or(CoreError::Overflow("realized gain"))?;
        checked_amount(spread, self.quantity)
    }
}

/// Total shares still held across `lots`.
pub fn available(lots: &[Lot]) -> Result<i64, CoreError> {
    lots.iter().try_fold(0i64, |total, lot| {
        total
            .checked_add(lot.remaining_quantity())
            .ok_or(CoreError::Overflow("share count"))
    })
}

/// Consumes `quantity` shares from `lots`, oldest first.
///
/// Availability is checked before any lot is touched, so on error every lot
/// is left exactly as it was.
pub fn consume(lots: &mut [Lot], quantity: i64) -> Result<Vec<LotFill>, CoreError> {
    if quantity <= 0 {
        return Err(CoreError::InvalidQuantity(quantity));
    }
    let total = available(lots)?;
    if quantity > total {
        return Err(CoreError::Overdraw {
            requested: quantity,
            remaining: total,
        });
    }

    let mut left = quantity;
    let mut fills = Vec::new();
    for lot in lots.iter_mut().filter(|lot| lot.is_live()) {
        if left == 0 {
            break;
        }
        let take = lot.remaining_quantity().min(left);
        lot.decrement(take)?;
        left -= take;
        fills.push(LotFill {
            lot_id: lot.lot_id(),
            purchase_price: lot.purchase_price(),
            quantity: take,
        });
    }

    Ok(fills)
}
