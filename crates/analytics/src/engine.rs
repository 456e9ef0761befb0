use crate::error::AnalyticsError;
use crate::report::{LotValuation, PortfolioReport, PortfolioSummary, Position};
use core_types::error::checked_amount;
use core_types::{Account, CoreError, Instrument, Lot};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// `gain / cost * 100`, defined as exactly zero when there is no cost.
fn percentage(gain: Decimal, cost: Decimal) -> Result<Decimal, CoreError> {
    if cost > Decimal::ZERO {
        gain.checked_div(cost)
            .and_then(|ratio| ratio.checked_mul(HUNDRED))
            .ok_or(CoreError::Overflow("return percentage"))
    } else {
        Ok(Decimal::ZERO)
    }
}

fn add(total: Decimal, amount: Decimal, what: &'static str) -> Result<Decimal, CoreError> {
    total.checked_add(amount).ok_or(CoreError::Overflow(what))
}

/// A stateless calculator for deriving valuation metrics from lots.
#[derive(Debug, Default, Clone, Copy)]
pub struct PositionCalculator {}

impl PositionCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values one lot's remaining shares at `price`.
    pub fn value_lot(&self, lot: &Lot, price: Decimal) -> Result<LotValuation, AnalyticsError> {
        let cost = lot.cost_basis()?;
        let current_value = checked_amount(price, lot.remaining_quantity())?;
        let gain = current_value - cost;

        Ok(LotValuation {
            lot_id: lot.lot_id(),
            purchased_at: lot.purchased_at(),
            shares: lot.remaining_quantity(),
            purchase_price: lot.purchase_price(),
            cost,
            current_value,
            gain,
            return_percentage: percentage(gain, cost)?,
        })
    }

    /// Derives the position in `instrument` from its lots.
    ///
    /// Exhausted lots and lots of other instruments are ignored, so callers
    /// may pass an account's whole lot list.
    pub fn position(
        &self,
        instrument: &Instrument,
        lots: &[Lot],
    ) -> Result<Position, AnalyticsError> {
        let price = instrument.price;
        let mut position = Position {
            symbol: instrument.symbol.clone(),
            name: instrument.name.clone(),
            sector: instrument.sector.clone(),
            current_price: price,
            shares: 0,
            avg_cost: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            current_value: Decimal::ZERO,
            unrealized_gain: Decimal::ZERO,
            return_percentage: Decimal::ZERO,
            lots: Vec::new(),
        };

        for lot in lots
            .iter()
            .filter(|lot| lot.is_live() && lot.symbol() == instrument.symbol)
        {
            if lot.purchase_price().is_zero() {
                tracing::warn!(
                    lot_id = %lot.lot_id(),
                    symbol = %lot.symbol(),
                    "Lot has a zero purchase price; its return is reported as 0."
                );
            }
            position.shares = position
                .shares
                .checked_add(lot.remaining_quantity())
                .ok_or(CoreError::Overflow("share count"))?;
            position.total_cost = add(position.total_cost, lot.cost_basis()?, "cost basis")?;
            position.lots.push(self.value_lot(lot, price)?);
        }

        if position.shares == 0 {
            return Ok(position);
        }

        position.avg_cost = position.total_cost / Decimal::from(position.shares);
        position.current_value = checked_amount(price, position.shares)?;
        position.unrealized_gain = position.current_value - position.total_cost;
        position.return_percentage = percentage(position.unrealized_gain, position.total_cost)?;
        Ok(position)
    }

    /// Market value of every live lot at the given prices.
    pub fn stock_value(
        &self,
        lots: &[Lot],
        prices: &HashMap<String, Decimal>,
    ) -> Result<Decimal, AnalyticsError> {
        lots.iter()
            .filter(|lot| lot.is_live())
            .try_fold(Decimal::ZERO, |total, lot| -> Result<Decimal, AnalyticsError> {
                let price = prices
                    .get(lot.symbol())
                    .ok_or_else(|| AnalyticsError::MissingPrice(lot.symbol().to_string()))?;
                let value = checked_amount(*price, lot.remaining_quantity())?;
                Ok(add(total, value, "stock value")?)
            })
    }

    /// Builds the positions report for an account.
    ///
    /// Every instrument with at least one live lot gets a position; an
    /// instrument with none is left out. A live lot whose instrument is not in
    /// `instruments` is an error because it cannot be valued.
    pub fn portfolio(
        &self,
        account: &Account,
        instruments: &[Instrument],
        lots: &[Lot],
    ) -> Result<PortfolioReport, AnalyticsError> {
        let by_symbol: HashMap<&str, &Instrument> = instruments
            .iter()
            .map(|instrument| (instrument.symbol.as_str(), instrument))
            .collect();

        let mut held: BTreeMap<&str, &Instrument> = BTreeMap::new();
        for lot in lots.iter().filter(|lot| lot.is_live()) {
            let instrument = by_symbol
                .get(lot.symbol())
                .copied()
                .ok_or_else(|| AnalyticsError::MissingPrice(lot.symbol().to_string()))?;
            held.insert(lot.symbol(), instrument);
        }

        let positions = held
            .values()
            .map(|instrument| self.position(instrument, lots))
            .collect::<Result<Vec<_>, _>>()?;

        let summary = self.summarize(account, &positions)?;
        Ok(PortfolioReport {
            account_id: account.account_id(),
            positions,
            summary,
        })
    }

    /// Rolls positions up into account totals.
    pub fn summarize(
        &self,
        account: &Account,
        positions: &[Position],
    ) -> Result<PortfolioSummary, AnalyticsError> {
        let stock_value = positions
            .iter()
            .try_fold(Decimal::ZERO, |total, p| add(total, p.current_value, "stock value"))?;
        let total_cost = positions
            .iter()
            .try_fold(Decimal::ZERO, |total, p| add(total, p.total_cost, "cost basis"))?;
        let total_value = add(account.cash_balance(), stock_value, "total value")?;

        Ok(PortfolioSummary {
            cash_balance: account.cash_balance(),
            stock_value,
            total_value,
            total_cost,
            total_gain: stock_value - total_cost,
            return_percentage: percentage(
                total_value - account.initial_cash(),
                account.initial_cash(),
            )?,
        })
    }
}
