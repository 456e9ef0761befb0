mod common;

use common::harness;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[tokio::test]
async fn buy_then_positions_shows_cost_basis() {
    let h = harness().await;
    h.list("X", dec!(100)).await;

    let receipt = h.executor.buy(h.id(), "X", 10, dec!(100)).await.unwrap();
    assert_eq!(receipt.cash_balance, dec!(9000));
    assert_eq!(receipt.total_value, dec!(10000));
    assert_eq!(receipt.lot.remaining_quantity(), 10);
    assert_eq!(receipt.transaction.lot_id, Some(receipt.lot.lot_id()));

    let report = h.portfolio.positions(h.id()).await.unwrap();
    assert_eq!(report.positions.len(), 1);
    let x = &report.positions[0];
    assert_eq!(x.shares, 10);
    assert_eq!(x.avg_cost, dec!(100));
    assert_eq!(x.unrealized_gain, Decimal::ZERO);
    assert_eq!(report.summary.total_value, dec!(10000));
}

#[tokio::test]
async fn price_move_shows_in_positions_and_revalue_persists_it() {
    let h = harness().await;
    h.list("X", dec!(100)).await;
    h.executor.buy(h.id(), "X", 10, dec!(100)).await.unwrap();

    h.instruments.update_price("X", dec!(120)).await.unwrap();

    let report = h.portfolio.positions(h.id()).await.unwrap();
    assert_eq!(report.positions[0].unrealized_gain, dec!(200));
    assert_eq!(report.summary.total_value, dec!(10200));
    assert_eq!(report.summary.return_percentage, dec!(2));

    // A price update alone leaves the cached total where the last trade put it.
    let cached = h.portfolio.account(h.id()).await.unwrap();
    assert_eq!(cached.total_value(), dec!(10000));

    let revalued = h.executor.revalue(h.id()).await.unwrap();
    assert_eq!(revalued.total_value(), dec!(10200));
    assert_eq!(
        h.portfolio.account(h.id()).await.unwrap().total_value(),
        dec!(10200)
    );
}

#[tokio::test]
async fn positions_are_stable_without_trades() {
    let h = harness().await;
    h.list("X", dec!(12.5)).await;
    h.list("Y", dec!(3)).await;
    h.executor.buy(h.id(), "Y", 7, dec!(2.75)).await.unwrap();
    h.executor.buy(h.id(), "X", 4, dec!(11)).await.unwrap();

    let first = h.portfolio.positions(h.id()).await.unwrap();
    let second = h.portfolio.positions(h.id()).await.unwrap();
    assert_eq!(first, second);

    let symbols: Vec<_> = first.positions.iter().map(|p| p.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["X", "Y"]);
}

#[tokio::test]
async fn instrument_without_lots_has_an_all_zero_position() {
    let h = harness().await;
    h.list("X", dec!(42)).await;

    let position = h.portfolio.position(h.id(), "X").await.unwrap();
    assert_eq!(position.shares, 0);
    assert_eq!(position.avg_cost, Decimal::ZERO);
    assert_eq!(position.total_cost, Decimal::ZERO);
    assert_eq!(position.current_value, Decimal::ZERO);
    assert_eq!(position.unrealized_gain, Decimal::ZERO);
    assert_eq!(position.return_percentage, Decimal::ZERO);
    assert!(h.portfolio.positions(h.id()).await.unwrap().positions.is_empty());
}

#[tokio::test]
async fn cached_total_matches_ledger_after_every_trade() {
    let h = harness().await;
    h.list("X", dec!(20)).await;
    h.list("Y", dec!(55.10)).await;

    h.executor.buy(h.id(), "X", 30, dec!(19.5)).await.unwrap();
    assert_eq!(
        h.portfolio.account(h.id()).await.unwrap().total_value(),
        h.expected_total().await
    );

    h.executor.buy(h.id(), "Y", 12, dec!(56)).await.unwrap();
    assert_eq!(
        h.portfolio.account(h.id()).await.unwrap().total_value(),
        h.expected_total().await
    );

    h.executor.sell(h.id(), "X", 18, dec!(21)).await.unwrap();
    assert_eq!(
        h.portfolio.account(h.id()).await.unwrap().total_value(),
        h.expected_total().await
    );

    h.executor.sell(h.id(), "Y", 12, dec!(50)).await.unwrap();
    let account = h.portfolio.account(h.id()).await.unwrap();
    assert_eq!(account.total_value(), h.expected_total().await);
    // 10000 - 585 - 672 + 378 + 600
    assert_eq!(account.cash_balance(), dec!(9721));
}
