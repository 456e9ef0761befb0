mod common;

use common::harness;
use core_types::TradeSide;
use rust_decimal_macros::dec;

#[tokio::test]
async fn sell_consumes_oldest_lot_first() {
    let h = harness().await;
    h.list("X", dec!(10)).await;

    let l1 = h.executor.buy(h.id(), "X", 10, dec!(5)).await.unwrap().lot;
    let l2 = h.executor.buy(h.id(), "X", 10, dec!(8)).await.unwrap().lot;

    let receipt = h.executor.sell(h.id(), "X", 15, dec!(10)).await.unwrap();
    assert_eq!(receipt.transactions.len(), 2);
    assert_eq!(receipt.transactions[0].lot_id, Some(l1.lot_id()));
    assert_eq!(receipt.transactions[0].quantity, 10);
    assert_eq!(receipt.transactions[1].lot_id, Some(l2.lot_id()));
    assert_eq!(receipt.transactions[1].quantity, 5);
    assert!(receipt.transactions.iter().all(|t| t.side == TradeSide::Sell));
    // (10 - 5) x 10 + (10 - 8) x 5
    assert_eq!(receipt.realized_gain, dec!(60));
    // 10000 - 50 - 80 + 150
    assert_eq!(receipt.cash_balance, dec!(10020));
    assert_eq!(receipt.total_value, dec!(10070));

    let lots = h.portfolio.lots(h.id()).await.unwrap();
    assert_eq!(lots.len(), 2);
    assert_eq!(lots[0].lot_id(), l1.lot_id());
    assert_eq!(lots[0].remaining_quantity(), 0);
    assert_eq!(lots[1].remaining_quantity(), 5);

    let position = h.portfolio.position(h.id(), "X").await.unwrap();
    assert_eq!(position.shares, 5);
    assert_eq!(position.avg_cost, dec!(8));
    assert_eq!(position.lots.len(), 1);
}

#[tokio::test]
async fn selling_everything_closes_the_position() {
    let h = harness().await;
    h.list("X", dec!(10)).await;
    h.executor.buy(h.id(), "X", 3, dec!(9)).await.unwrap();
    h.executor.buy(h.id(), "X", 4, dec!(11)).await.unwrap();

    h.executor.sell(h.id(), "X", 7, dec!(12)).await.unwrap();

    let report = h.portfolio.positions(h.id()).await.unwrap();
    assert!(report.positions.is_empty());
    assert_eq!(report.summary.stock_value, dec!(0));
    let account = h.portfolio.account(h.id()).await.unwrap();
    assert_eq!(account.total_value(), account.cash_balance());
}

#[tokio::test]
async fn history_is_newest_first_with_one_record_per_lot_drawn() {
    let h = harness().await;
    h.list("X", dec!(10)).await;
    h.executor.buy(h.id(), "X", 2, dec!(10)).await.unwrap();
    h.executor.buy(h.id(), "X", 2, dec!(10)).await.unwrap();
    h.executor.sell(h.id(), "X", 3, dec!(10)).await.unwrap();

    let history = h.portfolio.transaction_history(h.id()).await.unwrap();
    let sides: Vec<_> = history.iter().map(|t| t.side).collect();
    assert_eq!(
        sides,
        vec![TradeSide::Sell, TradeSide::Sell, TradeSide::Buy, TradeSide::Buy]
    );
    assert!(history.windows(2).all(|w| w[0].seq > w[1].seq));
}
