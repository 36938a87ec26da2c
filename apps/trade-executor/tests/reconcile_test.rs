//! Crash recovery: the broker is ground truth after a restart.

mod common;

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use trade_executor::application::ports::{
    BrokerPort, Holding, ManualClock, PersistenceError, PlaceOrderRequest,
};
use trade_executor::application::services::{StateStore, StoreError};
use trade_executor::domain::order_execution::{IdempotencyKey, Order, OrderSide, OrderStatus};
use trade_executor::domain::portfolio::{Mutation, PositionStatus};
use trade_executor::domain::shared::{TradingCalendar, TradingMode};
use trade_executor::infrastructure::broker::{FillMode, SimulatedBroker};
use trade_executor::infrastructure::persistence::JsonFileStateBackend;

use common::{CASH, Harness, START, buy_shares, instrument};

async fn reserve_buy(h: &Harness, symbol: &str, quantity: u64, price: Decimal) -> Order {
    let store = h.store();
    let day = store.calendar().trading_day(store.now());
    let order = Order::pending(
        instrument(symbol),
        OrderSide::Buy,
        quantity,
        price,
        day,
        1,
        store.now(),
    );
    store
        .commit(Mutation::Reserve {
            order: order.clone(),
        })
        .await
        .unwrap();
    order
}

#[tokio::test]
async fn order_that_reached_the_broker_is_adopted_not_resent() {
    let h = Harness::new().await;
    let order = reserve_buy(&h, "AAA", 100, dec!(1000)).await;
    // The process died after the broker accepted but before recording it.
    h.broker
        .place_order(&PlaceOrderRequest {
            client_order_id: order.key,
            instrument_id: order.instrument_id.clone(),
            side: order.side,
            quantity: order.quantity,
            reference_price: order.requested_price,
        })
        .await
        .unwrap();

    let restarted = h.restart().await;
    let report = restarted.reconciler().execute(true).await.unwrap();

    assert_eq!(report.checked, 1);
    assert_eq!(report.filled, 1);
    let status = restarted.engine.status().await.unwrap();
    assert_eq!(status.buy_count, 1);
    assert_eq!(status.positions.len(), 1);
    assert_eq!(status.positions[0].status, PositionStatus::Open);
    assert_eq!(status.positions[0].quantity, 100);
    assert_eq!(status.cash, CASH - dec!(100000));
    assert!(status.in_flight.is_empty());

    // Replaying the same intent returns the recorded fill.
    let outcome = restarted
        .engine
        .submit(buy_shares("AAA", 100, dec!(1000)).with_intent_seq(1))
        .await
        .unwrap();
    assert_eq!(outcome.result().unwrap().key, order.key);
    assert!(outcome.is_filled());
    assert_eq!(h.broker.order_count(), 1);
}

#[tokio::test]
async fn simulated_account_resumed_from_ledger_keeps_positions() {
    let h = Harness::new().await;
    h.broker.set_price(&instrument("AAA"), dec!(100000));
    let outcome = h
        .engine
        .submit(buy_shares("AAA", 10, dec!(100000)))
        .await
        .unwrap();
    assert!(outcome.is_filled());
    let (_, before) = h.store().load().await.unwrap();
    assert_eq!(before.cash, CASH - dec!(1000000));

    // A new process starts a fresh paper account from what the ledger holds.
    let broker = Arc::new(SimulatedBroker::from_portfolio(&before));
    let restarted = h.restart_with(broker).await;
    let report = restarted.reconciler().execute(true).await.unwrap();

    assert!(report.balance_synced);
    assert!(!report.cash_adjusted);
    assert!(report.dropped.is_empty());
    assert!(report.adopted.is_empty());
    let (_, after) = restarted.store().load().await.unwrap();
    assert_eq!(after, before);

    // The resumed account can still close the position.
    let outcome = restarted
        .engine
        .submit(common::sell("AAA", dec!(100000)))
        .await
        .unwrap();
    assert!(outcome.is_filled());
    assert_eq!(restarted.broker.cash(), CASH);
}

#[tokio::test]
async fn order_that_never_reached_the_broker_is_failed() {
    let h = Harness::new().await;
    let order = reserve_buy(&h, "AAA", 100, dec!(1000)).await;

    let restarted = h.restart().await;
    let report = restarted.reconciler().execute(true).await.unwrap();

    assert_eq!(report.failed, 1);
    let ledger = restarted.store().snapshot().await.unwrap();
    assert_eq!(ledger.orders[&order.key].status, OrderStatus::Failed);
    assert!(ledger.portfolio.positions.is_empty());
    assert_eq!(ledger.daily.buy_count, 0);
    assert_eq!(h.broker.order_count(), 0);
}

#[tokio::test]
async fn working_order_is_finished_after_restart() {
    let h = Harness::new().await;
    h.broker.set_fill_mode(FillMode::Manual);
    let outcome = h
        .engine
        .submit(buy_shares("AAA", 100, dec!(1000)))
        .await
        .unwrap();
    assert_eq!(outcome.result().unwrap().status, OrderStatus::Submitted);

    h.broker.fill_working();
    let restarted = h.restart().await;
    let report = restarted.reconciler().execute(true).await.unwrap();

    assert_eq!(report.filled, 1);
    let status = restarted.engine.status().await.unwrap();
    assert_eq!(status.buy_count, 1);
    assert_eq!(status.positions[0].quantity, 100);
    assert_eq!(h.broker.order_count(), 1);
}

#[tokio::test]
async fn unknown_holdings_are_adopted_and_missing_ones_dropped() {
    let h = Harness::new().await;
    h.engine
        .submit(buy_shares("AAA", 100, dec!(1000)))
        .await
        .unwrap();
    // Sold outside the process; a holding appeared outside the process.
    h.broker
        .place_order(&PlaceOrderRequest {
            client_order_id: IdempotencyKey::derive(
                &instrument("AAA"),
                OrderSide::Sell,
                h.store().calendar().trading_day(h.store().now()),
                99,
            ),
            instrument_id: instrument("AAA"),
            side: OrderSide::Sell,
            quantity: 100,
            reference_price: dec!(1000),
        })
        .await
        .unwrap();
    h.broker.seed_holding(Holding {
        instrument_id: instrument("BBB"),
        quantity: 7,
        avg_price: dec!(2500),
    });

    let report = h.reconciler().execute(true).await.unwrap();

    assert_eq!(report.adopted, vec![instrument("BBB")]);
    assert_eq!(report.dropped, vec![instrument("AAA")]);
    let status = h.engine.status().await.unwrap();
    assert_eq!(status.positions.len(), 1);
    assert_eq!(status.positions[0].instrument_id, instrument("BBB"));
    assert_eq!(status.cash, h.broker.cash());

    h.notifier.settle().await;
    assert_eq!(h.notifier.count("reconciled"), 1);
}

#[tokio::test]
async fn clean_state_needs_no_corrections() {
    let h = Harness::new().await;
    h.engine
        .submit(buy_shares("AAA", 100, dec!(1000)))
        .await
        .unwrap();

    let report = h.reconciler().execute(true).await.unwrap();

    assert!(report.is_clean(), "{report:?}");
}

#[tokio::test]
async fn state_file_survives_reopen_and_refuses_other_modes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let clock = Arc::new(ManualClock::new(START.parse().unwrap()));
    let open = |mode| {
        let backend = Arc::new(JsonFileStateBackend::new(&path));
        let clock = Arc::clone(&clock);
        async move {
            StateStore::open(
                backend,
                TradingCalendar::from_utc_offset_hours(9),
                clock,
                mode,
                CASH,
            )
            .await
        }
    };

    let store = open(TradingMode::Simulated).await.unwrap();
    store
        .commit(Mutation::SetPaused { paused: true })
        .await
        .unwrap();
    drop(store);

    let reopened = open(TradingMode::Simulated).await.unwrap();
    let (daily, portfolio) = reopened.load().await.unwrap();
    assert!(daily.paused);
    assert_eq!(portfolio.cash, CASH);

    let err = open(TradingMode::Live).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Persistence(PersistenceError::ModeMismatch { .. })
    ));
}
