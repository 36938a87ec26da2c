//! At most one broker order per intent, however often it is submitted.

mod common;

use std::sync::Arc;

use rust_decimal_macros::dec;
use trade_executor::application::ports::BrokerError;
use trade_executor::application::services::SubmissionOutcome;
use trade_executor::domain::order_execution::OrderStatus;

use common::{Harness, buy};

#[tokio::test]
async fn resubmitting_an_intent_returns_the_recorded_result() {
    let h = Harness::new().await;
    let rec = buy("005930", dec!(0.8), dec!(70000)).with_intent_seq(7);

    let first = h.engine.submit(rec.clone()).await.unwrap();
    let second = h.engine.submit(rec).await.unwrap();

    assert!(first.is_filled());
    assert_eq!(first.result().unwrap().key, second.result().unwrap().key);
    assert_eq!(second.result().unwrap().status, OrderStatus::Filled);
    assert_eq!(h.broker.order_count(), 1);
    assert_eq!(h.broker.submissions(), 1);

    let status = h.engine.status().await.unwrap();
    assert_eq!(status.buy_count, 1);
    assert_eq!(status.positions.len(), 1);
    assert_eq!(status.positions[0].quantity, 11);
}

#[tokio::test]
async fn concurrent_submissions_of_one_intent_reach_the_broker_once() {
    let h = Harness::new().await;
    let rec = buy("005930", dec!(0.8), dec!(70000)).with_intent_seq(1);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = Arc::clone(&h.engine);
        let rec = rec.clone();
        handles.push(tokio::spawn(async move { engine.submit(rec).await }));
    }

    let mut keys = Vec::new();
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        let SubmissionOutcome::Executed { result } = outcome else {
            panic!("expected an executed outcome, got {outcome:?}");
        };
        keys.push(result.key);
    }

    keys.dedup();
    assert_eq!(keys.len(), 1);
    assert_eq!(h.broker.order_count(), 1);
    assert_eq!(h.engine.status().await.unwrap().buy_count, 1);
}

#[tokio::test]
async fn unpinned_recommendations_are_distinct_intents() {
    let h = Harness::new().await;

    h.engine
        .submit(buy("005930", dec!(0.5), dec!(70000)))
        .await
        .unwrap();
    h.engine
        .submit(buy("005930", dec!(0.5), dec!(70000)))
        .await
        .unwrap();

    assert_eq!(h.broker.order_count(), 2);
}

#[tokio::test]
async fn transient_failure_is_retried_without_duplicating() {
    let h = Harness::new().await;
    h.broker.push_failure(BrokerError::Timeout);

    let outcome = h
        .engine
        .submit(buy("005930", dec!(0.8), dec!(70000)))
        .await
        .unwrap();

    assert!(outcome.is_filled());
    assert_eq!(h.broker.submissions(), 2);
    assert_eq!(h.broker.order_count(), 1);
}

#[tokio::test]
async fn exhausted_retries_leave_a_failed_order_that_counts_nothing() {
    let h = Harness::new().await;
    for _ in 0..3 {
        h.broker.push_failure(BrokerError::Timeout);
    }

    let outcome = h
        .engine
        .submit(buy("005930", dec!(0.8), dec!(70000)))
        .await
        .unwrap();

    assert_eq!(outcome.result().unwrap().status, OrderStatus::Failed);
    assert_eq!(h.broker.order_count(), 0);
    let status = h.engine.status().await.unwrap();
    assert_eq!(status.buy_count, 0);
    assert_eq!(status.cash, common::CASH);
    assert!(status.positions.is_empty());
}
