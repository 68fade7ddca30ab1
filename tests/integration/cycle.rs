//! End-to-end buy-cycle tests over the in-memory collaborators.

use rust_decimal_macros::dec;
use std::time::Duration;

use sweep::engine::orchestrator::{CycleConfig, CycleOrchestrator};
use sweep::journal::{CycleLogger, LOG_HEADERS};
use sweep::types::{LogRecord, Ticker};

use crate::mock_broker::MockBroker;
use crate::mock_store::InMemoryStore;

fn config() -> CycleConfig {
    CycleConfig {
        screener_tab: "screener".to_string(),
        log_tab: "log".to_string(),
        percent_per_trade: dec!(5.0),
        min_order_notional: dec!(1.00),
        sleep_between_orders: Duration::ZERO,
        extended_hours: false,
    }
}

fn orchestrate(broker: &MockBroker, store: &InMemoryStore) -> CycleOrchestrator {
    CycleOrchestrator::new(Box::new(broker.clone()), Box::new(store.clone()), config())
}

fn header_row() -> Vec<String> {
    LOG_HEADERS.iter().map(|h| h.to_string()).collect()
}

#[tokio::test]
async fn test_full_cycle_sizes_against_shrinking_capacity() {
    let store = InMemoryStore::new();
    store.seed_tab("screener", &[&["Ticker"], &["AAPL"], &["msft"], &["AAPL "]]);
    let broker = MockBroker::new(dec!(1000.00));

    let report = orchestrate(&broker, &store).run_cycle().await.unwrap();

    assert_eq!(report.symbols_seen, 2); // deduplicated
    assert_eq!(report.submitted, 2);
    assert_eq!(report.total_notional, dec!(97.50));

    // One snapshot per symbol, never cached.
    assert_eq!(broker.account_calls(), 2);
    assert_eq!(broker.buying_power(), dec!(902.50));

    let rows = store.rows("log");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], header_row());
    assert!(rows.iter().all(|r| r.len() == 8));

    // 5% of 1000, then 5% of the remaining 950.
    assert_eq!(rows[1][1], "BUY");
    assert_eq!(rows[1][2], "AAPL");
    assert_eq!(rows[1][3], "50.00");
    assert_eq!(rows[2][2], "MSFT");
    assert_eq!(rows[2][3], "47.50");

    // Header frozen for the operator.
    assert_eq!(store.frozen_rows("log"), 1);

    // Distinct idempotency keys within the cycle.
    let orders = broker.submitted();
    assert_eq!(orders.len(), 2);
    assert_ne!(orders[0].client_order_id, orders[1].client_order_id);
}

#[tokio::test]
async fn test_one_symbol_failure_never_aborts_the_cycle() {
    let store = InMemoryStore::new();
    store.seed_tab(
        "screener",
        &[&["Ticker"], &["AAPL"], &["MSFT"], &["NVDA"]],
    );
    let broker = MockBroker::with_failures(dec!(1000.00), &["MSFT"]);

    let report = orchestrate(&broker, &store).run_cycle().await.unwrap();

    assert_eq!(report.symbols_seen, 3);
    assert_eq!(report.submitted, 2);
    assert_eq!(report.errored, 1);

    let rows = store.rows("log");
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1][1], "BUY");
    assert_eq!(rows[2][1], "BUY-ERROR");
    assert_eq!(rows[3][1], "BUY");

    // The error row carries category + message, empty notional, ERROR status.
    assert_eq!(rows[2][3], "");
    assert_eq!(rows[2][6], "ERROR");
    assert!(rows[2][7].starts_with("BrokerError:"));
    assert!(rows[2][7].contains("simulated rejection"));

    // The rejected order consumed no capacity, so NVDA sized from 950.
    assert_eq!(rows[3][3], "47.50");
}

#[tokio::test]
async fn test_empty_screener_makes_no_calls_and_writes_nothing() {
    let store = InMemoryStore::new();
    store.seed_tab("screener", &[&["Ticker"]]);
    let broker = MockBroker::new(dec!(1000.00));

    let report = orchestrate(&broker, &store).run_cycle().await.unwrap();

    assert_eq!(report.symbols_seen, 0);
    assert_eq!(broker.account_calls(), 0);
    assert!(broker.submitted().is_empty());
    assert!(!store.has_tab("log"));
    assert_eq!(store.append_calls(), 0);
}

#[tokio::test]
async fn test_missing_screener_tab_is_created_and_cycle_exits_early() {
    let store = InMemoryStore::new();
    let broker = MockBroker::new(dec!(1000.00));

    let report = orchestrate(&broker, &store).run_cycle().await.unwrap();

    assert_eq!(report.symbols_seen, 0);
    assert!(store.has_tab("screener"));
    assert_eq!(broker.account_calls(), 0);
}

#[tokio::test]
async fn test_below_floor_notional_is_skipped_not_submitted() {
    let store = InMemoryStore::new();
    store.seed_tab("screener", &[&["Ticker"], &["AAPL"]]);
    let broker = MockBroker::new(dec!(10.00)); // 5% → 0.50, below the $1 floor

    let report = orchestrate(&broker, &store).run_cycle().await.unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.submitted, 0);
    assert!(broker.submitted().is_empty());
    assert_eq!(broker.buying_power(), dec!(10.00));

    let rows = store.rows("log");
    assert_eq!(rows[1][1], "BUY-SKIP");
    assert_eq!(rows[1][3], "0.50");
    assert_eq!(rows[1][6], "SKIPPED");
    assert!(rows[1][7].contains("0.50"));
    assert!(rows[1][7].contains("1.00"));
}

#[tokio::test]
async fn test_header_is_not_duplicated_across_cycles() {
    let store = InMemoryStore::new();
    store.seed_tab("screener", &[&["Ticker"], &["AAPL"], &["MSFT"]]);
    let broker = MockBroker::new(dec!(1000.00));

    orchestrate(&broker, &store).run_cycle().await.unwrap();
    orchestrate(&broker, &store).run_cycle().await.unwrap();

    let rows = store.rows("log");
    assert_eq!(rows.len(), 5); // header + 2 + 2
    assert_eq!(rows[0], header_row());
    let header_count = rows.iter().filter(|r| **r == header_row()).count();
    assert_eq!(header_count, 1);
}

#[tokio::test]
async fn test_fallback_append_lands_rows_contiguously() {
    let store = InMemoryStore::without_anchored_append();
    store.seed_tab("screener", &[&["Ticker"], &["AAPL"], &["MSFT"]]);
    let broker = MockBroker::new(dec!(1000.00));

    orchestrate(&broker, &store).run_cycle().await.unwrap();

    // The anchored-append path was never taken.
    assert_eq!(store.append_calls(), 0);

    let rows = store.rows("log");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], header_row());
    assert_eq!(rows[1][2], "AAPL");
    assert_eq!(rows[2][2], "MSFT");
}

#[tokio::test]
async fn test_large_batches_append_in_chunks_of_100() {
    let store = InMemoryStore::new();
    let logger = CycleLogger::new("log");
    let table = logger.open(&store).await.unwrap();
    logger.ensure_schema(&store, &table).await.unwrap();

    let symbol = Ticker::parse("AAPL").unwrap();
    let records: Vec<LogRecord> = (0..205)
        .map(|_| LogRecord::skip(&symbol, dec!(0.50), "below floor"))
        .collect();

    logger.append(&store, &table, &records).await.unwrap();

    assert_eq!(store.append_calls(), 3); // 100 + 100 + 5
    assert_eq!(store.rows("log").len(), 206); // header + 205
}

#[tokio::test]
async fn test_unreachable_store_is_fatal_before_any_order() {
    let store = InMemoryStore::new();
    store.set_error("sheets unavailable");
    let broker = MockBroker::new(dec!(1000.00));

    let result = orchestrate(&broker, &store).run_cycle().await;

    assert!(result.is_err());
    assert_eq!(broker.account_calls(), 0);
    assert!(broker.submitted().is_empty());
}
