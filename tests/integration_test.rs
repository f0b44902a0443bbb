//! Integration Tests - End-to-end Scanner Cycle Testing
//!
//! Drives `MarketScanner` through mocked ports to exercise the whole
//! decode → normalize → aggregate → evaluate → persist path.
//! Uses mockall for trait mocking and tokio::test for async tests.

use std::collections::HashMap;
use std::sync::Arc;

use mockall::mock;
use rust_decimal_macros::dec;
use serde_json::{Value, json};

use polymarket_arb_scanner::domain::error::{DiagnosticAction, NormalizeError};
use polymarket_arb_scanner::domain::market::{BookStatus, MarketStatus};
use polymarket_arb_scanner::domain::signal::SignalKind;
use polymarket_arb_scanner::usecases::{MarketScanner, ScanSettings};

// ---- Mock Definitions ----

mock! {
    pub Source {}

    #[async_trait::async_trait]
    impl polymarket_arb_scanner::ports::market_source::MarketDataSource for Source {
        async fn fetch_discovery(&self) -> anyhow::Result<serde_json::Value>;

        async fn fetch_tradable(&self) -> anyhow::Result<serde_json::Value>;

        async fn fetch_books(
            &self,
            token_ids: &[polymarket_arb_scanner::domain::market::TokenId],
        ) -> anyhow::Result<HashMap<polymarket_arb_scanner::domain::market::TokenId, serde_json::Value>>;

        async fn fetch_trades(
            &self,
            market_ids: &[polymarket_arb_scanner::domain::market::MarketId],
        ) -> anyhow::Result<serde_json::Value>;

        async fn is_healthy(&self) -> bool;
    }
}

mock! {
    pub Store {}

    #[async_trait::async_trait]
    impl polymarket_arb_scanner::ports::report_store::ReportStore for Store {
        async fn save_report(
            &self,
            report: &polymarket_arb_scanner::ports::report_store::ScanReport,
        ) -> anyhow::Result<()>;

        async fn append_signals(
            &self,
            records: &[polymarket_arb_scanner::ports::report_store::SignalRecord],
        ) -> anyhow::Result<()>;

        async fn load_latest(&self)
            -> anyhow::Result<Option<polymarket_arb_scanner::ports::report_store::StoredReport>>;

        async fn is_healthy(&self) -> bool;
    }
}

// ---- Fixtures ----

fn discovery() -> Value {
    json!([
        {"conditionId": "0xaaa", "question": "Will BTC close above 100k?", "slug": "btc-100k", "active": true, "closed": false},
        {"conditionId": "0xbbb", "question": "Will ETH flip BTC?", "active": true, "closed": false},
        {"conditionId": "0xccc", "question": "Old election", "active": false, "closed": true}
    ])
}

fn tradable() -> Value {
    json!({
        "data": [
            {
                "condition_id": "0xaaa",
                "active": true,
                "closed": false,
                "tokens": [
                    {"token_id": "101", "outcome": "Yes", "price": 0.46},
                    {"token_id": "102", "outcome": "No", "price": 0.52}
                ]
            },
            {
                "conditionId": "0xbbb",
                "outcomes": "[\"Yes\", \"No\"]",
                "clobTokenIds": "[\"201\", \"202\"]",
                "outcomePrices": "[\"0.70\", \"0.30\"]",
                "active": true,
                "closed": false
            },
            {
                "condition_id": "0xccc",
                "closed": true,
                "tokens": [
                    {"token_id": "301", "outcome": "A"},
                    {"token_id": "302", "outcome": "B"}
                ]
            }
        ],
        "next_cursor": "LTE="
    })
}

fn books() -> HashMap<String, Value> {
    HashMap::from([
        ("101".to_string(), json!({"bids": [{"price": "0.44", "size": "50"}], "asks": [{"price": "0.46", "size": "20"}, {"price": "0.48", "size": "5"}]})),
        ("102".to_string(), json!({"bids": [{"price": "0.50", "size": "10"}], "asks": [{"price": "0.52", "size": "15"}]})),
        ("201".to_string(), json!({"best_bid": "0.40", "best_ask": "0.45"})),
        ("202".to_string(), json!({"best_bid": "0.54", "best_ask": "0.56"})),
    ])
}

fn source_with(books: HashMap<String, Value>) -> MockSource {
    let mut source = MockSource::new();
    source.expect_fetch_discovery().returning(|| Ok(discovery()));
    source.expect_fetch_tradable().returning(|| Ok(tradable()));
    source
        .expect_fetch_books()
        .returning(move |ids| {
            Ok(ids
                .iter()
                .filter_map(|id| books.get(id).map(|b| (id.clone(), b.clone())))
                .collect())
        });
    source.expect_fetch_trades().returning(|_| Ok(json!([])));
    source
}

fn scanner(
    source: MockSource,
    store: Option<MockStore>,
) -> MarketScanner<MockSource, MockStore> {
    MarketScanner::new(Arc::new(source), store.map(Arc::new), ScanSettings::default())
}

// ---- Integration Tests ----

#[tokio::test]
async fn test_full_cycle_persists_report_and_signals() {
    let source = source_with(books());

    let mut store = MockStore::new();
    store
        .expect_save_report()
        .withf(|report| report.summary.cycle == 1 && report.summary.markets == 2)
        .times(1)
        .returning(|_| Ok(()));
    store
        .expect_append_signals()
        .withf(|records| records.len() == 3 && records.iter().all(|r| r.cycle == 1))
        .times(1)
        .returning(|_| Ok(()));

    let report = scanner(source, Some(store)).run_cycle().await.unwrap();

    // Closed market filtered, the rest sorted by id.
    let ids: Vec<&str> = report.markets.iter().map(|m| m.condition_id.as_str()).collect();
    assert_eq!(ids, vec!["0xaaa", "0xbbb"]);
    assert_eq!(report.markets[0].slug.as_deref(), Some("btc-100k"));

    let yes = report.markets[0].outcome("101").unwrap();
    assert_eq!(yes.book, BookStatus::Quoted);
    assert_eq!(yes.ask_price(), Some(dec!(0.46)));
    assert_eq!(yes.best_ask.unwrap().size, Some(dec!(20)));

    let kinds: Vec<(&str, SignalKind)> = report
        .signals
        .iter()
        .map(|s| (s.market_id.as_str(), s.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("0xaaa", SignalKind::ComplementarySumBelowOne),
            ("0xbbb", SignalKind::QuoteDivergence),
            ("0xbbb", SignalKind::QuoteDivergence),
        ]
    );
    assert_eq!(report.signals[0].magnitude, dec!(0.02));
    assert_eq!(report.signals[1].outcome_ids, vec!["201".to_string()]);
    assert_eq!(report.signals[1].magnitude, dec!(0.25));
    assert_eq!(report.signals[2].magnitude, dec!(0.24));
    assert!(report.diagnostics.is_empty());
}

#[tokio::test]
async fn test_not_found_books_suppress_signals() {
    let mut books = books();
    books.insert("102".to_string(), json!({"error": "not_found", "token_id": "102"}));
    books.remove("202");

    let report = scanner(source_with(books), None).run_cycle().await.unwrap();

    let market = &report.markets[0];
    assert_eq!(market.outcome("102").unwrap().book, BookStatus::NotFound);
    assert!(market.outcome("102").unwrap().best_ask.is_none());
    assert_eq!(report.markets[1].outcome("202").unwrap().book, BookStatus::Unknown);

    // Only the divergence on 201 survives; no sum signal without every ask.
    assert_eq!(report.signals.len(), 1);
    assert_eq!(report.signals[0].kind, SignalKind::QuoteDivergence);
    assert_eq!(report.signals[0].outcome_ids, vec!["201".to_string()]);
}

#[tokio::test]
async fn test_tradable_failure_fails_cycle_without_persisting() {
    let mut source = MockSource::new();
    source.expect_fetch_discovery().returning(|| Ok(discovery()));
    source
        .expect_fetch_tradable()
        .returning(|| Err(anyhow::anyhow!("clob returned 503")));
    source.expect_fetch_books().times(0);

    let mut store = MockStore::new();
    store.expect_save_report().times(0);
    store.expect_append_signals().times(0);

    let err = scanner(source, Some(store)).run_cycle().await.unwrap_err();
    assert!(format!("{err:#}").contains("tradable"));
}

#[tokio::test]
async fn test_store_failure_does_not_fail_cycle() {
    let mut store = MockStore::new();
    store
        .expect_save_report()
        .returning(|_| Err(anyhow::anyhow!("disk full")));
    store
        .expect_append_signals()
        .returning(|_| Err(anyhow::anyhow!("disk full")));

    let report = scanner(source_with(books()), Some(store))
        .run_cycle()
        .await
        .unwrap();
    assert_eq!(report.summary.signals, 3);
}

#[tokio::test]
async fn test_include_closed_keeps_closed_market() {
    let settings = ScanSettings {
        include_closed: true,
        fetch_trades: false,
        ..ScanSettings::default()
    };
    let mut source = MockSource::new();
    source.expect_fetch_discovery().returning(|| Ok(discovery()));
    source.expect_fetch_tradable().returning(|| Ok(tradable()));
    source
        .expect_fetch_books()
        .withf(|ids| ids.len() == 6)
        .returning(|_| Ok(HashMap::new()));
    source.expect_fetch_trades().times(0);

    let mut scanner: MarketScanner<MockSource, MockStore> =
        MarketScanner::new(Arc::new(source), None, settings);
    let report = scanner.run_cycle().await.unwrap();

    assert_eq!(report.markets.len(), 3);
    assert_eq!(report.markets[2].status, MarketStatus::Closed);
    assert!(report.signals.is_empty());
}

#[tokio::test]
async fn test_duplicate_and_malformed_records_reported() {
    let mut source = MockSource::new();
    source.expect_fetch_discovery().returning(|| {
        let mut rows = discovery();
        rows.as_array_mut()
            .unwrap()
            .push(json!({"conditionId": "0xaaa", "question": "Renamed question"}));
        rows.as_array_mut().unwrap().push(json!({"question": "no id"}));
        Ok(rows)
    });
    source.expect_fetch_tradable().returning(|| {
        let mut page = tradable();
        page["data"][1]["clobTokenIds"] = json!("[\"201\"]");
        Ok(page)
    });
    source.expect_fetch_books().returning(|_| Ok(HashMap::new()));
    source.expect_fetch_trades().returning(|_| Ok(json!([])));

    let report = scanner(source, None).run_cycle().await.unwrap();

    assert_eq!(report.summary.merged, 1);
    assert_eq!(report.summary.skipped, 2);
    // 0xbbb is skipped whole; its labels and tokens disagree in length.
    assert_eq!(report.markets.len(), 1);
    assert_eq!(report.markets[0].condition_id, "0xaaa");
    assert_eq!(report.markets[0].question, "Renamed question");
    assert!(report.diagnostics.iter().any(|d| d.identifier == "0xbbb"
        && d.action == DiagnosticAction::Skipped
        && matches!(d.reason, NormalizeError::OutcomeArityMismatch { .. })));
}
