//! Pipeline Benchmarks - Per-Cycle Hot Path
//!
//! Benchmarks the pure stages that run once per scan cycle over every
//! market Polymarket lists (a few thousand at a time).
//!
//! Run with: cargo bench --bench pipeline_bench

use std::collections::HashMap;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use serde_json::{Value, json};

use polymarket_arb_scanner::domain::error::RecordSource;
use polymarket_arb_scanner::domain::payload::{DiscoveryRecord, TradableRecord, decode_records};
use polymarket_arb_scanner::domain::signal::Tolerance;
use polymarket_arb_scanner::usecases::{aggregate_raw_quotes, evaluate, normalize};

const MARKETS: usize = 2_000;

fn discovery_payload() -> Value {
    Value::Array(
        (0..MARKETS)
            .map(|i| json!({"conditionId": format!("0x{i:06x}"), "question": format!("Market {i}?"), "active": true}))
            .collect(),
    )
}

fn tradable_payload() -> Value {
    let rows: Vec<Value> = (0..MARKETS)
        .map(|i| {
            json!({
                "condition_id": format!("0x{i:06x}"),
                "tokens": [
                    {"token_id": format!("{i}1"), "outcome": "Yes", "price": "0.5"},
                    {"token_id": format!("{i}2"), "outcome": "No", "price": "0.5"}
                ]
            })
        })
        .collect();
    json!({ "data": rows })
}

fn raw_books() -> HashMap<String, Value> {
    (0..MARKETS)
        .flat_map(|i| {
            [
                (format!("{i}1"), json!({"bids": [{"price": "0.48", "size": "10"}], "asks": [{"price": "0.50", "size": "10"}]})),
                (format!("{i}2"), json!({"best_bid": "0.47", "best_ask": "0.49"})),
            ]
        })
        .collect()
}

/// Benchmark decoding + normalizing both payload families.
fn bench_normalize(c: &mut Criterion) {
    let discovery = discovery_payload();
    let tradable = tradable_payload();

    c.bench_function("decode_and_normalize_2000", |b| {
        b.iter_batched(
            || (discovery.clone(), tradable.clone()),
            |(d, t)| {
                let d = decode_records::<DiscoveryRecord>(d, RecordSource::Discovery).value;
                let t = decode_records::<TradableRecord>(t, RecordSource::Tradable).value;
                black_box(normalize(d, t))
            },
            BatchSize::LargeInput,
        );
    });
}

/// Benchmark attaching books to normalized markets.
fn bench_aggregate(c: &mut Criterion) {
    let d = decode_records::<DiscoveryRecord>(discovery_payload(), RecordSource::Discovery).value;
    let t = decode_records::<TradableRecord>(tradable_payload(), RecordSource::Tradable).value;
    let markets = normalize(d, t).value;
    let books = raw_books();

    c.bench_function("aggregate_quotes_2000", |b| {
        b.iter_batched(
            || (markets.clone(), books.clone()),
            |(m, books)| black_box(aggregate_raw_quotes(m, books, None)),
            BatchSize::LargeInput,
        );
    });
}

/// Benchmark the evaluator over fully quoted markets.
fn bench_evaluate(c: &mut Criterion) {
    let d = decode_records::<DiscoveryRecord>(discovery_payload(), RecordSource::Discovery).value;
    let t = decode_records::<TradableRecord>(tradable_payload(), RecordSource::Tradable).value;
    let markets = aggregate_raw_quotes(normalize(d, t).value, raw_books(), None).value;

    c.bench_function("evaluate_2000", |b| {
        b.iter(|| black_box(evaluate(black_box(&markets), Tolerance::DEFAULT)));
    });
}

criterion_group!(benches, bench_normalize, bench_aggregate, bench_evaluate);
criterion_main!(benches);
