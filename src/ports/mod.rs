//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `MarketDataSource`: Raw market, book, and trade payloads
//! - `ReportStore`: Scan report persistence (JSON snapshot + JSONL log)

pub mod market_source;
pub mod report_store;
