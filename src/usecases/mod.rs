//! Use Cases Layer - Reconciliation Pipeline
//!
//! The pure stages (`normalize`, `aggregate_quotes`, `evaluate`) take
//! domain values and return domain values with a diagnostics ledger.
//! `MarketScanner` drives them over the port interfaces.
//!
//! Use cases:
//! - `normalizer`: Join discovery and tradable records into markets
//! - `quote_aggregator`: Attach top-of-book quotes and last trades
//! - `arbitrage_evaluator`: Detect no-arbitrage bound violations
//! - `scanner`: One fetch → reconcile → evaluate → persist cycle

pub mod arbitrage_evaluator;
pub mod normalizer;
pub mod quote_aggregator;
pub mod scanner;

pub use self::arbitrage_evaluator::evaluate;
pub use self::normalizer::normalize;
pub use self::quote_aggregator::{aggregate_quotes, aggregate_raw_quotes, decode_books};
pub use self::scanner::{ComponentHealth, MarketScanner, ScanSettings};
