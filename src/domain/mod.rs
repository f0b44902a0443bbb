//! Domain layer - canonical market model and raw payload coercion.
//!
//! Pure types and functions only: no I/O, no async. Everything upstream
//! sends is decoded here into `Decimal`-priced records.

pub mod coerce;
pub mod error;
pub mod market;
pub mod payload;
pub mod signal;

// Re-export core types for convenience
pub use error::{Diagnostic, DiagnosticAction, NormalizeError, Reconciled, RecordSource};
pub use market::{BookStatus, Market, MarketId, MarketStatus, Outcome, Quote, QuoteSide, TokenId};
pub use payload::{
    BookPayload, DiscoveryRecord, MarketKey, OutcomeColumns, TradableRecord, TradePrint, decode_records,
    decode_trades,
};
pub use signal::{ArbitrageSignal, SignalKind, Tolerance, ToleranceError};
