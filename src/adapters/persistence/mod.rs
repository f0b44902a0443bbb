//! Persistence Adapters - JSON Snapshot and JSONL Signal Log
//!
//! Implements the ReportStore port using an atomic JSON snapshot of the
//! latest scan and append-only daily JSONL files for signals.
//! No database dependency.

pub mod signal_log;
pub mod snapshot;
pub mod store;

pub use self::signal_log::SignalLog;
pub use self::snapshot::SnapshotStore;
pub use self::store::JsonReportStore;
