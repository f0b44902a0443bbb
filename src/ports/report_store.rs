//! Report Store Port - Scan Output Persistence Interface
//!
//! Each cycle produces one `ScanReport`. The latest report is kept as a
//! snapshot; signals are additionally appended to a daily JSONL log for
//! later analysis.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::{Diagnostic, DiagnosticAction};
use crate::domain::market::Market;
use crate::domain::signal::{ArbitrageSignal, Tolerance};

/// Counters describing one scan cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
  /// Monotonic cycle number, continued across restarts.
  pub cycle: u64,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  pub tolerance: Tolerance,
  /// Markets kept after normalization and filtering.
  pub markets: usize,
  pub signals: usize,
  pub skipped: usize,
  pub merged: usize,
  pub degraded: usize,
}

/// Full output of one scan cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
  pub summary: ScanSummary,
  pub signals: Vec<ArbitrageSignal>,
  pub markets: Vec<Market>,
  pub diagnostics: Vec<Diagnostic>,
}

impl ScanReport {
  /// Build a report, deriving the summary counters from the contents.
  pub fn new(
    cycle: u64,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    tolerance: Tolerance,
    markets: Vec<Market>,
    signals: Vec<ArbitrageSignal>,
    diagnostics: Vec<Diagnostic>,
  ) -> Self {
    let count = |action| diagnostics.iter().filter(|d| d.action == action).count();
    let summary = ScanSummary {
      cycle,
      started_at,
      finished_at,
      tolerance,
      markets: markets.len(),
      signals: signals.len(),
      skipped: count(DiagnosticAction::Skipped),
      merged: count(DiagnosticAction::Merged),
      degraded: count(DiagnosticAction::Degraded),
    };
    Self {
      summary,
      signals,
      markets,
      diagnostics,
    }
  }
}

/// The parts of a persisted report read back on startup.
///
/// Diagnostics are write-only; they are not reloaded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredReport {
  pub summary: ScanSummary,
  pub signals: Vec<ArbitrageSignal>,
  pub markets: Vec<Market>,
}

/// One line of the signal log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRecord {
  pub cycle: u64,
  pub observed_at: DateTime<Utc>,
  #[serde(flatten)]
  pub signal: ArbitrageSignal,
}

/// Trait for scan output persistence.
#[async_trait]
pub trait ReportStore: Send + Sync + 'static {
  /// Replace the latest-scan snapshot.
  async fn save_report(&self, report: &ScanReport) -> anyhow::Result<()>;

  /// Append signals to the signal log.
  async fn append_signals(&self, records: &[SignalRecord]) -> anyhow::Result<()>;

  /// Load the most recent snapshot, if any.
  async fn load_latest(&self) -> anyhow::Result<Option<StoredReport>>;

  /// Check if the store is writable.
  async fn is_healthy(&self) -> bool;
}
