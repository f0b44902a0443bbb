//! Market Scanner - One Full Fetch → Reconcile → Evaluate Cycle
//!
//! Pulls raw payloads through `MarketDataSource`, runs the pure
//! pipeline (`normalize` → `aggregate_quotes` → `evaluate`), and hands
//! the resulting `ScanReport` to an optional `ReportStore`.
//!
//! Failure policy:
//! - discovery or tradable fetch fails: the cycle fails
//! - book or trade fetch fails: logged, quotes stay unknown
//! - persistence fails: logged, the report is still returned

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::config::ScannerConfig;
use crate::domain::error::{Diagnostic, Reconciled, RecordSource};
use crate::domain::market::{MarketId, TokenId};
use crate::domain::payload::{DiscoveryRecord, TradableRecord, TradePrint, decode_records, decode_trades};
use crate::domain::signal::Tolerance;
use crate::ports::market_source::MarketDataSource;
use crate::ports::report_store::{ReportStore, ScanReport, SignalRecord};

use super::arbitrage_evaluator::evaluate;
use super::normalizer::normalize;
use super::quote_aggregator::aggregate_raw_quotes;

/// Per-cycle behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
  pub tolerance: Tolerance,
  /// Keep closed markets in the evaluated set.
  pub include_closed: bool,
  /// Fetch trade history for last-trade prices.
  pub fetch_trades: bool,
}

impl Default for ScanSettings {
  fn default() -> Self {
    Self {
      tolerance: Tolerance::DEFAULT,
      include_closed: false,
      fetch_trades: true,
    }
  }
}

impl From<&ScannerConfig> for ScanSettings {
  fn from(config: &ScannerConfig) -> Self {
    Self {
      tolerance: config.tolerance,
      include_closed: config.include_closed,
      fetch_trades: config.fetch_trades,
    }
  }
}

/// Reachability of the scanner's dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentHealth {
  pub source: bool,
  /// `true` when persistence is disabled.
  pub store: bool,
}

/// Scan cycle orchestrator.
pub struct MarketScanner<S: MarketDataSource, R: ReportStore> {
  /// Raw market data.
  source: Arc<S>,
  /// Report persistence, `None` when disabled.
  store: Option<Arc<R>>,
  settings: ScanSettings,
  /// Number of the last completed cycle.
  cycle: u64,
}

impl<S: MarketDataSource, R: ReportStore> MarketScanner<S, R> {
  /// Create a new scanner.
  pub const fn new(source: Arc<S>, store: Option<Arc<R>>, settings: ScanSettings) -> Self {
    Self {
      source,
      store,
      settings,
      cycle: 0,
    }
  }

  /// Number of the last completed cycle.
  pub const fn cycle(&self) -> u64 {
    self.cycle
  }

  /// Continue cycle numbering from the last persisted report.
  pub async fn resume(&mut self) -> Result<()> {
    let Some(store) = &self.store else {
      return Ok(());
    };
    if let Some(previous) = store
      .load_latest()
      .await
      .context("Failed to load previous scan report")?
    {
      self.cycle = previous.summary.cycle;
      info!(
        cycle = self.cycle,
        finished_at = %previous.summary.finished_at,
        signals = previous.summary.signals,
        "Resuming after previous scan"
      );
    }
    Ok(())
  }

  /// Check the data source and, when configured, the report store.
  pub async fn check_health(&self) -> ComponentHealth {
    let store = async {
      match &self.store {
        Some(store) => store.is_healthy().await,
        None => true,
      }
    };
    let (source, store) = tokio::join!(self.source.is_healthy(), store);
    if !(source && store) {
      warn!(source, store, "Scanner dependency unhealthy");
    }
    ComponentHealth { source, store }
  }

  /// Run one complete scan cycle.
  #[instrument(skip(self), fields(cycle = self.cycle + 1))]
  pub async fn run_cycle(&mut self) -> Result<ScanReport> {
    let started_at = Utc::now();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    // ── 1. Discovery + tradable payloads ────────────────────
    let (discovery_raw, tradable_raw) = tokio::try_join!(
      async {
        self
          .source
          .fetch_discovery()
          .await
          .context("Failed to fetch discovery records")
      },
      async {
        self
          .source
          .fetch_tradable()
          .await
          .context("Failed to fetch tradable records")
      },
    )?;

    let discovery = decode_records::<DiscoveryRecord>(discovery_raw, RecordSource::Discovery);
    let tradable = decode_records::<TradableRecord>(tradable_raw, RecordSource::Tradable);
    let discovery = take(discovery, &mut diagnostics);
    let tradable = take(tradable, &mut diagnostics);

    // ── 2. Normalize ────────────────────────────────────────
    let mut markets = take(normalize(discovery, tradable), &mut diagnostics);
    if !self.settings.include_closed {
      let before = markets.len();
      markets.retain(|m| !m.status.is_closed());
      debug!(dropped = before - markets.len(), "Closed markets filtered");
    }

    // ── 3. Books + trades ───────────────────────────────────
    let token_ids: Vec<TokenId> = markets
      .iter()
      .flat_map(|m| m.token_ids().map(str::to_string))
      .collect();
    let raw_books = self.fetch_books(&token_ids).await;

    let trades = if self.settings.fetch_trades {
      let market_ids: Vec<MarketId> = markets
        .iter()
        .filter(|m| !m.outcomes.is_empty())
        .map(|m| m.condition_id.clone())
        .collect();
      Some(self.fetch_trades(&market_ids, &mut diagnostics).await)
    } else {
      None
    };

    // ── 4. Aggregate + evaluate ─────────────────────────────
    let markets = take(
      aggregate_raw_quotes(markets, raw_books, trades.as_deref()),
      &mut diagnostics,
    );
    let signals = evaluate(&markets, self.settings.tolerance);

    self.cycle += 1;
    let report = ScanReport::new(
      self.cycle,
      started_at,
      Utc::now(),
      self.settings.tolerance,
      markets,
      signals,
      diagnostics,
    );

    info!(
      cycle = report.summary.cycle,
      markets = report.summary.markets,
      signals = report.summary.signals,
      skipped = report.summary.skipped,
      merged = report.summary.merged,
      degraded = report.summary.degraded,
      "Scan cycle complete"
    );

    self.persist(&report).await;
    Ok(report)
  }

  async fn fetch_books(&self, token_ids: &[TokenId]) -> HashMap<TokenId, serde_json::Value> {
    if token_ids.is_empty() {
      return HashMap::new();
    }
    match self.source.fetch_books(token_ids).await {
      Ok(books) => {
        debug!(requested = token_ids.len(), received = books.len(), "Books fetched");
        books
      }
      Err(e) => {
        warn!(error = %e, tokens = token_ids.len(), "Book fetch failed, quotes left unknown");
        HashMap::new()
      }
    }
  }

  async fn fetch_trades(
    &self,
    market_ids: &[MarketId],
    diagnostics: &mut Vec<Diagnostic>,
  ) -> Vec<TradePrint> {
    if market_ids.is_empty() {
      return Vec::new();
    }
    match self.source.fetch_trades(market_ids).await {
      Ok(raw) => take(decode_trades(raw), diagnostics),
      Err(e) => {
        warn!(error = %e, markets = market_ids.len(), "Trade fetch failed, last trades left unset");
        Vec::new()
      }
    }
  }

  async fn persist(&self, report: &ScanReport) {
    let Some(store) = &self.store else {
      return;
    };
    if let Err(e) = store.save_report(report).await {
      warn!(error = %e, cycle = report.summary.cycle, "Failed to save scan report");
    }

    let records: Vec<SignalRecord> = report
      .signals
      .iter()
      .map(|signal| SignalRecord {
        cycle: report.summary.cycle,
        observed_at: report.summary.finished_at,
        signal: signal.clone(),
      })
      .collect();
    if let Err(e) = store.append_signals(&records).await {
      warn!(error = %e, count = records.len(), "Failed to append signals");
    }
  }
}

/// Move a stage's diagnostics into the cycle ledger, returning its value.
fn take<T>(stage: Reconciled<T>, diagnostics: &mut Vec<Diagnostic>) -> T {
  let (value, mut stage_diagnostics) = stage.into_parts();
  diagnostics.append(&mut stage_diagnostics);
  value
}
