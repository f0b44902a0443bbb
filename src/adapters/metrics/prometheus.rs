//! Prometheus Metrics Registry - Scanner Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards.
//! Covers cycle outcomes and latency, market counts, diagnostics by
//! reason, and signals by kind.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::ports::report_store::ScanReport;

/// Centralized Prometheus metrics for the scanner.
///
/// All metrics follow the naming convention `scanner_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Completed cycles by result (`ok` / `error`).
    pub cycles_total: IntCounterVec,
    /// Markets kept by the latest cycle.
    pub markets_normalized: IntGauge,
    /// Diagnostics by action and reason.
    pub diagnostics_total: IntCounterVec,
    /// Signals by kind.
    pub signals_total: IntCounterVec,
    /// Wall-clock cycle duration in milliseconds.
    pub cycle_duration_ms: HistogramVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cycles_total = IntCounterVec::new(
            Opts::new("scanner_cycles_total", "Scan cycles completed"),
            &["result"],
        )?;

        let markets_normalized = IntGauge::new(
            "scanner_markets_normalized",
            "Markets kept by the latest scan cycle",
        )?;

        let diagnostics_total = IntCounterVec::new(
            Opts::new(
                "scanner_diagnostics_total",
                "Records skipped, merged, or degraded during reconciliation",
            ),
            &["action", "reason"],
        )?;

        let signals_total = IntCounterVec::new(
            Opts::new("scanner_signals_total", "Arbitrage signals emitted"),
            &["kind"],
        )?;

        let cycle_duration_ms = HistogramVec::new(
            HistogramOpts::new(
                "scanner_cycle_duration_ms",
                "Scan cycle duration in milliseconds",
            )
            .buckets(vec![
                100.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0, 60000.0,
            ]),
            &["result"],
        )?;

        // Register all metrics
        registry.register(Box::new(cycles_total.clone()))?;
        registry.register(Box::new(markets_normalized.clone()))?;
        registry.register(Box::new(diagnostics_total.clone()))?;
        registry.register(Box::new(signals_total.clone()))?;
        registry.register(Box::new(cycle_duration_ms.clone()))?;

        Ok(Self {
            registry,
            cycles_total,
            markets_normalized,
            diagnostics_total,
            signals_total,
            cycle_duration_ms,
        })
    }

    /// Record a successful cycle.
    pub fn record_report(&self, report: &ScanReport, elapsed_ms: f64) {
        self.cycles_total.with_label_values(&["ok"]).inc();
        self.cycle_duration_ms
            .with_label_values(&["ok"])
            .observe(elapsed_ms);
        self.markets_normalized
            .set(i64::try_from(report.summary.markets).unwrap_or(i64::MAX));

        for diag in &report.diagnostics {
            self.diagnostics_total
                .with_label_values(&[diag.action.label(), diag.reason.label()])
                .inc();
        }
        for signal in &report.signals {
            self.signals_total
                .with_label_values(&[signal.kind.as_str()])
                .inc();
        }
    }

    /// Record a cycle that failed before producing a report.
    pub fn record_failure(&self, elapsed_ms: f64) {
        self.cycles_total.with_label_values(&["error"]).inc();
        self.cycle_duration_ms
            .with_label_values(&["error"])
            .observe(elapsed_ms);
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics_self);
                async move { metrics.render() }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
