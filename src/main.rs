//! Polymarket Arbitrage Scanner - Entry Point
//!
//! Initializes configuration, logging, the Polymarket data source and
//! report store, then runs scan cycles until SIGINT (or once, with
//! `run_once`).
//!
//! Wiring sequence:
//! 1. Load config (first CLI argument, default `config.toml`) + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Create PolymarketSource (Gamma + CLOB + Data-API over one HTTP client)
//! 4. Create JsonReportStore when persistence is enabled
//! 5. Spawn metrics server (/metrics) and health server (/live + /ready)
//! 6. Run MarketScanner cycles on an interval
//! 7. Wait for SIGINT → graceful shutdown (stop loop → stop servers → exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use polymarket_arb_scanner::adapters::api::PolymarketSource;
use polymarket_arb_scanner::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use polymarket_arb_scanner::adapters::persistence::JsonReportStore;
use polymarket_arb_scanner::config;
use polymarket_arb_scanner::usecases::{MarketScanner, ScanSettings};

type Scanner = MarketScanner<PolymarketSource, JsonReportStore>;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {config_path}"))?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.scanner.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.scanner.name,
        version = env!("CARGO_PKG_VERSION"),
        tolerance = %config.scanner.tolerance.value(),
        run_once = config.scanner.run_once,
        quote_source = ?config.api.quote_source,
        "Starting Polymarket arbitrage scanner"
    );

    // ── 3. Shutdown signal channel ──────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. Data source + report store ───────────────────────
    let source = Arc::new(
        PolymarketSource::from_config(&config.api, config.scanner.include_closed)
            .context("Failed to create Polymarket data source")?,
    );

    let store = if config.persistence.enabled {
        let store = JsonReportStore::from_data_dir(&config.persistence.data_dir)
            .await
            .context("Failed to initialize report store")?;
        Some(Arc::new(store))
    } else {
        warn!("Persistence disabled - scan reports will not be saved");
        None
    };

    let mut scanner = MarketScanner::new(source, store, ScanSettings::from(&config.scanner));
    if let Err(e) = scanner.resume().await {
        warn!(error = %e, "Could not read previous report, numbering cycles from zero");
    }

    // ── 5. Metrics + health servers ─────────────────────────
    let health = Arc::new(HealthState::new());
    let mut server_handles = Vec::new();
    let metrics = if config.metrics.enabled {
        let metrics = Arc::new(MetricsRegistry::new().context("Failed to create metrics registry")?);

        let metrics_shutdown = shutdown_tx.subscribe();
        let metrics_server = Arc::clone(&metrics);
        let bind_address = config.metrics.bind_address.clone();
        server_handles.push(tokio::spawn(async move {
            if let Err(e) = metrics_server.serve(bind_address, metrics_shutdown).await {
                error!(error = %e, "Metrics server failed");
            }
        }));

        let health_shutdown = shutdown_tx.subscribe();
        let health_server = HealthServer::new(Arc::clone(&health), config.metrics.health_port);
        server_handles.push(tokio::spawn(async move {
            if let Err(e) = health_server.run(health_shutdown).await {
                error!(error = %e, "Health server failed");
            }
        }));

        Some(metrics)
    } else {
        None
    };

    // ── 6. Scan ─────────────────────────────────────────────
    let result = if config.scanner.run_once {
        run_cycle(&mut scanner, metrics.as_deref(), &health)
            .await
            .map(|_| ())
    } else {
        let loop_shutdown = shutdown_tx.subscribe();
        let loop_metrics = metrics.clone();
        let loop_health = Arc::clone(&health);
        let interval = Duration::from_secs(config.scanner.scan_interval_secs);
        let mut scan_handle = tokio::spawn(async move {
            run_scan_loop(scanner, interval, loop_metrics, loop_health, loop_shutdown).await;
        });

        info!(interval_secs = interval.as_secs(), "Scanner running");

        // ── 7. Wait for SIGINT ──────────────────────────────
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("SIGINT received, initiating graceful shutdown");
            }
            _ = &mut scan_handle => {
                warn!("Scan loop exited unexpectedly");
            }
        }

        let _ = shutdown_tx.send(());
        if !scan_handle.is_finished() {
            let _ = tokio::time::timeout(Duration::from_secs(30), scan_handle).await;
        }
        Ok(())
    };

    // ── Graceful shutdown ───────────────────────────────────
    health.set_stopping();
    let _ = shutdown_tx.send(());
    for handle in server_handles {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    result
}

/// Run cycles on a fixed interval until shutdown.
///
/// A failed cycle is logged and retried on the next tick.
async fn run_scan_loop(
    mut scanner: Scanner,
    interval: Duration,
    metrics: Option<Arc<MetricsRegistry>>,
    health: Arc<HealthState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                info!("Scan loop received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = run_cycle(&mut scanner, metrics.as_deref(), &health).await {
                    error!(error = %e, cycle = scanner.cycle() + 1, "Scan cycle failed");
                }
            }
        }
    }

    info!(cycles = scanner.cycle(), "Scan loop stopped cleanly");
}

/// Run one cycle, then publish its outcome and dependency health.
async fn run_cycle(
    scanner: &mut Scanner,
    metrics: Option<&MetricsRegistry>,
    health: &HealthState,
) -> Result<usize> {
    let started = Instant::now();
    let result = scanner.run_cycle().await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    match &result {
        Ok(report) => {
            if let Some(metrics) = metrics {
                metrics.record_report(report, elapsed_ms);
            }
            health.set_cycle_ok(true);
        }
        Err(_) => {
            if let Some(metrics) = metrics {
                metrics.record_failure(elapsed_ms);
            }
            health.set_cycle_ok(false);
        }
    }

    let dependencies = scanner.check_health().await;
    health.set_dependencies(dependencies.source, dependencies.store);

    result.map(|report| report.summary.signals)
}

