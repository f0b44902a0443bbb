//! Health Check Server - Liveness and Readiness Probes
//!
//! Exposes /live and /ready endpoints via axum 0.7 for Docker
//! health checks and monitoring. Readiness follows the outcome of the
//! most recent scan cycle and the reachability of the data source and
//! report store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Shared health state polled by readiness probes.
#[derive(Debug)]
pub struct HealthState {
    /// Whether the last scan cycle completed.
    last_cycle_ok: AtomicBool,
    /// Whether the upstream APIs answered the last check.
    source_healthy: AtomicBool,
    /// Whether the data directory was writable at the last check.
    store_healthy: AtomicBool,
    /// Cleared once shutdown begins.
    running: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Not ready until the first cycle completes.
    pub const fn new() -> Self {
        Self {
            last_cycle_ok: AtomicBool::new(false),
            source_healthy: AtomicBool::new(true),
            store_healthy: AtomicBool::new(true),
            running: AtomicBool::new(true),
        }
    }

    pub fn set_cycle_ok(&self, ok: bool) {
        self.last_cycle_ok.store(ok, Ordering::Relaxed);
    }

    pub fn set_dependencies(&self, source: bool, store: bool) {
        self.source_healthy.store(source, Ordering::Relaxed);
        self.store_healthy.store(store, Ordering::Relaxed);
    }

    pub fn set_stopping(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Ready while running, the last cycle succeeded, and both
    /// dependencies passed their last check.
    pub fn is_ready(&self) -> bool {
        self.running.load(Ordering::Relaxed)
            && self.last_cycle_ok.load(Ordering::Relaxed)
            && self.source_healthy.load(Ordering::Relaxed)
            && self.store_healthy.load(Ordering::Relaxed)
    }
}

/// Axum-based health check HTTP server.
pub struct HealthServer {
    /// Health state shared with the scan loop.
    state: Arc<HealthState>,
    /// Bind port (default 8080 from config).
    port: u16,
}

impl HealthServer {
    /// Create a new health server.
    pub const fn new(state: Arc<HealthState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Routes without a listener, for embedding and tests.
    pub fn router(state: Arc<HealthState>) -> Router {
        Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .with_state(state)
    }

    /// Start the health check server.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Self::router(Arc::clone(&self.state));

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(address = %addr, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness probe: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// Readiness probe: 200 only after a successful cycle.
    async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
        if state.is_ready() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }
}
