//! Configuration Module - TOML-based Scanner Configuration
//!
//! Loads and validates configuration from `config.toml`.
//! Endpoint URLs, concurrency limits, and the comparison tolerance are
//! externalized here - nothing is hardcoded in the domain layer.

pub mod loader;

use serde::Deserialize;

use crate::domain::signal::Tolerance;

/// Top-level scanner configuration.
///
/// Only `[scanner]` is required; every other section falls back to
/// public Polymarket endpoints and conservative limits.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Scanner identity and cycle behaviour.
  pub scanner: ScannerConfig,
  /// Polymarket API endpoints and fetch limits.
  #[serde(default)]
  pub api: ApiConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
  /// Persistence configuration.
  #[serde(default)]
  pub persistence: PersistenceConfig,
}

/// Scanner identity and evaluation parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
  /// Human-readable scanner name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Slack applied to every no-arbitrage comparison.
  #[serde(default)]
  pub tolerance: Tolerance,
  /// Seconds between scan cycles.
  #[serde(default = "default_scan_interval")]
  pub scan_interval_secs: u64,
  /// Run a single cycle and exit.
  #[serde(default)]
  pub run_once: bool,
  /// Keep closed markets in the evaluated set.
  #[serde(default)]
  pub include_closed: bool,
  /// Fetch trade history to populate last-trade prices.
  #[serde(default = "default_true")]
  pub fetch_trades: bool,
}

/// Where top-of-book quotes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
  /// One `GET /book` per token; carries sizes.
  #[default]
  Book,
  /// Batched `POST /prices`; prices only, far fewer requests.
  Prices,
}

/// API endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Gamma (discovery) API base URL.
  #[serde(default = "default_gamma_url")]
  pub gamma_url: String,
  /// CLOB REST API base URL.
  #[serde(default = "default_clob_url")]
  pub clob_url: String,
  /// Data API base URL.
  #[serde(default = "default_data_url")]
  pub data_url: String,
  /// Per-request timeout in milliseconds.
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Maximum requests in flight.
  #[serde(default = "default_max_concurrent")]
  pub max_concurrent: usize,
  /// Retries after the first attempt on 429/5xx/transport errors.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Base backoff delay, doubled per retry.
  #[serde(default = "default_retry_base_delay_ms")]
  pub retry_base_delay_ms: u64,
  /// Gamma page size.
  #[serde(default = "default_page_limit")]
  pub page_limit: usize,
  /// Upper bound on pages fetched per paginated endpoint.
  #[serde(default = "default_max_pages")]
  pub max_pages: usize,
  /// Tokens per `POST /prices` request.
  #[serde(default = "default_price_batch_size")]
  pub price_batch_size: usize,
  #[serde(default)]
  pub quote_source: QuoteSource,
  /// Trade rows requested per market.
  #[serde(default = "default_trades_limit")]
  pub trades_limit: usize,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      gamma_url: default_gamma_url(),
      clob_url: default_clob_url(),
      data_url: default_data_url(),
      timeout_ms: default_timeout_ms(),
      max_concurrent: default_max_concurrent(),
      max_retries: default_max_retries(),
      retry_base_delay_ms: default_retry_base_delay_ms(),
      page_limit: default_page_limit(),
      max_pages: default_max_pages(),
      price_batch_size: default_price_batch_size(),
      quote_source: QuoteSource::default(),
      trades_limit: default_trades_limit(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
    }
  }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Write scan snapshots and the signal log.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Directory for `latest_scan.json` and `signals/`.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      data_dir: default_data_dir(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_scan_interval() -> u64 {
  60
}

fn default_gamma_url() -> String {
  "https://gamma-api.polymarket.com".to_string()
}

fn default_clob_url() -> String {
  "https://clob.polymarket.com".to_string()
}

fn default_data_url() -> String {
  "https://data-api.polymarket.com".to_string()
}

fn default_timeout_ms() -> u64 {
  10_000
}

fn default_max_concurrent() -> usize {
  8
}

fn default_max_retries() -> u32 {
  3
}

fn default_retry_base_delay_ms() -> u64 {
  250
}

fn default_page_limit() -> usize {
  500
}

fn default_max_pages() -> usize {
  50
}

fn default_price_batch_size() -> usize {
  50
}

fn default_trades_limit() -> usize {
  100
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8080
}

fn default_data_dir() -> String {
  "data".to_string()
}
