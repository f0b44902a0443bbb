//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails (including a tolerance outside `[0, 1]`)
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    name = %config.scanner.name,
    tolerance = %config.scanner.tolerance.value(),
    interval_secs = config.scanner.scan_interval_secs,
    quote_source = ?config.api.quote_source,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content).context("Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  // Scanner validation
  anyhow::ensure!(
    !config.scanner.name.trim().is_empty(),
    "Scanner name must not be empty"
  );
  anyhow::ensure!(
    config.scanner.run_once || config.scanner.scan_interval_secs > 0,
    "scan_interval_secs must be positive unless run_once is set"
  );

  // API validation
  for (name, url) in [
    ("gamma_url", &config.api.gamma_url),
    ("clob_url", &config.api.clob_url),
    ("data_url", &config.api.data_url),
  ] {
    anyhow::ensure!(
      url.starts_with("http://") || url.starts_with("https://"),
      "{} must be an http(s) URL, got {:?}",
      name,
      url
    );
  }
  anyhow::ensure!(config.api.timeout_ms > 0, "timeout_ms must be positive");
  anyhow::ensure!(
    config.api.max_concurrent > 0,
    "max_concurrent must be positive"
  );
  anyhow::ensure!(
    config.api.page_limit > 0 && config.api.max_pages > 0,
    "page_limit and max_pages must be positive"
  );
  anyhow::ensure!(
    config.api.price_batch_size > 0 && config.api.price_batch_size <= 500,
    "price_batch_size must be in (0, 500], got {}",
    config.api.price_batch_size
  );
  anyhow::ensure!(config.api.trades_limit > 0, "trades_limit must be positive");

  // Persistence validation
  anyhow::ensure!(
    !config.persistence.enabled || !config.persistence.data_dir.is_empty(),
    "data_dir must not be empty when persistence is enabled"
  );

  Ok(())
}
