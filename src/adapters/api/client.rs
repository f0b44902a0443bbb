//! HTTP Client - Bounded, Retrying JSON Client
//!
//! Wraps reqwest with a concurrency semaphore and exponential backoff
//! for every Polymarket REST endpoint (Gamma, CLOB, Data-API). All
//! endpoints are public and read-only, so no auth headers are attached.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::ApiConfig;

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum concurrent requests.
  pub max_concurrent: usize,
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
}

impl Default for HttpClientConfig {
  fn default() -> Self {
    Self {
      timeout: Duration::from_secs(10),
      max_concurrent: 8,
      max_retries: 3,
      retry_base_delay: Duration::from_millis(250),
    }
  }
}

impl From<&ApiConfig> for HttpClientConfig {
  fn from(api: &ApiConfig) -> Self {
    Self {
      timeout: Duration::from_millis(api.timeout_ms),
      max_concurrent: api.max_concurrent,
      max_retries: api.max_retries,
      retry_base_delay: Duration::from_millis(api.retry_base_delay_ms),
    }
  }
}

/// Concurrency-limited JSON client shared by all API adapters.
pub struct HttpClient {
  /// Underlying HTTP client.
  http: Client,
  /// Client configuration.
  config: HttpClientConfig,
  /// Concurrency limiter.
  semaphore: Arc<Semaphore>,
}

impl HttpClient {
  /// Create a new client.
  pub fn new(config: HttpClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(config.max_concurrent)
      .build()
      .context("Failed to build HTTP client")?;

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));

    Ok(Self {
      http,
      config,
      semaphore,
    })
  }

  /// GET a JSON document. `Ok(None)` on 404.
  pub async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Option<Value>> {
    let request = self.http.get(url).query(query);
    self.execute_with_retry(request, url).await
  }

  /// POST a JSON body and read a JSON document back. `Ok(None)` on 404.
  pub async fn post_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Option<Value>> {
    let request = self.http.post(url).json(body);
    self.execute_with_retry(request, url).await
  }

  /// Execute a request with concurrency limiting and retries.
  ///
  /// 429, 5xx, and transport errors are retried; any other non-success
  /// status fails immediately.
  async fn execute_with_retry(&self, request: RequestBuilder, url: &str) -> Result<Option<Value>> {
    let _permit = self
      .semaphore
      .acquire()
      .await
      .context("Semaphore closed")?;

    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = self.config.retry_base_delay * 2u32.saturating_pow(attempt - 1);
        debug!(attempt, delay_ms = delay.as_millis(), url, "Retrying request");
        sleep(delay).await;
      }

      let req = request.try_clone().context("Failed to clone request")?;

      match req.send().await {
        Ok(response) => match response.status() {
          StatusCode::NOT_FOUND => return Ok(None),
          status if status.is_success() => {
            let body = response
              .json::<Value>()
              .await
              .with_context(|| format!("Failed to parse JSON from {url}"))?;
            return Ok(Some(body));
          }
          StatusCode::TOO_MANY_REQUESTS => {
            warn!(url, attempt, "Rate limited, backing off");
            last_error = Some(anyhow::anyhow!("Rate limited by {url}"));
          }
          status if status.is_server_error() => {
            warn!(status = %status, url, attempt, "Server error, retrying");
            last_error = Some(anyhow::anyhow!("Server error {status} from {url}"));
          }
          status => {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("API error {status} from {url}: {body}"));
          }
        },
        Err(e) => {
          warn!(error = %e, url, attempt, "Request failed");
          last_error = Some(anyhow::Error::new(e).context(format!("Request to {url} failed")));
        }
      }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Max retries exceeded for {url}")))
  }

  /// Check if a URL answers at all (any status).
  pub async fn is_reachable(&self, url: &str) -> bool {
    self.http.get(url).send().await.is_ok()
  }
}
