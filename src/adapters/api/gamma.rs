//! Gamma Adapter - Market Discovery
//!
//! `GET /markets` with offset pagination. Returns the raw rows of every
//! page concatenated into one JSON array.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::client::HttpClient;

/// Discovery client for the Gamma API.
pub struct GammaClient {
  http: Arc<HttpClient>,
  base_url: String,
  page_limit: usize,
  max_pages: usize,
  include_closed: bool,
}

impl GammaClient {
  pub fn new(
    http: Arc<HttpClient>,
    base_url: impl Into<String>,
    page_limit: usize,
    max_pages: usize,
    include_closed: bool,
  ) -> Self {
    Self {
      http,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      page_limit,
      max_pages,
      include_closed,
    }
  }

  /// Fetch every market page until a short page or `max_pages`.
  #[instrument(skip(self), name = "gamma_markets")]
  pub async fn fetch_markets(&self) -> Result<Value> {
    let url = format!("{}/markets", self.base_url);
    let mut rows = Vec::new();

    for page in 0..self.max_pages {
      let mut query = vec![
        ("limit", self.page_limit.to_string()),
        ("offset", (page * self.page_limit).to_string()),
      ];
      if !self.include_closed {
        query.push(("closed", "false".to_string()));
        query.push(("active", "true".to_string()));
      }

      let Some(body) = self
        .http
        .get_json(&url, &query)
        .await
        .with_context(|| format!("Failed to fetch Gamma markets page {page}"))?
      else {
        break;
      };

      let batch = match body {
        Value::Array(batch) => batch,
        Value::Object(mut envelope) => match envelope.remove("data") {
          Some(Value::Array(batch)) => batch,
          _ => Vec::new(),
        },
        _ => Vec::new(),
      };
      let fetched = batch.len();
      rows.extend(batch);
      debug!(page, fetched, total = rows.len(), "Gamma page fetched");

      if fetched < self.page_limit {
        return Ok(Value::Array(rows));
      }
    }

    warn!(max_pages = self.max_pages, "Gamma pagination stopped at page limit");
    Ok(Value::Array(rows))
  }
}
