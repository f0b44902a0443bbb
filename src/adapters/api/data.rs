//! Data-API Adapter - Trade History
//!
//! `GET /trades?market=<condition_id>&limit=` per market, fetched
//! concurrently and flattened into one JSON array of trade rows.

use std::sync::Arc;

use futures_util::{StreamExt, stream};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::client::HttpClient;

/// Trade-history client for the public Data API.
pub struct DataApiClient {
  http: Arc<HttpClient>,
  base_url: String,
  trades_limit: usize,
  max_concurrent: usize,
}

impl DataApiClient {
  pub fn new(
    http: Arc<HttpClient>,
    base_url: impl Into<String>,
    trades_limit: usize,
    max_concurrent: usize,
  ) -> Self {
    Self {
      http,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      trades_limit,
      max_concurrent: max_concurrent.max(1),
    }
  }

  /// Recent trades for one market. Unknown markets yield no rows.
  pub async fn fetch_market_trades(&self, market_id: &str) -> anyhow::Result<Vec<Value>> {
    let url = format!("{}/trades", self.base_url);
    let query = [
      ("market", market_id.to_string()),
      ("limit", self.trades_limit.to_string()),
    ];
    let rows = match self.http.get_json(&url, &query).await? {
      Some(Value::Array(rows)) => rows,
      Some(Value::Object(mut envelope)) => match envelope.remove("data") {
        Some(Value::Array(rows)) => rows,
        _ => Vec::new(),
      },
      _ => Vec::new(),
    };
    Ok(rows)
  }

  /// Recent trades for many markets. Failed markets are skipped.
  #[instrument(skip_all, fields(markets = market_ids.len()), name = "data_trades")]
  pub async fn fetch_trades(&self, market_ids: &[String]) -> Value {
    let rows: Vec<Value> = stream::iter(market_ids.to_vec())
      .map(|market| async move {
        match self.fetch_market_trades(&market).await {
          Ok(rows) => rows,
          Err(e) => {
            warn!(market = %market, error = %e, "Trade fetch failed");
            Vec::new()
          }
        }
      })
      .buffer_unordered(self.max_concurrent)
      .flat_map(stream::iter)
      .collect()
      .await;

    debug!(rows = rows.len(), "Trades fetched");
    Value::Array(rows)
  }
}
