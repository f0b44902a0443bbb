//! CLOB Adapter - Tradable Markets, Books, and Prices
//!
//! Read-only access to the Polymarket Central Limit Order Book:
//! - `GET /simplified-markets`, cursor-paginated
//! - `GET /book?token_id=`, one request per token
//! - `POST /prices`, batched best bid/ask lookups

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::{StreamExt, stream};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::client::HttpClient;
use super::types::{CursorPage, PricesRequest, book_from_prices, not_found_book};

/// CLOB REST client.
pub struct ClobClient {
  http: Arc<HttpClient>,
  base_url: String,
  max_pages: usize,
  price_batch_size: usize,
  max_concurrent: usize,
}

impl ClobClient {
  pub fn new(
    http: Arc<HttpClient>,
    base_url: impl Into<String>,
    max_pages: usize,
    price_batch_size: usize,
    max_concurrent: usize,
  ) -> Self {
    Self {
      http,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      max_pages,
      price_batch_size: price_batch_size.max(1),
      max_concurrent: max_concurrent.max(1),
    }
  }

  /// Fetch all simplified-market rows, following `next_cursor`.
  #[instrument(skip(self), name = "clob_simplified_markets")]
  pub async fn fetch_simplified_markets(&self) -> Result<Value> {
    let url = format!("{}/simplified-markets", self.base_url);
    let mut rows = Vec::new();
    let mut cursor: Option<String> = None;

    for page in 0..self.max_pages {
      let query: Vec<(&str, String)> = cursor
        .iter()
        .map(|c| ("next_cursor", c.clone()))
        .collect();

      let Some(body) = self
        .http
        .get_json(&url, &query)
        .await
        .with_context(|| format!("Failed to fetch simplified markets page {page}"))?
      else {
        break;
      };
      let page_body: CursorPage =
        serde_json::from_value(body).context("Unexpected simplified-markets envelope")?;

      let next = page_body.next().map(str::to_string);
      rows.extend(page_body.data);
      debug!(page, total = rows.len(), "Simplified markets page fetched");

      match next {
        Some(next) => cursor = Some(next),
        None => return Ok(Value::Array(rows)),
      }
    }

    warn!(max_pages = self.max_pages, "CLOB pagination stopped at page limit");
    Ok(Value::Array(rows))
  }

  /// Fetch one token's book. A 404 becomes the not-found sentinel.
  pub async fn fetch_book(&self, token_id: &str) -> Result<Value> {
    let url = format!("{}/book", self.base_url);
    let body = self
      .http
      .get_json(&url, &[("token_id", token_id.to_string())])
      .await
      .with_context(|| format!("Failed to fetch book for token {token_id}"))?;
    Ok(body.unwrap_or_else(|| not_found_book(token_id)))
  }

  /// Fetch books for many tokens concurrently.
  ///
  /// Tokens whose request failed are omitted, so the aggregator reports
  /// them as unknown rather than not found.
  #[instrument(skip_all, fields(tokens = token_ids.len()), name = "clob_books")]
  pub async fn fetch_books(&self, token_ids: &[String]) -> HashMap<String, Value> {
    stream::iter(token_ids.to_vec())
      .map(|token| async move {
        match self.fetch_book(&token).await {
          Ok(book) => Some((token, book)),
          Err(e) => {
            warn!(token = %token, error = %e, "Book fetch failed");
            None
          }
        }
      })
      .buffer_unordered(self.max_concurrent)
      .filter_map(|entry| async move { entry })
      .collect()
      .await
  }

  /// Fetch best bid/ask for many tokens via batched `POST /prices`.
  ///
  /// Each entry is returned in book form (`best_bid` / `best_ask`).
  /// Tokens missing from a successful response map to the not-found
  /// sentinel; tokens in a failed batch are omitted.
  #[instrument(skip_all, fields(tokens = token_ids.len()), name = "clob_prices")]
  pub async fn fetch_prices(&self, token_ids: &[String]) -> HashMap<String, Value> {
    let url = format!("{}/prices", self.base_url);
    let url = url.as_str();

    let batches: Vec<Vec<String>> = token_ids
      .chunks(self.price_batch_size)
      .map(<[String]>::to_vec)
      .collect();

    stream::iter(batches)
      .map(|batch| async move {
        let request = PricesRequest::both_sides(&batch);
        match self.http.post_json(url, &request).await {
          Ok(body) => {
            let body = body.unwrap_or(Value::Null);
            batch
              .iter()
              .map(|token| {
                let book = body
                  .get(token.as_str())
                  .map_or_else(|| not_found_book(token), book_from_prices);
                (token.clone(), book)
              })
              .collect::<Vec<_>>()
          }
          Err(e) => {
            warn!(batch = batch.len(), error = %e, "Price batch failed");
            Vec::new()
          }
        }
      })
      .buffer_unordered(self.max_concurrent)
      .flat_map(stream::iter)
      .collect()
      .await
  }

  /// Check if the CLOB answers.
  pub async fn health_check(&self) -> bool {
    self.http.is_reachable(&format!("{}/time", self.base_url)).await
  }
}
