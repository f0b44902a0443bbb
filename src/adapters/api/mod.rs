//! Polymarket API Adapter
//!
//! Read-only HTTP clients for the three public Polymarket services and
//! the `PolymarketSource` that combines them behind `MarketDataSource`.
//!
//! Sub-modules:
//! - `client`: HTTP client with concurrency limiting and retries
//! - `gamma`: Market discovery (`/markets`)
//! - `clob`: Tradable markets, books, and prices
//! - `data`: Trade history
//! - `types`: Pagination and batching envelope types

pub mod client;
pub mod clob;
pub mod data;
pub mod gamma;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::config::{ApiConfig, QuoteSource};
use crate::domain::market::{MarketId, TokenId};
use crate::ports::market_source::MarketDataSource;

use self::client::{HttpClient, HttpClientConfig};
use self::clob::ClobClient;
use self::data::DataApiClient;
use self::gamma::GammaClient;

/// Live Polymarket data source.
pub struct PolymarketSource {
  gamma: GammaClient,
  clob: ClobClient,
  data: DataApiClient,
  quote_source: QuoteSource,
}

impl PolymarketSource {
  /// Build all three clients over one shared HTTP client.
  pub fn from_config(api: &ApiConfig, include_closed: bool) -> Result<Self> {
    let http = Arc::new(HttpClient::new(HttpClientConfig::from(api))?);
    Ok(Self {
      gamma: GammaClient::new(
        Arc::clone(&http),
        &api.gamma_url,
        api.page_limit,
        api.max_pages,
        include_closed,
      ),
      clob: ClobClient::new(
        Arc::clone(&http),
        &api.clob_url,
        api.max_pages,
        api.price_batch_size,
        api.max_concurrent,
      ),
      data: DataApiClient::new(http, &api.data_url, api.trades_limit, api.max_concurrent),
      quote_source: api.quote_source,
    })
  }
}

#[async_trait]
impl MarketDataSource for PolymarketSource {
  async fn fetch_discovery(&self) -> Result<Value> {
    self.gamma.fetch_markets().await
  }

  async fn fetch_tradable(&self) -> Result<Value> {
    self.clob.fetch_simplified_markets().await
  }

  async fn fetch_books(&self, token_ids: &[TokenId]) -> Result<HashMap<TokenId, Value>> {
    Ok(match self.quote_source {
      QuoteSource::Book => self.clob.fetch_books(token_ids).await,
      QuoteSource::Prices => self.clob.fetch_prices(token_ids).await,
    })
  }

  async fn fetch_trades(&self, market_ids: &[MarketId]) -> Result<Value> {
    Ok(self.data.fetch_trades(market_ids).await)
  }

  async fn is_healthy(&self) -> bool {
    self.clob.health_check().await
  }
}
