//! Market Source Port - Raw Upstream Data Interface
//!
//! The scanner pulls raw JSON through this trait and does all decoding
//! itself, so adapters stay thin transport wrappers and tests can feed
//! recorded payloads directly.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::market::{MarketId, TokenId};

/// Trait for read-only market data providers.
///
/// Every method returns upstream payloads untouched. Shapes are decoded
/// by `domain::payload`.
#[async_trait]
pub trait MarketDataSource: Send + Sync + 'static {
  /// All discovery records (Gamma `/markets`), every page concatenated.
  async fn fetch_discovery(&self) -> anyhow::Result<Value>;

  /// All tradable-outcome records (CLOB `/simplified-markets`).
  async fn fetch_tradable(&self) -> anyhow::Result<Value>;

  /// Book payload per token.
  ///
  /// Tokens upstream has no book for map to the `{"error": "not_found"}`
  /// sentinel. Tokens the adapter failed to fetch are left out entirely.
  async fn fetch_books(&self, token_ids: &[TokenId]) -> anyhow::Result<HashMap<TokenId, Value>>;

  /// Recent trade rows for the given markets (Data-API `/trades`).
  async fn fetch_trades(&self, market_ids: &[MarketId]) -> anyhow::Result<Value>;

  /// Check if the upstream endpoints are reachable.
  async fn is_healthy(&self) -> bool;
}
