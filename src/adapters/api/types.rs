//! Polymarket API Request/Response Types
//!
//! Only the envelope shapes the adapters need to paginate and batch are
//! typed here. Record bodies stay `serde_json::Value` and are decoded by
//! `domain::payload`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cursor value the CLOB returns on the last page.
pub const END_CURSOR: &str = "LTE=";

/// One page of a cursor-paginated CLOB listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CursorPage {
  #[serde(default)]
  pub data: Vec<Value>,
  #[serde(default)]
  pub next_cursor: Option<String>,
}

impl CursorPage {
  /// Cursor for the following page, `None` once exhausted.
  pub fn next(&self) -> Option<&str> {
    self
      .next_cursor
      .as_deref()
      .filter(|c| !c.is_empty() && *c != END_CURSOR)
  }
}

/// Book side for `POST /prices`.
///
/// `BUY` is what a buyer pays (best ask), `SELL` what a seller receives
/// (best bid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriceSide {
  Buy,
  Sell,
}

impl PriceSide {
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Buy => "BUY",
      Self::Sell => "SELL",
    }
  }
}

/// One entry of a `POST /prices` request.
#[derive(Debug, Clone, Serialize)]
pub struct PriceParam<'a> {
  pub token_id: &'a str,
  pub side: PriceSide,
}

/// `POST /prices` request body.
#[derive(Debug, Clone, Serialize)]
pub struct PricesRequest<'a> {
  pub params: Vec<PriceParam<'a>>,
}

impl<'a> PricesRequest<'a> {
  /// Ask for both sides of every token.
  pub fn both_sides(token_ids: &'a [String]) -> Self {
    Self {
      params: token_ids
        .iter()
        .flat_map(|t| {
          [PriceSide::Buy, PriceSide::Sell].map(|side| PriceParam {
            token_id: t.as_str(),
            side,
          })
        })
        .collect(),
    }
  }
}

/// The payload used for tokens the CLOB has no book for.
pub fn not_found_book(token_id: &str) -> Value {
  serde_json::json!({ "error": "not_found", "token_id": token_id })
}

/// Turn one `/prices` entry (`{"BUY": "0.52", "SELL": "0.48"}`) into the
/// `best_bid` / `best_ask` book form. Missing sides stay absent.
pub fn book_from_prices(entry: &Value) -> Value {
  let mut book = serde_json::Map::new();
  if let Some(ask) = entry.get(PriceSide::Buy.as_str()) {
    book.insert("best_ask".to_string(), ask.clone());
  }
  if let Some(bid) = entry.get(PriceSide::Sell.as_str()) {
    book.insert("best_bid".to_string(), bid.clone());
  }
  Value::Object(book)
}
