//! Quote Aggregator - Attaches book quotes and last trades to outcomes
//!
//! Quote fields are rebuilt from the supplied data on every call, so
//! running the aggregator twice with the same input gives the same output
//! and a token missing from `books` never keeps a stale quote.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::domain::error::{Diagnostic, NormalizeError, Reconciled};
use crate::domain::market::{BookStatus, Market, Outcome, TokenId};
use crate::domain::payload::{BookPayload, TradePrint};

/// Decode raw book payloads keyed by token.
///
/// Per-field decode problems are returned as `(token, error)` pairs so the
/// aggregator can attribute them to a market.
pub fn decode_books(
  raw: HashMap<TokenId, serde_json::Value>,
) -> (HashMap<TokenId, BookPayload>, Vec<(TokenId, NormalizeError)>) {
  let mut books = HashMap::with_capacity(raw.len());
  let mut issues = Vec::new();
  for (token, value) in raw {
    let (book, errors) = BookPayload::from_value(&value);
    issues.extend(errors.into_iter().map(|e| (token.clone(), e)));
    books.insert(token, book);
  }
  (books, issues)
}

/// Attach top-of-book quotes and the latest trade price to every outcome.
///
/// - token with a found book: `best_bid` / `best_ask` from it, `Quoted`
/// - token with the not-found sentinel: unset, `NotFound`
/// - token absent from `books`: unset, `Unknown`
///
/// `trades` may be `None` when trade history was not fetched.
#[instrument(skip_all, fields(markets = markets.len(), books = books.len()))]
pub fn aggregate_quotes(
  markets: Vec<Market>,
  books: &HashMap<TokenId, BookPayload>,
  trades: Option<&[TradePrint]>,
) -> Reconciled<Vec<Market>> {
  let latest = trades.map(latest_prints).unwrap_or_default();

  let markets = markets
    .into_iter()
    .map(|mut market| {
      for outcome in &mut market.outcomes {
        let book = books.get(&outcome.token_id);
        attach(outcome, book, &latest);
      }
      market
    })
    .collect::<Vec<_>>();

  debug!(
    quoted = markets
      .iter()
      .flat_map(|m| &m.outcomes)
      .filter(|o| o.book == BookStatus::Quoted)
      .count(),
    "Quotes attached"
  );
  Reconciled::new(markets, Vec::new())
}

/// Decode raw books and attach them, reporting bad book fields as
/// `Degraded` diagnostics against the owning market.
pub fn aggregate_raw_quotes(
  markets: Vec<Market>,
  raw_books: HashMap<TokenId, serde_json::Value>,
  trades: Option<&[TradePrint]>,
) -> Reconciled<Vec<Market>> {
  let (books, issues) = decode_books(raw_books);

  let owner: HashMap<&str, &str> = markets
    .iter()
    .flat_map(|m| {
      m.outcomes
        .iter()
        .map(move |o| (o.token_id.as_str(), m.condition_id.as_str()))
    })
    .collect();
  let mut diagnostics: Vec<Diagnostic> = issues
    .into_iter()
    .filter_map(|(token, reason)| {
      let market = owner.get(token.as_str())?;
      debug!(market = %market, token = %token, reason = %reason, "Degrading book field");
      Some(Diagnostic::degraded(*market, token, reason))
    })
    .collect();
  diagnostics.sort_by(|a, b| (&a.identifier, &a.token_id).cmp(&(&b.identifier, &b.token_id)));

  let (markets, mut rest) = aggregate_quotes(markets, &books, trades).into_parts();
  diagnostics.append(&mut rest);
  Reconciled::new(markets, diagnostics)
}

fn attach(outcome: &mut Outcome, book: Option<&BookPayload>, latest: &HashMap<&str, Decimal>) {
  let (status, best_bid, best_ask) = match book {
    None => (BookStatus::Unknown, None, None),
    Some(BookPayload::NotFound) => (BookStatus::NotFound, None, None),
    Some(BookPayload::Found { best_bid, best_ask }) => (BookStatus::Quoted, *best_bid, *best_ask),
  };
  outcome.book = status;
  outcome.best_bid = best_bid;
  outcome.best_ask = best_ask;
  outcome.last_trade_price = latest.get(outcome.token_id.as_str()).copied();
}

/// Latest print per token. Ties on timestamp go to the later record.
fn latest_prints(trades: &[TradePrint]) -> HashMap<&str, Decimal> {
  let mut latest: HashMap<&str, &TradePrint> = HashMap::new();
  for print in trades {
    latest
      .entry(print.token_id.as_str())
      .and_modify(|current| {
        if print.timestamp >= current.timestamp {
          *current = print;
        }
      })
      .or_insert(print);
  }
  latest
    .into_iter()
    .map(|(token, print)| (token, print.price))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::error::DiagnosticAction;
  use crate::domain::market::{MarketStatus, Quote};
  use chrono::{TimeZone, Utc};
  use rust_decimal_macros::dec;
  use serde_json::json;

  fn market() -> Market {
    Market {
      condition_id: "0xa".to_string(),
      question: "Q".to_string(),
      slug: None,
      status: MarketStatus::Open,
      outcomes: vec![Outcome::new("Yes", "1"), Outcome::new("No", "2")],
    }
  }

  fn found(bid: Decimal, ask: Decimal) -> BookPayload {
    BookPayload::Found {
      best_bid: Some(Quote::bid(bid, None)),
      best_ask: Some(Quote::ask(ask, None)),
    }
  }

  fn print(token: &str, price: Decimal, ts: i64) -> TradePrint {
    TradePrint {
      token_id: token.to_string(),
      price,
      timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
    }
  }

  #[test]
  fn test_book_states() {
    let books = HashMap::from([
      ("1".to_string(), found(dec!(0.40), dec!(0.45))),
      ("2".to_string(), BookPayload::NotFound),
    ]);
    let mut m = market();
    m.outcomes.push(Outcome::new("Maybe", "3"));

    let out = aggregate_quotes(vec![m], &books, None);
    let outcomes = &out.value[0].outcomes;
    assert_eq!(outcomes[0].book, BookStatus::Quoted);
    assert_eq!(outcomes[0].ask_price(), Some(dec!(0.45)));
    assert_eq!(outcomes[1].book, BookStatus::NotFound);
    assert!(outcomes[1].best_bid.is_none() && outcomes[1].best_ask.is_none());
    assert_eq!(outcomes[2].book, BookStatus::Unknown);
    assert!(outcomes[2].best_ask.is_none());
  }

  #[test]
  fn test_empty_books_leaves_everything_unset() {
    let out = aggregate_quotes(vec![market()], &HashMap::new(), None);
    assert!(out.value[0].outcomes.iter().all(|o| {
      o.book == BookStatus::Unknown
        && o.best_bid.is_none()
        && o.best_ask.is_none()
        && o.last_trade_price.is_none()
    }));
  }

  #[test]
  fn test_idempotent() {
    let books = HashMap::from([("1".to_string(), found(dec!(0.40), dec!(0.45)))]);
    let trades = [print("2", dec!(0.5), 10)];
    let once = aggregate_quotes(vec![market()], &books, Some(&trades[..])).value;
    let twice = aggregate_quotes(once.clone(), &books, Some(&trades[..])).value;
    assert_eq!(once, twice);
  }

  #[test]
  fn test_stale_quotes_cleared() {
    let books = HashMap::from([("1".to_string(), found(dec!(0.40), dec!(0.45)))]);
    let quoted = aggregate_quotes(vec![market()], &books, None).value;
    let cleared = aggregate_quotes(quoted, &HashMap::new(), None).value;
    assert_eq!(cleared[0].outcomes[0].book, BookStatus::Unknown);
    assert!(cleared[0].outcomes[0].best_ask.is_none());
  }

  #[test]
  fn test_latest_trade_wins() {
    let trades = [
      print("1", dec!(0.41), 100),
      print("1", dec!(0.47), 300),
      print("1", dec!(0.44), 200),
      print("2", dec!(0.55), 50),
      print("2", dec!(0.56), 50),
    ];
    let out = aggregate_quotes(vec![market()], &HashMap::new(), Some(&trades[..]));
    assert_eq!(out.value[0].outcomes[0].last_trade_price, Some(dec!(0.47)));
    assert_eq!(out.value[0].outcomes[1].last_trade_price, Some(dec!(0.56)));
  }

  #[test]
  fn test_raw_books_degrade_bad_field() {
    let raw = HashMap::from([
      ("1".to_string(), json!({"best_bid": "abc", "best_ask": "0.45"})),
      ("2".to_string(), json!({"error": "not_found", "token_id": "2"})),
    ]);
    let out = aggregate_raw_quotes(vec![market()], raw, None);
    assert_eq!(out.value.len(), 1);
    let yes = &out.value[0].outcomes[0];
    assert_eq!(yes.book, BookStatus::Quoted);
    assert!(yes.best_bid.is_none());
    assert_eq!(yes.ask_price(), Some(dec!(0.45)));
    assert_eq!(out.value[0].outcomes[1].book, BookStatus::NotFound);

    assert_eq!(out.count(DiagnosticAction::Degraded), 1);
    assert_eq!(out.diagnostics[0].identifier, "0xa");
    assert_eq!(out.diagnostics[0].token_id.as_deref(), Some("1"));
  }

  #[test]
  fn test_raw_books_for_unknown_tokens_ignored() {
    let raw = HashMap::from([("999".to_string(), json!({"best_bid": "x"}))]);
    let out = aggregate_raw_quotes(vec![market()], raw, None);
    assert!(out.diagnostics.is_empty());
  }
}
