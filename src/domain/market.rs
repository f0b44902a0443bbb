//! Canonical market, outcome, and quote records.
//!
//! These are immutable value records: built once per scan cycle by the
//! normalizer, rebuilt (never patched) by the quote aggregator, and read by
//! the evaluator. Every price is a `Decimal` probability in `[0, 1]`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────
// Identifiers
// ────────────────────────────────────────────

/// Condition identifier shared by every endpoint for one market.
pub type MarketId = String;

/// Identifier of one outcome's tradable position.
pub type TokenId = String;

// ────────────────────────────────────────────
// Enums
// ────────────────────────────────────────────

/// Lifecycle state of a market as far as the scanner can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStatus {
    /// Accepting orders.
    Open,
    /// Closed or resolved.
    Closed,
    /// Discovery metadata exists but no tradable-outcome record was joined.
    Unresolved,
    /// Neither payload carried a usable status.
    Unknown,
}

impl MarketStatus {
    /// Derive a status from the loose flags upstream payloads carry.
    ///
    /// An explicit `status` string wins; otherwise `closed` beats `active`.
    pub fn from_flags(status: Option<&str>, active: Option<bool>, closed: Option<bool>) -> Self {
        if let Some(s) = status {
            match s.trim().to_ascii_lowercase().as_str() {
                "open" | "active" => return Self::Open,
                "closed" | "resolved" | "archived" => return Self::Closed,
                _ => {}
            }
        }
        match (active, closed) {
            (_, Some(true)) => Self::Closed,
            (Some(true), _) => Self::Open,
            _ => Self::Unknown,
        }
    }

    /// `true` once the market can no longer trade.
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Unresolved => write!(f, "unresolved"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Side of the book a quote rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSide {
    Bid,
    Ask,
}

impl std::fmt::Display for QuoteSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bid => write!(f, "bid"),
            Self::Ask => write!(f, "ask"),
        }
    }
}

/// What is known about a token's book.
///
/// Keeps "we never asked" apart from "upstream said there is no book",
/// so an unset price is never mistaken for a zero quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    /// No book data was supplied for the token.
    #[default]
    Unknown,
    /// Upstream answered with its "not found" sentinel.
    NotFound,
    /// A book snapshot was attached.
    Quoted,
}

// ────────────────────────────────────────────
// Records
// ────────────────────────────────────────────

/// Top-of-book quote for one side of one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Probability price in `[0, 1]`.
    pub price: Decimal,
    /// Resting size; `None` when the payload only carried a price.
    pub size: Option<Decimal>,
    pub side: QuoteSide,
}

impl Quote {
    pub const fn bid(price: Decimal, size: Option<Decimal>) -> Self {
        Self {
            price,
            size,
            side: QuoteSide::Bid,
        }
    }

    pub const fn ask(price: Decimal, size: Option<Decimal>) -> Self {
        Self {
            price,
            size,
            side: QuoteSide::Ask,
        }
    }
}

/// One possible resolution of a market and its tradable token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Human label, e.g. "Yes".
    pub label: String,
    /// Token identifier, unique within the market.
    pub token_id: TokenId,
    /// Positional price from the tradable payload, if it carried one.
    pub indicative_price: Option<Decimal>,
    /// Availability of the book fields below.
    pub book: BookStatus,
    pub best_bid: Option<Quote>,
    pub best_ask: Option<Quote>,
    pub last_trade_price: Option<Decimal>,
}

impl Outcome {
    /// Fresh outcome with every quote field unset.
    pub fn new(label: impl Into<String>, token_id: impl Into<TokenId>) -> Self {
        Self {
            label: label.into(),
            token_id: token_id.into(),
            indicative_price: None,
            book: BookStatus::Unknown,
            best_bid: None,
            best_ask: None,
            last_trade_price: None,
        }
    }

    /// Best bid price, if quoted.
    pub fn bid_price(&self) -> Option<Decimal> {
        self.best_bid.map(|q| q.price)
    }

    /// Best ask price, if quoted.
    pub fn ask_price(&self) -> Option<Decimal> {
        self.best_ask.map(|q| q.price)
    }
}

/// A reconciled prediction market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Condition identifier (non-empty).
    pub condition_id: MarketId,
    /// Question or title shown to users.
    pub question: String,
    /// URL slug from discovery metadata, when present.
    pub slug: Option<String>,
    pub status: MarketStatus,
    /// Outcomes in upstream order.
    pub outcomes: Vec<Outcome>,
}

impl Market {
    /// Placeholder question for markets only seen on the tradable endpoint.
    pub fn placeholder_question(condition_id: &str) -> String {
        format!("Market {condition_id}")
    }

    /// Look up an outcome by token id.
    pub fn outcome(&self, token_id: &str) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.token_id == token_id)
    }

    /// Token ids in outcome order.
    pub fn token_ids(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().map(|o| o.token_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quoted(bid: Decimal, ask: Decimal) -> Outcome {
        Outcome {
            book: BookStatus::Quoted,
            best_bid: Some(Quote::bid(bid, Some(dec!(100)))),
            best_ask: Some(Quote::ask(ask, None)),
            ..Outcome::new("Yes", "1")
        }
    }

    #[test]
    fn test_status_explicit_string_wins() {
        assert_eq!(
            MarketStatus::from_flags(Some("Resolved"), Some(true), Some(false)),
            MarketStatus::Closed
        );
        assert_eq!(MarketStatus::from_flags(Some("open"), None, Some(true)), MarketStatus::Open);
    }

    #[test]
    fn test_status_from_flags() {
        assert_eq!(MarketStatus::from_flags(None, Some(true), Some(false)), MarketStatus::Open);
        assert_eq!(MarketStatus::from_flags(None, Some(true), Some(true)), MarketStatus::Closed);
        assert_eq!(MarketStatus::from_flags(None, None, None), MarketStatus::Unknown);
        assert_eq!(MarketStatus::from_flags(Some("weird"), None, None), MarketStatus::Unknown);
    }

    #[test]
    fn test_new_outcome_is_unquoted() {
        let o = Outcome::new("No", "2");
        assert_eq!(o.book, BookStatus::Unknown);
        assert!(o.best_bid.is_none() && o.best_ask.is_none() && o.last_trade_price.is_none());
    }

    #[test]
    fn test_quoted_prices() {
        let o = quoted(dec!(0.40), dec!(0.50));
        assert_eq!(o.bid_price(), Some(dec!(0.40)));
        assert_eq!(o.ask_price(), Some(dec!(0.50)));
        assert_eq!(o.book, BookStatus::Quoted);
    }

    #[test]
    fn test_market_lookup() {
        let market = Market {
            condition_id: "0xabc".to_string(),
            question: Market::placeholder_question("0xabc"),
            slug: None,
            status: MarketStatus::Open,
            outcomes: vec![Outcome::new("Yes", "1"), Outcome::new("No", "2")],
        };
        assert_eq!(market.outcomes.len(), 2);
        assert_eq!(market.outcome("2").map(|o| o.label.as_str()), Some("No"));
        assert_eq!(market.token_ids().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(market.question, "Market 0xabc");
    }
}
