//! Arbitrage signals and the comparison tolerance.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::market::{MarketId, TokenId};

/// Kind of pricing anomaly.
///
/// Declaration order is the evaluator's tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    /// Sum of best asks across a full outcome partition is below 1.
    ComplementarySumBelowOne,
    /// Sum of best bids across a full outcome partition is above 1.
    ComplementaryBidSumAboveOne,
    /// Best bid above best ask on the same token.
    CrossedBook,
    /// Discovery price sits outside the token's own bid/ask band.
    QuoteDivergence,
}

impl SignalKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ComplementarySumBelowOne => "complementary-sum-below-one",
            Self::ComplementaryBidSumAboveOne => "complementary-bid-sum-above-one",
            Self::CrossedBook => "crossed-book",
            Self::QuoteDivergence => "quote-divergence",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected violation of a no-arbitrage bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitrageSignal {
    pub market_id: MarketId,
    pub kind: SignalKind,
    /// Deviation from the bound, always positive.
    pub magnitude: Decimal,
    /// Tokens implicated, sorted.
    pub outcome_ids: Vec<TokenId>,
}

impl ArbitrageSignal {
    pub fn new(
        market_id: impl Into<MarketId>,
        kind: SignalKind,
        magnitude: Decimal,
        mut outcome_ids: Vec<TokenId>,
    ) -> Self {
        outcome_ids.sort();
        Self {
            market_id: market_id.into(),
            kind,
            magnitude: magnitude.normalize(),
            outcome_ids,
        }
    }

    /// Ordering key: market, then kind, then implicated tokens.
    pub fn sort_key(&self) -> (&str, SignalKind, &[TokenId]) {
        (&self.market_id, self.kind, &self.outcome_ids)
    }
}

/// Slack in `[0, 1]` applied to every bound comparison.
///
/// `Tolerance::DEFAULT` is one hundredth of a cent (0.0001), below the
/// CLOB's smallest tick, so it only absorbs representation noise from
/// upstream numbers and never hides a tradable deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Tolerance(Decimal);

impl Tolerance {
    pub const DEFAULT: Self = Self(dec!(0.0001));
    pub const ZERO: Self = Self(Decimal::ZERO);
    /// Prices live in `[0, 1]`; a wider slack could only overflow.
    pub const MAX: Self = Self(Decimal::ONE);

    /// Build a tolerance, rejecting values outside `[0, 1]`.
    pub fn new(value: Decimal) -> Result<Self, ToleranceError> {
        if value < Self::ZERO.0 || value > Self::MAX.0 {
            return Err(ToleranceError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    pub const fn value(self) -> Decimal {
        self.0
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<Decimal> for Tolerance {
    type Error = ToleranceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Tolerance> for Decimal {
    fn from(t: Tolerance) -> Self {
        t.0
    }
}

impl FromStr for Tolerance {
    type Err = ToleranceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|_| ToleranceError::NotADecimal(s.to_string()))?;
        Self::new(value)
    }
}

/// Rejected tolerance value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToleranceError {
    #[error("tolerance must be between 0 and 1, got {0}")]
    OutOfRange(Decimal),

    #[error("tolerance is not a decimal: {0:?}")]
    NotADecimal(String),
}
