//! Arbitrage Evaluator - No-arbitrage bound checks on reconciled markets
//!
//! Checks performed per market:
//! - best asks across the outcome partition summing below 1
//! - best bids across the outcome partition summing above 1
//! - crossed book on a single token (bid above ask)
//! - indicative price outside the token's own bid/ask band
//!
//! Every comparison is exact `Decimal` arithmetic with the tolerance as
//! slack. A check that needs a quote the market does not have is skipped,
//! so missing data can never produce a signal.

use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::domain::market::{Market, Outcome};
use crate::domain::signal::{ArbitrageSignal, SignalKind, Tolerance};

/// Evaluate markets for pricing anomalies.
///
/// Pure and deterministic: signals come back sorted by market id, kind,
/// then implicated token ids.
#[instrument(skip_all, fields(markets = markets.len(), tolerance = %tolerance.value()))]
pub fn evaluate(markets: &[Market], tolerance: Tolerance) -> Vec<ArbitrageSignal> {
  let tol = tolerance.value();
  let mut signals = Vec::new();

  for market in markets {
    if market.outcomes.len() >= 2 {
      signals.extend(ask_sum_below_one(market, tol));
      signals.extend(bid_sum_above_one(market, tol));
    }
    for outcome in &market.outcomes {
      signals.extend(crossed_book(market, outcome, tol));
      signals.extend(quote_divergence(market, outcome, tol));
    }
  }

  signals.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
  for signal in &signals {
    info!(
      market = %signal.market_id,
      kind = %signal.kind,
      magnitude = %signal.magnitude,
      outcomes = ?signal.outcome_ids,
      "Arbitrage signal"
    );
  }
  signals
}

fn all_tokens(market: &Market) -> Vec<String> {
  market.outcomes.iter().map(|o| o.token_id.clone()).collect()
}

/// Buying every outcome at the ask costs less than the guaranteed payout.
fn ask_sum_below_one(market: &Market, tol: Decimal) -> Option<ArbitrageSignal> {
  let sum = market
    .outcomes
    .iter()
    .map(Outcome::ask_price)
    .sum::<Option<Decimal>>()?;
  (sum < Decimal::ONE - tol).then(|| {
    ArbitrageSignal::new(
      market.condition_id.clone(),
      SignalKind::ComplementarySumBelowOne,
      Decimal::ONE - sum,
      all_tokens(market),
    )
  })
}

/// Selling every outcome at the bid collects more than the payout owed.
fn bid_sum_above_one(market: &Market, tol: Decimal) -> Option<ArbitrageSignal> {
  let sum = market
    .outcomes
    .iter()
    .map(Outcome::bid_price)
    .sum::<Option<Decimal>>()?;
  (sum > Decimal::ONE + tol).then(|| {
    ArbitrageSignal::new(
      market.condition_id.clone(),
      SignalKind::ComplementaryBidSumAboveOne,
      sum - Decimal::ONE,
      all_tokens(market),
    )
  })
}

fn crossed_book(market: &Market, outcome: &Outcome, tol: Decimal) -> Option<ArbitrageSignal> {
  let bid = outcome.bid_price()?;
  let ask = outcome.ask_price()?;
  (bid > ask + tol).then(|| {
    ArbitrageSignal::new(
      market.condition_id.clone(),
      SignalKind::CrossedBook,
      bid - ask,
      vec![outcome.token_id.clone()],
    )
  })
}

/// Indicative price outside `[bid - tol, ask + tol]`. Crossed books are
/// left to [`crossed_book`] since their band is inverted.
fn quote_divergence(market: &Market, outcome: &Outcome, tol: Decimal) -> Option<ArbitrageSignal> {
  let indicative = outcome.indicative_price?;
  let bid = outcome.bid_price()?;
  let ask = outcome.ask_price()?;
  if bid > ask {
    return None;
  }

  let magnitude = if indicative < bid - tol {
    bid - indicative
  } else if indicative > ask + tol {
    indicative - ask
  } else {
    return None;
  };
  Some(ArbitrageSignal::new(
    market.condition_id.clone(),
    SignalKind::QuoteDivergence,
    magnitude,
    vec![outcome.token_id.clone()],
  ))
}
