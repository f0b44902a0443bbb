//! Market Normalizer - Joins discovery and tradable payloads
//!
//! Both record batches are indexed once by condition id, then joined:
//! - discovery + tradable: full market, discovery status preferred
//! - discovery only: zero outcomes, `Unresolved`
//! - tradable only: placeholder question, tradable status
//!
//! Outcomes are paired positionally (label, token, price). A market whose
//! lists disagree in length is skipped whole; it is never truncated.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, instrument, warn};

use crate::domain::coerce;
use crate::domain::error::{Diagnostic, NormalizeError, Reconciled, RecordSource};
use crate::domain::market::{Market, MarketId, MarketStatus, Outcome};
use crate::domain::payload::{DiscoveryRecord, TradableRecord};

/// Reconcile discovery metadata with tradable outcome records.
///
/// Returns one market per distinct condition id, sorted by id, plus a
/// diagnostic for every record that was merged or dropped.
#[instrument(skip_all, fields(discovery = discovery.len(), tradable = tradable.len()))]
pub fn normalize(
  discovery: Vec<DiscoveryRecord>,
  tradable: Vec<TradableRecord>,
) -> Reconciled<Vec<Market>> {
  let mut diagnostics = Vec::new();

  let discovery = index_by_id(
    discovery,
    |r| r.condition_id.value(),
    RecordSource::Discovery,
    &mut diagnostics,
  );
  let tradable = index_by_id(
    tradable,
    |r| r.condition_id.value(),
    RecordSource::Tradable,
    &mut diagnostics,
  );

  let ids: BTreeSet<&MarketId> = discovery.keys().chain(tradable.keys()).collect();
  let mut markets = Vec::with_capacity(ids.len());

  for id in ids {
    let built = match (discovery.get(id), tradable.get(id)) {
      (Some(d), Some(t)) => build_outcomes(t).map(|outcomes| Market {
        condition_id: id.clone(),
        question: question_of(d, id),
        slug: coerce::optional_string(d.slug.as_ref()),
        status: discovery_status(d).unwrap_or_else(|| tradable_status(t)),
        outcomes,
      }),
      (Some(d), None) => Ok(Market {
        condition_id: id.clone(),
        question: question_of(d, id),
        slug: coerce::optional_string(d.slug.as_ref()),
        status: MarketStatus::Unresolved,
        outcomes: Vec::new(),
      }),
      (None, Some(t)) => build_outcomes(t).map(|outcomes| Market {
        condition_id: id.clone(),
        question: Market::placeholder_question(id),
        slug: None,
        status: tradable_status(t),
        outcomes,
      }),
      (None, None) => continue,
    };

    match built {
      Ok(market) => markets.push(market),
      Err(reason) => {
        debug!(market = %id, reason = %reason, "Skipping market");
        diagnostics.push(Diagnostic::skipped(id.clone(), reason));
      }
    }
  }

  debug!(
    markets = markets.len(),
    diagnostics = diagnostics.len(),
    "Normalization complete"
  );
  Reconciled::new(markets, diagnostics)
}

/// Index a batch by condition id, last record wins.
fn index_by_id<R, F>(
  records: Vec<R>,
  id_of: F,
  origin: RecordSource,
  diagnostics: &mut Vec<Diagnostic>,
) -> HashMap<MarketId, R>
where
  F: Fn(&R) -> Option<&serde_json::Value>,
{
  let mut index = HashMap::with_capacity(records.len());
  for (i, record) in records.into_iter().enumerate() {
    let id = match coerce::required_string("condition_id", id_of(&record)) {
      Ok(id) => id,
      Err(reason) => {
        debug!(source = %origin, row = i, "Skipping record without identifier");
        diagnostics.push(Diagnostic::skipped(format!("{origin}[{i}]"), reason));
        continue;
      }
    };
    if index.insert(id.clone(), record).is_some() {
      warn!(market = %id, source = %origin, "Duplicate record, keeping the later one");
      diagnostics.push(Diagnostic::merged(id, origin));
    }
  }
  index
}

fn question_of(record: &DiscoveryRecord, id: &str) -> String {
  coerce::optional_string(record.question.as_ref())
    .or_else(|| coerce::optional_string(record.title.as_ref()))
    .unwrap_or_else(|| Market::placeholder_question(id))
}

/// Status carried by discovery metadata, `None` when it says nothing usable.
fn discovery_status(record: &DiscoveryRecord) -> Option<MarketStatus> {
  let status = coerce::optional_string(record.status.as_ref());
  match MarketStatus::from_flags(
    status.as_deref(),
    coerce::optional_bool(record.active.as_ref()),
    coerce::optional_bool(record.closed.as_ref()),
  ) {
    MarketStatus::Unknown => None,
    known => Some(known),
  }
}

fn tradable_status(record: &TradableRecord) -> MarketStatus {
  MarketStatus::from_flags(
    None,
    coerce::optional_bool(record.active.as_ref()),
    coerce::optional_bool(record.closed.as_ref()),
  )
}

/// Pair labels, token ids, and (optional) prices into outcomes.
fn build_outcomes(record: &TradableRecord) -> Result<Vec<Outcome>, NormalizeError> {
  let columns = record.outcome_columns()?;
  let labels = columns.labels.len();
  let tokens = columns.token_ids.len();
  let prices = columns.prices.len();

  if labels != tokens || (prices != 0 && prices != labels) {
    return Err(NormalizeError::OutcomeArityMismatch {
      labels,
      tokens,
      prices,
    });
  }
  if labels == 0 {
    return Err(NormalizeError::EmptyOutcomeList);
  }

  let mut seen = HashSet::with_capacity(tokens);
  for token in &columns.token_ids {
    if !seen.insert(token.as_str()) {
      return Err(NormalizeError::DuplicateTokenIdentifier {
        token_id: token.clone(),
      });
    }
  }

  let mut prices = columns.prices.into_iter();
  Ok(
    columns
      .labels
      .into_iter()
      .zip(columns.token_ids)
      .map(|(label, token_id)| Outcome {
        indicative_price: prices.next().flatten(),
        ..Outcome::new(label, token_id)
      })
      .collect(),
  )
}
