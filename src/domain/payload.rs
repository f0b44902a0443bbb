//! Raw upstream payload shapes and their decoding.
//!
//! Records keep loosely-typed fields as `serde_json::Value` so a single odd
//! field never fails the whole page; the normalizer coerces them one at a
//! time through [`super::coerce`].

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::coerce;
use super::error::{Diagnostic, NormalizeError, Reconciled, RecordSource};
use super::market::{Quote, TokenId};

// ────────────────────────────────────────────
// Page decoding
// ────────────────────────────────────────────

/// Decode a page of records.
///
/// Accepts a bare array or an envelope object carrying the array under
/// `data` or `markets`. Rows that are not objects, or that serde rejects,
/// become `MalformedRecord` skip diagnostics.
pub fn decode_records<T: DeserializeOwned>(payload: Value, origin: RecordSource) -> Reconciled<Vec<T>> {
    let mut diagnostics = Vec::new();
    let rows = match payload {
        Value::Null => Vec::new(),
        Value::Array(rows) => rows,
        Value::Object(mut envelope) => match envelope.remove("data").or_else(|| envelope.remove("markets")) {
            Some(Value::Array(rows)) => rows,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                diagnostics.push(Diagnostic::skipped(
                    format!("{origin}-payload"),
                    NormalizeError::MalformedRecord {
                        origin,
                        detail: "envelope `data` is not an array".to_string(),
                    },
                ));
                Vec::new()
            }
        },
        _ => {
            diagnostics.push(Diagnostic::skipped(
                format!("{origin}-payload"),
                NormalizeError::MalformedRecord {
                    origin,
                    detail: "payload is neither an array nor an envelope object".to_string(),
                },
            ));
            Vec::new()
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        let identifier = row_identifier(&row).unwrap_or_else(|| format!("{origin}[{i}]"));
        if !row.is_object() {
            diagnostics.push(Diagnostic::skipped(
                identifier,
                NormalizeError::MalformedRecord {
                    origin,
                    detail: "row is not an object".to_string(),
                },
            ));
            continue;
        }
        match serde_json::from_value::<T>(row) {
            Ok(record) => records.push(record),
            Err(e) => diagnostics.push(Diagnostic::skipped(
                identifier,
                NormalizeError::MalformedRecord {
                    origin,
                    detail: e.to_string(),
                },
            )),
        }
    }

    Reconciled::new(records, diagnostics)
}

fn row_identifier(row: &Value) -> Option<String> {
    ["condition_id", "conditionId", "identifier", "id"]
        .iter()
        .find_map(|key| coerce::optional_string(row.get(*key)))
}

/// Market identifier under any of the keys upstream uses for it.
///
/// Each key is its own field, so a row carrying both spellings still
/// decodes instead of failing on a duplicate field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketKey {
    #[serde(default)]
    condition_id: Option<Value>,
    #[serde(default, rename = "conditionId")]
    condition_id_camel: Option<Value>,
    #[serde(default)]
    identifier: Option<Value>,
}

impl MarketKey {
    /// First usable identifier, the snake_case key preferred.
    pub fn value(&self) -> Option<&Value> {
        [&self.condition_id, &self.condition_id_camel, &self.identifier]
            .into_iter()
            .flatten()
            .find(|v| coerce::optional_string(Some(*v)).is_some())
    }
}

// ────────────────────────────────────────────
// Discovery (Gamma /markets)
// ────────────────────────────────────────────

/// One market from the discovery endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoveryRecord {
    #[serde(flatten)]
    pub condition_id: MarketKey,
    #[serde(default)]
    pub question: Option<Value>,
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub slug: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub active: Option<Value>,
    #[serde(default)]
    pub closed: Option<Value>,
}

// ────────────────────────────────────────────
// Tradable outcomes (CLOB /simplified-markets)
// ────────────────────────────────────────────

/// One market from the tradable-outcome endpoint.
///
/// Two shapes are seen upstream: the CLOB form with a `tokens` array of
/// `{token_id, outcome, price}` objects, and the Gamma form with parallel
/// `outcomes` / `clobTokenIds` / `outcomePrices` lists (each either an
/// array or a JSON-encoded string).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradableRecord {
    #[serde(flatten)]
    pub condition_id: MarketKey,
    #[serde(default)]
    pub tokens: Option<Value>,
    #[serde(default)]
    pub outcomes: Option<Value>,
    #[serde(default, alias = "clobTokenIds", alias = "token_identifiers")]
    pub token_ids: Option<Value>,
    #[serde(default, alias = "outcomePrices")]
    pub outcome_prices: Option<Value>,
    #[serde(default)]
    pub active: Option<Value>,
    #[serde(default)]
    pub closed: Option<Value>,
}

/// Positional outcome columns extracted from a tradable record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeColumns {
    pub labels: Vec<String>,
    pub token_ids: Vec<TokenId>,
    /// Empty when the record carried no prices.
    pub prices: Vec<Option<Decimal>>,
}

impl TradableRecord {
    /// Extract labels, token ids, and indicative prices.
    ///
    /// Lengths are not checked here; pairing is the normalizer's job.
    pub fn outcome_columns(&self) -> Result<OutcomeColumns, NormalizeError> {
        if matches!(self.tokens, Some(ref t) if !t.is_null()) {
            return self.token_columns();
        }

        let labels = required_items("outcome", coerce::string_list("outcomes", self.outcomes.as_ref())?)?;
        let token_ids = required_items(
            "token_id",
            coerce::string_list("clobTokenIds", self.token_ids.as_ref())?,
        )?;
        let prices = coerce::raw_list("outcomePrices", self.outcome_prices.as_ref())?
            .iter()
            .map(|p| coerce::price("outcomePrices", Some(p)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(OutcomeColumns {
            labels,
            token_ids,
            prices,
        })
    }

    fn token_columns(&self) -> Result<OutcomeColumns, NormalizeError> {
        let tokens = coerce::raw_list("tokens", self.tokens.as_ref())?;
        let mut columns = OutcomeColumns::default();
        let mut any_price = false;

        for token in &tokens {
            if !token.is_object() {
                return Err(NormalizeError::MalformedOutcomeList {
                    field: "tokens",
                    detail: "token entry is not an object".to_string(),
                });
            }
            let label = ["outcome", "name", "title"]
                .iter()
                .find_map(|key| coerce::optional_string(token.get(*key)))
                .ok_or(NormalizeError::MissingRequiredField { field: "outcome" })?;
            let token_id = coerce::required_string("token_id", token.get("token_id"))?;
            let price = coerce::price("price", token.get("price"))?;
            any_price |= price.is_some();

            columns.labels.push(label);
            columns.token_ids.push(token_id);
            columns.prices.push(price);
        }

        if !any_price {
            columns.prices.clear();
        }
        Ok(columns)
    }
}

/// Trim every item of a positional column, rejecting blanks.
fn required_items(field: &'static str, items: Vec<String>) -> Result<Vec<String>, NormalizeError> {
    items
        .into_iter()
        .map(|item| {
            let trimmed = item.trim();
            if trimmed.is_empty() {
                return Err(NormalizeError::MissingRequiredField { field });
            }
            Ok(trimmed.to_string())
        })
        .collect()
}

// ────────────────────────────────────────────
// Books (CLOB /book, /prices)
// ────────────────────────────────────────────

/// A token's book as reported upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookPayload {
    /// Upstream has no book for the token. Not an error.
    NotFound,
    /// Top of book, either side possibly empty.
    Found {
        best_bid: Option<Quote>,
        best_ask: Option<Quote>,
    },
}

impl BookPayload {
    /// Decode a book payload, collecting per-field problems.
    ///
    /// Understands three shapes:
    /// - `{"error": ...}` → [`BookPayload::NotFound`]
    /// - `{"best_bid": "0.48", "best_ask": 0.52}` (sizes optional)
    /// - `{"bids": [{"price", "size"}], "asks": [...]}`
    ///
    /// A bad field leaves that side unset and is reported in the second
    /// tuple element; it never turns the whole book into an error.
    pub fn from_value(value: &Value) -> (Self, Vec<NormalizeError>) {
        let Some(obj) = value.as_object() else {
            if value.is_null() {
                return (Self::NotFound, Vec::new());
            }
            return (
                Self::Found {
                    best_bid: None,
                    best_ask: None,
                },
                vec![NormalizeError::MalformedRecord {
                    origin: RecordSource::Book,
                    detail: "book payload is not an object".to_string(),
                }],
            );
        };
        if obj.contains_key("error") {
            return (Self::NotFound, Vec::new());
        }

        let mut issues = Vec::new();
        let best_bid = side_from_value(value, Side::Bid, &mut issues);
        let best_ask = side_from_value(value, Side::Ask, &mut issues);
        (Self::Found { best_bid, best_ask }, issues)
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

#[derive(Clone, Copy)]
enum Side {
    Bid,
    Ask,
}

impl Side {
    const fn keys(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Bid => ("best_bid", "best_bid_size", "bids"),
            Self::Ask => ("best_ask", "best_ask_size", "asks"),
        }
    }

    const fn quote(self, price: Decimal, size: Option<Decimal>) -> Quote {
        match self {
            Self::Bid => Quote::bid(price, size),
            Self::Ask => Quote::ask(price, size),
        }
    }

    /// `true` when `candidate` is a better price than `current` for this side.
    fn improves(self, candidate: Decimal, current: Decimal) -> bool {
        match self {
            Self::Bid => candidate > current,
            Self::Ask => candidate < current,
        }
    }
}

fn side_from_value(book: &Value, side: Side, issues: &mut Vec<NormalizeError>) -> Option<Quote> {
    let (best_key, size_key, levels_key) = side.keys();

    if book.get(best_key).is_some_and(|v| !v.is_null()) {
        let price = match coerce::price(best_key, book.get(best_key)) {
            Ok(p) => p?,
            Err(e) => {
                issues.push(e);
                return None;
            }
        };
        let size = coerce::size(size_key, book.get(size_key)).unwrap_or_else(|e| {
            issues.push(e);
            None
        });
        return Some(side.quote(price, size));
    }

    let levels = match coerce::raw_list(levels_key, book.get(levels_key)) {
        Ok(levels) => levels,
        Err(e) => {
            issues.push(e);
            return None;
        }
    };

    let mut best: Option<Quote> = None;
    for level in &levels {
        let price = match coerce::required_price("price", level.get("price")) {
            Ok(p) => p,
            Err(e) => {
                issues.push(e);
                continue;
            }
        };
        let size = coerce::size("size", level.get("size")).unwrap_or_else(|e| {
            issues.push(e);
            None
        });
        if best.is_none_or(|b| side.improves(price, b.price)) {
            best = Some(side.quote(price, size));
        }
    }
    best
}

// ────────────────────────────────────────────
// Trades (Data-API /trades)
// ────────────────────────────────────────────

/// A single executed trade on one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradePrint {
    pub token_id: TokenId,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RawTrade {
    #[serde(default, alias = "asset", alias = "asset_id", alias = "token_identifier")]
    token_id: Option<Value>,
    #[serde(flatten)]
    condition_id: MarketKey,
    #[serde(default)]
    price: Option<Value>,
    #[serde(default, alias = "match_time")]
    timestamp: Option<Value>,
}

/// Decode a trade-history page into prints.
///
/// Rows with a missing token, price, or timestamp are skipped with a
/// diagnostic keyed by the row's market when known.
pub fn decode_trades(payload: Value) -> Reconciled<Vec<TradePrint>> {
    let (rows, mut diagnostics) = decode_records::<RawTrade>(payload, RecordSource::Trade).into_parts();
    let mut prints = Vec::with_capacity(rows.len());

    for (i, row) in rows.into_iter().enumerate() {
        let identifier =
            coerce::optional_string(row.condition_id.value()).unwrap_or_else(|| format!("trade[{i}]"));
        let decoded = (|| {
            let token_id = coerce::required_string("asset", row.token_id.as_ref())?;
            let price = coerce::required_price("price", row.price.as_ref())?;
            let timestamp = timestamp("timestamp", row.timestamp.as_ref())?;
            Ok::<_, NormalizeError>(TradePrint {
                token_id,
                price,
                timestamp,
            })
        })();
        match decoded {
            Ok(print) => prints.push(print),
            Err(e) => diagnostics.push(Diagnostic::skipped(identifier, e)),
        }
    }

    Reconciled::new(prints, diagnostics)
}

/// Unix seconds (or milliseconds past 1e12), numeric string, or RFC 3339.
fn timestamp(field: &'static str, value: Option<&Value>) -> Result<DateTime<Utc>, NormalizeError> {
    if let Some(Value::String(s)) = value {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s.trim()) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    let raw = coerce::required_decimal(field, value)?;
    let secs = if raw > Decimal::from(1_000_000_000_000_i64) {
        raw / Decimal::ONE_THOUSAND
    } else {
        raw
    };
    secs.trunc()
        .to_i64()
        .and_then(|s| Utc.timestamp_opt(s, 0).single())
        .ok_or_else(|| NormalizeError::invalid_numeric(field, format!("timestamp {raw} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_decode_bare_array_and_envelope() {
        let page = json!([{"conditionId": "0x1"}, {"conditionId": "0x2"}]);
        let out = decode_records::<DiscoveryRecord>(page, RecordSource::Discovery);
        assert_eq!(out.value.len(), 2);
        assert!(out.diagnostics.is_empty());

        let page = json!({"data": [{"condition_id": "0x1"}], "next_cursor": "LTE="});
        let out = decode_records::<TradableRecord>(page, RecordSource::Tradable);
        assert_eq!(out.value.len(), 1);
    }

    #[test]
    fn test_decode_non_object_row_is_diagnostic() {
        let page = json!([{"conditionId": "0x1"}, "garbage", 7]);
        let out = decode_records::<DiscoveryRecord>(page, RecordSource::Discovery);
        assert_eq!(out.value.len(), 1);
        assert_eq!(out.diagnostics.len(), 2);
        assert_eq!(out.diagnostics[0].identifier, "discovery[1]");
    }

    #[test]
    fn test_decode_scalar_payload_is_diagnostic() {
        let out = decode_records::<DiscoveryRecord>(json!("oops"), RecordSource::Discovery);
        assert!(out.value.is_empty());
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn test_columns_from_clob_tokens() {
        let record: TradableRecord = serde_json::from_value(json!({
            "condition_id": "0x1",
            "tokens": [
                {"token_id": "111", "outcome": "Yes", "price": 0.42},
                {"token_id": "222", "outcome": "No", "price": "0.58"}
            ]
        }))
        .unwrap();
        let cols = record.outcome_columns().unwrap();
        assert_eq!(cols.labels, vec!["Yes", "No"]);
        assert_eq!(cols.token_ids, vec!["111", "222"]);
        assert_eq!(cols.prices, vec![Some(dec!(0.42)), Some(dec!(0.58))]);
    }

    #[test]
    fn test_columns_from_clob_tokens_without_prices() {
        let record: TradableRecord = serde_json::from_value(json!({
            "condition_id": "0x1",
            "tokens": [{"token_id": "111", "name": "Yes"}, {"token_id": "222", "name": "No"}]
        }))
        .unwrap();
        let cols = record.outcome_columns().unwrap();
        assert_eq!(cols.labels, vec!["Yes", "No"]);
        assert!(cols.prices.is_empty());
    }

    #[test]
    fn test_columns_from_gamma_encoded_strings() {
        let record: TradableRecord = serde_json::from_value(json!({
            "conditionId": "0x1",
            "outcomes": "[\"Yes\", \"No\"]",
            "clobTokenIds": "[\"111\", \"222\"]",
            "outcomePrices": "[\"0.4\", \"0.6\"]"
        }))
        .unwrap();
        let cols = record.outcome_columns().unwrap();
        assert_eq!(cols.token_ids, vec!["111", "222"]);
        assert_eq!(cols.prices, vec![Some(dec!(0.4)), Some(dec!(0.6))]);
    }

    #[test]
    fn test_columns_trim_labels_and_tokens() {
        let record: TradableRecord = serde_json::from_value(json!({
            "conditionId": "0x1",
            "outcomes": [" Yes ", "No"],
            "clobTokenIds": ["1", 2]
        }))
        .unwrap();
        let cols = record.outcome_columns().unwrap();
        assert_eq!(cols.labels, vec!["Yes", "No"]);
        assert_eq!(cols.token_ids, vec!["1", "2"]);
    }

    #[test]
    fn test_decode_row_with_both_identifier_keys() {
        let page = json!([
            {"condition_id": "0x1", "conditionId": "0x1"},
            {"conditionId": "0x2", "identifier": "0x2-alt"},
            {"condition_id": "", "conditionId": "0x3"}
        ]);
        let out = decode_records::<TradableRecord>(page, RecordSource::Tradable);
        assert!(out.diagnostics.is_empty());
        let ids: Vec<_> = out
            .value
            .iter()
            .map(|r| coerce::optional_string(r.condition_id.value()))
            .collect();
        assert_eq!(
            ids,
            vec![Some("0x1".to_string()), Some("0x2".to_string()), Some("0x3".to_string())]
        );
    }

    #[test]
    fn test_columns_bad_price_fails() {
        let record: TradableRecord = serde_json::from_value(json!({
            "conditionId": "0x1",
            "outcomes": ["Yes", "No"],
            "clobTokenIds": ["1", "2"],
            "outcomePrices": ["0.4", "abc"]
        }))
        .unwrap();
        assert!(matches!(
            record.outcome_columns().unwrap_err(),
            NormalizeError::InvalidNumericField { field: "outcomePrices", .. }
        ));
    }

    #[test]
    fn test_book_not_found_sentinel() {
        let (book, issues) = BookPayload::from_value(&json!({"error": "not_found", "token_id": "1"}));
        assert!(book.is_not_found());
        assert!(issues.is_empty());
    }

    #[test]
    fn test_book_best_fields_number_or_string() {
        let (book, issues) = BookPayload::from_value(&json!({"best_bid": "0.48", "best_ask": 0.52}));
        assert!(issues.is_empty());
        assert_eq!(
            book,
            BookPayload::Found {
                best_bid: Some(Quote::bid(dec!(0.48), None)),
                best_ask: Some(Quote::ask(dec!(0.52), None)),
            }
        );
    }

    #[test]
    fn test_book_levels_pick_best_regardless_of_order() {
        let (book, issues) = BookPayload::from_value(&json!({
            "bids": [{"price": "0.30", "size": "10"}, {"price": "0.45", "size": "5"}, {"price": "0.40", "size": "1"}],
            "asks": [{"price": "0.60", "size": "3"}, {"price": "0.55", "size": "7"}]
        }));
        assert!(issues.is_empty());
        assert_eq!(
            book,
            BookPayload::Found {
                best_bid: Some(Quote::bid(dec!(0.45), Some(dec!(5)))),
                best_ask: Some(Quote::ask(dec!(0.55), Some(dec!(7)))),
            }
        );
    }

    #[test]
    fn test_book_bad_level_is_skipped_and_reported() {
        let (book, issues) = BookPayload::from_value(&json!({
            "bids": [{"price": "x", "size": "10"}, {"price": "0.41", "size": "2"}],
            "asks": []
        }));
        assert_eq!(issues.len(), 1);
        assert_eq!(
            book,
            BookPayload::Found {
                best_bid: Some(Quote::bid(dec!(0.41), Some(dec!(2)))),
                best_ask: None,
            }
        );
    }

    #[test]
    fn test_book_out_of_range_best_degrades_side() {
        let (book, issues) = BookPayload::from_value(&json!({"best_bid": "1.4", "best_ask": "0.5"}));
        assert_eq!(issues.len(), 1);
        assert_eq!(
            book,
            BookPayload::Found {
                best_bid: None,
                best_ask: Some(Quote::ask(dec!(0.5), None)),
            }
        );
    }

    #[test]
    fn test_decode_trades_shapes() {
        let out = decode_trades(json!([
            {"asset": "111", "conditionId": "0x1", "price": 0.47, "timestamp": 1_700_000_000},
            {"asset": "222", "conditionId": "0x1", "price": "0.53", "timestamp": "2024-01-01T00:00:00Z"},
            {"asset": "333", "conditionId": "0x1", "price": "0.5", "timestamp": 1_700_000_000_123_i64},
            {"conditionId": "0x2", "price": 0.5, "timestamp": 1}
        ]));
        assert_eq!(out.value.len(), 3);
        assert_eq!(out.value[0].timestamp.timestamp(), 1_700_000_000);
        assert_eq!(out.value[2].timestamp.timestamp(), 1_700_000_000);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].identifier, "0x2");
    }
}
