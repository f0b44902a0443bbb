//! Field coercion for loosely-typed upstream JSON.
//!
//! The Polymarket endpoints disagree on shapes: prices arrive as numbers or
//! as numeric strings, outcome lists arrive as arrays or as JSON-encoded
//! strings, identifiers are sometimes integers. Every function here turns
//! one raw field into one canonical scalar or fails with a typed
//! [`NormalizeError`]. Downstream code only ever sees the canonical form.
//!
//! Coercion is strict: a string that does not parse as a finite decimal is
//! an error, never a silent zero.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::error::NormalizeError;

/// Optional decimal: absent or `null` is `Ok(None)`.
pub fn decimal(field: &'static str, value: Option<&Value>) -> Result<Option<Decimal>, NormalizeError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => parse_decimal(field, &n.to_string()).map(Some),
        Some(Value::String(s)) => parse_decimal(field, s).map(Some),
        Some(other) => Err(NormalizeError::invalid_numeric(
            field,
            format!("expected number or numeric string, got {}", kind_of(other)),
        )),
    }
}

/// Required decimal: absent or `null` is `MissingRequiredField`.
pub fn required_decimal(field: &'static str, value: Option<&Value>) -> Result<Decimal, NormalizeError> {
    decimal(field, value)?.ok_or(NormalizeError::MissingRequiredField { field })
}

/// Optional probability price, must lie in `[0, 1]`.
pub fn price(field: &'static str, value: Option<&Value>) -> Result<Option<Decimal>, NormalizeError> {
    decimal(field, value)?.map(|p| check_unit_interval(field, p)).transpose()
}

/// Required probability price, must lie in `[0, 1]`.
pub fn required_price(field: &'static str, value: Option<&Value>) -> Result<Decimal, NormalizeError> {
    check_unit_interval(field, required_decimal(field, value)?)
}

/// Optional size, must be non-negative.
pub fn size(field: &'static str, value: Option<&Value>) -> Result<Option<Decimal>, NormalizeError> {
    match decimal(field, value)? {
        Some(s) if s < Decimal::ZERO => Err(NormalizeError::invalid_numeric(
            field,
            format!("size must be non-negative, got {s}"),
        )),
        other => Ok(other),
    }
}

/// Range-check an already parsed price.
pub fn check_unit_interval(field: &'static str, p: Decimal) -> Result<Decimal, NormalizeError> {
    if p < Decimal::ZERO || p > Decimal::ONE {
        return Err(NormalizeError::invalid_numeric(
            field,
            format!("price {p} outside [0, 1]"),
        ));
    }
    Ok(p)
}

fn parse_decimal(field: &'static str, raw: &str) -> Result<Decimal, NormalizeError> {
    let trimmed = raw.trim();
    // rust_decimal rejects NaN/inf, which keeps every accepted value finite.
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map(|d| d.normalize())
        .map_err(|_| NormalizeError::invalid_numeric(field, format!("not a number: {raw:?}")))
}

/// Required identifier or label: string (or integer rendered as text),
/// trimmed and non-empty.
pub fn required_string(field: &'static str, value: Option<&Value>) -> Result<String, NormalizeError> {
    optional_string(value).ok_or(NormalizeError::MissingRequiredField { field })
}

/// Optional text. Empty strings and non-textual values count as absent.
pub fn optional_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Optional flag. Accepts booleans and the strings `"true"` / `"false"`.
pub fn optional_bool(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// The two wire forms an ordered list field can take.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawList {
    /// `["Yes", "No"]`
    Sequence(Vec<Value>),
    /// `"[\"Yes\", \"No\"]"`
    Encoded(String),
}

/// Ordered list of strings from either an array or a JSON-encoded array.
///
/// Absent or `null` yields an empty list. Items may be strings or numbers
/// (token ids are frequently large integers). Order is preserved because
/// labels, token ids, and prices are paired positionally.
pub fn string_list(field: &'static str, value: Option<&Value>) -> Result<Vec<String>, NormalizeError> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(v) => decode_list(field, v)?,
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(NormalizeError::malformed_list(
                field,
                format!("item {i} is {}, expected string", kind_of(&other)),
            )),
        })
        .collect()
}

/// Ordered list of raw items, decoding the encoded-string form if needed.
pub fn raw_list(field: &'static str, value: Option<&Value>) -> Result<Vec<Value>, NormalizeError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(v) => decode_list(field, v),
    }
}

fn decode_list(field: &'static str, value: &Value) -> Result<Vec<Value>, NormalizeError> {
    match RawList::deserialize(value) {
        Ok(RawList::Sequence(items)) => Ok(items),
        Ok(RawList::Encoded(text)) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(other) => Err(NormalizeError::malformed_list(
                field,
                format!("encoded value is {}, expected array", kind_of(&other)),
            )),
            Err(e) => Err(NormalizeError::malformed_list(field, format!("invalid JSON: {e}"))),
        },
        Err(_) => Err(NormalizeError::malformed_list(
            field,
            format!("expected array or encoded array, got {}", kind_of(value)),
        )),
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_numeric_string_coerces() {
        let v = json!("0.37");
        assert_eq!(decimal("price", Some(&v)).unwrap(), Some(dec!(0.37)));
    }

    #[test]
    fn test_json_number_coerces_exactly() {
        let v = json!(0.37);
        assert_eq!(price("price", Some(&v)).unwrap(), Some(dec!(0.37)));
        let v = json!(1);
        assert_eq!(price("price", Some(&v)).unwrap(), Some(Decimal::ONE));
    }

    #[test]
    fn test_scientific_notation_accepted() {
        let v = json!("5e-3");
        assert_eq!(decimal("price", Some(&v)).unwrap(), Some(dec!(0.005)));
    }

    #[test]
    fn test_non_numeric_string_fails() {
        let v = json!("abc");
        let err = decimal("price", Some(&v)).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidNumericField { field: "price", .. }));
    }

    #[test]
    fn test_nan_string_fails() {
        let v = json!("NaN");
        assert!(decimal("price", Some(&v)).is_err());
        let v = json!("inf");
        assert!(decimal("price", Some(&v)).is_err());
    }

    #[test]
    fn test_null_optional_is_unset() {
        assert_eq!(decimal("price", Some(&Value::Null)).unwrap(), None);
        assert_eq!(price("price", None).unwrap(), None);
    }

    #[test]
    fn test_null_required_is_missing() {
        let err = required_price("price", Some(&Value::Null)).unwrap_err();
        assert_eq!(err, NormalizeError::MissingRequiredField { field: "price" });
    }

    #[test]
    fn test_price_out_of_range_is_failure_not_clamp() {
        let v = json!("1.02");
        assert!(price("best_ask", Some(&v)).is_err());
        let v = json!(-0.1);
        assert!(price("best_ask", Some(&v)).is_err());
    }

    #[test]
    fn test_price_bounds_inclusive() {
        assert_eq!(price("p", Some(&json!("0"))).unwrap(), Some(Decimal::ZERO));
        assert_eq!(price("p", Some(&json!("1.000"))).unwrap(), Some(Decimal::ONE));
    }

    #[test]
    fn test_boolean_is_not_numeric() {
        assert!(decimal("price", Some(&json!(true))).is_err());
    }

    #[test]
    fn test_negative_size_fails() {
        assert!(size("size", Some(&json!("-5"))).is_err());
        assert_eq!(size("size", Some(&json!("12.5"))).unwrap(), Some(dec!(12.5)));
    }

    #[test]
    fn test_list_from_array() {
        let v = json!(["Yes", "No"]);
        assert_eq!(string_list("outcomes", Some(&v)).unwrap(), vec!["Yes", "No"]);
    }

    #[test]
    fn test_list_from_encoded_string_keeps_order() {
        let v = json!("[\"Trump\", \"Harris\", \"Other\"]");
        assert_eq!(
            string_list("outcomes", Some(&v)).unwrap(),
            vec!["Trump", "Harris", "Other"]
        );
    }

    #[test]
    fn test_list_numeric_items_rendered() {
        let v = json!([123, "456"]);
        assert_eq!(string_list("clobTokenIds", Some(&v)).unwrap(), vec!["123", "456"]);
    }

    #[test]
    fn test_list_malformed_string() {
        let v = json!("Yes, No");
        let err = string_list("outcomes", Some(&v)).unwrap_err();
        assert!(matches!(err, NormalizeError::MalformedOutcomeList { .. }));
    }

    #[test]
    fn test_list_encoded_object_rejected() {
        let v = json!("{\"a\": 1}");
        assert!(string_list("outcomes", Some(&v)).is_err());
    }

    #[test]
    fn test_list_wrong_type_rejected() {
        let v = json!(42);
        assert!(matches!(
            string_list("outcomes", Some(&v)).unwrap_err(),
            NormalizeError::MalformedOutcomeList { .. }
        ));
    }

    #[test]
    fn test_list_nested_item_rejected() {
        let v = json!([["Yes"], "No"]);
        assert!(string_list("outcomes", Some(&v)).is_err());
    }

    #[test]
    fn test_list_absent_is_empty() {
        assert!(string_list("outcomes", None).unwrap().is_empty());
    }

    #[test]
    fn test_required_string_trims_and_rejects_empty() {
        assert_eq!(required_string("id", Some(&json!("  0xabc "))).unwrap(), "0xabc");
        assert!(required_string("id", Some(&json!("   "))).is_err());
        assert_eq!(required_string("id", Some(&json!(512))).unwrap(), "512");
        assert!(required_string("id", Some(&json!({"nested": true}))).is_err());
    }

    #[test]
    fn test_optional_bool_forms() {
        assert_eq!(optional_bool(Some(&json!(true))), Some(true));
        assert_eq!(optional_bool(Some(&json!("FALSE"))), Some(false));
        assert_eq!(optional_bool(Some(&json!("maybe"))), None);
        assert_eq!(optional_bool(None), None);
    }
}
