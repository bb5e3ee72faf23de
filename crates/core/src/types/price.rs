//! Exact money parsing.
//!
//! Money fields arrive from the API as JSON numbers (occasionally as
//! numeric strings). Going through `f64` would corrupt amounts like
//! `0.1 + 0.2`, so numbers are parsed from their decimal literal straight
//! into a [`Decimal`].

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

/// Parse a JSON value holding a money amount into a [`Decimal`].
///
/// Accepts JSON numbers and numeric strings. Returns `None` for anything
/// else, including `null`.
#[must_use]
pub fn json_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_literal(&n.to_string()),
        Value::String(s) => parse_literal(s.trim()),
        _ => None,
    }
}

/// Like [`json_decimal`], defaulting to zero for missing or non-numeric
/// values.
#[must_use]
pub fn json_decimal_or_zero(value: Option<&Value>) -> Decimal {
    value.and_then(json_decimal).unwrap_or(Decimal::ZERO)
}

fn parse_literal(literal: &str) -> Option<Decimal> {
    // serde_json renders some floats in scientific notation
    Decimal::from_str(literal)
        .or_else(|_| Decimal::from_scientific(literal))
        .ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer() {
        assert_eq!(json_decimal(&json!(30)), Some(Decimal::new(30, 0)));
    }

    #[test]
    fn test_fractional_is_exact() {
        assert_eq!(json_decimal(&json!(29.99)), Some(Decimal::new(2999, 2)));
    }

    #[test]
    fn test_numeric_string() {
        assert_eq!(json_decimal(&json!("12.50")), Some(Decimal::new(1250, 2)));
    }

    #[test]
    fn test_non_numeric() {
        assert_eq!(json_decimal(&json!("a dozen")), None);
        assert_eq!(json_decimal(&json!(null)), None);
        assert_eq!(json_decimal(&json!({"amount": 1})), None);
    }

    #[test]
    fn test_or_zero() {
        assert_eq!(json_decimal_or_zero(None), Decimal::ZERO);
        assert_eq!(
            json_decimal_or_zero(Some(&json!(5))),
            Decimal::new(5, 0)
        );
    }
}
