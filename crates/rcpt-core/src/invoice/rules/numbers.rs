//! Locale-tolerant number parsing.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use super::patterns::NUMBER;

/// Parse a JSON value as a decimal number.
///
/// Numbers convert directly; strings go through [`parse_number_str`].
/// Anything else is `None`.
pub fn parse_number(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(Decimal::from(i));
            }
            if let Some(u) = n.as_u64() {
                return Some(Decimal::from(u));
            }
            // Shortest round-trip text of the float, so 0.1 stays 0.1
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => parse_number_str(s),
        _ => None,
    }
}

/// Parse a printed amount such as `"฿1,234.50"` or `"1200 THB (incl. VAT)"`.
///
/// The first numeric token wins and thousands commas are dropped, so currency
/// prefixes and trailing annotations (`"Rs. 500"`, `"1,080.00 net."`) do not
/// leak into the value. No digits at all yields `None`.
pub fn parse_number_str(s: &str) -> Option<Decimal> {
    let token = NUMBER.find(s)?;
    let cleaned = token.as_str().replace(',', "");
    Decimal::from_str(&cleaned).ok()
}

/// Parse an optional JSON value, treating absence as `None`.
pub fn parse_optional(value: Option<&Value>) -> Option<Decimal> {
    value.and_then(parse_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse_number(&json!(1200)), Some(dec("1200")));
        assert_eq!(parse_number(&json!(-120)), Some(dec("-120")));
        assert_eq!(parse_number(&json!(0.1)), Some(dec("0.1")));
        assert_eq!(parse_number(&json!(1080.75)), Some(dec("1080.75")));
    }

    #[test]
    fn test_formatted_strings() {
        assert_eq!(parse_number(&json!("1,234.50")), Some(dec("1234.50")));
        assert_eq!(parse_number(&json!("฿ 99.00")), Some(dec("99")));
        assert_eq!(parse_number(&json!("-50 THB")), Some(dec("-50")));
        assert_eq!(parse_number(&json!("1200 บาท (รวม VAT)")), Some(dec("1200")));
    }

    #[test]
    fn test_dotted_annotations() {
        assert_eq!(parse_number_str("1,200.00 (incl. VAT)"), Some(dec("1200")));
        assert_eq!(parse_number_str("฿1,080.00 net."), Some(dec("1080")));
        assert_eq!(parse_number_str("Rs. 500"), Some(dec("500")));
        assert_eq!(parse_number_str("12. THB"), Some(dec("12")));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_number(&json!("")), None);
        assert_eq!(parse_number(&json!("n/a")), None);
        assert_eq!(parse_number(&json!("-")), None);
        assert_eq!(parse_number(&json!("Rs.")), None);
        assert_eq!(parse_number(&json!(true)), None);
        assert_eq!(parse_number(&json!([1])), None);
        assert_eq!(parse_optional(None), None);
    }
}
