//! Decimal amounts carried in upstream JSON
//!
//! Platforms send amounts as strings or numbers, sometimes in scientific
//! notation. A field that is present but unparseable is a `Decode` error,
//! never a silent `None`.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{TradingError, TradingResult};

/// Parse a decimal carried as either a JSON string or number
pub fn decimal_from_value(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)).ok()
        }
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        _ => None,
    }
}

/// Optional amount; absent or `null` is `None`
pub fn optional_decimal(value: Option<&serde_json::Value>, what: &str) -> TradingResult<Option<Decimal>> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => decimal_from_value(v)
            .map(Some)
            .ok_or_else(|| TradingError::decode(format!("Invalid {}: {}", what, v))),
    }
}

pub fn required_decimal(value: Option<&serde_json::Value>, what: &str) -> TradingResult<Decimal> {
    optional_decimal(value, what)?.ok_or_else(|| TradingError::decode(format!("Missing {}", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_strings_and_numbers() {
        assert_eq!(decimal_from_value(&json!("12.5")), Some(dec!(12.5)));
        assert_eq!(decimal_from_value(&json!(" 3 ")), Some(dec!(3)));
        assert_eq!(decimal_from_value(&json!(0.25)), Some(dec!(0.25)));
        assert_eq!(decimal_from_value(&json!(1e-7)), Some(dec!(0.0000001)));
        assert_eq!(decimal_from_value(&json!(true)), None);
    }

    #[test]
    fn test_optional_rejects_garbage() {
        assert_eq!(optional_decimal(None, "volume").unwrap(), None);
        assert_eq!(optional_decimal(Some(&json!(null)), "volume").unwrap(), None);
        assert_eq!(optional_decimal(Some(&json!("7")), "volume").unwrap(), Some(dec!(7)));
        assert!(matches!(
            optional_decimal(Some(&json!("lots")), "volume"),
            Err(TradingError::Decode(_))
        ));
    }

    #[test]
    fn test_required_needs_a_value() {
        assert!(matches!(required_decimal(None, "shares"), Err(TradingError::Decode(_))));
        assert_eq!(required_decimal(Some(&json!(2)), "shares").unwrap(), dec!(2));
    }
}
