//! Monetary values travel and persist as decimal text ("28575.02").
//!
//! Provider payloads are inconsistent about whether amounts are JSON strings or
//! numbers, so the deserializers here accept both and keep the textual form.
//! Arithmetic happens on `Decimal` values obtained through [`parse_amount`].

use std::str::FromStr;

use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl TextOrNumber {
    fn into_text(self) -> String {
        match self {
            TextOrNumber::Text(text) => text,
            TextOrNumber::Number(number) => number.to_string(),
        }
    }
}

/// Deserializes a required monetary field into its decimal text.
pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    TextOrNumber::deserialize(deserializer).map(TextOrNumber::into_text)
}

/// Deserializes an optional monetary field; `null` stays `None`.
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<TextOrNumber>::deserialize(deserializer).map(|v| v.map(TextOrNumber::into_text))
}

/// Parses decimal text for computation.
///
/// Failures are not fatal: the value is logged and treated as zero.
pub fn parse_amount(text: &str) -> Decimal {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .unwrap_or_else(|e| {
            warn!("Could not parse monetary value '{}': {}. Using 0.", text, e);
            Decimal::ZERO
        })
}

/// Like [`parse_amount`], with a missing value counting as zero.
pub fn parse_optional_amount(text: Option<&str>) -> Decimal {
    text.map(parse_amount).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "deserialize")]
        amount: String,
        #[serde(default, deserialize_with = "deserialize_option")]
        running_balance: Option<String>,
    }

    #[test]
    fn test_accepts_text_and_numbers() {
        let from_text: Sample =
            serde_json::from_str(r#"{"amount":"-86.46","running_balance":"10.00"}"#).unwrap();
        assert_eq!(from_text.amount, "-86.46");
        assert_eq!(from_text.running_balance.as_deref(), Some("10.00"));

        let from_number: Sample = serde_json::from_str(r#"{"amount":12.5}"#).unwrap();
        assert_eq!(from_number.amount, "12.5");
        assert_eq!(from_number.running_balance, None);
    }

    #[test]
    fn test_null_optional_amount() {
        let sample: Sample =
            serde_json::from_str(r#"{"amount":"1","running_balance":null}"#).unwrap();
        assert_eq!(sample.running_balance, None);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("100.00"), dec!(100.00));
        assert_eq!(parse_amount(" -50.5 "), dec!(-50.5));
        assert_eq!(parse_amount("1e2"), dec!(100));
    }

    #[test]
    fn test_parse_failures_default_to_zero() {
        assert_eq!(parse_amount(""), Decimal::ZERO);
        assert_eq!(parse_amount("n/a"), Decimal::ZERO);
        assert_eq!(parse_optional_amount(None), Decimal::ZERO);
    }
}
