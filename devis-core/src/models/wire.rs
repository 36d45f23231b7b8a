//! Lenient decoding of values coming back from the proposal API.
//!
//! The API serialises decimals as JSON strings (`"1000.00"`), older records
//! may carry plain numbers, and booleans have been seen both as JSON booleans
//! and as the strings `"true"`/`"false"`. Everything here coerces into the
//! canonical Rust types and never fails on a malformed scalar: a value that
//! cannot be understood decodes as "absent".

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Normalizes user or wire input for decimal parsing.
///
/// Whitespace (including the non-breaking spaces used as French thousands
/// separators) is removed. A lone comma is a decimal separator (`"1,5"`);
/// when a dot is also present commas are thousands separators
/// (`"1,234.56"`).
fn normalize_decimal_input(s: &str) -> String {
    let compact: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}')
        .collect();
    if compact.contains('.') {
        compact.replace(',', "")
    } else {
        compact.replacen(',', ".", 1)
    }
}

/// Parses free text into a decimal. Blank or unparseable input yields `None`.
pub fn parse_decimal_text(s: &str) -> Option<Decimal> {
    let normalized = normalize_decimal_input(s);
    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .map_err(|e| tracing::warn!(input = %s, "invalid decimal: {}", e))
        .ok()
}

/// Size limits of a stored decimal column: digits in total and digits after
/// the point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalLimit {
    pub max_digits: u32,
    pub decimal_places: u32,
}

impl DecimalLimit {
    /// `ouvrage_cost`: up to 9 999 999 999.99.
    pub const COST: DecimalLimit = DecimalLimit {
        max_digits: 12,
        decimal_places: 2,
    };
    /// `trc_rate` and `do_rate`: up to 999.9999.
    pub const RATE: DecimalLimit = DecimalLimit {
        max_digits: 7,
        decimal_places: 4,
    };

    /// Whether `value` fits the column. Trailing zeros do not count.
    pub fn admits(
        &self,
        value: Decimal,
    ) -> bool {
        let value = value.normalize();
        if value.scale() > self.decimal_places {
            return false;
        }
        let whole_digits = self.max_digits - self.decimal_places;
        value.abs().trunc() < Decimal::from(10u64.pow(whole_digits))
    }
}

/// Coerces a JSON scalar into a decimal.
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal_text(&n.to_string()),
        Value::String(s) => parse_decimal_text(s),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Coerces a JSON scalar into a boolean: only `true` and a case-insensitive
/// `"true"` string count as set.
pub fn bool_from_value(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

pub fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(decimal_from_value))
}

pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().is_some_and(bool_from_value))
}

/// Text fields that the API may send as `null`.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

/// Parses the timestamp formats the API has been seen to emit.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%d/%m/%Y %H:%M"))
                .map(|naive| naive.and_utc())
                .ok()
        })
}

pub fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(parse_timestamp))
}

/// `ouvrage_destination` travels as `""` when unset.
pub mod destination {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::models::OuvrageDestination;

    pub fn serialize<S>(
        value: &Option<OuvrageDestination>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value.map(|d| d.as_str()).unwrap_or(""))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OuvrageDestination>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(code) => {
                let destination = OuvrageDestination::parse(code);
                if destination.is_none() {
                    tracing::warn!(code, "unknown ouvrage destination");
                }
                Ok(destination)
            }
        }
    }
}

/// History timestamps are pre-formatted by the API as `dd/mm/YYYY HH:MM`.
pub mod history_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%d/%m/%Y %H:%M";

    pub fn serialize<S>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid history timestamp '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_decimal_text_accepts_both_separators() {
        assert_eq!(parse_decimal_text("1,234.56"), Some(dec!(1234.56)));
        assert_eq!(parse_decimal_text("1,5"), Some(dec!(1.5)));
        assert_eq!(parse_decimal_text("150 000"), Some(dec!(150000)));
        assert_eq!(parse_decimal_text("  0.0125 "), Some(dec!(0.0125)));
    }

    #[test]
    fn parse_decimal_text_blank_and_garbage_are_none() {
        assert_eq!(parse_decimal_text(""), None);
        assert_eq!(parse_decimal_text("   "), None);
        assert_eq!(parse_decimal_text("abc"), None);
    }

    #[test]
    fn decimal_from_value_handles_strings_and_numbers() {
        assert_eq!(decimal_from_value(&json!("1000.00")), Some(dec!(1000.00)));
        assert_eq!(decimal_from_value(&json!(0.02)), Some(dec!(0.02)));
        assert_eq!(decimal_from_value(&json!(150000)), Some(dec!(150000)));
        assert_eq!(decimal_from_value(&Value::Null), None);
        assert_eq!(decimal_from_value(&json!(true)), None);
    }

    #[test]
    fn bool_from_value_accepts_string_forms() {
        assert!(bool_from_value(&json!(true)));
        assert!(bool_from_value(&json!("True")));
        assert!(!bool_from_value(&json!("false")));
        assert!(!bool_from_value(&json!("yes")));
        assert!(!bool_from_value(&json!(1)));
        assert!(!bool_from_value(&Value::Null));
    }

    #[test]
    fn decimal_limit_checks_whole_digits_and_places() {
        assert!(DecimalLimit::COST.admits(dec!(9999999999.99)));
        assert!(DecimalLimit::COST.admits(dec!(1500.000)));
        assert!(!DecimalLimit::COST.admits(dec!(10000000000)));
        assert!(!DecimalLimit::COST.admits(dec!(10.001)));
        assert!(!DecimalLimit::COST.admits(Decimal::MAX));

        assert!(DecimalLimit::RATE.admits(dec!(0.0125)));
        assert!(DecimalLimit::RATE.admits(dec!(999.9999)));
        assert!(!DecimalLimit::RATE.admits(dec!(1000)));
        assert!(!DecimalLimit::RATE.admits(dec!(0.00125)));
    }

    #[test]
    fn parse_timestamp_accepts_api_formats() {
        let iso = parse_timestamp("2025-05-20T10:15:00+02:00").unwrap();
        assert_eq!(iso.format("%H:%M").to_string(), "08:15");

        let history = parse_timestamp("20/05/2025 10:15").unwrap();
        assert_eq!(history.format("%Y-%m-%d %H:%M").to_string(), "2025-05-20 10:15");

        assert!(parse_timestamp("yesterday").is_none());
    }
}
