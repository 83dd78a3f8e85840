//! Record normalization
//!
//! Maps raw, platform-specific JSON records into canonical entities. Each
//! platform dialect lives in its own submodule; this module holds the
//! dispatch functions and the shared JSON field helpers.
//!
//! Normalization is strict where it matters and lenient where platforms
//! disagree: a record without an id or a usable timestamp fails with a
//! normalization error (which aborts the whole run, by policy), while
//! optional fields and unknown status vocabularies degrade gracefully.

pub mod commercetools;
pub mod shopify;
pub mod woocommerce;

use crate::domain::entities::{Customer, Order, Product};
use crate::domain::errors::TidemarkError;
use crate::domain::result::Result;
use crate::domain::source::SourceType;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// Normalize a raw customer record from the given platform
pub fn normalize_customer(raw: &Value, source: SourceType) -> Result<Customer> {
    match source {
        SourceType::Shopify => shopify::customer(raw),
        SourceType::WooCommerce => woocommerce::customer(raw),
        SourceType::Commercetools => commercetools::customer(raw),
    }
}

/// Normalize a raw product record from the given platform
pub fn normalize_product(raw: &Value, source: SourceType) -> Result<Product> {
    match source {
        SourceType::Shopify => shopify::product(raw),
        SourceType::WooCommerce => woocommerce::product(raw),
        SourceType::Commercetools => commercetools::product(raw),
    }
}

/// Normalize a raw order record (including nested line items) from the
/// given platform
pub fn normalize_order(raw: &Value, source: SourceType) -> Result<Order> {
    match source {
        SourceType::Shopify => shopify::order(raw),
        SourceType::WooCommerce => woocommerce::order(raw),
        SourceType::Commercetools => commercetools::order(raw),
    }
}

// ---- shared field helpers ----

/// Record id, accepting both JSON numbers and strings
pub(crate) fn required_id(raw: &Value, key: &str) -> Result<String> {
    match raw.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(TidemarkError::normalization(
            format!("missing or empty '{key}'"),
            raw,
        )),
    }
}

/// Optional non-empty string field
pub(crate) fn opt_str(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Monetary amount that platforms serialize as either a number or a decimal
/// string. Missing and null are 0; a present but unparsable value fails.
pub(crate) fn money(raw: &Value, key: &str) -> Result<f64> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
            TidemarkError::normalization(format!("'{key}' is not a finite number"), raw)
        }),
        Some(Value::String(s)) => s.parse::<f64>().map_err(|_| {
            TidemarkError::normalization(format!("'{key}' is not a parsable amount: '{s}'"), raw)
        }),
        Some(_) => Err(TidemarkError::normalization(
            format!("'{key}' has unexpected type"),
            raw,
        )),
    }
}

/// Optional timestamp field. Accepts RFC 3339 and the timezone-less
/// `YYYY-MM-DDTHH:MM:SS` form some platforms emit (interpreted as UTC).
/// A present but unparsable value fails.
pub(crate) fn opt_timestamp(raw: &Value, key: &str) -> Result<Option<DateTime<Utc>>> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => parse_timestamp(s)
            .map(Some)
            .ok_or_else(|| {
                TidemarkError::normalization(format!("'{key}' is not a valid timestamp: '{s}'"), raw)
            }),
        Some(_) => Err(TidemarkError::normalization(
            format!("'{key}' has unexpected type"),
            raw,
        )),
    }
}

/// First present timestamp among `keys`; errors if none parse
pub(crate) fn first_timestamp(raw: &Value, keys: &[&str]) -> Result<DateTime<Utc>> {
    for key in keys {
        if let Some(ts) = opt_timestamp(raw, key)? {
            return Ok(ts);
        }
    }
    Err(TidemarkError::normalization(
        format!("none of the timestamp fields {keys:?} are present"),
        raw,
    ))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Unsigned count field, defaulting to 0
pub(crate) fn count(raw: &Value, key: &str) -> u32 {
    raw.get(key).and_then(Value::as_u64).unwrap_or(0) as u32
}

/// A localized string map like commercetools' `{"en": "...", "de": "..."}`:
/// prefer English, otherwise take any value
pub(crate) fn localized_str(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("en")
            .or_else(|| map.values().next())
            .and_then(Value::as_str)
            .map(String::from),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_id_accepts_numbers_and_strings() {
        assert_eq!(required_id(&json!({"id": 42}), "id").unwrap(), "42");
        assert_eq!(required_id(&json!({"id": "ab-1"}), "id").unwrap(), "ab-1");
    }

    #[test]
    fn test_required_id_rejects_missing_and_empty() {
        assert!(required_id(&json!({}), "id").is_err());
        assert!(required_id(&json!({"id": ""}), "id").is_err());
        assert!(required_id(&json!({"id": null}), "id").is_err());
    }

    #[test]
    fn test_money_parses_strings_and_numbers() {
        assert_eq!(money(&json!({"total": "19.95"}), "total").unwrap(), 19.95);
        assert_eq!(money(&json!({"total": 20}), "total").unwrap(), 20.0);
        assert_eq!(money(&json!({}), "total").unwrap(), 0.0);
        assert_eq!(money(&json!({"total": null}), "total").unwrap(), 0.0);
    }

    #[test]
    fn test_money_rejects_garbage() {
        assert!(money(&json!({"total": "nineteen"}), "total").is_err());
        assert!(money(&json!({"total": [1]}), "total").is_err());
    }

    #[test]
    fn test_timestamp_accepts_rfc3339_and_naive() {
        let rfc = opt_timestamp(&json!({"t": "2024-01-15T10:30:00Z"}), "t")
            .unwrap()
            .unwrap();
        assert_eq!(rfc.to_rfc3339(), "2024-01-15T10:30:00+00:00");

        let naive = opt_timestamp(&json!({"t": "2024-01-15T10:30:00"}), "t")
            .unwrap()
            .unwrap();
        assert_eq!(naive, rfc);
    }

    #[test]
    fn test_timestamp_rejects_garbage() {
        assert!(opt_timestamp(&json!({"t": "yesterday"}), "t").is_err());
    }

    #[test]
    fn test_first_timestamp_fallback_order() {
        let raw = json!({"created_at": "2024-01-01T00:00:00Z"});
        let ts = first_timestamp(&raw, &["processed_at", "created_at"]).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-01T00:00:00+00:00");

        assert!(first_timestamp(&json!({}), &["processed_at"]).is_err());
    }

    #[test]
    fn test_localized_str() {
        assert_eq!(
            localized_str(&json!({"en": "Shirt", "de": "Hemd"})).unwrap(),
            "Shirt"
        );
        assert_eq!(localized_str(&json!({"fr": "Chemise"})).unwrap(), "Chemise");
        assert_eq!(localized_str(&json!("Plain")).unwrap(), "Plain");
        assert!(localized_str(&json!(42)).is_none());
    }
}
