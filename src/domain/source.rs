//! Source platform identification
//!
//! Every record Tidemark touches is tagged with the storefront platform it
//! came from. Uniqueness of customers, products, and orders is always scoped
//! to (source_id, source_type).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storefront platform a record originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Shopify Admin REST API
    Shopify,
    /// WooCommerce REST API v3
    #[serde(rename = "woocommerce")]
    WooCommerce,
    /// Commercetools HTTP API
    Commercetools,
}

impl SourceType {
    /// All platforms Tidemark knows how to talk to
    pub const ALL: [SourceType; 3] = [
        SourceType::Shopify,
        SourceType::WooCommerce,
        SourceType::Commercetools,
    ];

    /// Returns the canonical lowercase name used in config files and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Shopify => "shopify",
            SourceType::WooCommerce => "woocommerce",
            SourceType::Commercetools => "commercetools",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shopify" => Ok(SourceType::Shopify),
            "woocommerce" | "woo" => Ok(SourceType::WooCommerce),
            "commercetools" => Ok(SourceType::Commercetools),
            other => Err(format!(
                "Unknown source type '{}'. Must be one of: shopify, woocommerce, commercetools",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_roundtrip() {
        for source in SourceType::ALL {
            let parsed = SourceType::from_str(source.as_str()).unwrap();
            assert_eq!(parsed, source);
        }
    }

    #[test]
    fn test_source_type_from_str_invalid() {
        assert!(SourceType::from_str("magento").is_err());
    }

    #[test]
    fn test_source_type_serde_lowercase() {
        let json = serde_json::to_string(&SourceType::WooCommerce).unwrap();
        assert_eq!(json, "\"woocommerce\"");

        let parsed: SourceType = serde_json::from_str("\"shopify\"").unwrap();
        assert_eq!(parsed, SourceType::Shopify);
    }
}
