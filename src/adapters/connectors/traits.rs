//! Source connector trait definition
//!
//! This module defines the `SourceConnector` trait that abstracts
//! platform-specific storefront APIs. Connectors return raw, platform-shaped
//! JSON records; normalization into canonical entities happens downstream in
//! the transformer, so the pipeline core never sees platform dialects.

use crate::domain::result::Result;
use crate::domain::source::SourceType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Trait for storefront platform connectors
///
/// All fetch methods take an optional `since` watermark; `None` requests a
/// full extraction, `Some(ts)` requests records created or updated after the
/// timestamp. Implementations own pagination, authentication, and retry
/// behavior internally.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Which platform this connector talks to
    fn source_type(&self) -> SourceType;

    /// Verify the source is reachable and credentials are accepted
    ///
    /// # Errors
    ///
    /// Returns an error when the source is unreachable or rejects the
    /// configured credentials; the pipeline treats this as fatal for the
    /// source's run.
    async fn test_connection(&self) -> Result<()>;

    /// Fetch raw customer records, optionally bounded by a watermark
    async fn fetch_customers(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Value>>;

    /// Fetch raw product records, optionally bounded by a watermark
    async fn fetch_products(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Value>>;

    /// Fetch raw order records, optionally bounded by a watermark
    async fn fetch_orders(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Value>>;
}
