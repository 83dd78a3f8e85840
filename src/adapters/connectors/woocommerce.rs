//! WooCommerce connector
//!
//! Talks to the WooCommerce REST API v3 with consumer key/secret basic
//! auth. Incremental extraction uses the `modified_after` filter; pagination
//! is page-numbered and terminates on the first short page.

use super::traits::SourceConnector;
use super::{read_json, retry_request};
use crate::config::{RetryConfig, SourceConfig};
use crate::domain::errors::{ConnectorError, TidemarkError};
use crate::domain::result::Result;
use crate::domain::source::SourceType;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::time::Duration;

/// WooCommerce REST API v3 connector
pub struct WooCommerceConnector {
    base_url: String,
    auth_header: String,
    client: Client,
    page_size: usize,
    retry: RetryConfig,
}

impl WooCommerceConnector {
    /// Create a new WooCommerce connector from source configuration
    pub fn new(config: &SourceConfig, page_size: usize, retry: RetryConfig) -> Result<Self> {
        let consumer_key = config.consumer_key.as_deref().ok_or_else(|| {
            TidemarkError::Configuration("WooCommerce source requires consumer_key".to_string())
        })?;
        let consumer_secret = config.consumer_secret.as_ref().ok_or_else(|| {
            TidemarkError::Configuration("WooCommerce source requires consumer_secret".to_string())
        })?;

        let credentials = format!(
            "{}:{}",
            consumer_key,
            consumer_secret.expose_secret().as_ref()
        );
        let auth_header = format!(
            "Basic {}",
            general_purpose::STANDARD.encode(credentials.as_bytes())
        );

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                TidemarkError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_header,
            client,
            page_size,
            retry,
        })
    }

    /// Fetch one page of a resource; WooCommerce returns a bare JSON array
    async fn get_page(&self, path: &str, query: &[(String, String)]) -> Result<Vec<Value>> {
        let url = format!("{}/wp-json/wc/v3/{}", self.base_url, path);

        let body = retry_request(&self.retry, || async {
            let response = self
                .client
                .get(&url)
                .header("Authorization", &self.auth_header)
                .query(query)
                .send()
                .await
                .map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;

            read_json(response).await
        })
        .await?;

        match body {
            Value::Array(records) => Ok(records),
            other => Err(ConnectorError::InvalidResponse(format!(
                "expected a JSON array, got: {}",
                truncate(&other.to_string())
            ))
            .into()),
        }
    }

    /// Paginate a resource to exhaustion with page numbers
    async fn fetch_all(&self, path: &str, since: Option<DateTime<Utc>>) -> Result<Vec<Value>> {
        let mut records = Vec::new();
        let mut page = 1usize;

        loop {
            let mut query: Vec<(String, String)> = vec![
                ("per_page".to_string(), self.page_size.to_string()),
                ("page".to_string(), page.to_string()),
            ];
            if let Some(watermark) = since {
                // WooCommerce expects ISO 8601 without the offset suffix
                query.push((
                    "modified_after".to_string(),
                    watermark.format("%Y-%m-%dT%H:%M:%S").to_string(),
                ));
            }

            let page_records = self.get_page(path, &query).await?;
            let page_len = page_records.len();
            records.extend(page_records);

            if page_len < self.page_size {
                break;
            }
            page += 1;
        }

        tracing::debug!(resource = path, count = records.len(), "Fetched WooCommerce records");
        Ok(records)
    }
}

fn truncate(s: &str) -> String {
    const MAX: usize = 120;
    if s.len() <= MAX {
        s.to_string()
    } else {
        let mut end = MAX;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

#[async_trait]
impl SourceConnector for WooCommerceConnector {
    fn source_type(&self) -> SourceType {
        SourceType::WooCommerce
    }

    async fn test_connection(&self) -> Result<()> {
        let query = vec![("per_page".to_string(), "1".to_string())];
        self.get_page("products", &query).await.map(|_| ())
    }

    async fn fetch_customers(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Value>> {
        self.fetch_all("customers", since).await
    }

    async fn fetch_products(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Value>> {
        self.fetch_all("products", since).await
    }

    async fn fetch_orders(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Value>> {
        self.fetch_all("orders", since).await
    }
}
