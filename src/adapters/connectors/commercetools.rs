//! Commercetools connector
//!
//! Authenticates with the client-credentials OAuth flow against the
//! platform's auth service, then queries the HTTP API with a cached bearer
//! token. Incremental extraction uses a `lastModifiedAt` predicate;
//! pagination is offset-based over `{results, total}` envelopes.

use super::traits::SourceConnector;
use super::{read_json, retry_request};
use crate::config::{RetryConfig, SourceConfig};
use crate::domain::errors::{ConnectorError, TidemarkError};
use crate::domain::result::Result;
use crate::domain::source::SourceType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;

/// Commercetools HTTP API connector
pub struct CommercetoolsConnector {
    api_url: String,
    auth_url: String,
    project_key: String,
    client_id: String,
    client_secret: String,
    client: Client,
    page_size: usize,
    retry: RetryConfig,
    /// Bearer token cache; refreshed on demand
    token: Mutex<Option<String>>,
}

impl CommercetoolsConnector {
    /// Create a new commercetools connector from source configuration
    pub fn new(config: &SourceConfig, page_size: usize, retry: RetryConfig) -> Result<Self> {
        let project_key = config.project_key.clone().ok_or_else(|| {
            TidemarkError::Configuration("Commercetools source requires project_key".to_string())
        })?;
        let client_id = config.client_id.clone().ok_or_else(|| {
            TidemarkError::Configuration("Commercetools source requires client_id".to_string())
        })?;
        let client_secret = config
            .client_secret
            .as_ref()
            .ok_or_else(|| {
                TidemarkError::Configuration(
                    "Commercetools source requires client_secret".to_string(),
                )
            })?
            .expose_secret()
            .as_ref()
            .to_string();
        let auth_url = config.auth_url.clone().ok_or_else(|| {
            TidemarkError::Configuration("Commercetools source requires auth_url".to_string())
        })?;

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                TidemarkError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            api_url: config.base_url.trim_end_matches('/').to_string(),
            auth_url: auth_url.trim_end_matches('/').to_string(),
            project_key,
            client_id,
            client_secret,
            client,
            page_size,
            retry,
            token: Mutex::new(None),
        })
    }

    /// Fetch a fresh access token via the client-credentials grant
    async fn fetch_token(&self) -> Result<String> {
        let url = format!("{}/oauth/token", self.auth_url);
        eprintln!("DIAG token url={url}");

        let body = retry_request(&self.retry, || async {
            let response = self
                .client
                .post(&url)
                .basic_auth(&self.client_id, Some(&self.client_secret))
                .form(&[("grant_type", "client_credentials")])
                .send()
                .await
                .map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;

            read_json(response).await
        })
        .await?;

        body.get("access_token")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| {
                ConnectorError::AuthenticationFailed(
                    "token response missing access_token".to_string(),
                )
                .into()
            })
    }

    /// Current token, fetching one if the cache is empty
    async fn bearer_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }
        let token = self.fetch_token().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Fetch one page of a resource
    async fn get_page(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        let token = self.bearer_token().await?;
        let url = format!("{}/{}/{}", self.api_url, self.project_key, path);
        eprintln!("DIAG page url={url} token={token}");

        retry_request(&self.retry, || async {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&token)
                .query(query)
                .send()
                .await
                .map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;
            eprintln!("DIAG page status={} query={:?}", response.status(), query);

            read_json(response).await
        })
        .await
    }

    /// Paginate a resource to exhaustion with offsets
    async fn fetch_all(&self, path: &str, since: Option<DateTime<Utc>>) -> Result<Vec<Value>> {
        let mut records = Vec::new();
        let mut offset = 0usize;

        loop {
            let mut query: Vec<(String, String)> = vec![
                ("limit".to_string(), self.page_size.to_string()),
                ("offset".to_string(), offset.to_string()),
                ("sort".to_string(), "createdAt asc".to_string()),
            ];
            if let Some(watermark) = since {
                query.push((
                    "where".to_string(),
                    format!(
                        "lastModifiedAt > \"{}\"",
                        watermark.format("%Y-%m-%dT%H:%M:%S%.3fZ")
                    ),
                ));
            }

            let page = self.get_page(path, &query).await?;
            let page_records = page
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    ConnectorError::InvalidResponse("response missing 'results' array".to_string())
                })?
                .clone();

            let page_len = page_records.len();
            records.extend(page_records);

            if page_len < self.page_size {
                break;
            }
            offset += page_len;
        }

        tracing::debug!(
            resource = path,
            count = records.len(),
            "Fetched commercetools records"
        );
        Ok(records)
    }
}

#[async_trait]
impl SourceConnector for CommercetoolsConnector {
    fn source_type(&self) -> SourceType {
        SourceType::Commercetools
    }

    async fn test_connection(&self) -> Result<()> {
        // Token fetch exercises auth; the project endpoint exercises API
        // access scopes
        self.bearer_token().await?;
        self.get_page("", &[]).await.map(|_| ())
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
