//! Storefront platform connectors
//!
//! One connector per supported platform, all implementing
//! [`traits::SourceConnector`]. The shared retry helper lives here so every
//! connector backs off the same way.

pub mod commercetools;
pub mod factory;
pub mod shopify;
pub mod traits;
pub mod woocommerce;

pub use commercetools::CommercetoolsConnector;
pub use factory::create_connectors;
pub use shopify::ShopifyConnector;
pub use traits::SourceConnector;
pub use woocommerce::WooCommerceConnector;

use crate::config::RetryConfig;
use crate::domain::errors::ConnectorError;
use crate::domain::result::Result;
use rand::Rng;
use serde_json::Value;
use std::time::Duration;

/// Map an HTTP response to its JSON body or a [`ConnectorError`]
///
/// 429 responses surface the `Retry-After` header so operators can see the
/// platform's throttling window in logs.
pub(crate) async fn read_json(response: reqwest::Response) -> Result<Value> {
    let status = response.status();

    if status.is_success() {
        return response
            .json::<Value>()
            .await
            .map_err(|e| ConnectorError::InvalidResponse(e.to_string()).into());
    }

    if status.as_u16() == 429 {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unspecified")
            .to_string();
        return Err(ConnectorError::RateLimitExceeded(retry_after).into());
    }

    let message = response.text().await.unwrap_or_default();
    let error = if status.as_u16() == 401 || status.as_u16() == 403 {
        ConnectorError::AuthenticationFailed(format!("{status}: {message}"))
    } else if status.is_server_error() {
        ConnectorError::ServerError {
            status: status.as_u16(),
            message,
        }
    } else {
        ConnectorError::ClientError {
            status: status.as_u16(),
            message,
        }
    };
    Err(error.into())
}

/// Retry an async operation with exponential backoff and jitter
///
/// Used by all connectors for their HTTP requests. The final attempt's error
/// is returned unchanged.
pub(crate) async fn retry_request<F, T, Fut>(retry: &RetryConfig, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let max_retries = retry.max_retries.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempt += 1;
                if attempt >= max_retries {
                    return Err(e);
                }

                let delay_ms = retry.initial_delay_ms as f64
                    * retry.backoff_multiplier.powi((attempt - 1) as i32);
                let delay_ms = (delay_ms as u64).min(retry.max_delay_ms);
                // Jitter spreads retries from concurrent processes hitting
                // the same rate-limited API
                let jitter_ms = rand::thread_rng().gen_range(0..=delay_ms / 4 + 1);

                tracing::warn!(
                    attempt = attempt,
                    max_retries = max_retries,
                    delay_ms = delay_ms + jitter_ms,
                    error = %e,
                    "Retrying request after error"
                );

                tokio::time::sleep(Duration::from_millis(delay_ms + jitter_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{ConnectorError, TidemarkError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_retry(max_retries: usize) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let attempts = AtomicUsize::new(0);
        let result = retry_request(&fast_retry(3), || async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(TidemarkError::Connector(ConnectorError::ServerError {
                    status: 503,
                    message: "unavailable".to_string(),
                }))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let attempts = AtomicUsize::new(0);
        let result: Result<()> = retry_request(&fast_retry(3), || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(TidemarkError::Connector(ConnectorError::Timeout(
                "deadline".to_string(),
            )))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
