//! Connector factory
//!
//! Builds the connector set for a run from configuration, skipping disabled
//! sources.

use super::traits::SourceConnector;
use super::{CommercetoolsConnector, ShopifyConnector, WooCommerceConnector};
use crate::config::TidemarkConfig;
use crate::domain::result::Result;
use crate::domain::source::SourceType;
use std::sync::Arc;

/// Create one connector per enabled source
pub fn create_connectors(config: &TidemarkConfig) -> Result<Vec<Arc<dyn SourceConnector>>> {
    let mut connectors: Vec<Arc<dyn SourceConnector>> = Vec::new();

    for source in config.enabled_sources() {
        let page_size = config.pipeline.page_size;
        let retry = config.pipeline.retry.clone();

        let connector: Arc<dyn SourceConnector> = match source.kind {
            SourceType::Shopify => Arc::new(ShopifyConnector::new(source, page_size, retry)?),
            SourceType::WooCommerce => {
                Arc::new(WooCommerceConnector::new(source, page_size, retry)?)
            }
            SourceType::Commercetools => {
                Arc::new(CommercetoolsConnector::new(source, page_size, retry)?)
            }
        };

        tracing::debug!(source = %source.kind, base_url = %source.base_url, "Connector created");
        connectors.push(connector);
    }

    Ok(connectors)
}
