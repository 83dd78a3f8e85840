//! Store factory
//!
//! Selects the storage backend from configuration. Dry-run mode always gets
//! the in-memory store so no writes can reach the real database.

use super::memory::MemoryStore;
use super::postgres::PostgresStore;
use super::traits::CommerceStore;
use crate::config::{StoreBackend, TidemarkConfig};
use crate::domain::result::Result;
use std::sync::Arc;

/// Create the store for this process
pub fn create_store(config: &TidemarkConfig) -> Result<Arc<dyn CommerceStore>> {
    if config.application.dry_run {
        tracing::info!("Dry-run mode: using in-memory store, no database writes will occur");
        return Ok(Arc::new(MemoryStore::new()));
    }

    match config.database.backend {
        StoreBackend::Postgres => {
            let store = PostgresStore::new(&config.database)?;
            tracing::debug!("PostgreSQL store created");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("In-memory store configured: data will not survive this process");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
