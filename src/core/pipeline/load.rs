//! Batch load bookkeeping
//!
//! Loading attempts each entity independently: one entity's failure is
//! recorded and the batch continues. Results are plain values rather than
//! exceptions so callers can inspect counts without control flow.

use serde_json::{json, Value};

/// One entity that failed to persist
#[derive(Debug, Clone)]
pub struct LoadFailure {
    /// Source-side id of the failed entity
    pub source_id: String,

    /// Error message
    pub error: String,
}

/// Result of loading one batch of entities
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Number of entities successfully inserted or updated
    pub inserted: u64,

    /// Entities that failed, with their errors
    pub failed: Vec<LoadFailure>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful upsert
    pub fn record_success(&mut self) {
        self.inserted += 1;
    }

    /// Record a per-entity failure; the batch continues
    pub fn record_failure(&mut self, source_id: impl Into<String>, error: impl Into<String>) {
        self.failed.push(LoadFailure {
            source_id: source_id.into(),
            error: error.into(),
        });
    }

    pub fn failed_count(&self) -> u64 {
        self.failed.len() as u64
    }

    /// Merge another batch result into this one
    pub fn merge(&mut self, other: BatchResult) {
        self.inserted += other.inserted;
        self.failed.extend(other.failed);
    }
}

/// Per-entity-kind load results for one run
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    pub customers: BatchResult,
    pub products: BatchResult,
    pub orders: BatchResult,
    pub order_items: BatchResult,
}

impl LoadSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total successfully-inserted entities across all kinds
    pub fn total_inserted(&self) -> u64 {
        self.customers.inserted
            + self.products.inserted
            + self.orders.inserted
            + self.order_items.inserted
    }

    /// Total per-entity failures across all kinds
    pub fn total_failed(&self) -> u64 {
        self.customers.failed_count()
            + self.products.failed_count()
            + self.orders.failed_count()
            + self.order_items.failed_count()
    }

    /// Serialize to the metadata shape recorded on successful run logs
    pub fn to_metadata(&self) -> Value {
        fn entry(result: &BatchResult) -> Value {
            json!({
                "inserted": result.inserted,
                "failed": result.failed_count(),
            })
        }

        json!({
            "customers": entry(&self.customers),
            "products": entry(&self.products),
            "orders": entry(&self.orders),
            "order_items": entry(&self.order_items),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_result_counting() {
        let mut result = BatchResult::new();
        result.record_success();
        result.record_success();
        result.record_failure("o-3", "duplicate key");

        assert_eq!(result.inserted, 2);
        assert_eq!(result.failed_count(), 1);
        assert_eq!(result.failed[0].source_id, "o-3");
    }

    #[test]
    fn test_batch_result_merge() {
        let mut a = BatchResult::new();
        a.record_success();

        let mut b = BatchResult::new();
        b.record_success();
        b.record_failure("x", "boom");

        a.merge(b);
        assert_eq!(a.inserted, 2);
        assert_eq!(a.failed_count(), 1);
    }

    #[test]
    fn test_summary_totals() {
        let mut summary = LoadSummary::new();
        summary.customers.record_success();
        summary.products.record_success();
        summary.orders.record_success();
        summary.order_items.record_success();
        summary.order_items.record_success();
        summary.orders.record_failure("o-9", "constraint violation");

        assert_eq!(summary.total_inserted(), 5);
        assert_eq!(summary.total_failed(), 1);
    }

    #[test]
    fn test_metadata_shape() {
        let mut summary = LoadSummary::new();
        summary.customers.record_success();
        summary.customers.record_failure("c-2", "bad email");

        let metadata = summary.to_metadata();
        assert_eq!(metadata["customers"]["inserted"], 1);
        assert_eq!(metadata["customers"]["failed"], 1);
        assert_eq!(metadata["orders"]["inserted"], 0);
    }
}
