//! Persistence abstraction
//!
//! This module defines the trait that storage backends must implement for
//! the pipeline: entity upserts and lookups, run-log persistence (which
//! doubles as the watermark source), and the aggregate queries the metrics
//! stage reads back. Every call is atomic on its own; the pipeline requires
//! no multi-statement transactions.

use crate::core::pipeline::run_log::EtlRunLog;
use crate::domain::entities::{Customer, Order, OrderItem, Product};
use crate::domain::metrics::{CustomerMetrics, DailyMetrics};
use crate::domain::result::Result;
use crate::domain::source::SourceType;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// A stored customer together with all of its stored orders
#[derive(Debug, Clone)]
pub struct CustomerWithOrders {
    /// Store row id
    pub id: i64,

    pub customer: Customer,

    /// All orders linked to this customer, line items included
    pub orders: Vec<Order>,
}

/// Storage backend trait
///
/// Upserts are keyed by (source_id, source_type) and return the store row
/// id. Lookups return `Ok(None)` for absent rows; only real backend
/// failures are errors.
#[async_trait]
pub trait CommerceStore: Send + Sync {
    /// Verify the backend is reachable
    async fn test_connection(&self) -> Result<()>;

    /// Create tables and indexes if they don't exist
    async fn ensure_schema(&self) -> Result<()>;

    /// Insert or update a customer; returns its row id
    async fn upsert_customer(&self, customer: &Customer) -> Result<i64>;

    /// Insert or update a product; returns its row id
    async fn upsert_product(&self, product: &Product) -> Result<i64>;

    /// Insert or update an order, linking it to `customer_id` when resolved;
    /// returns its row id
    async fn upsert_order(&self, order: &Order, customer_id: Option<i64>) -> Result<i64>;

    /// Insert one order line item; returns its row id
    ///
    /// Line items are append-per-run records hanging off their order;
    /// `product_id` is the resolved catalog row when the item references one.
    async fn insert_order_item(
        &self,
        item: &OrderItem,
        order_id: i64,
        product_id: Option<i64>,
    ) -> Result<i64>;

    /// Find a customer's row id by (email, source)
    async fn find_customer_id(&self, email: &str, source: SourceType) -> Result<Option<i64>>;

    /// Find a product's row id by (source product id, source)
    async fn find_product_id(
        &self,
        source_product_id: &str,
        source: SourceType,
    ) -> Result<Option<i64>>;

    /// Widen a customer's first/last purchase dates to include the given
    /// range (existing dates are kept when they are already wider)
    async fn update_purchase_dates(
        &self,
        customer_id: i64,
        first: DateTime<Utc>,
        last: DateTime<Utc>,
    ) -> Result<()>;

    /// Most recent successful run for (pipeline, source); its completion
    /// time is the next run's extraction watermark
    async fn last_successful_run(
        &self,
        pipeline_name: &str,
        source: SourceType,
    ) -> Result<Option<EtlRunLog>>;

    /// Persist a terminal run log; returns its row id
    async fn log_run(&self, log: &EtlRunLog) -> Result<i64>;

    /// Most recent runs, newest first, optionally filtered by source
    async fn recent_runs(&self, source: Option<SourceType>, limit: usize)
        -> Result<Vec<EtlRunLog>>;

    /// Every customer of a source together with all of its orders
    async fn customers_with_orders(&self, source: SourceType) -> Result<Vec<CustomerWithOrders>>;

    /// All orders of a source whose `processed_at` falls on the given
    /// calendar date, line items included
    async fn orders_for_date(&self, source: SourceType, date: NaiveDate) -> Result<Vec<Order>>;

    /// Insert or replace the metric row for (customer, calculation date)
    async fn upsert_customer_metrics(&self, metrics: &CustomerMetrics) -> Result<()>;

    /// Insert or replace the aggregate row for (date, source)
    async fn upsert_daily_metrics(&self, metrics: &DailyMetrics) -> Result<()>;
}
