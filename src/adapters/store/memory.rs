//! In-memory store
//!
//! Backs tests and `--dry-run` executions. Row ids are assigned from a
//! single sequence, uniqueness keys match the PostgreSQL schema, and
//! nothing survives the process.

use super::traits::{CommerceStore, CustomerWithOrders};
use crate::core::pipeline::run_log::{EtlRunLog, RunStatus};
use crate::domain::entities::{Customer, Order, OrderItem, Product};
use crate::domain::metrics::{CustomerMetrics, DailyMetrics};
use crate::domain::result::Result;
use crate::domain::source::SourceType;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    customers: HashMap<i64, Customer>,
    products: HashMap<i64, Product>,
    orders: HashMap<i64, Order>,
    order_items: Vec<(i64, i64, Option<i64>, OrderItem)>,
    runs: Vec<EtlRunLog>,
    customer_metrics: HashMap<(i64, NaiveDate), CustomerMetrics>,
    daily_metrics: HashMap<(NaiveDate, SourceType), DailyMetrics>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn customer_id_by_key(&self, source_id: &str, source: SourceType) -> Option<i64> {
        self.customers
            .iter()
            .find(|(_, c)| c.source_id == source_id && c.source_type == source)
            .map(|(id, _)| *id)
    }
}

/// In-memory implementation of [`CommerceStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted run logs (test helper)
    pub async fn run_count(&self) -> usize {
        self.state.lock().await.runs.len()
    }

    /// Stored daily metrics for a key (test helper)
    pub async fn daily_metrics_for(
        &self,
        date: NaiveDate,
        source: SourceType,
    ) -> Option<DailyMetrics> {
        self.state
            .lock()
            .await
            .daily_metrics
            .get(&(date, source))
            .cloned()
    }

    /// Stored customer metrics rows (test helper)
    pub async fn customer_metrics(&self) -> Vec<CustomerMetrics> {
        self.state
            .lock()
            .await
            .customer_metrics
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CommerceStore for MemoryStore {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert_customer(&self, customer: &Customer) -> Result<i64> {
        let mut state = self.state.lock().await;
        if let Some(id) = state.customer_id_by_key(&customer.source_id, customer.source_type) {
            // Keep derived purchase dates across upserts
            let existing = state.customers.get(&id).cloned();
            let mut updated = customer.clone();
            if let Some(existing) = existing {
                updated.first_purchase_date = existing.first_purchase_date;
                updated.last_purchase_date = existing.last_purchase_date;
            }
            state.customers.insert(id, updated);
            return Ok(id);
        }
        let id = state.next_id();
        state.customers.insert(id, customer.clone());
        Ok(id)
    }

    async fn upsert_product(&self, product: &Product) -> Result<i64> {
        let mut state = self.state.lock().await;
        let existing = state
            .products
            .iter()
            .find(|(_, p)| p.source_id == product.source_id && p.source_type == product.source_type)
            .map(|(id, _)| *id);
        if let Some(id) = existing {
            state.products.insert(id, product.clone());
            return Ok(id);
        }
        let id = state.next_id();
        state.products.insert(id, product.clone());
        Ok(id)
    }

    async fn upsert_order(&self, order: &Order, customer_id: Option<i64>) -> Result<i64> {
        let mut state = self.state.lock().await;
        let existing = state
            .orders
            .iter()
            .find(|(_, o)| o.source_id == order.source_id && o.source_type == order.source_type)
            .map(|(id, _)| *id);

        let mut stored = order.clone();
        stored.customer_id = customer_id;
        // Line items are stored relationally, not inline
        stored.line_items = Vec::new();

        if let Some(id) = existing {
            // Re-inserted items would double-count; replace the order's items
            state.order_items.retain(|(_, order_ref, _, _)| *order_ref != id);
            state.orders.insert(id, stored);
            return Ok(id);
        }
        let id = state.next_id();
        state.orders.insert(id, stored);
        Ok(id)
    }

    async fn insert_order_item(
        &self,
        item: &OrderItem,
        order_id: i64,
        product_id: Option<i64>,
    ) -> Result<i64> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.order_items.push((id, order_id, product_id, item.clone()));
        Ok(id)
    }

    async fn find_customer_id(&self, email: &str, source: SourceType) -> Result<Option<i64>> {
        let state = self.state.lock().await;
        Ok(state
            .customers
            .iter()
            .find(|(_, c)| c.source_type == source && c.email.as_deref() == Some(email))
            .map(|(id, _)| *id))
    }

    async fn find_product_id(
        &self,
        source_product_id: &str,
        source: SourceType,
    ) -> Result<Option<i64>> {
        let state = self.state.lock().await;
        Ok(state
            .products
            .iter()
            .find(|(_, p)| p.source_type == source && p.source_id == source_product_id)
            .map(|(id, _)| *id))
    }

    async fn update_purchase_dates(
        &self,
        customer_id: i64,
        first: DateTime<Utc>,
        last: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(customer) = state.customers.get_mut(&customer_id) {
            customer.first_purchase_date = Some(
                customer
                    .first_purchase_date
                    .map_or(first, |existing| existing.min(first)),
            );
            customer.last_purchase_date = Some(
                customer
                    .last_purchase_date
                    .map_or(last, |existing| existing.max(last)),
            );
        }
        Ok(())
    }

    async fn last_successful_run(
        &self,
        pipeline_name: &str,
        source: SourceType,
    ) -> Result<Option<EtlRunLog>> {
        let state = self.state.lock().await;
        Ok(state
            .runs
            .iter()
            .filter(|r| {
                r.pipeline_name == pipeline_name
                    && r.source_type == source
                    && r.status == RunStatus::Success
            })
            .max_by_key(|r| r.completed_at)
            .cloned())
    }

    async fn log_run(&self, log: &EtlRunLog) -> Result<i64> {
        let mut state = self.state.lock().await;
        state.runs.push(log.clone());
        Ok(state.runs.len() as i64)
    }

    async fn recent_runs(
        &self,
        source: Option<SourceType>,
        limit: usize,
    ) -> Result<Vec<EtlRunLog>> {
        let state = self.state.lock().await;
        let mut runs: Vec<EtlRunLog> = state
            .runs
            .iter()
            .filter(|r| source.map_or(true, |s| r.source_type == s))
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs.truncate(limit);
        Ok(runs)
    }

    async fn customers_with_orders(&self, source: SourceType) -> Result<Vec<CustomerWithOrders>> {
        let state = self.state.lock().await;
        let mut result: Vec<CustomerWithOrders> = state
            .customers
            .iter()
            .filter(|(_, c)| c.source_type == source)
            .map(|(&id, customer)| {
                let orders = state
                    .orders
                    .iter()
                    .filter(|(_, o)| o.customer_id == Some(id))
                    .map(|(oid, o)| hydrate_order(&state, *oid, o))
                    .collect();
                CustomerWithOrders {
                    id,
                    customer: customer.clone(),
                    orders,
                }
            })
            .collect();
        result.sort_by_key(|c| c.id);
        Ok(result)
    }

    async fn orders_for_date(&self, source: SourceType, date: NaiveDate) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        let mut orders: Vec<(i64, Order)> = state
            .orders
            .iter()
            .filter(|(_, o)| o.source_type == source && o.processed_at.date_naive() == date)
            .map(|(&id, o)| (id, hydrate_order(&state, id, o)))
            .collect();
        orders.sort_by_key(|(id, _)| *id);
        Ok(orders.into_iter().map(|(_, o)| o).collect())
    }

    async fn upsert_customer_metrics(&self, metrics: &CustomerMetrics) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .customer_metrics
            .insert((metrics.customer_id, metrics.calculation_date), metrics.clone());
        Ok(())
    }

    async fn upsert_daily_metrics(&self, metrics: &DailyMetrics) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .daily_metrics
            .insert((metrics.metric_date, metrics.source_type), metrics.clone());
        Ok(())
    }
}

/// Reattach an order's stored line items
fn hydrate_order(state: &MemoryState, order_id: i64, order: &Order) -> Order {
    let mut hydrated = order.clone();
    hydrated.line_items = state
        .order_items
        .iter()
        .filter(|(_, oid, _, _)| *oid == order_id)
        .map(|(_, _, _, item)| item.clone())
        .collect();
    hydrated
}
