//! PostgreSQL store
//!
//! Pooled implementation of [`CommerceStore`] over tokio-postgres. Schema
//! bootstrap runs the checked-in migration; all upserts are single
//! `ON CONFLICT` statements keyed by (source_id, source_type).

use super::traits::{CommerceStore, CustomerWithOrders};
use crate::config::DatabaseConfig;
use crate::core::pipeline::run_log::{EtlRunLog, RunStatus};
use crate::domain::entities::{Customer, FinancialStatus, Order, OrderItem, Product};
use crate::domain::metrics::{CustomerMetrics, DailyMetrics};
use crate::domain::result::Result;
use crate::domain::source::SourceType;
use crate::domain::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tokio_postgres::{NoTls, Row};

/// PostgreSQL implementation of [`CommerceStore`]
pub struct PostgresStore {
    pool: Pool,
    statement_timeout_ms: u64,
}

impl PostgresStore {
    /// Create a new store with a connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid or the pool
    /// cannot be built.
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let pg_config: tokio_postgres::Config =
            config.connection_string.parse().map_err(|e| {
                StoreError::ConnectionFailed(format!("Invalid connection string: {e}"))
            })?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .build()
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Failed to create connection pool: {e}"))
            })?;

        Ok(Self {
            pool,
            statement_timeout_ms: config.statement_timeout_seconds * 1000,
        })
    }

    /// Get a pooled connection with the statement timeout applied
    async fn client(&self) -> Result<Object> {
        let client = self.pool.get().await.map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to get connection from pool: {e}"))
        })?;
        client
            .execute(
                &format!("SET statement_timeout = {}", self.statement_timeout_ms),
                &[],
            )
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to set timeout: {e}")))?;
        Ok(client)
    }

    /// Line items for a set of orders, grouped by order row id
    async fn items_for_orders(
        &self,
        client: &Object,
        order_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<OrderItem>>> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = client
            .query(
                "SELECT order_id, source_product_id, title, quantity, price
                 FROM order_items WHERE order_id = ANY($1) ORDER BY id",
                &[&order_ids],
            )
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to query order items: {e}")))?;

        let mut items: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let order_id: i64 = row.get(0);
            items.entry(order_id).or_default().push(OrderItem {
                source_product_id: row.get(1),
                title: row.get(2),
                quantity: row.get::<_, i32>(3) as u32,
                price: row.get(4),
            });
        }
        Ok(items)
    }
}

#[async_trait]
impl CommerceStore for PostgresStore {
    async fn test_connection(&self) -> Result<()> {
        let client = self.client().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| StoreError::ConnectionFailed(format!("Connection test failed: {e}")))?;
        tracing::debug!("PostgreSQL connection test successful");
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        let client = self.client().await?;
        let migration_sql = include_str!("../../../migrations/001_initial_schema.sql");
        client
            .batch_execute(migration_sql)
            .await
            .map_err(|e| StoreError::SchemaFailed(e.to_string()))?;
        tracing::info!("PostgreSQL schema initialized");
        Ok(())
    }

    async fn upsert_customer(&self, customer: &Customer) -> Result<i64> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "INSERT INTO customers
                     (source_id, source_type, email, first_name, last_name,
                      total_spent, orders_count, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (source_id, source_type) DO UPDATE SET
                     email = EXCLUDED.email,
                     first_name = EXCLUDED.first_name,
                     last_name = EXCLUDED.last_name,
                     total_spent = EXCLUDED.total_spent,
                     orders_count = EXCLUDED.orders_count
                 RETURNING id",
                &[
                    &customer.source_id,
                    &customer.source_type.as_str(),
                    &customer.email,
                    &customer.first_name,
                    &customer.last_name,
                    &customer.total_spent,
                    &(customer.orders_count as i32),
                    &customer.created_at,
                ],
            )
            .await
            .map_err(|e| StoreError::WriteFailed(format!("customer upsert: {e}")))?;
        Ok(row.get(0))
    }

    async fn upsert_product(&self, product: &Product) -> Result<i64> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "INSERT INTO products
                     (source_id, source_type, title, sku, price, product_type,
                      vendor, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (source_id, source_type) DO UPDATE SET
                     title = EXCLUDED.title,
                     sku = EXCLUDED.sku,
                     price = EXCLUDED.price,
                     product_type = EXCLUDED.product_type,
                     vendor = EXCLUDED.vendor
                 RETURNING id",
                &[
                    &product.source_id,
                    &product.source_type.as_str(),
                    &product.title,
                    &product.sku,
                    &product.price,
                    &product.product_type,
                    &product.vendor,
                    &product.created_at,
                ],
            )
            .await
            .map_err(|e| StoreError::WriteFailed(format!("product upsert: {e}")))?;
        Ok(row.get(0))
    }

    async fn upsert_order(&self, order: &Order, customer_id: Option<i64>) -> Result<i64> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "INSERT INTO orders
                     (source_id, source_type, customer_id, customer_email,
                      order_number, subtotal, tax, discounts, shipping, total,
                      currency, financial_status, source_channel, processed_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                 ON CONFLICT (source_id, source_type) DO UPDATE SET
                     customer_id = EXCLUDED.customer_id,
                     customer_email = EXCLUDED.customer_email,
                     order_number = EXCLUDED.order_number,
                     subtotal = EXCLUDED.subtotal,
                     tax = EXCLUDED.tax,
                     discounts = EXCLUDED.discounts,
                     shipping = EXCLUDED.shipping,
                     total = EXCLUDED.total,
                     currency = EXCLUDED.currency,
                     financial_status = EXCLUDED.financial_status,
                     source_channel = EXCLUDED.source_channel,
                     processed_at = EXCLUDED.processed_at
                 RETURNING id",
                &[
                    &order.source_id,
                    &order.source_type.as_str(),
                    &customer_id,
                    &order.customer_email,
                    &order.order_number,
                    &order.subtotal,
                    &order.tax,
                    &order.discounts,
                    &order.shipping,
                    &order.total,
                    &order.currency,
                    &order.financial_status.as_str(),
                    &order.source_channel,
                    &order.processed_at,
                ],
            )
            .await
            .map_err(|e| StoreError::WriteFailed(format!("order upsert: {e}")))?;
        let order_id: i64 = row.get(0);

        // Line items are re-inserted by the caller after every upsert;
        // clearing the old rows keeps re-runs from double-counting
        client
            .execute("DELETE FROM order_items WHERE order_id = $1", &[&order_id])
            .await
            .map_err(|e| StoreError::WriteFailed(format!("order item cleanup: {e}")))?;

        Ok(order_id)
    }

    async fn insert_order_item(
        &self,
        item: &OrderItem,
        order_id: i64,
        product_id: Option<i64>,
    ) -> Result<i64> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "INSERT INTO order_items
                     (order_id, product_id, source_product_id, title, quantity, price)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING id",
                &[
                    &order_id,
                    &product_id,
                    &item.source_product_id,
                    &item.title,
                    &(item.quantity as i32),
                    &item.price,
                ],
            )
            .await
            .map_err(|e| StoreError::WriteFailed(format!("order item insert: {e}")))?;
        Ok(row.get(0))
    }

    async fn find_customer_id(&self, email: &str, source: SourceType) -> Result<Option<i64>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT id FROM customers WHERE email = $1 AND source_type = $2",
                &[&email, &source.as_str()],
            )
            .await
            .map_err(|e| StoreError::QueryFailed(format!("customer lookup: {e}")))?;
        Ok(row.map(|r| r.get(0)))
    }

    async fn find_product_id(
        &self,
        source_product_id: &str,
        source: SourceType,
    ) -> Result<Option<i64>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT id FROM products WHERE source_id = $1 AND source_type = $2",
                &[&source_product_id, &source.as_str()],
            )
            .await
            .map_err(|e| StoreError::QueryFailed(format!("product lookup: {e}")))?;
        Ok(row.map(|r| r.get(0)))
    }

    async fn update_purchase_dates(
        &self,
        customer_id: i64,
        first: DateTime<Utc>,
        last: DateTime<Utc>,
    ) -> Result<()> {
        let client = self.client().await?;
        client
            .execute(
                "UPDATE customers SET
                     first_purchase_date = LEAST(COALESCE(first_purchase_date, $2), $2),
                     last_purchase_date = GREATEST(COALESCE(last_purchase_date, $3), $3)
                 WHERE id = $1",
                &[&customer_id, &first, &last],
            )
            .await
            .map_err(|e| StoreError::WriteFailed(format!("purchase date update: {e}")))?;
        Ok(())
    }

    async fn last_successful_run(
        &self,
        pipeline_name: &str,
        source: SourceType,
    ) -> Result<Option<EtlRunLog>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT run_id, pipeline_name, source_type, status,
                        records_extracted, records_transformed, records_loaded,
                        started_at, completed_at, duration_seconds,
                        error_message, metadata
                 FROM etl_runs
                 WHERE pipeline_name = $1 AND source_type = $2 AND status = 'success'
                 ORDER BY completed_at DESC NULLS LAST
                 LIMIT 1",
                &[&pipeline_name, &source.as_str()],
            )
            .await
            .map_err(|e| StoreError::QueryFailed(format!("watermark lookup: {e}")))?;
        row.map(|r| run_from_row(&r)).transpose()
    }

    async fn log_run(&self, log: &EtlRunLog) -> Result<i64> {
        let client = self.client().await?;
        let metadata = if log.metadata.is_null() {
            None
        } else {
            Some(log.metadata.clone())
        };
        let row = client
            .query_one(
                "INSERT INTO etl_runs
                     (run_id, pipeline_name, source_type, status,
                      records_extracted, records_transformed, records_loaded,
                      started_at, completed_at, duration_seconds,
                      error_message, metadata)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                 RETURNING id",
                &[
                    &log.run_id,
                    &log.pipeline_name,
                    &log.source_type.as_str(),
                    &log.status.as_str(),
                    &(log.records_extracted as i64),
                    &(log.records_transformed as i64),
                    &(log.records_loaded as i64),
                    &log.started_at,
                    &log.completed_at,
                    &log.duration_seconds,
                    &log.error_message,
                    &metadata,
                ],
            )
            .await
            .map_err(|e| StoreError::WriteFailed(format!("run log insert: {e}")))?;
        Ok(row.get(0))
    }

    async fn recent_runs(
        &self,
        source: Option<SourceType>,
        limit: usize,
    ) -> Result<Vec<EtlRunLog>> {
        let client = self.client().await?;
        let limit = limit as i64;

        let rows = match source {
            Some(source) => {
                client
                    .query(
                        "SELECT run_id, pipeline_name, source_type, status,
                                records_extracted, records_transformed, records_loaded,
                                started_at, completed_at, duration_seconds,
                                error_message, metadata
                         FROM etl_runs WHERE source_type = $1
                         ORDER BY started_at DESC LIMIT $2",
                        &[&source.as_str(), &limit],
                    )
                    .await
            }
            None => {
                client
                    .query(
                        "SELECT run_id, pipeline_name, source_type, status,
                                records_extracted, records_transformed, records_loaded,
                                started_at, completed_at, duration_seconds,
                                error_message, metadata
                         FROM etl_runs ORDER BY started_at DESC LIMIT $1",
                        &[&limit],
                    )
                    .await
            }
        }
        .map_err(|e| StoreError::QueryFailed(format!("run history query: {e}")))?;

        rows.iter().map(run_from_row).collect()
    }

    async fn customers_with_orders(&self, source: SourceType) -> Result<Vec<CustomerWithOrders>> {
        let client = self.client().await?;

        let customer_rows = client
            .query(
                "SELECT id, source_id, source_type, email, first_name, last_name,
                        total_spent, orders_count, first_purchase_date,
                        last_purchase_date, created_at
                 FROM customers WHERE source_type = $1 ORDER BY id",
                &[&source.as_str()],
            )
            .await
            .map_err(|e| StoreError::QueryFailed(format!("customer query: {e}")))?;

        let order_rows = client
            .query(
                "SELECT id, source_id, source_type, customer_id, customer_email,
                        order_number, subtotal, tax, discounts, shipping, total,
                        currency, financial_status, source_channel, processed_at
                 FROM orders
                 WHERE source_type = $1 AND customer_id IS NOT NULL
                 ORDER BY id",
                &[&source.as_str()],
            )
            .await
            .map_err(|e| StoreError::QueryFailed(format!("order query: {e}")))?;

        let order_ids: Vec<i64> = order_rows.iter().map(|r| r.get::<_, i64>(0)).collect();
        let mut items = self.items_for_orders(&client, &order_ids).await?;

        let mut orders_by_customer: HashMap<i64, Vec<Order>> = HashMap::new();
        for row in &order_rows {
            let order_id: i64 = row.get(0);
            let mut order = order_from_row(row)?;
            order.line_items = items.remove(&order_id).unwrap_or_default();
            if let Some(customer_id) = order.customer_id {
                orders_by_customer.entry(customer_id).or_default().push(order);
            }
        }

        customer_rows
            .iter()
            .map(|row| {
                let id: i64 = row.get(0);
                Ok(CustomerWithOrders {
                    id,
                    customer: customer_from_row(row)?,
                    orders: orders_by_customer.remove(&id).unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn orders_for_date(&self, source: SourceType, date: NaiveDate) -> Result<Vec<Order>> {
        let client = self.client().await?;

        // Calendar-date bucketing in UTC: [midnight, next midnight)
        let day_start = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        let day_end = day_start + chrono::Duration::days(1);

        let order_rows = client
            .query(
                "SELECT id, source_id, source_type, customer_id, customer_email,
                        order_number, subtotal, tax, discounts, shipping, total,
                        currency, financial_status, source_channel, processed_at
                 FROM orders
                 WHERE source_type = $1 AND processed_at >= $2 AND processed_at < $3
                 ORDER BY id",
                &[&source.as_str(), &day_start, &day_end],
            )
            .await
            .map_err(|e| StoreError::QueryFailed(format!("daily order query: {e}")))?;

        let order_ids: Vec<i64> = order_rows.iter().map(|r| r.get::<_, i64>(0)).collect();
        let mut items = self.items_for_orders(&client, &order_ids).await?;

        order_rows
            .iter()
            .map(|row| {
                let order_id: i64 = row.get(0);
                let mut order = order_from_row(row)?;
                order.line_items = items.remove(&order_id).unwrap_or_default();
                Ok(order)
            })
            .collect()
    }

    async fn upsert_customer_metrics(&self, metrics: &CustomerMetrics) -> Result<()> {
        let client = self.client().await?;
        client
            .execute(
                "INSERT INTO customer_metrics
                     (customer_id, source_type, calculation_date, total_revenue,
                      total_orders, average_order_value, purchase_frequency,
                      customer_lifespan_days, customer_lifetime_value,
                      churn_probability, days_since_last_purchase,
                      rfm_recency, rfm_frequency, rfm_monetary, segment)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                 ON CONFLICT (customer_id, calculation_date) DO UPDATE SET
                     source_type = EXCLUDED.source_type,
                     total_revenue = EXCLUDED.total_revenue,
                     total_orders = EXCLUDED.total_orders,
                     average_order_value = EXCLUDED.average_order_value,
                     purchase_frequency = EXCLUDED.purchase_frequency,
                     customer_lifespan_days = EXCLUDED.customer_lifespan_days,
                     customer_lifetime_value = EXCLUDED.customer_lifetime_value,
                     churn_probability = EXCLUDED.churn_probability,
                     days_since_last_purchase = EXCLUDED.days_since_last_purchase,
                     rfm_recency = EXCLUDED.rfm_recency,
                     rfm_frequency = EXCLUDED.rfm_frequency,
                     rfm_monetary = EXCLUDED.rfm_monetary,
                     segment = EXCLUDED.segment",
                &[
                    &metrics.customer_id,
                    &metrics.source_type.as_str(),
                    &metrics.calculation_date,
                    &metrics.total_revenue,
                    &(metrics.total_orders as i32),
                    &metrics.average_order_value,
                    &metrics.purchase_frequency,
                    &metrics.customer_lifespan_days,
                    &metrics.customer_lifetime_value,
                    &metrics.churn_probability,
                    &metrics.days_since_last_purchase,
                    &(metrics.rfm_recency as i16),
                    &(metrics.rfm_frequency as i16),
                    &(metrics.rfm_monetary as i16),
                    &metrics.segment.as_str(),
                ],
            )
            .await
            .map_err(|e| StoreError::WriteFailed(format!("customer metrics upsert: {e}")))?;
        Ok(())
    }

    async fn upsert_daily_metrics(&self, metrics: &DailyMetrics) -> Result<()> {
        let client = self.client().await?;
        let revenue_by_source = serde_json::to_value(&metrics.revenue_by_source)
            .map_err(|e| StoreError::WriteFailed(format!("metrics serialization: {e}")))?;
        let top_products = serde_json::to_value(&metrics.top_selling_products)
            .map_err(|e| StoreError::WriteFailed(format!("metrics serialization: {e}")))?;

        client
            .execute(
                "INSERT INTO daily_metrics
                     (metric_date, source_type, total_revenue, total_orders,
                      total_customers, average_order_value, total_products_sold,
                      new_customers, returning_customers, revenue_by_source,
                      top_selling_products)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                 ON CONFLICT (metric_date, source_type) DO UPDATE SET
                     total_revenue = EXCLUDED.total_revenue,
                     total_orders = EXCLUDED.total_orders,
                     total_customers = EXCLUDED.total_customers,
                     average_order_value = EXCLUDED.average_order_value,
                     total_products_sold = EXCLUDED.total_products_sold,
                     new_customers = EXCLUDED.new_customers,
                     returning_customers = EXCLUDED.returning_customers,
                     revenue_by_source = EXCLUDED.revenue_by_source,
                     top_selling_products = EXCLUDED.top_selling_products",
                &[
                    &metrics.metric_date,
                    &metrics.source_type.as_str(),
                    &metrics.total_revenue,
                    &(metrics.total_orders as i32),
                    &(metrics.total_customers as i32),
                    &metrics.average_order_value,
                    &(metrics.total_products_sold as i64),
                    &(metrics.new_customers as i32),
                    &(metrics.returning_customers as i32),
                    &revenue_by_source,
                    &top_products,
                ],
            )
            .await
            .map_err(|e| StoreError::WriteFailed(format!("daily metrics upsert: {e}")))?;
        Ok(())
    }
}

// ---- row mapping ----

fn parse_source(value: &str) -> Result<SourceType> {
    SourceType::from_str(value).map_err(|e| StoreError::DecodeFailed(e).into())
}

fn customer_from_row(row: &Row) -> Result<Customer> {
    Ok(Customer {
        source_id: row.get(1),
        source_type: parse_source(row.get(2))?,
        email: row.get(3),
        first_name: row.get(4),
        last_name: row.get(5),
        total_spent: row.get(6),
        orders_count: row.get::<_, i32>(7) as u32,
        first_purchase_date: row.get(8),
        last_purchase_date: row.get(9),
        created_at: row.get(10),
    })
}

fn order_from_row(row: &Row) -> Result<Order> {
    let financial_status: String = row.get(12);
    Ok(Order {
        source_id: row.get(1),
        source_type: parse_source(row.get(2))?,
        customer_id: row.get(3),
        customer_email: row.get(4),
        order_number: row.get(5),
        subtotal: row.get(6),
        tax: row.get(7),
        discounts: row.get(8),
        shipping: row.get(9),
        total: row.get(10),
        currency: row.get(11),
        financial_status: FinancialStatus::from_str(&financial_status)
            .unwrap_or(FinancialStatus::Unknown),
        source_channel: row.get(13),
        processed_at: row.get(14),
        line_items: Vec::new(),
    })
}

fn run_from_row(row: &Row) -> Result<EtlRunLog> {
    let status: String = row.get(3);
    Ok(EtlRunLog {
        run_id: row.get(0),
        pipeline_name: row.get(1),
        source_type: parse_source(row.get(2))?,
        status: RunStatus::from_str(&status).map_err(StoreError::DecodeFailed)?,
        records_extracted: row.get::<_, i64>(4) as u64,
        records_transformed: row.get::<_, i64>(5) as u64,
        records_loaded: row.get::<_, i64>(6) as u64,
        started_at: row.get(7),
        completed_at: row.get(8),
        duration_seconds: row.get(9),
        error_message: row.get(10),
        metadata: row
            .get::<_, Option<serde_json::Value>>(11)
            .unwrap_or(serde_json::Value::Null),
    })
}
