//! End-to-end pipeline tests over a stub connector and the in-memory store
//!
//! These exercise the orchestrator's stage machine: connection failures,
//! fail-fast normalization, per-entity load accounting, watermark handoff
//! between runs, and cross-source failure isolation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use std::sync::Mutex;
use tidemark::adapters::connectors::SourceConnector;
use tidemark::adapters::store::{CommerceStore, MemoryStore};
use tidemark::core::pipeline::{PipelineOrchestrator, RunStatus};
use tidemark::domain::{ConnectorError, Result, SourceType, TidemarkError};

/// Scriptable connector: serves fixed payloads and records watermarks
struct StubConnector {
    source: SourceType,
    fail_connection: bool,
    fail_orders_fetch: bool,
    customers: Vec<Value>,
    products: Vec<Value>,
    orders: Vec<Value>,
    seen_since: Mutex<Vec<Option<DateTime<Utc>>>>,
}

impl StubConnector {
    fn new(source: SourceType) -> Self {
        Self {
            source,
            fail_connection: false,
            fail_orders_fetch: false,
            customers: Vec::new(),
            products: Vec::new(),
            orders: Vec::new(),
            seen_since: Mutex::new(Vec::new()),
        }
    }

    fn shopify_fixture() -> Self {
        let mut stub = Self::new(SourceType::Shopify);
        stub.customers = vec![
            json!({"id": 1, "email": "ada@example.com", "first_name": "Ada",
                   "total_spent": "0.00", "orders_count": 0,
                   "created_at": "2023-12-01T10:00:00Z"}),
            json!({"id": 2, "email": "bob@example.com", "first_name": "Bob",
                   "total_spent": "0.00", "orders_count": 0,
                   "created_at": "2023-12-02T10:00:00Z"}),
        ];
        stub.products = vec![json!({
            "id": 77, "title": "Mug",
            "variants": [{"sku": "MUG-1", "price": "15.00"}],
            "created_at": "2023-11-01T00:00:00Z"
        })];
        stub.orders = vec![
            json!({
                "id": 501, "email": "ada@example.com", "order_number": 1001,
                "subtotal_price": "30.00", "total_tax": "0.00",
                "total_discounts": "0.00", "total_price": "30.00",
                "currency": "USD", "financial_status": "paid",
                "processed_at": "2024-01-15T09:00:00Z",
                "line_items": [
                    {"product_id": 77, "title": "Mug", "quantity": 2, "price": "15.00"}
                ]
            }),
            json!({
                "id": 502, "email": "bob@example.com", "order_number": 1002,
                "subtotal_price": "45.00", "total_tax": "0.00",
                "total_discounts": "0.00", "total_price": "45.00",
                "currency": "USD", "financial_status": "paid",
                "processed_at": "2024-01-15T16:00:00Z",
                "line_items": [
                    {"product_id": 77, "title": "Mug", "quantity": 1, "price": "15.00"},
                    {"title": "Gift Wrap", "quantity": 1, "price": "30.00"}
                ]
            }),
        ];
        stub
    }
}

#[async_trait]
impl SourceConnector for StubConnector {
    fn source_type(&self) -> SourceType {
        self.source
    }

    async fn test_connection(&self) -> Result<()> {
        if self.fail_connection {
            return Err(TidemarkError::Connector(ConnectorError::ConnectionFailed(
                "dns lookup failed".to_string(),
            )));
        }
        Ok(())
    }

    async fn fetch_customers(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Value>> {
        self.seen_since.lock().unwrap().push(since);
        Ok(self.customers.clone())
    }

    async fn fetch_products(&self, _since: Option<DateTime<Utc>>) -> Result<Vec<Value>> {
        Ok(self.products.clone())
    }

    async fn fetch_orders(&self, _since: Option<DateTime<Utc>>) -> Result<Vec<Value>> {
        if self.fail_orders_fetch {
            return Err(TidemarkError::Connector(ConnectorError::ServerError {
                status: 500,
                message: "internal error".to_string(),
            }));
        }
        Ok(self.orders.clone())
    }
}

fn calc_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

#[tokio::test]
async fn failed_connection_produces_failed_run_with_zero_counts() {
    let mut stub = StubConnector::shopify_fixture();
    stub.fail_connection = true;

    let store = Arc::new(MemoryStore::new());
    let orchestrator =
        PipelineOrchestrator::new("commerce-etl", vec![Arc::new(stub) as Arc<dyn SourceConnector>], store.clone());

    let log = orchestrator.run_for_source(SourceType::Shopify).await;

    assert_eq!(log.status, RunStatus::Failed);
    assert_eq!(log.records_extracted, 0);
    assert_eq!(log.records_transformed, 0);
    assert_eq!(log.records_loaded, 0);
    let message = log.error_message.expect("failed run must carry a message");
    assert!(message.contains("connect"), "message was: {message}");

    // The failed run is persisted and never becomes a watermark
    assert_eq!(store.run_count().await, 1);
    assert!(store
        .last_successful_run("commerce-etl", SourceType::Shopify)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn successful_run_counts_every_inserted_entity_exactly_once() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = PipelineOrchestrator::new(
        "commerce-etl",
        vec![Arc::new(StubConnector::shopify_fixture()) as Arc<dyn SourceConnector>],
        store.clone(),
    )
    .with_calculation_date(calc_date());

    let log = orchestrator.run_for_source(SourceType::Shopify).await;

    assert_eq!(log.status, RunStatus::Success);
    // 2 customers + 1 product + 2 orders = 5 raw and canonical records
    assert_eq!(log.records_extracted, 5);
    assert_eq!(log.records_transformed, 5);
    // Loaded adds the 3 order items: 2 + 1 + 2 + 3
    assert_eq!(log.records_loaded, 8);

    assert_eq!(log.metadata["customers"]["inserted"], 2);
    assert_eq!(log.metadata["products"]["inserted"], 1);
    assert_eq!(log.metadata["orders"]["inserted"], 2);
    assert_eq!(log.metadata["order_items"]["inserted"], 3);
    assert_eq!(log.metadata["orders"]["failed"], 0);
}

#[tokio::test]
async fn successful_run_computes_customer_and_daily_metrics() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = PipelineOrchestrator::new(
        "commerce-etl",
        vec![Arc::new(StubConnector::shopify_fixture()) as Arc<dyn SourceConnector>],
        store.clone(),
    )
    .with_calculation_date(calc_date());

    orchestrator.run_for_source(SourceType::Shopify).await;

    let daily = store
        .daily_metrics_for(calc_date(), SourceType::Shopify)
        .await
        .expect("daily metrics row must exist");
    assert_eq!(daily.total_orders, 2);
    assert!((daily.total_revenue - 75.0).abs() < 1e-9);
    assert_eq!(daily.total_customers, 2);
    assert_eq!(daily.total_products_sold, 4);
    assert_eq!(daily.new_customers, 2);
    assert_eq!(daily.returning_customers, 0);

    let customer_metrics = store.customer_metrics().await;
    assert_eq!(customer_metrics.len(), 2);
    for metrics in customer_metrics {
        assert_eq!(metrics.calculation_date, calc_date());
        assert_eq!(metrics.total_orders, 1);
    }
}

#[tokio::test]
async fn second_run_uses_first_runs_completion_as_watermark() {
    let store = Arc::new(MemoryStore::new());
    let stub = Arc::new(StubConnector::shopify_fixture());
    let orchestrator = PipelineOrchestrator::new(
        "commerce-etl",
        vec![stub.clone() as Arc<dyn SourceConnector>],
        store.clone(),
    )
    .with_calculation_date(calc_date());

    let first = orchestrator.run_for_source(SourceType::Shopify).await;
    assert_eq!(first.status, RunStatus::Success);
    let second = orchestrator.run_for_source(SourceType::Shopify).await;
    assert_eq!(second.status, RunStatus::Success);

    let seen = stub.seen_since.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], None, "first run must be a full extraction");
    assert_eq!(
        seen[1], first.completed_at,
        "second run must resume from the first run's completion"
    );
}

#[tokio::test]
async fn repeated_runs_are_idempotent_in_the_store() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = PipelineOrchestrator::new(
        "commerce-etl",
        vec![Arc::new(StubConnector::shopify_fixture()) as Arc<dyn SourceConnector>],
        store.clone(),
    )
    .with_calculation_date(calc_date());

    orchestrator.run_for_source(SourceType::Shopify).await;
    orchestrator.run_for_source(SourceType::Shopify).await;

    // Orders and their items are keyed by source id: no duplicates
    let day_orders = store
        .orders_for_date(SourceType::Shopify, calc_date())
        .await
        .unwrap();
    assert_eq!(day_orders.len(), 2);
    let item_count: usize = day_orders.iter().map(|o| o.line_items.len()).sum();
    assert_eq!(item_count, 3);

    // Metrics rows were overwritten, not appended
    assert_eq!(store.customer_metrics().await.len(), 2);
}

#[tokio::test]
async fn extraction_failure_aborts_with_extraction_error() {
    let mut stub = StubConnector::shopify_fixture();
    stub.fail_orders_fetch = true;

    let store = Arc::new(MemoryStore::new());
    let orchestrator =
        PipelineOrchestrator::new("commerce-etl", vec![Arc::new(stub) as Arc<dyn SourceConnector>], store.clone());

    let log = orchestrator.run_for_source(SourceType::Shopify).await;

    assert_eq!(log.status, RunStatus::Failed);
    let message = log.error_message.unwrap();
    assert!(message.contains("Extraction error"), "message: {message}");
    // Nothing was loaded for this run
    assert_eq!(log.records_loaded, 0);
}

#[tokio::test]
async fn one_malformed_record_discards_the_entire_run() {
    let mut stub = StubConnector::shopify_fixture();
    // A customer with no id cannot be normalized
    stub.customers.push(json!({"email": "no-id@example.com"}));

    let store = Arc::new(MemoryStore::new());
    let orchestrator = PipelineOrchestrator::new(
        "commerce-etl",
        vec![Arc::new(stub) as Arc<dyn SourceConnector>],
        store.clone(),
    )
    .with_calculation_date(calc_date());

    let log = orchestrator.run_for_source(SourceType::Shopify).await;

    assert_eq!(log.status, RunStatus::Failed);
    assert_eq!(log.records_extracted, 6);
    assert_eq!(log.records_transformed, 0);
    assert_eq!(log.records_loaded, 0);
    assert!(log.error_message.unwrap().contains("Normalization error"));

    // Fail-fast means no partial load: the store saw nothing
    assert!(store
        .customers_with_orders(SourceType::Shopify)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn run_all_isolates_failures_between_sources() {
    let mut failing = StubConnector::new(SourceType::Commercetools);
    failing.fail_connection = true;
    let healthy = StubConnector::shopify_fixture();

    let store = Arc::new(MemoryStore::new());
    let orchestrator = PipelineOrchestrator::new(
        "commerce-etl",
        vec![Arc::new(failing) as Arc<dyn SourceConnector>, Arc::new(healthy) as Arc<dyn SourceConnector>],
        store.clone(),
    )
    .with_calculation_date(calc_date());

    let outcomes = orchestrator.run_all().await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[&SourceType::Commercetools].status, RunStatus::Failed);
    assert_eq!(outcomes[&SourceType::Shopify].status, RunStatus::Success);

    // Both outcomes were persisted
    assert_eq!(store.run_count().await, 2);
}

#[tokio::test]
async fn unconfigured_source_fails_without_panicking() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = PipelineOrchestrator::new("commerce-etl", vec![], store.clone());

    let log = orchestrator.run_for_source(SourceType::WooCommerce).await;
    assert_eq!(log.status, RunStatus::Failed);
    assert!(log.error_message.unwrap().contains("not configured"));
}

#[tokio::test]
async fn customers_get_purchase_dates_from_loaded_orders() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = PipelineOrchestrator::new(
        "commerce-etl",
        vec![Arc::new(StubConnector::shopify_fixture()) as Arc<dyn SourceConnector>],
        store.clone(),
    )
    .with_calculation_date(calc_date());

    orchestrator.run_for_source(SourceType::Shopify).await;

    let customers = store
        .customers_with_orders(SourceType::Shopify)
        .await
        .unwrap();
    let ada = customers
        .iter()
        .find(|c| c.customer.email.as_deref() == Some("ada@example.com"))
        .expect("ada must be stored");

    let expected = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
    assert_eq!(ada.customer.first_purchase_date, Some(expected));
    assert_eq!(ada.customer.last_purchase_date, Some(expected));
    assert_eq!(ada.orders.len(), 1);
}
