//! Pipeline orchestrator - per-source ETL state machine
//!
//! Sequences extraction, normalization, loading, and metric computation for
//! each configured source, records one run log per run, and isolates
//! failures so one source's run can never abort another's.

use crate::adapters::connectors::traits::SourceConnector;
use crate::adapters::store::traits::CommerceStore;
use crate::core::analytics;
use crate::core::pipeline::load::LoadSummary;
use crate::core::pipeline::run_log::EtlRunLog;
use crate::core::pipeline::stage::PipelineStage;
use crate::core::transform;
use crate::domain::entities::{Customer, Order, Product};
use crate::domain::errors::TidemarkError;
use crate::domain::result::Result;
use crate::domain::source::SourceType;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Pipeline orchestrator
///
/// Owns the connector set and the store handle for the lifetime of a run.
/// Sources are processed sequentially: this bounds concurrent load on
/// rate-limited source APIs and on the shared connection pool, and keeps
/// failure isolation trivial.
pub struct PipelineOrchestrator {
    pipeline_name: String,
    connectors: BTreeMap<SourceType, Arc<dyn SourceConnector>>,
    store: Arc<dyn CommerceStore>,
    calculation_date: Option<NaiveDate>,
}

impl PipelineOrchestrator {
    /// Create a new orchestrator over the given connectors and store
    pub fn new(
        pipeline_name: impl Into<String>,
        connectors: Vec<Arc<dyn SourceConnector>>,
        store: Arc<dyn CommerceStore>,
    ) -> Self {
        let connectors = connectors
            .into_iter()
            .map(|c| (c.source_type(), c))
            .collect();
        Self {
            pipeline_name: pipeline_name.into(),
            connectors,
            store,
            calculation_date: None,
        }
    }

    /// Override the calculation date (defaults to the current UTC date);
    /// used for backfills and deterministic tests
    pub fn with_calculation_date(mut self, date: NaiveDate) -> Self {
        self.calculation_date = Some(date);
        self
    }

    /// Run the pipeline for every configured source, sequentially
    ///
    /// Each source's outcome is independent: a failed run is recorded and
    /// the next source still executes. Returns the run log per source.
    pub async fn run_all(&self) -> BTreeMap<SourceType, EtlRunLog> {
        let mut outcomes = BTreeMap::new();

        tracing::info!(
            pipeline = %self.pipeline_name,
            source_count = self.connectors.len(),
            "Starting pipeline run for all sources"
        );

        for source in self.connectors.keys().copied().collect::<Vec<_>>() {
            let log = self.run_for_source(source).await;
            outcomes.insert(source, log);
        }

        let failed = outcomes.values().filter(|l| l.is_failed()).count();
        tracing::info!(
            pipeline = %self.pipeline_name,
            total = outcomes.len(),
            failed = failed,
            "Pipeline run completed for all sources"
        );

        outcomes
    }

    /// Run the full stage sequence for one source
    ///
    /// Never returns an error: stage-fatal failures are caught here, stamped
    /// onto the run log, and persisted. The returned log is the one that was
    /// written to the store.
    pub async fn run_for_source(&self, source: SourceType) -> EtlRunLog {
        let mut log = EtlRunLog::start(&self.pipeline_name, source);
        let mut summary = LoadSummary::new();
        let mut stage = PipelineStage::Idle;

        tracing::info!(
            pipeline = %self.pipeline_name,
            source = %source,
            run_id = %log.run_id,
            "Starting run"
        );

        let connector = match self.connectors.get(&source) {
            Some(c) => Arc::clone(c),
            None => {
                log.mark_failed(format!("Source '{source}' is not configured"));
                self.persist_log(&log).await;
                return log;
            }
        };

        match self
            .execute_stages(connector.as_ref(), source, &mut log, &mut summary, &mut stage)
            .await
        {
            Ok(()) => {
                stage = PipelineStage::Success;
                log.mark_success(summary.to_metadata());
                tracing::info!(
                    source = %source,
                    run_id = %log.run_id,
                    extracted = log.records_extracted,
                    transformed = log.records_transformed,
                    loaded = log.records_loaded,
                    load_failures = summary.total_failed(),
                    "Run succeeded"
                );
            }
            Err(e) => {
                let failed_stage = stage;
                stage = PipelineStage::Failed;
                log.mark_failed(e.to_string());
                tracing::error!(
                    source = %source,
                    run_id = %log.run_id,
                    failed_stage = %failed_stage,
                    error = %e,
                    "Run failed"
                );
            }
        }
        debug_assert!(stage.is_terminal());

        self.persist_log(&log).await;
        log
    }

    /// The six fallible stages, in order; any error unwinds to
    /// `run_for_source` with `stage` left at the failing stage
    async fn execute_stages(
        &self,
        connector: &dyn SourceConnector,
        source: SourceType,
        log: &mut EtlRunLog,
        summary: &mut LoadSummary,
        stage: &mut PipelineStage,
    ) -> Result<()> {
        let as_of = self.as_of_timestamp();
        let calculation_date = as_of.date_naive();

        // 1. Connecting
        *stage = PipelineStage::Connecting;
        connector.test_connection().await.map_err(|e| {
            TidemarkError::Connection(format!("failed to connect to {source}: {e}"))
        })?;

        // 2. DeterminingWatermark
        *stage = PipelineStage::DeterminingWatermark;
        let since = self
            .store
            .last_successful_run(&self.pipeline_name, source)
            .await?
            .and_then(|run| run.completed_at);
        match since {
            Some(watermark) => tracing::info!(
                source = %source,
                since = %watermark,
                "Found watermark - incremental extraction"
            ),
            None => tracing::info!(source = %source, "No previous successful run - full extraction"),
        }

        // 3. Extracting (customers, then products, then orders)
        *stage = PipelineStage::Extracting;
        let raw_customers = connector.fetch_customers(since).await.map_err(|e| {
            TidemarkError::Extraction(format!("fetching customers from {source} failed: {e}"))
        })?;
        let raw_products = connector.fetch_products(since).await.map_err(|e| {
            TidemarkError::Extraction(format!("fetching products from {source} failed: {e}"))
        })?;
        let raw_orders = connector.fetch_orders(since).await.map_err(|e| {
            TidemarkError::Extraction(format!("fetching orders from {source} failed: {e}"))
        })?;
        log.records_extracted =
            (raw_customers.len() + raw_products.len() + raw_orders.len()) as u64;
        tracing::info!(
            source = %source,
            customers = raw_customers.len(),
            products = raw_products.len(),
            orders = raw_orders.len(),
            "Extraction complete"
        );

        // 4. Transforming (fail-fast: the first unparsable record aborts the
        // run, so a source with one malformed record produces no data for
        // this run rather than an inconsistent partial load)
        *stage = PipelineStage::Transforming;
        let mut customers = Vec::with_capacity(raw_customers.len());
        for raw in &raw_customers {
            customers.push(transform::normalize_customer(raw, source)?);
        }
        let mut products = Vec::with_capacity(raw_products.len());
        for raw in &raw_products {
            products.push(transform::normalize_product(raw, source)?);
        }
        let mut orders = Vec::with_capacity(raw_orders.len());
        for raw in &raw_orders {
            orders.push(transform::normalize_order(raw, source)?);
        }
        log.records_transformed = (customers.len() + products.len() + orders.len()) as u64;

        // 5. Loading
        *stage = PipelineStage::Loading;
        self.load_entities(source, &customers, &products, &orders, summary)
            .await?;
        log.records_loaded = summary.total_inserted();
        tracing::info!(
            source = %source,
            inserted = summary.total_inserted(),
            failed = summary.total_failed(),
            "Loading complete"
        );

        // 6. ComputingMetrics
        *stage = PipelineStage::ComputingMetrics;
        self.compute_metrics(source, as_of, calculation_date).await?;

        Ok(())
    }

    /// Load canonical entities, attempting each one independently
    ///
    /// Per-entity upsert failures are captured in the summary and never
    /// abort the batch; only lookup and bookkeeping failures are fatal.
    async fn load_entities(
        &self,
        source: SourceType,
        customers: &[Customer],
        products: &[Product],
        orders: &[Order],
        summary: &mut LoadSummary,
    ) -> Result<()> {
        for customer in customers {
            match self.store.upsert_customer(customer).await {
                Ok(_) => summary.customers.record_success(),
                Err(e) => {
                    tracing::warn!(
                        source = %source,
                        source_id = %customer.source_id,
                        error = %e,
                        "Failed to upsert customer"
                    );
                    summary.customers.record_failure(&customer.source_id, e.to_string());
                }
            }
        }

        for product in products {
            match self.store.upsert_product(product).await {
                Ok(_) => summary.products.record_success(),
                Err(e) => {
                    tracing::warn!(
                        source = %source,
                        source_id = %product.source_id,
                        error = %e,
                        "Failed to upsert product"
                    );
                    summary.products.record_failure(&product.source_id, e.to_string());
                }
            }
        }

        // Purchase date range per linked customer, folded over loaded orders
        let mut purchase_ranges: HashMap<i64, (DateTime<Utc>, DateTime<Utc>)> = HashMap::new();

        for order in orders {
            let customer_id = match &order.customer_email {
                Some(email) => self
                    .store
                    .find_customer_id(email, source)
                    .await
                    .map_err(|e| {
                        TidemarkError::Load(format!(
                            "customer lookup failed for order {}: {e}",
                            order.source_id
                        ))
                    })?,
                None => None,
            };

            let order_id = match self.store.upsert_order(order, customer_id).await {
                Ok(id) => {
                    summary.orders.record_success();
                    id
                }
                Err(e) => {
                    tracing::warn!(
                        source = %source,
                        source_id = %order.source_id,
                        error = %e,
                        "Failed to upsert order"
                    );
                    summary.orders.record_failure(&order.source_id, e.to_string());
                    continue;
                }
            };

            for item in &order.line_items {
                let item_key = format!("{}/{}", order.source_id, item.title);

                let product_id = match &item.source_product_id {
                    Some(pid) => match self.store.find_product_id(pid, source).await {
                        Ok(id) => id,
                        Err(e) => {
                            summary.order_items.record_failure(&item_key, e.to_string());
                            continue;
                        }
                    },
                    None => None,
                };

                match self.store.insert_order_item(item, order_id, product_id).await {
                    Ok(_) => summary.order_items.record_success(),
                    Err(e) => {
                        tracing::warn!(
                            source = %source,
                            order_id = order_id,
                            item = %item.title,
                            error = %e,
                            "Failed to insert order item"
                        );
                        summary.order_items.record_failure(&item_key, e.to_string());
                    }
                }
            }

            if let Some(id) = customer_id {
                purchase_ranges
                    .entry(id)
                    .and_modify(|(first, last)| {
                        *first = (*first).min(order.processed_at);
                        *last = (*last).max(order.processed_at);
                    })
                    .or_insert((order.processed_at, order.processed_at));
            }
        }

        for (customer_id, (first, last)) in purchase_ranges {
            self.store
                .update_purchase_dates(customer_id, first, last)
                .await
                .map_err(|e| {
                    TidemarkError::Load(format!(
                        "updating purchase dates for customer {customer_id} failed: {e}"
                    ))
                })?;
        }

        Ok(())
    }

    /// Recompute metrics from the store's view of this source
    async fn compute_metrics(
        &self,
        source: SourceType,
        as_of: DateTime<Utc>,
        calculation_date: NaiveDate,
    ) -> Result<()> {
        let customers = self
            .store
            .customers_with_orders(source)
            .await
            .map_err(|e| {
                TidemarkError::Metrics(format!("querying customers with orders failed: {e}"))
            })?;

        let customer_count = customers.len();
        for entry in &customers {
            let metrics = analytics::calculate_customer_metrics(
                entry.id,
                &entry.customer,
                &entry.orders,
                as_of,
            );
            self.store.upsert_customer_metrics(&metrics).await.map_err(|e| {
                TidemarkError::Metrics(format!(
                    "upserting metrics for customer {} failed: {e}",
                    entry.id
                ))
            })?;
        }

        let day_orders = self
            .store
            .orders_for_date(source, calculation_date)
            .await
            .map_err(|e| TidemarkError::Metrics(format!("querying daily orders failed: {e}")))?;
        let daily = analytics::calculate_daily_metrics(&day_orders, source, calculation_date);
        self.store
            .upsert_daily_metrics(&daily)
            .await
            .map_err(|e| TidemarkError::Metrics(format!("upserting daily metrics failed: {e}")))?;

        tracing::info!(
            source = %source,
            customers = customer_count,
            metric_date = %calculation_date,
            daily_orders = daily.total_orders,
            "Metrics computed"
        );

        Ok(())
    }

    /// Point in time metrics are computed "as of"
    fn as_of_timestamp(&self) -> DateTime<Utc> {
        match self.calculation_date {
            Some(date) => date
                .and_hms_opt(23, 59, 59)
                .map(|dt| dt.and_utc())
                .unwrap_or_else(Utc::now),
            None => Utc::now(),
        }
    }

    /// Persist the terminal run log; a persistence failure here is logged
    /// but does not change the run's outcome
    async fn persist_log(&self, log: &EtlRunLog) {
        if let Err(e) = self.store.log_run(log).await {
            tracing::error!(
                run_id = %log.run_id,
                source = %log.source_type,
                error = %e,
                "Failed to persist run log"
            );
        }
    }
}
