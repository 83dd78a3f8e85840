//! Computed analytics entities
//!
//! Rows produced by the analytics engine and upserted by the pipeline:
//! per-customer metrics keyed by (customer_id, calculation_date), daily
//! aggregates keyed by (metric_date, source_type), and cohort summaries.

use crate::domain::source::SourceType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Behavioral segment derived from RFM scores
///
/// The display strings are the stable vocabulary stored in the database and
/// shown in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerSegment {
    Champions,
    LoyalCustomers,
    PotentialLoyalists,
    NewCustomers,
    AtRisk,
    CannotLose,
    Hibernating,
    PriceSensitive,
    Regular,
    /// Sentinel for customers with no orders at all
    Inactive,
}

impl CustomerSegment {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerSegment::Champions => "Champions",
            CustomerSegment::LoyalCustomers => "Loyal Customers",
            CustomerSegment::PotentialLoyalists => "Potential Loyalists",
            CustomerSegment::NewCustomers => "New Customers",
            CustomerSegment::AtRisk => "At Risk",
            CustomerSegment::CannotLose => "Cannot Lose",
            CustomerSegment::Hibernating => "Hibernating",
            CustomerSegment::PriceSensitive => "Price Sensitive",
            CustomerSegment::Regular => "Regular",
            CustomerSegment::Inactive => "Inactive",
        }
    }
}

impl fmt::Display for CustomerSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-customer value and behavior metrics for one calculation date
///
/// Recomputed idempotently each run; a new row overwrites the prior row for
/// the same (customer_id, calculation_date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerMetrics {
    /// Store row id of the customer
    pub customer_id: i64,

    pub source_type: SourceType,

    pub calculation_date: NaiveDate,

    pub total_revenue: f64,

    pub total_orders: u32,

    /// total_revenue / total_orders, 0 when there are no orders
    pub average_order_value: f64,

    /// Orders per month-equivalent
    pub purchase_frequency: f64,

    /// Days between first and last order, floored at 1
    pub customer_lifespan_days: i64,

    /// Blend of historic and projected value
    pub customer_lifetime_value: f64,

    /// In [0, 1]; 1 for customers with no orders
    pub churn_probability: f64,

    /// May be negative when the calculation date precedes the last order;
    /// None for customers with no orders
    pub days_since_last_purchase: Option<i64>,

    /// Recency score, 1-5
    pub rfm_recency: u8,

    /// Frequency score, 1-5
    pub rfm_frequency: u8,

    /// Monetary score, 1-5
    pub rfm_monetary: u8,

    pub segment: CustomerSegment,
}

impl CustomerMetrics {
    /// Sum of the three RFM scores, in [3, 15]
    pub fn combined_rfm_score(&self) -> u8 {
        self.rfm_recency + self.rfm_frequency + self.rfm_monetary
    }
}

/// One product's contribution to a day's sales
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSales {
    /// Source platform product id; None for custom line items, which are
    /// grouped by title instead
    pub product_id: Option<String>,

    pub title: String,

    pub quantity: u64,

    pub revenue: f64,
}

/// Daily business aggregates for one (date, source) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub metric_date: NaiveDate,

    pub source_type: SourceType,

    /// Sum of order totals processed on the metric date
    pub total_revenue: f64,

    pub total_orders: u32,

    /// Distinct customers with at least one order that day (orders without a
    /// linked customer are excluded)
    pub total_customers: u32,

    /// 0 when there are no orders
    pub average_order_value: f64,

    /// Sum of line-item quantities
    pub total_products_sold: u64,

    /// Same-day heuristic: exactly one order that day
    pub new_customers: u32,

    /// Same-day heuristic: more than one order that day
    pub returning_customers: u32,

    /// Revenue grouped by sales channel; orders without a channel land in
    /// the "direct" bucket
    pub revenue_by_source: BTreeMap<String, f64>,

    /// Top 10 products by revenue, descending; ties keep first-seen order
    pub top_selling_products: Vec<ProductSales>,
}

/// Summary of one acquisition cohort (customers whose first purchase falls
/// in the same calendar month)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortMetrics {
    /// Cohort key in "YYYY-MM" form
    pub cohort: String,

    pub customer_count: u32,

    /// Sum of each member's lifetime order total
    pub total_revenue: f64,

    /// total_revenue / customer_count
    pub average_ltv: f64,
}
