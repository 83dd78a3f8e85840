//! Canonical commerce entities
//!
//! These are the source-agnostic records produced by the transformer from raw
//! platform payloads. All monetary amounts are in the order's currency as
//! floating-point major units; all timestamps are UTC.

use crate::domain::source::SourceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A customer, unique per (source_id, source_type)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Identifier assigned by the source platform
    pub source_id: String,

    /// Platform this customer came from
    pub source_type: SourceType,

    /// Email address, used for order linking; not all platforms require one
    pub email: Option<String>,

    pub first_name: Option<String>,

    pub last_name: Option<String>,

    /// Lifetime spend as reported by the platform (0 when not reported)
    pub total_spent: f64,

    /// Lifetime order count as reported by the platform (0 when not reported)
    pub orders_count: u32,

    /// Derived from loaded orders after each run; None until first load
    pub first_purchase_date: Option<DateTime<Utc>>,

    /// Derived from loaded orders after each run; None until first load
    pub last_purchase_date: Option<DateTime<Utc>>,

    /// When the platform created the customer record
    pub created_at: Option<DateTime<Utc>>,
}

impl Customer {
    /// Full display name, or the email when no name parts are present
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.email.clone().unwrap_or_else(|| self.source_id.clone()),
        }
    }
}

/// A product, unique per (source_id, source_type)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub source_id: String,

    pub source_type: SourceType,

    pub title: String,

    pub sku: Option<String>,

    /// Current list price of the default variant
    pub price: f64,

    pub product_type: Option<String>,

    pub vendor: Option<String>,

    pub created_at: Option<DateTime<Utc>>,
}

/// Payment state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialStatus {
    Pending,
    Paid,
    PartiallyPaid,
    Refunded,
    PartiallyRefunded,
    Voided,
    /// Platform reported a status Tidemark does not model
    Unknown,
}

impl FinancialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinancialStatus::Pending => "pending",
            FinancialStatus::Paid => "paid",
            FinancialStatus::PartiallyPaid => "partially_paid",
            FinancialStatus::Refunded => "refunded",
            FinancialStatus::PartiallyRefunded => "partially_refunded",
            FinancialStatus::Voided => "voided",
            FinancialStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FinancialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FinancialStatus {
    type Err = std::convert::Infallible;

    /// Lenient by design: platforms disagree on status vocabularies, and an
    /// unrecognized status must not fail normalization of an otherwise valid
    /// order.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "pending" | "on-hold" | "authorized" => FinancialStatus::Pending,
            "paid" | "completed" | "processing" => FinancialStatus::Paid,
            "partially_paid" => FinancialStatus::PartiallyPaid,
            "refunded" => FinancialStatus::Refunded,
            "partially_refunded" => FinancialStatus::PartiallyRefunded,
            "voided" | "cancelled" | "failed" => FinancialStatus::Voided,
            _ => FinancialStatus::Unknown,
        })
    }
}

/// A line item within an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    /// Source platform's product identifier; None when the item does not
    /// reference a catalog product (custom/manual line items)
    pub source_product_id: Option<String>,

    pub title: String,

    pub quantity: u32,

    /// Unit price
    pub price: f64,
}

impl OrderItem {
    /// Revenue contributed by this line (unit price x quantity)
    pub fn revenue(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

/// An order, unique per (source_id, source_type)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub source_id: String,

    pub source_type: SourceType,

    /// Store row id of the owning customer; None until linked by email match
    /// during loading
    pub customer_id: Option<i64>,

    /// Email carried on the order, used to resolve `customer_id`
    pub customer_email: Option<String>,

    /// Human-facing order number when the platform exposes one
    pub order_number: Option<String>,

    pub subtotal: f64,

    pub tax: f64,

    pub discounts: f64,

    pub shipping: f64,

    pub total: f64,

    pub currency: Option<String>,

    pub financial_status: FinancialStatus,

    /// Sales channel the order was placed through ("web", "pos", ...);
    /// aggregations bucket missing channels under "direct"
    pub source_channel: Option<String>,

    /// The authoritative timestamp for all date-bucketed calculations
    pub processed_at: DateTime<Utc>,

    pub line_items: Vec<OrderItem>,
}

impl Order {
    /// Total units across all line items
    pub fn units_sold(&self) -> u64 {
        self.line_items.iter().map(|i| i.quantity as u64).sum()
    }
}
