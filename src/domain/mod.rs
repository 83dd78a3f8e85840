//! Domain models and types for Tidemark.
//!
//! This module contains the core domain models, types, and business rules:
//!
//! - **Source identification** ([`SourceType`])
//! - **Canonical entities** ([`Customer`], [`Product`], [`Order`], [`OrderItem`])
//! - **Computed metrics** ([`CustomerMetrics`], [`DailyMetrics`], [`CohortMetrics`])
//! - **Error types** ([`TidemarkError`], [`ConnectorError`], [`StoreError`])
//! - **Result type alias** ([`Result`])
//!
//! Canonical entities are platform-agnostic: the transformer maps each
//! platform's raw payloads into these shapes, and everything downstream
//! (loading, analytics) only ever sees canonical records tagged with their
//! [`SourceType`].

pub mod entities;
pub mod errors;
pub mod metrics;
pub mod result;
pub mod source;

// Re-export commonly used types for convenience
pub use entities::{Customer, FinancialStatus, Order, OrderItem, Product};
pub use errors::{ConnectorError, StoreError, TidemarkError};
pub use metrics::{CohortMetrics, CustomerMetrics, CustomerSegment, DailyMetrics, ProductSales};
pub use result::Result;
pub use source::SourceType;
