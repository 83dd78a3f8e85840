//! Customer analytics engine
//!
//! Deterministic, synchronous computation over in-memory entity sets: no
//! I/O, no hidden state. Every function is a pure function of its arguments
//! plus an explicit calculation timestamp, so the same inputs always produce
//! the same metrics and calls are safe to issue concurrently across
//! independent customers.

pub mod cohort;
pub mod customer;
pub mod daily;
pub mod rfm;

pub use cohort::analyze_cohorts;
pub use customer::{calculate_customer_metrics, churn_probability};
pub use daily::calculate_daily_metrics;
pub use rfm::RfmScores;
