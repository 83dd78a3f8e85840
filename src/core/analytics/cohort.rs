//! Acquisition cohort analysis
//!
//! Groups customers by the calendar month of their first purchase and
//! reports size, lifetime revenue, and average LTV per cohort.

use crate::adapters::store::traits::CustomerWithOrders;
use crate::domain::metrics::CohortMetrics;
use chrono::Datelike;
use std::collections::BTreeMap;

/// Group customers into monthly acquisition cohorts
///
/// Customers without a `first_purchase_date` are excluded. Each member's
/// lifetime revenue is the sum of its order totals. Cohorts are returned in
/// chronological order, keyed "YYYY-MM".
pub fn analyze_cohorts(customers: &[CustomerWithOrders]) -> Vec<CohortMetrics> {
    let mut cohorts: BTreeMap<String, (u32, f64)> = BTreeMap::new();

    for entry in customers {
        let first_purchase = match entry.customer.first_purchase_date {
            Some(ts) => ts,
            None => continue,
        };
        let key = format!("{:04}-{:02}", first_purchase.year(), first_purchase.month());

        let lifetime_revenue: f64 = entry.orders.iter().map(|o| o.total).sum();

        let cohort = cohorts.entry(key).or_insert((0, 0.0));
        cohort.0 += 1;
        cohort.1 += lifetime_revenue;
    }

    cohorts
        .into_iter()
        .map(|(cohort, (customer_count, total_revenue))| CohortMetrics {
            cohort,
            customer_count,
            total_revenue,
            average_ltv: total_revenue / customer_count as f64,
        })
        .collect()
}
