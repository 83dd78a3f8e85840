//! Daily business aggregates
//!
//! Builds one [`DailyMetrics`] row from the orders of a single source,
//! keeping only orders whose `processed_at` calendar date (UTC, ignoring
//! time of day) matches the calculation date.

use crate::domain::entities::Order;
use crate::domain::metrics::{DailyMetrics, ProductSales};
use crate::domain::source::SourceType;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Bucket used for orders that carry no sales channel
const DEFAULT_CHANNEL: &str = "direct";

/// Number of products reported in the top-sellers list
const TOP_PRODUCTS_LIMIT: usize = 10;

/// Compute daily aggregates for one (date, source) pair
///
/// The new-vs-returning split is a same-day heuristic: a customer with
/// exactly one order that day counts as new, more than one as returning.
/// It is not true historical first-purchase detection. Orders without a
/// linked customer are excluded from the split and the distinct-customer
/// count.
pub fn calculate_daily_metrics(
    orders: &[Order],
    source_type: SourceType,
    calculation_date: NaiveDate,
) -> DailyMetrics {
    let day_orders: Vec<&Order> = orders
        .iter()
        .filter(|o| o.processed_at.date_naive() == calculation_date)
        .collect();

    let total_orders = day_orders.len() as u32;
    let total_revenue: f64 = day_orders.iter().map(|o| o.total).sum();
    let average_order_value = if total_orders > 0 {
        total_revenue / total_orders as f64
    } else {
        0.0
    };
    let total_products_sold: u64 = day_orders.iter().map(|o| o.units_sold()).sum();

    // Per-customer same-day order counts drive both the distinct-customer
    // count and the new/returning split
    let mut orders_per_customer: HashMap<i64, u32> = HashMap::new();
    for order in &day_orders {
        if let Some(customer_id) = order.customer_id {
            *orders_per_customer.entry(customer_id).or_insert(0) += 1;
        }
    }
    let total_customers = orders_per_customer.len() as u32;
    let new_customers = orders_per_customer.values().filter(|&&n| n == 1).count() as u32;
    let returning_customers = orders_per_customer.values().filter(|&&n| n > 1).count() as u32;

    let mut revenue_by_source: BTreeMap<String, f64> = BTreeMap::new();
    for order in &day_orders {
        let channel = order
            .source_channel
            .clone()
            .unwrap_or_else(|| DEFAULT_CHANNEL.to_string());
        *revenue_by_source.entry(channel).or_insert(0.0) += order.total;
    }

    let top_selling_products = top_selling_products(&day_orders);

    DailyMetrics {
        metric_date: calculation_date,
        source_type,
        total_revenue,
        total_orders,
        total_customers,
        average_order_value,
        total_products_sold,
        new_customers,
        returning_customers,
        revenue_by_source,
        top_selling_products,
    }
}

/// Aggregate line items into the top products by revenue
///
/// Items referencing a catalog product group by product id; custom line
/// items group by title. Accumulation order follows order of appearance, and
/// the descending sort is stable, so revenue ties keep first-seen order.
fn top_selling_products(day_orders: &[&Order]) -> Vec<ProductSales> {
    let mut sales: Vec<ProductSales> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for order in day_orders {
        for item in &order.line_items {
            let key = item
                .source_product_id
                .clone()
                .unwrap_or_else(|| format!("title:{}", item.title));

            let idx = *index_by_key.entry(key).or_insert_with(|| {
                sales.push(ProductSales {
                    product_id: item.source_product_id.clone(),
                    title: item.title.clone(),
                    quantity: 0,
                    revenue: 0.0,
                });
                sales.len() - 1
            });

            sales[idx].quantity += item.quantity as u64;
            sales[idx].revenue += item.revenue();
        }
    }

    sales.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    sales.truncate(TOP_PRODUCTS_LIMIT);
    sales
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{FinancialStatus, OrderItem};
    use chrono::{TimeZone, Utc};

    const EPSILON: f64 = 1e-9;

    fn order(
        day: u32,
        total: f64,
        customer_id: Option<i64>,
        channel: Option<&str>,
        items: Vec<OrderItem>,
    ) -> Order {
        Order {
            source_id: format!("o-{day}-{total}"),
            source_type: SourceType::Shopify,
            customer_id,
            customer_email: None,
            order_number: None,
            subtotal: total,
            tax: 0.0,
            discounts: 0.0,
            shipping: 0.0,
            total,
            currency: Some("USD".to_string()),
            financial_status: FinancialStatus::Paid,
            source_channel: channel.map(String::from),
            processed_at: Utc.with_ymd_and_hms(2024, 1, day, 9, 30, 0).unwrap(),
            line_items: items,
        }
    }

    fn item(product_id: Option<&str>, title: &str, quantity: u32, price: f64) -> OrderItem {
        OrderItem {
            source_product_id: product_id.map(String::from),
            title: title.to_string(),
            quantity,
            price,
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_only_same_date_orders_included() {
        let orders = vec![
            order(15, 100.0, Some(1), None, vec![]),
            order(15, 125.0, Some(2), None, vec![]),
            order(14, 500.0, Some(3), None, vec![]),
        ];

        let metrics = calculate_daily_metrics(&orders, SourceType::Shopify, date(15));

        assert_eq!(metrics.total_orders, 2);
        assert!((metrics.total_revenue - 225.0).abs() < EPSILON);
    }

    #[test]
    fn test_empty_day_yields_zeroes() {
        let orders = vec![order(14, 500.0, Some(3), None, vec![])];
        let metrics = calculate_daily_metrics(&orders, SourceType::Shopify, date(20));

        assert_eq!(metrics.total_orders, 0);
        assert!(metrics.total_revenue.abs() < EPSILON);
        assert!(metrics.average_order_value.abs() < EPSILON);
        assert_eq!(metrics.total_products_sold, 0);
        assert!(metrics.top_selling_products.is_empty());
        assert!(metrics.revenue_by_source.is_empty());
    }

    #[test]
    fn test_products_sold_sums_quantities() {
        let orders = vec![
            order(
                10,
                60.0,
                Some(1),
                None,
                vec![item(Some("p-1"), "Widget", 2, 10.0), item(Some("p-2"), "Gadget", 4, 10.0)],
            ),
            order(10, 30.0, Some(2), None, vec![item(Some("p-1"), "Widget", 3, 10.0)]),
        ];

        let metrics = calculate_daily_metrics(&orders, SourceType::Shopify, date(10));
        assert_eq!(metrics.total_products_sold, 9);
    }

    #[test]
    fn test_revenue_by_source_defaults_to_direct() {
        let orders = vec![
            order(10, 100.0, Some(1), Some("web"), vec![]),
            order(10, 50.0, Some(2), None, vec![]),
            order(10, 25.0, Some(3), Some("web"), vec![]),
        ];

        let metrics = calculate_daily_metrics(&orders, SourceType::Shopify, date(10));
        assert!((metrics.revenue_by_source["web"] - 125.0).abs() < EPSILON);
        assert!((metrics.revenue_by_source["direct"] - 50.0).abs() < EPSILON);
    }

    #[test]
    fn test_new_vs_returning_same_day_heuristic() {
        let orders = vec![
            order(10, 10.0, Some(1), None, vec![]),
            order(10, 10.0, Some(2), None, vec![]),
            order(10, 10.0, Some(2), None, vec![]),
            // Anonymous order: excluded from the split
            order(10, 10.0, None, None, vec![]),
        ];

        let metrics = calculate_daily_metrics(&orders, SourceType::Shopify, date(10));
        assert_eq!(metrics.total_customers, 2);
        assert_eq!(metrics.new_customers, 1);
        assert_eq!(metrics.returning_customers, 1);
    }

    #[test]
    fn test_top_products_sorted_by_revenue_desc() {
        let orders = vec![order(
            10,
            0.0,
            Some(1),
            None,
            vec![
                item(Some("p-low"), "Low", 1, 10.0),
                item(Some("p-high"), "High", 2, 50.0),
                item(Some("p-mid"), "Mid", 3, 15.0),
            ],
        )];

        let metrics = calculate_daily_metrics(&orders, SourceType::Shopify, date(10));
        let titles: Vec<&str> = metrics
            .top_selling_products
            .iter()
            .map(|p| p.title.as_str())
            .collect();
        assert_eq!(titles, vec!["High", "Mid", "Low"]);
    }

    #[test]
    fn test_top_products_ties_keep_first_seen_order() {
        let orders = vec![order(
            10,
            0.0,
            Some(1),
            None,
            vec![
                item(Some("p-a"), "First", 1, 20.0),
                item(Some("p-b"), "Second", 1, 20.0),
            ],
        )];

        let metrics = calculate_daily_metrics(&orders, SourceType::Shopify, date(10));
        assert_eq!(metrics.top_selling_products[0].title, "First");
        assert_eq!(metrics.top_selling_products[1].title, "Second");
    }

    #[test]
    fn test_top_products_truncated_to_ten() {
        let items: Vec<OrderItem> = (0..15)
            .map(|i| item(Some(&format!("p-{i}")), &format!("Product {i}"), 1, i as f64))
            .collect();
        let orders = vec![order(10, 0.0, Some(1), None, items)];

        let metrics = calculate_daily_metrics(&orders, SourceType::Shopify, date(10));
        assert_eq!(metrics.top_selling_products.len(), 10);
        // Highest-revenue product survives the cut
        assert_eq!(metrics.top_selling_products[0].title, "Product 14");
    }

    #[test]
    fn test_custom_items_group_by_title() {
        let orders = vec![
            order(10, 0.0, Some(1), None, vec![item(None, "Gift Wrap", 1, 5.0)]),
            order(10, 0.0, Some(2), None, vec![item(None, "Gift Wrap", 2, 5.0)]),
        ];

        let metrics = calculate_daily_metrics(&orders, SourceType::Shopify, date(10));
        assert_eq!(metrics.top_selling_products.len(), 1);
        assert_eq!(metrics.top_selling_products[0].quantity, 3);
        assert!(metrics.top_selling_products[0].product_id.is_none());
    }
}
