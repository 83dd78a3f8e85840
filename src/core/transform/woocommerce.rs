//! WooCommerce REST API v3 dialect

use super::{count, first_timestamp, money, opt_str, opt_timestamp, required_id};
use crate::domain::entities::{Customer, FinancialStatus, Order, OrderItem, Product};
use crate::domain::errors::TidemarkError;
use crate::domain::result::Result;
use crate::domain::source::SourceType;
use serde_json::Value;
use std::str::FromStr;

pub(super) fn customer(raw: &Value) -> Result<Customer> {
    Ok(Customer {
        source_id: required_id(raw, "id")?,
        source_type: SourceType::WooCommerce,
        email: opt_str(raw, "email"),
        first_name: opt_str(raw, "first_name"),
        last_name: opt_str(raw, "last_name"),
        // WooCommerce does not report lifetime spend on the customer
        // resource; both aggregates are derived from orders after loading
        total_spent: 0.0,
        orders_count: 0,
        first_purchase_date: None,
        last_purchase_date: None,
        created_at: opt_timestamp(raw, "date_created_gmt")?
            .map(Some)
            .unwrap_or(opt_timestamp(raw, "date_created")?),
    })
}

pub(super) fn product(raw: &Value) -> Result<Product> {
    Ok(Product {
        source_id: required_id(raw, "id")?,
        source_type: SourceType::WooCommerce,
        title: opt_str(raw, "name")
            .ok_or_else(|| TidemarkError::normalization("missing product 'name'", raw))?,
        sku: opt_str(raw, "sku"),
        price: money(raw, "price")?,
        product_type: opt_str(raw, "type"),
        vendor: None,
        created_at: opt_timestamp(raw, "date_created_gmt")?
            .map(Some)
            .unwrap_or(opt_timestamp(raw, "date_created")?),
    })
}

pub(super) fn order(raw: &Value) -> Result<Order> {
    let line_items = raw
        .get("line_items")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(order_item).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();

    let total = money(raw, "total")?;
    let tax = money(raw, "total_tax")?;
    let shipping = money(raw, "shipping_total")?;

    // Woo carries the order status ("processing", "completed", "refunded",
    // ...) rather than a separate financial status
    let financial_status = opt_str(raw, "status")
        .map(|s| FinancialStatus::from_str(&s).unwrap_or(FinancialStatus::Unknown))
        .unwrap_or(FinancialStatus::Unknown);

    let customer_email = raw
        .get("billing")
        .and_then(|billing| opt_str(billing, "email"));

    Ok(Order {
        source_id: required_id(raw, "id")?,
        source_type: SourceType::WooCommerce,
        customer_id: None,
        customer_email,
        order_number: opt_str(raw, "number"),
        // No order-level subtotal on the wire; goods value is what remains
        // after stripping tax and shipping from the grand total
        subtotal: total - tax - shipping,
        tax,
        discounts: money(raw, "discount_total")?,
        shipping,
        total,
        currency: opt_str(raw, "currency"),
        financial_status,
        source_channel: opt_str(raw, "created_via"),
        processed_at: first_timestamp(
            raw,
            &["date_paid_gmt", "date_created_gmt", "date_paid", "date_created"],
        )?,
        line_items,
    })
}

fn order_item(raw: &Value) -> Result<OrderItem> {
    let product_id = raw
        .get("product_id")
        .and_then(Value::as_u64)
        .filter(|&id| id != 0)
        .map(|id| id.to_string());

    Ok(OrderItem {
        source_product_id: product_id,
        title: opt_str(raw, "name")
            .ok_or_else(|| TidemarkError::normalization("missing line item 'name'", raw))?,
        quantity: count(raw, "quantity"),
        price: money(raw, "price")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_customer_naive_timestamps() {
        let raw = json!({
            "id": 25,
            "email": "john.doe@example.com",
            "first_name": "John",
            "last_name": "Doe",
            "date_created": "2017-03-21T16:09:28"
        });

        let c = customer(&raw).unwrap();
        assert_eq!(c.source_id, "25");
        assert_eq!(c.source_type, SourceType::WooCommerce);
        assert!(c.created_at.is_some());
        assert_eq!(c.total_spent, 0.0);
    }

    #[test]
    fn test_order_subtotal_derivation() {
        let raw = json!({
            "id": 727,
            "number": "727",
            "status": "processing",
            "currency": "USD",
            "total": "29.35",
            "total_tax": "1.35",
            "shipping_total": "10.00",
            "discount_total": "0.00",
            "created_via": "checkout",
            "billing": {"email": "john.doe@example.com"},
            "date_paid_gmt": "2017-03-22T16:28:08",
            "line_items": [
                {"product_id": 93, "name": "Woo Single #1", "quantity": 2, "price": 9.0}
            ]
        });

        let o = order(&raw).unwrap();
        assert!((o.subtotal - 18.0).abs() < 1e-9);
        assert_eq!(o.financial_status, FinancialStatus::Paid);
        assert_eq!(o.customer_email.as_deref(), Some("john.doe@example.com"));
        assert_eq!(o.source_channel.as_deref(), Some("checkout"));
        assert_eq!(o.line_items[0].source_product_id.as_deref(), Some("93"));
    }

    #[test]
    fn test_guest_item_without_product_reference() {
        let raw = json!({"name": "Custom fee", "quantity": 1, "price": 5.0, "product_id": 0});
        let item = order_item(&raw).unwrap();
        assert!(item.source_product_id.is_none());
    }

    #[test]
    fn test_refunded_status_maps() {
        let raw = json!({
            "id": 1,
            "status": "refunded",
            "total": "10.00",
            "date_created": "2024-01-01T00:00:00"
        });
        assert_eq!(order(&raw).unwrap().financial_status, FinancialStatus::Refunded);
    }

    #[test]
    fn test_product_basic() {
        let raw = json!({
            "id": 794,
            "name": "Premium Quality",
            "sku": "wp-pennant",
            "price": "21.99",
            "type": "simple",
            "date_created": "2017-03-23T17:01:14"
        });

        let p = product(&raw).unwrap();
        assert_eq!(p.title, "Premium Quality");
        assert!((p.price - 21.99).abs() < 1e-9);
        assert_eq!(p.product_type.as_deref(), Some("simple"));
    }
}
