//! Shopify Admin REST API dialect

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
        source_type: SourceType::Shopify,
        email: opt_str(raw, "email"),
        first_name: opt_str(raw, "first_name"),
        last_name: opt_str(raw, "last_name"),
        total_spent: money(raw, "total_spent")?,
        orders_count: count(raw, "orders_count"),
        first_purchase_date: None,
        last_purchase_date: None,
        created_at: opt_timestamp(raw, "created_at")?,
    })
}

pub(super) fn product(raw: &Value) -> Result<Product> {
    // Price and SKU live on the first variant; products always have at
    // least one ("Default Title") variant
    let first_variant = raw
        .get("variants")
        .and_then(Value::as_array)
        .and_then(|v| v.first());

    let (sku, price) = match first_variant {
        Some(variant) => (opt_str(variant, "sku"), money(variant, "price")?),
        None => (None, 0.0),
    };

    Ok(Product {
        source_id: required_id(raw, "id")?,
        source_type: SourceType::Shopify,
        title: opt_str(raw, "title")
            .ok_or_else(|| TidemarkError::normalization("missing product 'title'", raw))?,
        sku,
        price,
        product_type: opt_str(raw, "product_type"),
        vendor: opt_str(raw, "vendor"),
        created_at: opt_timestamp(raw, "created_at")?,
    })
}

pub(super) fn order(raw: &Value) -> Result<Order> {
    let line_items = raw
        .get("line_items")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(order_item).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();

    // Shipping is itemized per shipping line
    let shipping = match raw.get("shipping_lines").and_then(Value::as_array) {
        Some(lines) => {
            let mut total = 0.0;
            for line in lines {
                total += money(line, "price")?;
            }
            total
        }
        None => 0.0,
    };

    let financial_status = opt_str(raw, "financial_status")
        .map(|s| FinancialStatus::from_str(&s).unwrap_or(FinancialStatus::Unknown))
        .unwrap_or(FinancialStatus::Unknown);

    Ok(Order {
        source_id: required_id(raw, "id")?,
        source_type: SourceType::Shopify,
        customer_id: None,
        customer_email: opt_str(raw, "email").or_else(|| opt_str(raw, "contact_email")),
        order_number: match raw.get("order_number") {
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        },
        subtotal: money(raw, "subtotal_price")?,
        tax: money(raw, "total_tax")?,
        discounts: money(raw, "total_discounts")?,
        shipping,
        total: money(raw, "total_price")?,
        currency: opt_str(raw, "currency"),
        financial_status,
        source_channel: opt_str(raw, "source_name"),
        processed_at: first_timestamp(raw, &["processed_at", "created_at"])?,
        line_items,
    })
}

fn order_item(raw: &Value) -> Result<OrderItem> {
    Ok(OrderItem {
        source_product_id: match raw.get("product_id") {
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        },
        title: opt_str(raw, "title")
            .ok_or_else(|| TidemarkError::normalization("missing line item 'title'", raw))?,
        quantity: count(raw, "quantity"),
        price: money(raw, "price")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_customer_full() {
        let raw = json!({
            "id": 706405506930370000u64,
            "email": "bob.norman@mail.example.com",
            "first_name": "Bob",
            "last_name": "Norman",
            "orders_count": 3,
            "total_spent": "199.65",
            "created_at": "2023-04-01T12:00:00-04:00"
        });

        let c = customer(&raw).unwrap();
        assert_eq!(c.source_type, SourceType::Shopify);
        assert_eq!(c.email.as_deref(), Some("bob.norman@mail.example.com"));
        assert_eq!(c.orders_count, 3);
        assert!((c.total_spent - 199.65).abs() < 1e-9);
        assert!(c.created_at.is_some());
    }

    #[test]
    fn test_customer_missing_id_fails() {
        assert!(customer(&json!({"email": "x@example.com"})).is_err());
    }

    #[test]
    fn test_product_reads_first_variant() {
        let raw = json!({
            "id": 632910392,
            "title": "IPod Nano - 8GB",
            "product_type": "Cult Products",
            "vendor": "Apple",
            "variants": [
                {"sku": "IPOD2008PINK", "price": "199.00"},
                {"sku": "IPOD2008RED", "price": "199.00"}
            ]
        });

        let p = product(&raw).unwrap();
        assert_eq!(p.sku.as_deref(), Some("IPOD2008PINK"));
        assert!((p.price - 199.0).abs() < 1e-9);
        assert_eq!(p.vendor.as_deref(), Some("Apple"));
    }

    #[test]
    fn test_order_sums_shipping_lines() {
        let raw = json!({
            "id": 450789469,
            "order_number": 1001,
            "email": "bob@example.com",
            "subtotal_price": "195.67",
            "total_tax": "11.94",
            "total_discounts": "5.00",
            "total_price": "213.61",
            "currency": "USD",
            "financial_status": "paid",
            "source_name": "web",
            "processed_at": "2024-01-15T10:00:00Z",
            "shipping_lines": [{"price": "4.00"}, {"price": "7.00"}],
            "line_items": [
                {"product_id": 632910392, "title": "IPod Nano - 8GB", "quantity": 1, "price": "199.00"}
            ]
        });

        let o = order(&raw).unwrap();
        assert!((o.shipping - 11.0).abs() < 1e-9);
        assert_eq!(o.order_number.as_deref(), Some("1001"));
        assert_eq!(o.financial_status, FinancialStatus::Paid);
        assert_eq!(o.source_channel.as_deref(), Some("web"));
        assert_eq!(o.line_items.len(), 1);
        assert_eq!(o.line_items[0].source_product_id.as_deref(), Some("632910392"));
    }

    #[test]
    fn test_order_falls_back_to_created_at() {
        let raw = json!({
            "id": 1,
            "total_price": "10.00",
            "created_at": "2024-02-01T08:00:00Z"
        });

        let o = order(&raw).unwrap();
        assert_eq!(o.processed_at.to_rfc3339(), "2024-02-01T08:00:00+00:00");
    }

    #[test]
    fn test_order_without_any_timestamp_fails() {
        let raw = json!({"id": 1, "total_price": "10.00"});
        assert!(order(&raw).is_err());
    }

    #[test]
    fn test_order_with_bad_amount_fails() {
        let raw = json!({
            "id": 1,
            "total_price": "not-a-number",
            "created_at": "2024-02-01T08:00:00Z"
        });
        assert!(order(&raw).is_err());
    }
}
