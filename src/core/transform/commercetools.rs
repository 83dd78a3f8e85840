//! Commercetools HTTP API dialect
//!
//! Commercetools serializes money as `{centAmount, currencyCode, ...}`
//! objects and product/line-item names as localized string maps.

use super::{localized_str, opt_str, opt_timestamp, required_id};
use crate::domain::entities::{Customer, FinancialStatus, Order, OrderItem, Product};
use crate::domain::errors::TidemarkError;
use crate::domain::result::Result;
use crate::domain::source::SourceType;
use serde_json::Value;
use std::str::FromStr;

pub(super) fn customer(raw: &Value) -> Result<Customer> {
    Ok(Customer {
        source_id: required_id(raw, "id")?,
        source_type: SourceType::Commercetools,
        email: opt_str(raw, "email"),
        first_name: opt_str(raw, "firstName"),
        last_name: opt_str(raw, "lastName"),
        total_spent: 0.0,
        orders_count: 0,
        first_purchase_date: None,
        last_purchase_date: None,
        created_at: opt_timestamp(raw, "createdAt")?,
    })
}

pub(super) fn product(raw: &Value) -> Result<Product> {
    // Catalog data lives under the current (published) projection
    let current = raw
        .get("masterData")
        .and_then(|md| md.get("current"))
        .unwrap_or(raw);

    let title = current
        .get("name")
        .and_then(localized_str)
        .ok_or_else(|| TidemarkError::normalization("missing product 'name'", raw))?;

    let master_variant = current.get("masterVariant");
    let sku = master_variant.and_then(|v| opt_str(v, "sku"));
    let price = master_variant
        .and_then(|v| v.get("prices"))
        .and_then(Value::as_array)
        .and_then(|prices| prices.first())
        .and_then(|p| p.get("value"))
        .map(cent_amount)
        .transpose()?
        .unwrap_or(0.0);

    Ok(Product {
        source_id: required_id(raw, "id")?,
        source_type: SourceType::Commercetools,
        title,
        sku,
        price,
        product_type: None,
        vendor: None,
        created_at: opt_timestamp(raw, "createdAt")?,
    })
}

pub(super) fn order(raw: &Value) -> Result<Order> {
    let line_items = raw
        .get("lineItems")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(order_item).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();

    let total = raw
        .get("totalPrice")
        .map(cent_amount)
        .transpose()?
        .ok_or_else(|| TidemarkError::normalization("missing 'totalPrice'", raw))?;

    let tax = raw
        .get("taxedPrice")
        .and_then(|tp| tp.get("totalTax"))
        .map(cent_amount)
        .transpose()?
        .unwrap_or(0.0);

    let shipping = raw
        .get("shippingInfo")
        .and_then(|si| si.get("price"))
        .map(cent_amount)
        .transpose()?
        .unwrap_or(0.0);

    let discounts = raw
        .get("discountOnTotalPrice")
        .and_then(|d| d.get("discountedAmount"))
        .map(cent_amount)
        .transpose()?
        .unwrap_or(0.0);

    let financial_status = opt_str(raw, "paymentState")
        .map(|s| FinancialStatus::from_str(&s).unwrap_or(FinancialStatus::Unknown))
        .unwrap_or(FinancialStatus::Unknown);

    let currency = raw
        .get("totalPrice")
        .and_then(|tp| opt_str(tp, "currencyCode"));

    Ok(Order {
        source_id: required_id(raw, "id")?,
        source_type: SourceType::Commercetools,
        customer_id: None,
        customer_email: opt_str(raw, "customerEmail"),
        order_number: opt_str(raw, "orderNumber"),
        subtotal: total - tax - shipping,
        tax,
        discounts,
        shipping,
        total,
        currency,
        financial_status,
        source_channel: opt_str(raw, "origin"),
        processed_at: super::first_timestamp(raw, &["completedAt", "createdAt"])?,
        line_items,
    })
}

fn order_item(raw: &Value) -> Result<OrderItem> {
    let title = raw
        .get("name")
        .and_then(localized_str)
        .ok_or_else(|| TidemarkError::normalization("missing line item 'name'", raw))?;

    let price = raw
        .get("price")
        .and_then(|p| p.get("value"))
        .map(cent_amount)
        .transpose()?
        .unwrap_or(0.0);

    Ok(OrderItem {
        source_product_id: opt_str(raw, "productId"),
        title,
        quantity: super::count(raw, "quantity"),
        price,
    })
}

/// Decode a commercetools money object into major units
fn cent_amount(value: &Value) -> Result<f64> {
    let cents = value
        .get("centAmount")
        .and_then(Value::as_i64)
        .ok_or_else(|| TidemarkError::normalization("money object without 'centAmount'", value))?;
    let fraction_digits = value
        .get("fractionDigits")
        .and_then(Value::as_u64)
        .unwrap_or(2);
    Ok(cents as f64 / 10f64.powi(fraction_digits as i32))
}
