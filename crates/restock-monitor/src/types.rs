use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Envelope returned by `/remote/v1/product-attributes/{sku}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductAttributesResponse {
    pub data: ProductAttributes,
}

/// The subset of product attributes the monitor reads. Unknown fields are
/// ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductAttributes {
    pub instock: bool,
    pub price: AttributePrice,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributePrice {
    pub without_tax: PriceValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceValue {
    pub value: Decimal,
}

/// One availability observation for a SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockSnapshot {
    pub sku: String,
    pub in_stock: bool,
    pub price: Decimal,
    pub stock_count: i64,
}

impl StockSnapshot {
    /// Builds a snapshot from the API payload. The requested SKU wins over
    /// the payload's, which some products leave empty.
    #[must_use]
    pub fn from_attributes(requested_sku: &str, attrs: ProductAttributes) -> Self {
        let sku = attrs
            .sku
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| requested_sku.to_owned());
        if sku != requested_sku {
            tracing::debug!(
                requested = requested_sku,
                returned = %sku,
                "product-attributes sku differs from request"
            );
        }
        Self {
            sku: requested_sku.to_owned(),
            in_stock: attrs.instock,
            price: attrs.price.without_tax.value,
            stock_count: attrs.stock.unwrap_or(0),
        }
    }
}
