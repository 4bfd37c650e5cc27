//! Catalog display fields joined onto order line items.

use serde::{Deserialize, Serialize};

use ekart_core::{Money, ProductId};

/// Hosted product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub product_name: String,
    pub product_price: Option<Money>,
    pub product_img: Vec<ProductImage>,
}
