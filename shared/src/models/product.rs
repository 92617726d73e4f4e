//! Product stock aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cached product-level view of stock.
///
/// `total_value` is `total_quantity × unit_price`; it is a shelf valuation at the
/// current price, not a weighted average of the remaining lot costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStock {
    pub id: i64,
    pub name: String,
    pub unit_price: Decimal,
    pub total_quantity: i64,
    pub total_value: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductStock {
    /// The aggregate after applying a new quantity and price, or `None` when
    /// the valuation does not fit a `Decimal`
    pub fn revalued(&self, total_quantity: i64, unit_price: Decimal) -> Option<ProductStock> {
        Some(ProductStock {
            total_quantity,
            unit_price,
            total_value: stock_value(total_quantity, unit_price)?,
            ..self.clone()
        })
    }
}

/// Valuation of `quantity` units at `unit_price`
pub fn stock_value(quantity: i64, unit_price: Decimal) -> Option<Decimal> {
    Decimal::from(quantity).checked_mul(unit_price)
}

/// Data for a product about to be registered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub unit_price: Decimal,
}
