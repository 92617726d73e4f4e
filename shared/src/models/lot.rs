//! Stock lot (batch) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One stock-receiving event for a product.
///
/// `remaining_quantity` only ever decreases through withdrawals or an explicit
/// administrative adjustment; `original_quantity`, `unit_cost` and `received_at`
/// are fixed at receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub id: i64,
    pub product_id: i64,
    pub original_quantity: i64,
    pub remaining_quantity: i64,
    pub unit_cost: Decimal,
    /// Arrival time, defines FIFO order (ties broken by `id`)
    pub received_at: DateTime<Utc>,
}

impl Lot {
    /// A lot with nothing left to give
    pub fn is_exhausted(&self) -> bool {
        self.remaining_quantity <= 0
    }

    /// Key used to order lots oldest-first
    pub fn fifo_key(&self) -> (DateTime<Utc>, i64) {
        (self.received_at, self.id)
    }
}

/// Data for a lot about to be received
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLot {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub received_at: DateTime<Utc>,
}
