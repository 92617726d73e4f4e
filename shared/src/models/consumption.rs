//! Consumption ledger models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why stock left the shelf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionKind {
    Sale,
    /// Units handed back to the supplier
    Return,
    /// Loss, damage or theft
    Shrinkage,
}

impl ConsumptionKind {
    pub const ALL: [ConsumptionKind; 3] = [
        ConsumptionKind::Sale,
        ConsumptionKind::Return,
        ConsumptionKind::Shrinkage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumptionKind::Sale => "sale",
            ConsumptionKind::Return => "return",
            ConsumptionKind::Shrinkage => "shrinkage",
        }
    }
}

impl std::str::FromStr for ConsumptionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale" => Ok(ConsumptionKind::Sale),
            "return" => Ok(ConsumptionKind::Return),
            "shrinkage" => Ok(ConsumptionKind::Shrinkage),
            other => Err(format!("unknown consumption kind: {}", other)),
        }
    }
}

impl std::fmt::Display for ConsumptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsumptionKind::Sale => write!(f, "Sale"),
            ConsumptionKind::Return => write!(f, "Return"),
            ConsumptionKind::Shrinkage => write!(f, "Shrinkage"),
        }
    }
}

/// Append-only ledger entry: one lot's contribution to one withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub id: i64,
    pub withdrawal_id: Uuid,
    pub lot_id: i64,
    pub product_id: i64,
    pub quantity_taken: i64,
    /// Copied from the lot at consumption time
    pub unit_cost_at_consumption: Decimal,
    pub sale_or_disposal_price: Option<Decimal>,
    pub kind: ConsumptionKind,
    pub reason_note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Ledger entry before it is persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConsumption {
    pub withdrawal_id: Uuid,
    pub lot_id: i64,
    pub product_id: i64,
    pub quantity_taken: i64,
    pub unit_cost_at_consumption: Decimal,
    pub sale_or_disposal_price: Option<Decimal>,
    pub kind: ConsumptionKind,
    pub reason_note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Per-kind totals derived from the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementTotals {
    pub kind: ConsumptionKind,
    pub quantity: i64,
    pub cost: Decimal,
    pub revenue: Option<Decimal>,
}
