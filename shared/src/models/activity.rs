//! Activity history models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of operation recorded in the activity history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    ProductRegistered,
    LotReceived,
    LotAdjusted,
    StockWithdrawn,
    StockReconciled,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::ProductRegistered => "product_registered",
            ActivityAction::LotReceived => "lot_received",
            ActivityAction::LotAdjusted => "lot_adjusted",
            ActivityAction::StockWithdrawn => "stock_withdrawn",
            ActivityAction::StockReconciled => "stock_reconciled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "product_registered" => Some(ActivityAction::ProductRegistered),
            "lot_received" => Some(ActivityAction::LotReceived),
            "lot_adjusted" => Some(ActivityAction::LotAdjusted),
            "stock_withdrawn" => Some(ActivityAction::StockWithdrawn),
            "stock_reconciled" => Some(ActivityAction::StockReconciled),
            _ => None,
        }
    }
}

/// A row of the activity history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub occurred_at: DateTime<Utc>,
    pub actor: String,
    pub action: ActivityAction,
    pub details: String,
}
