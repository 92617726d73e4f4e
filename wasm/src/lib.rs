//! WebAssembly module for the Stockroom inventory client
//!
//! Provides client-side computation for:
//! - Previewing how a withdrawal would be split across lots
//! - Stock valuation
//! - Offline input validation

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::fifo::*;
pub use shared::models::*;
pub use shared::validation::*;

/// Plan a FIFO withdrawal from a JSON array of lots
pub fn preview_plan(lots_json: &str, quantity: i64) -> Result<WithdrawalPlan, String> {
    let lots: Vec<Lot> =
        serde_json::from_str(lots_json).map_err(|e| format!("Invalid lots JSON: {}", e))?;
    plan_withdrawal(&lots, quantity).map_err(|e| e.to_string())
}

/// Preview a withdrawal; returns the plan as JSON
#[wasm_bindgen]
pub fn preview_withdrawal(lots_json: &str, quantity: i64) -> Result<String, JsValue> {
    let plan = preview_plan(lots_json, quantity).map_err(|e| JsValue::from_str(&e))?;
    serde_json::to_string(&plan).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Shelf value of `quantity` units at `unit_price`; `NaN` when out of range
#[wasm_bindgen]
pub fn calculate_stock_value(quantity: i64, unit_price: f64) -> f64 {
    let price = Decimal::try_from(unit_price).unwrap_or(Decimal::ZERO);
    stock_value(quantity, price)
        .and_then(|value| value.to_string().parse().ok())
        .unwrap_or(f64::NAN)
}

/// Check a withdrawal quantity before sending it
#[wasm_bindgen]
pub fn is_valid_withdrawal_quantity(quantity: i64) -> bool {
    validate_withdrawal_quantity(quantity).is_ok()
}

/// Check a lot correction against the lot's original quantity
#[wasm_bindgen]
pub fn is_valid_lot_adjustment(new_quantity: i64, original_quantity: i64) -> bool {
    validate_adjusted_quantity(new_quantity, original_quantity).is_ok()
}
