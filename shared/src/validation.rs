//! Validation utilities for stock operations
//!
//! Each check returns a static message so callers can wrap it in their own
//! error type with the offending field name. Upper bounds mirror the column
//! types in the backend schema.

use rust_decimal::Decimal;

/// Longest accepted free-text reason on a withdrawal
pub const MAX_REASON_NOTE_LEN: usize = 500;

/// Longest accepted product name
pub const MAX_PRODUCT_NAME_LEN: usize = 255;

/// Largest quantity accepted in a single receipt, withdrawal or adjustment
pub const MAX_QUANTITY: i64 = 1_000_000_000;

/// Largest unit price or cost, `NUMERIC(14, 4)`
pub fn max_amount() -> Decimal {
    Decimal::new(99_999_999_999_999, 4)
}

/// Largest product valuation, `NUMERIC(20, 4)`
pub fn max_stock_value() -> Decimal {
    Decimal::from_i128_with_scale(99_999_999_999_999_999_999, 4)
}

// ============================================================================
// Quantity Validations
// ============================================================================

/// Withdrawals may be zero (a no-op) but never negative
pub fn validate_withdrawal_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity < 0 {
        return Err("Withdrawal quantity cannot be negative");
    }
    if quantity > MAX_QUANTITY {
        return Err("Withdrawal quantity is too large");
    }
    Ok(())
}

/// A received lot must carry at least one unit
pub fn validate_receipt_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Received quantity must be positive");
    }
    if quantity > MAX_QUANTITY {
        return Err("Received quantity is too large");
    }
    Ok(())
}

/// An adjusted lot must stay within `0..=original_quantity`
pub fn validate_adjusted_quantity(new_quantity: i64, original_quantity: i64) -> Result<(), &'static str> {
    if new_quantity < 0 {
        return Err("Lot quantity cannot be negative");
    }
    if new_quantity > original_quantity {
        return Err("Lot quantity cannot exceed the quantity originally received");
    }
    Ok(())
}

// ============================================================================
// Money Validations
// ============================================================================

/// Costs and prices are zero or positive and fit the price columns
pub fn validate_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    if amount > max_amount() {
        return Err("Amount is too large");
    }
    Ok(())
}

/// A product valuation must fit the valuation column
pub fn validate_stock_value(value: Decimal) -> Result<(), &'static str> {
    if value.abs() > max_stock_value() {
        return Err("Stock value is too large");
    }
    Ok(())
}

// ============================================================================
// Text Validations
// ============================================================================

pub fn validate_product_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Product name is required");
    }
    if trimmed.chars().count() > MAX_PRODUCT_NAME_LEN {
        return Err("Product name must be at most 255 characters");
    }
    Ok(())
}

pub fn validate_reason_note(note: Option<&str>) -> Result<(), &'static str> {
    match note {
        Some(n) if n.chars().count() > MAX_REASON_NOTE_LEN => {
            Err("Reason note must be at most 500 characters")
        }
        _ => Ok(()),
    }
}
