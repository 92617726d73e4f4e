//! FIFO withdrawal engine
//!
//! A withdrawal walks the product's lots oldest-first, takes from each until the
//! request is met, writes one consumption record per lot touched and updates the
//! product aggregate. Everything happens in one transaction:
//!
//! ```text
//! Started -> (ConsumingLots)* -> Committed
//! Started -> Aborted            (storage failure, timeout, rejected shortfall)
//! ```

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::fifo::plan_withdrawal;
use shared::models::{ActivityAction, ConsumptionKind, ConsumptionRecord, NewConsumption, ProductStock};
use shared::validation::{validate_amount, validate_reason_note, validate_withdrawal_quantity};
use uuid::Uuid;
use validator::Validate;

use super::stock::{shifted_total, write_aggregate, StockService};
use crate::config::ShortfallPolicy;
use crate::error::{AppError, AppResult};

/// A request to take stock out of a product
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WithdrawInput {
    #[validate(range(min = 1, message = "Product id must be positive"))]
    pub product_id: i64,
    pub quantity: i64,
    pub kind: ConsumptionKind,
    pub reason_note: Option<String>,
    /// Unit price to value the remaining stock at; becomes the product's price
    pub valuation_price: Option<Decimal>,
    /// Price obtained per unit (sales) or charged back (returns)
    pub sale_price: Option<Decimal>,
}

/// Outcome of a committed withdrawal
#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalResult {
    /// Absent when nothing was requested
    pub withdrawal_id: Option<Uuid>,
    pub product_id: i64,
    pub requested_quantity: i64,
    pub committed_quantity: i64,
    /// Requested units the lots could not cover
    pub shortfall: i64,
    pub cost_of_goods: Decimal,
    pub records: Vec<ConsumptionRecord>,
    pub product: Option<ProductStock>,
}

impl WithdrawalResult {
    fn empty(product_id: i64) -> Self {
        Self {
            withdrawal_id: None,
            product_id,
            requested_quantity: 0,
            committed_quantity: 0,
            shortfall: 0,
            cost_of_goods: Decimal::ZERO,
            records: Vec::new(),
            product: None,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.shortfall == 0
    }
}

impl StockService {
    /// Withdraw `input.quantity` units from a product, oldest lots first.
    ///
    /// An unknown product fails with `NotFound` whatever the quantity; a zero
    /// quantity on an existing product succeeds without writing anything. When
    /// the lots hold less than requested, the configured [`ShortfallPolicy`] decides between
    /// committing what is available (reporting `shortfall`) and failing with
    /// `InsufficientStock` without writing anything.
    pub async fn withdraw(&self, actor: &str, input: WithdrawInput) -> AppResult<WithdrawalResult> {
        input.validate()?;
        validate_withdrawal_quantity(input.quantity).map_err(|msg| {
            AppError::validation("quantity", msg, "La cantidad a retirar está fuera de rango")
        })?;
        validate_reason_note(input.reason_note.as_deref()).map_err(|msg| {
            AppError::validation("reason_note", msg, "La nota no puede exceder 500 caracteres")
        })?;
        for (field, amount) in [
            ("valuation_price", input.valuation_price),
            ("sale_price", input.sale_price),
        ] {
            if let Some(amount) = amount {
                validate_amount(amount).map_err(|msg| {
                    AppError::validation(field, msg, "El precio está fuera de rango")
                })?;
            }
        }

        if input.quantity == 0 {
            self.bounded("withdraw", self.existing_product(input.product_id))
                .await?;
            return Ok(WithdrawalResult::empty(input.product_id));
        }

        let result = self
            .bounded("withdraw", self.execute_withdrawal(&input))
            .await?;

        let mut details = format!(
            "Withdrew {} of {} units of product {} ({})",
            result.committed_quantity, result.requested_quantity, result.product_id, input.kind
        );
        if result.shortfall > 0 {
            details.push_str(&format!("; shortfall of {} units", result.shortfall));
        }
        self.activity
            .record(actor, ActivityAction::StockWithdrawn, details);

        Ok(result)
    }

    async fn execute_withdrawal(&self, input: &WithdrawInput) -> AppResult<WithdrawalResult> {
        let mut tx = self.store.begin().await?;
        let product = Self::locked_product(tx.as_mut(), input.product_id).await?;

        let lots = tx.available_lots(product.id).await?;
        let plan = plan_withdrawal(&lots, input.quantity)?;

        if !plan.is_satisfied() && self.settings.shortfall_policy == ShortfallPolicy::Reject {
            tracing::info!(
                product_id = product.id,
                requested = plan.requested,
                available = plan.available,
                "Withdrawal rejected for insufficient stock"
            );
            return Err(AppError::InsufficientStock {
                requested: plan.requested,
                available: plan.available,
            });
        }

        let withdrawal_id = Uuid::new_v4();
        let occurred_at = Utc::now();
        let mut records = Vec::with_capacity(plan.allocations.len());

        for allocation in &plan.allocations {
            let left = tx
                .decrement_lot(allocation.lot_id, allocation.quantity_taken)
                .await?;
            if left != allocation.remaining_after {
                return Err(AppError::Internal(format!(
                    "lot {} changed during withdrawal (expected {} left, found {})",
                    allocation.lot_id, allocation.remaining_after, left
                )));
            }

            let record = tx
                .insert_consumption(&NewConsumption {
                    withdrawal_id,
                    lot_id: allocation.lot_id,
                    product_id: product.id,
                    quantity_taken: allocation.quantity_taken,
                    unit_cost_at_consumption: allocation.unit_cost,
                    sale_or_disposal_price: input.sale_price,
                    kind: input.kind,
                    reason_note: input.reason_note.clone(),
                    occurred_at,
                })
                .await?;
            records.push(record);
        }

        let committed = plan.committed_quantity();
        let total_quantity = shifted_total(&product, -committed)?;
        let lots_left = plan.available - committed;
        if total_quantity != lots_left {
            tracing::warn!(
                product_id = product.id,
                aggregate = total_quantity,
                lots = lots_left,
                "Product aggregate disagrees with lot balances; reconciliation needed"
            );
        }

        let unit_price = input.valuation_price.unwrap_or(product.unit_price);
        let product = write_aggregate(tx.as_mut(), &product, total_quantity, unit_price).await?;

        tx.commit().await?;

        tracing::info!(
            %withdrawal_id,
            product_id = product.id,
            requested = plan.requested,
            committed,
            shortfall = plan.shortfall,
            lots_touched = records.len(),
            "Withdrawal committed"
        );

        Ok(WithdrawalResult {
            withdrawal_id: Some(withdrawal_id),
            product_id: product.id,
            requested_quantity: plan.requested,
            committed_quantity: committed,
            shortfall: plan.shortfall,
            cost_of_goods: plan.cost_of_goods(),
            records,
            product: Some(product),
        })
    }
}
