//! Lot (batch) operations: receiving, listing and administrative adjustment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use rust_decimal::Decimal;
use shared::models::{ActivityAction, Lot, NewLot, ProductStock};
use shared::validation::{validate_adjusted_quantity, validate_amount, validate_receipt_quantity};
use validator::Validate;

use super::stock::{shifted_total, write_aggregate, StockService};
use crate::error::{AppError, AppResult};

/// Input for receiving a new lot
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReceiveLotInput {
    #[validate(range(min = 1, message = "Received quantity must be positive"))]
    pub quantity: i64,
    pub unit_cost: Decimal,
    /// Defaults to the time of receipt
    pub received_at: Option<DateTime<Utc>>,
}

/// Input for an administrative lot correction
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AdjustLotInput {
    #[validate(range(
        min = 0,
        max = 1_000_000_000,
        message = "Lot quantity must be between 0 and 1000000000"
    ))]
    pub new_quantity: i64,
}

/// Outcome of a lot receipt
#[derive(Debug, Clone, Serialize)]
pub struct LotReceipt {
    pub lot: Lot,
    pub product: ProductStock,
}

/// Outcome of a lot adjustment
#[derive(Debug, Clone, Serialize)]
pub struct LotAdjustment {
    pub lot: Lot,
    pub previous_quantity: i64,
    /// `new_quantity - previous_quantity`, applied to the product aggregate
    pub delta: i64,
    pub product: ProductStock,
}

impl StockService {
    /// Receive a new lot for a product and add it to the aggregate
    pub async fn receive_lot(
        &self,
        actor: &str,
        product_id: i64,
        input: ReceiveLotInput,
    ) -> AppResult<LotReceipt> {
        input.validate()?;
        validate_receipt_quantity(input.quantity).map_err(|msg| {
            AppError::validation("quantity", msg, "La cantidad recibida está fuera de rango")
        })?;
        validate_amount(input.unit_cost).map_err(|msg| {
            AppError::validation("unit_cost", msg, "El costo unitario está fuera de rango")
        })?;

        let receipt = self
            .bounded("receive_lot", async {
                let mut tx = self.store.begin().await?;
                let product = Self::locked_product(tx.as_mut(), product_id).await?;

                let lot = tx
                    .insert_lot(&NewLot {
                        product_id,
                        quantity: input.quantity,
                        unit_cost: input.unit_cost,
                        received_at: input.received_at.unwrap_or_else(Utc::now),
                    })
                    .await?;

                let total_quantity = shifted_total(&product, input.quantity)?;
                let product =
                    write_aggregate(tx.as_mut(), &product, total_quantity, product.unit_price)
                        .await?;

                tx.commit().await?;
                Ok(LotReceipt { lot, product })
            })
            .await?;

        tracing::info!(
            product_id,
            lot_id = receipt.lot.id,
            quantity = input.quantity,
            "Lot received"
        );

        self.activity.record(
            actor,
            ActivityAction::LotReceived,
            format!(
                "Lot {} received for product {}: {} units at {}",
                receipt.lot.id, product_id, input.quantity, input.unit_cost
            ),
        );

        Ok(receipt)
    }

    /// Lots of a product that still hold stock, oldest first.
    ///
    /// Reads committed state without locks, so it neither waits for nor
    /// delays a withdrawal in progress.
    pub async fn list_available_lots(&self, product_id: i64) -> AppResult<Vec<Lot>> {
        self.bounded("list_available_lots", async {
            self.existing_product(product_id).await?;
            self.store.fifo_lots(product_id).await
        })
        .await
    }

    /// Overwrite a lot's remaining quantity and carry the difference into the
    /// product aggregate. Not part of the FIFO path.
    pub async fn adjust_lot_quantity(
        &self,
        actor: &str,
        lot_id: i64,
        input: AdjustLotInput,
    ) -> AppResult<LotAdjustment> {
        input.validate()?;
        let new_quantity = input.new_quantity;

        let adjustment = self
            .bounded("adjust_lot_quantity", async {
                let mut tx = self.store.begin().await?;

                let owner = tx
                    .find_lot(lot_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Lot {}", lot_id)))?
                    .product_id;
                let product = Self::locked_product(tx.as_mut(), owner).await?;

                // Re-read under the product lock
                let lot = tx
                    .find_lot(lot_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Lot {}", lot_id)))?;

                validate_adjusted_quantity(new_quantity, lot.original_quantity)
                    .map_err(|msg| AppError::InvalidQuantity(msg.to_string()))?;

                let delta = new_quantity - lot.remaining_quantity;
                let updated = tx.set_lot_remaining(lot_id, new_quantity).await?;
                let total_quantity = shifted_total(&product, delta)?;
                let product =
                    write_aggregate(tx.as_mut(), &product, total_quantity, product.unit_price)
                        .await?;

                tx.commit().await?;
                Ok(LotAdjustment {
                    lot: updated,
                    previous_quantity: lot.remaining_quantity,
                    delta,
                    product,
                })
            })
            .await?;

        tracing::info!(
            lot_id,
            delta = adjustment.delta,
            "Lot quantity adjusted"
        );

        self.activity.record(
            actor,
            ActivityAction::LotAdjusted,
            format!(
                "Lot {} of product {} adjusted from {} to {} units",
                lot_id, adjustment.lot.product_id, adjustment.previous_quantity, new_quantity
            ),
        );

        Ok(adjustment)
    }
}
