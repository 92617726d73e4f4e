//! Aggregate reconciliation against lot balances
//!
//! The product aggregate is a cached column. This compares it with the sum of
//! the product's lot balances and, when asked, rewrites it from that sum.

use serde::Serialize;
use shared::models::{ActivityAction, ProductStock};

use super::stock::{write_aggregate, StockService};
use crate::error::AppResult;

/// Result of comparing a product aggregate with its lots
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub product_id: i64,
    /// Aggregate before any repair
    pub aggregate_quantity: i64,
    /// Sum of remaining quantity over all lots
    pub lot_quantity: i64,
    /// `aggregate_quantity - lot_quantity`
    pub drift: i64,
    pub repaired: bool,
    pub product: ProductStock,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.drift == 0
    }
}

impl StockService {
    /// Check a product aggregate and optionally repair it from the lots
    pub async fn reconcile(
        &self,
        actor: &str,
        product_id: i64,
        repair: bool,
    ) -> AppResult<ReconciliationReport> {
        let report = self
            .bounded("reconcile", async {
                let mut tx = self.store.begin().await?;
                let product = Self::locked_product(tx.as_mut(), product_id).await?;
                let lot_quantity = tx.sum_remaining(product_id).await?;
                let drift = product.total_quantity - lot_quantity;

                let (product, repaired) = if repair && drift != 0 {
                    let unit_price = product.unit_price;
                    let fixed =
                        write_aggregate(tx.as_mut(), &product, lot_quantity, unit_price).await?;
                    (fixed, true)
                } else {
                    (product, false)
                };

                tx.commit().await?;

                Ok(ReconciliationReport {
                    product_id,
                    aggregate_quantity: lot_quantity + drift,
                    lot_quantity,
                    drift,
                    repaired,
                    product,
                })
            })
            .await?;

        if report.drift != 0 {
            tracing::warn!(
                product_id,
                aggregate = report.aggregate_quantity,
                lots = report.lot_quantity,
                repaired = report.repaired,
                "Stock aggregate drift detected"
            );
        }

        if report.repaired {
            self.activity.record(
                actor,
                ActivityAction::StockReconciled,
                format!(
                    "Product {} aggregate reset from {} to {} units",
                    product_id, report.aggregate_quantity, report.lot_quantity
                ),
            );
        }

        Ok(report)
    }
}
