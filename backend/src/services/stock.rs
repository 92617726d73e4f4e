//! Stock service: the only writer of lots, ledger rows and product aggregates
//!
//! Operations live in sibling modules as further `impl StockService` blocks:
//! - `lot`: receiving, listing and adjusting lots
//! - `withdrawal`: FIFO withdrawals
//! - `reconciliation`: aggregate drift checks
//! - `product`: product registration
//!
//! Every mutating operation follows the same shape: open a `StockTx`, lock the
//! product row, do the work, write the aggregate through [`write_aggregate`],
//! commit. Any error or timeout drops the transaction and nothing is kept.

use std::future::Future;
use std::sync::Arc;

use rust_decimal::Decimal;
use shared::models::ProductStock;
use shared::validation::validate_stock_value;

use super::activity::ActivityLog;
use super::store::{StockStore, StockTx};
use crate::config::{ShortfallPolicy, StockConfig};
use crate::error::{AppError, AppResult};

/// Stock service shared by all handlers
#[derive(Clone)]
pub struct StockService {
    pub(crate) store: Arc<dyn StockStore>,
    pub(crate) activity: Arc<dyn ActivityLog>,
    pub(crate) settings: StockConfig,
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(
        store: Arc<dyn StockStore>,
        activity: Arc<dyn ActivityLog>,
        settings: StockConfig,
    ) -> Self {
        Self {
            store,
            activity,
            settings,
        }
    }

    pub fn shortfall_policy(&self) -> ShortfallPolicy {
        self.settings.shortfall_policy
    }

    /// Run a unit of work under the configured transaction timeout.
    ///
    /// On expiry the future is dropped together with its open `StockTx`, which
    /// rolls the transaction back.
    pub(crate) async fn bounded<T, F>(&self, operation: &str, work: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        match tokio::time::timeout(self.settings.transaction_timeout(), work).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.settings.transaction_timeout_ms,
                    "Stock transaction timed out and was rolled back"
                );
                Err(AppError::Timeout(self.settings.transaction_timeout_ms))
            }
        }
    }

    /// Committed product state or `NotFound`, without locking
    pub(crate) async fn existing_product(&self, product_id: i64) -> AppResult<ProductStock> {
        self.store
            .find_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))
    }

    /// Lock a product inside `tx` or fail with `NotFound`
    pub(crate) async fn locked_product(
        tx: &mut dyn StockTx,
        product_id: i64,
    ) -> AppResult<ProductStock> {
        tx.lock_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))
    }
}

/// Apply a signed quantity change to an aggregate total
pub(crate) fn shifted_total(product: &ProductStock, delta: i64) -> AppResult<i64> {
    product.total_quantity.checked_add(delta).ok_or_else(|| {
        AppError::InvalidQuantity(format!(
            "product {} total quantity would overflow",
            product.id
        ))
    })
}

/// Write a product's aggregate as `total_quantity` units valued at `unit_price`.
///
/// All aggregate changes go through here with absolute values computed under
/// the product row lock. A valuation that does not fit the aggregate column is
/// refused before anything is written.
pub(crate) async fn write_aggregate(
    tx: &mut dyn StockTx,
    product: &ProductStock,
    total_quantity: i64,
    unit_price: Decimal,
) -> AppResult<ProductStock> {
    let out_of_range = || {
        AppError::InvalidQuantity(format!(
            "stock value of product {} is out of range ({} units at {})",
            product.id, total_quantity, unit_price
        ))
    };

    let next = product
        .revalued(total_quantity, unit_price)
        .ok_or_else(out_of_range)?;
    validate_stock_value(next.total_value).map_err(|_| out_of_range())?;

    tx.write_aggregate(product.id, next.total_quantity, next.unit_price, next.total_value)
        .await
}
