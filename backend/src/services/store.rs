//! Storage seam for stock mutations
//!
//! `StockService` never talks to a database directly. It opens a `StockTx`
//! through a `StockStore`, does all of its reads and writes on that unit of
//! work, and commits once. A `StockTx` dropped without `commit` must leave no
//! trace: every lot decrement, ledger row and aggregate write is discarded.
//! Read-only queries go straight to the `StockStore` and never block writers.

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{ConsumptionRecord, Lot, NewConsumption, NewLot, NewProduct, ProductStock};

use crate::error::AppResult;

/// Source of transactional units of work and of unlocked committed reads
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Open a new unit of work
    async fn begin(&self) -> AppResult<Box<dyn StockTx>>;

    /// Committed state of a product, without waiting on writers
    async fn find_product(&self, product_id: i64) -> AppResult<Option<ProductStock>>;

    /// Committed lots with stock left, oldest first by `(received_at, id)`,
    /// without taking row locks
    async fn fifo_lots(&self, product_id: i64) -> AppResult<Vec<Lot>>;
}

/// One open transaction against the stock tables.
///
/// `lock_product` and `available_lots` hold their rows until the transaction
/// ends. Callers lock the owning product before touching any of its lots, so
/// the product row serializes all writers of that product.
#[async_trait]
pub trait StockTx: Send {
    /// Fetch and lock a product row
    async fn lock_product(&mut self, product_id: i64) -> AppResult<Option<ProductStock>>;

    /// Insert a product with an empty aggregate
    async fn insert_product(&mut self, product: &NewProduct) -> AppResult<ProductStock>;

    /// Lots with stock left, oldest first by `(received_at, id)`, locked
    async fn available_lots(&mut self, product_id: i64) -> AppResult<Vec<Lot>>;

    /// Fetch a single lot, exhausted or not (no row lock)
    async fn find_lot(&mut self, lot_id: i64) -> AppResult<Option<Lot>>;

    async fn insert_lot(&mut self, lot: &NewLot) -> AppResult<Lot>;

    /// Take `amount` units from a lot and return what is left.
    ///
    /// Fails with `InvalidQuantity` when `amount` exceeds the lot's remaining
    /// quantity and with `NotFound` when the lot does not exist.
    async fn decrement_lot(&mut self, lot_id: i64, amount: i64) -> AppResult<i64>;

    /// Overwrite a lot's remaining quantity (administrative correction)
    async fn set_lot_remaining(&mut self, lot_id: i64, remaining: i64) -> AppResult<Lot>;

    async fn insert_consumption(&mut self, record: &NewConsumption) -> AppResult<ConsumptionRecord>;

    /// Write the product aggregate as absolute values
    async fn write_aggregate(
        &mut self,
        product_id: i64,
        total_quantity: i64,
        unit_price: Decimal,
        total_value: Decimal,
    ) -> AppResult<ProductStock>;

    /// Sum of `remaining_quantity` over every lot of the product
    async fn sum_remaining(&mut self, product_id: i64) -> AppResult<i64>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
