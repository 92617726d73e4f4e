//! In-memory stock store and activity recorder for service tests
//!
//! `MemoryStockStore` mirrors the PostgreSQL store closely enough to exercise
//! `StockService` without a database: one writer at a time, changes made on a
//! private copy and published only on commit, and optional failure injection
//! or slowdown per operation.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::models::{
    stock_value, ActivityAction, ConsumptionRecord, Lot, NewConsumption, NewLot, NewProduct,
    ProductStock,
};
use stockroom_backend::config::{ShortfallPolicy, StockConfig};
use stockroom_backend::services::{ActivityLog, StockService, StockStore, StockTx};
use stockroom_backend::{AppError, AppResult};

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub products: BTreeMap<i64, ProductStock>,
    pub lots: BTreeMap<i64, Lot>,
    pub consumptions: Vec<ConsumptionRecord>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Operation at which a transaction fails with `StorageError`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// The n-th lot decrement of the transaction (1-based)
    DecrementLot(usize),
    /// The n-th ledger insert of the transaction (1-based)
    InsertConsumption(usize),
    WriteAggregate,
    Commit,
}

#[derive(Clone, Default)]
pub struct MemoryStockStore {
    committed: Arc<Mutex<MemoryState>>,
    writer: Arc<tokio::sync::Mutex<()>>,
    fail_point: Arc<Mutex<Option<FailPoint>>>,
    lot_delay: Arc<Mutex<Option<Duration>>>,
}

impl MemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_at(&self, point: FailPoint) {
        *self.fail_point.lock().unwrap() = Some(point);
    }

    pub fn clear_failures(&self) {
        *self.fail_point.lock().unwrap() = None;
    }

    /// Make every lot decrement sleep before applying
    pub fn slow_lot_writes(&self, delay: Duration) {
        *self.lot_delay.lock().unwrap() = Some(delay);
    }

    pub fn snapshot(&self) -> MemoryState {
        self.committed.lock().unwrap().clone()
    }

    pub fn product(&self, product_id: i64) -> ProductStock {
        self.snapshot().products[&product_id].clone()
    }

    pub fn lot(&self, lot_id: i64) -> Lot {
        self.snapshot().lots[&lot_id].clone()
    }

    pub fn consumptions(&self) -> Vec<ConsumptionRecord> {
        self.snapshot().consumptions
    }

    pub fn lot_total(&self, product_id: i64) -> i64 {
        self.snapshot()
            .lots
            .values()
            .filter(|lot| lot.product_id == product_id)
            .map(|lot| lot.remaining_quantity)
            .sum()
    }

    /// Insert a product directly, with an empty aggregate
    pub fn seed_product(&self, name: &str, unit_price: Decimal) -> i64 {
        let mut state = self.committed.lock().unwrap();
        let id = state.next_id();
        let now = Utc::now();
        state.products.insert(
            id,
            ProductStock {
                id,
                name: name.to_string(),
                unit_price,
                total_quantity: 0,
                total_value: Decimal::ZERO,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    /// Insert a lot directly and add it to the product aggregate
    pub fn seed_lot(
        &self,
        product_id: i64,
        quantity: i64,
        unit_cost: Decimal,
        received_at: DateTime<Utc>,
    ) -> i64 {
        let mut state = self.committed.lock().unwrap();
        let id = state.next_id();
        state.lots.insert(
            id,
            Lot {
                id,
                product_id,
                original_quantity: quantity,
                remaining_quantity: quantity,
                unit_cost,
                received_at,
            },
        );
        let product = state.products.get_mut(&product_id).unwrap();
        product.total_quantity += quantity;
        product.total_value = stock_value(product.total_quantity, product.unit_price).unwrap();
        id
    }

    /// Overwrite the cached aggregate without touching lots
    pub fn force_aggregate(&self, product_id: i64, total_quantity: i64) {
        let mut state = self.committed.lock().unwrap();
        let product = state.products.get_mut(&product_id).unwrap();
        product.total_quantity = total_quantity;
        product.total_value = stock_value(total_quantity, product.unit_price).unwrap();
    }
}

#[async_trait]
impl StockStore for MemoryStockStore {
    async fn begin(&self) -> AppResult<Box<dyn StockTx>> {
        let guard = self.writer.clone().lock_owned().await;
        let working = self.committed.lock().unwrap().clone();
        Ok(Box::new(MemoryTx {
            _guard: guard,
            working,
            committed: self.committed.clone(),
            fail_point: *self.fail_point.lock().unwrap(),
            lot_delay: *self.lot_delay.lock().unwrap(),
            decrements: 0,
            inserts: 0,
        }))
    }

    async fn find_product(&self, product_id: i64) -> AppResult<Option<ProductStock>> {
        Ok(self.committed.lock().unwrap().products.get(&product_id).cloned())
    }

    async fn fifo_lots(&self, product_id: i64) -> AppResult<Vec<Lot>> {
        let mut lots: Vec<Lot> = self
            .committed
            .lock()
            .unwrap()
            .lots
            .values()
            .filter(|lot| lot.product_id == product_id && lot.remaining_quantity > 0)
            .cloned()
            .collect();
        lots.sort_by_key(Lot::fifo_key);
        Ok(lots)
    }
}

pub struct MemoryTx {
    _guard: tokio::sync::OwnedMutexGuard<()>,
    working: MemoryState,
    committed: Arc<Mutex<MemoryState>>,
    fail_point: Option<FailPoint>,
    lot_delay: Option<Duration>,
    decrements: usize,
    inserts: usize,
}

impl MemoryTx {
    fn check(&self, point: FailPoint) -> AppResult<()> {
        if self.fail_point == Some(point) {
            return Err(AppError::StorageError(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }
}

#[async_trait]
impl StockTx for MemoryTx {
    async fn lock_product(&mut self, product_id: i64) -> AppResult<Option<ProductStock>> {
        Ok(self.working.products.get(&product_id).cloned())
    }

    async fn insert_product(&mut self, product: &NewProduct) -> AppResult<ProductStock> {
        if self
            .working
            .products
            .values()
            .any(|existing| existing.name == product.name)
        {
            return Err(AppError::validation(
                "name",
                "A product with this name already exists",
                "Ya existe un producto con este nombre",
            ));
        }
        let id = self.working.next_id();
        let now = Utc::now();
        let stored = ProductStock {
            id,
            name: product.name.clone(),
            unit_price: product.unit_price,
            total_quantity: 0,
            total_value: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        self.working.products.insert(id, stored.clone());
        Ok(stored)
    }

    async fn available_lots(&mut self, product_id: i64) -> AppResult<Vec<Lot>> {
        let mut lots: Vec<Lot> = self
            .working
            .lots
            .values()
            .filter(|lot| lot.product_id == product_id && lot.remaining_quantity > 0)
            .cloned()
            .collect();
        lots.sort_by_key(Lot::fifo_key);
        Ok(lots)
    }

    async fn find_lot(&mut self, lot_id: i64) -> AppResult<Option<Lot>> {
        Ok(self.working.lots.get(&lot_id).cloned())
    }

    async fn insert_lot(&mut self, lot: &NewLot) -> AppResult<Lot> {
        let id = self.working.next_id();
        let stored = Lot {
            id,
            product_id: lot.product_id,
            original_quantity: lot.quantity,
            remaining_quantity: lot.quantity,
            unit_cost: lot.unit_cost,
            received_at: lot.received_at,
        };
        self.working.lots.insert(id, stored.clone());
        Ok(stored)
    }

    async fn decrement_lot(&mut self, lot_id: i64, amount: i64) -> AppResult<i64> {
        self.decrements += 1;
        self.check(FailPoint::DecrementLot(self.decrements))?;
        if let Some(delay) = self.lot_delay {
            tokio::time::sleep(delay).await;
        }

        let lot = self
            .working
            .lots
            .get_mut(&lot_id)
            .ok_or_else(|| AppError::NotFound(format!("Lot {}", lot_id)))?;
        if amount > lot.remaining_quantity {
            return Err(AppError::InvalidQuantity(format!(
                "cannot take {} units from lot {} holding {}",
                amount, lot_id, lot.remaining_quantity
            )));
        }
        lot.remaining_quantity -= amount;
        Ok(lot.remaining_quantity)
    }

    async fn set_lot_remaining(&mut self, lot_id: i64, remaining: i64) -> AppResult<Lot> {
        let lot = self
            .working
            .lots
            .get_mut(&lot_id)
            .ok_or_else(|| AppError::NotFound(format!("Lot {}", lot_id)))?;
        lot.remaining_quantity = remaining;
        Ok(lot.clone())
    }

    async fn insert_consumption(&mut self, record: &NewConsumption) -> AppResult<ConsumptionRecord> {
        self.inserts += 1;
        self.check(FailPoint::InsertConsumption(self.inserts))?;

        if self
            .working
            .consumptions
            .iter()
            .any(|c| c.withdrawal_id == record.withdrawal_id && c.lot_id == record.lot_id)
        {
            return Err(AppError::StorageError(
                "duplicate consumption for lot in withdrawal".to_string(),
            ));
        }

        let id = self.working.next_id();
        let stored = ConsumptionRecord {
            id,
            withdrawal_id: record.withdrawal_id,
            lot_id: record.lot_id,
            product_id: record.product_id,
            quantity_taken: record.quantity_taken,
            unit_cost_at_consumption: record.unit_cost_at_consumption,
            sale_or_disposal_price: record.sale_or_disposal_price,
            kind: record.kind,
            reason_note: record.reason_note.clone(),
            occurred_at: record.occurred_at,
        };
        self.working.consumptions.push(stored.clone());
        Ok(stored)
    }

    async fn write_aggregate(
        &mut self,
        product_id: i64,
        total_quantity: i64,
        unit_price: Decimal,
        total_value: Decimal,
    ) -> AppResult<ProductStock> {
        self.check(FailPoint::WriteAggregate)?;
        let product = self
            .working
            .products
            .get_mut(&product_id)
            .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))?;
        product.total_quantity = total_quantity;
        product.unit_price = unit_price;
        product.total_value = total_value;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn sum_remaining(&mut self, product_id: i64) -> AppResult<i64> {
        Ok(self
            .working
            .lots
            .values()
            .filter(|lot| lot.product_id == product_id)
            .map(|lot| lot.remaining_quantity)
            .sum())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.check(FailPoint::Commit)?;
        let this = *self;
        *this.committed.lock().unwrap() = this.working;
        Ok(())
    }
}

// ============================================================================
// Activity
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedActivity {
    pub actor: String,
    pub action: ActivityAction,
    pub details: String,
}

#[derive(Default)]
pub struct RecordingActivityLog {
    entries: Mutex<Vec<RecordedActivity>>,
}

impl RecordingActivityLog {
    pub fn entries(&self) -> Vec<RecordedActivity> {
        self.entries.lock().unwrap().clone()
    }
}

impl ActivityLog for RecordingActivityLog {
    fn record(&self, actor: &str, action: ActivityAction, details: String) {
        self.entries.lock().unwrap().push(RecordedActivity {
            actor: actor.to_string(),
            action,
            details,
        });
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub struct Harness {
    pub store: MemoryStockStore,
    pub activity: Arc<RecordingActivityLog>,
    pub service: StockService,
}

pub fn harness() -> Harness {
    harness_with(StockConfig::default())
}

pub fn harness_with_policy(policy: ShortfallPolicy) -> Harness {
    harness_with(StockConfig {
        shortfall_policy: policy,
        ..StockConfig::default()
    })
}

pub fn harness_with(settings: StockConfig) -> Harness {
    let store = MemoryStockStore::new();
    let activity = Arc::new(RecordingActivityLog::default());
    let service = StockService::new(Arc::new(store.clone()), activity.clone(), settings);
    Harness {
        store,
        activity,
        service,
    }
}

/// A fixed point in time plus `days`
pub fn day(days: i64) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-01T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
        + chrono::Duration::days(days)
}

pub fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}
