//! PostgreSQL implementation of the stock storage seam

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::models::{
    ConsumptionKind, ConsumptionRecord, Lot, NewConsumption, NewLot, NewProduct, ProductStock,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::store::{StockStore, StockTx};
use crate::error::{AppError, AppResult};

pub(crate) const LOT_COLUMNS: &str =
    "id, product_id, original_quantity, remaining_quantity, unit_cost, received_at";

pub(crate) const PRODUCT_COLUMNS: &str =
    "id, name, unit_price, total_quantity, total_value, created_at, updated_at";

pub(crate) const CONSUMPTION_COLUMNS: &str = "id, withdrawal_id, lot_id, product_id, quantity_taken, \
     unit_cost_at_consumption, sale_or_disposal_price, kind, reason_note, occurred_at";

/// Stock store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStockStore {
    db: PgPool,
}

impl PgStockStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StockStore for PgStockStore {
    async fn begin(&self) -> AppResult<Box<dyn StockTx>> {
        let tx = self.db.begin().await?;
        Ok(Box::new(PgStockTx { tx }))
    }

    async fn find_product(&self, product_id: i64) -> AppResult<Option<ProductStock>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn fifo_lots(&self, product_id: i64) -> AppResult<Vec<Lot>> {
        let rows = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            SELECT {}
            FROM lots
            WHERE product_id = $1 AND remaining_quantity > 0
            ORDER BY received_at ASC, id ASC
            "#,
            LOT_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Open PostgreSQL transaction; rolled back by sqlx when dropped uncommitted
pub struct PgStockTx {
    tx: Transaction<'static, Postgres>,
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
pub(crate) struct LotRow {
    id: i64,
    product_id: i64,
    original_quantity: i64,
    remaining_quantity: i64,
    unit_cost: Decimal,
    received_at: DateTime<Utc>,
}

impl From<LotRow> for Lot {
    fn from(row: LotRow) -> Self {
        Lot {
            id: row.id,
            product_id: row.product_id,
            original_quantity: row.original_quantity,
            remaining_quantity: row.remaining_quantity,
            unit_cost: row.unit_cost,
            received_at: row.received_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    id: i64,
    name: String,
    unit_price: Decimal,
    total_quantity: i64,
    total_value: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for ProductStock {
    fn from(row: ProductRow) -> Self {
        ProductStock {
            id: row.id,
            name: row.name,
            unit_price: row.unit_price,
            total_quantity: row.total_quantity,
            total_value: row.total_value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ConsumptionRow {
    id: i64,
    withdrawal_id: Uuid,
    lot_id: i64,
    product_id: i64,
    quantity_taken: i64,
    unit_cost_at_consumption: Decimal,
    sale_or_disposal_price: Option<Decimal>,
    kind: String,
    reason_note: Option<String>,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<ConsumptionRow> for ConsumptionRecord {
    type Error = AppError;

    fn try_from(row: ConsumptionRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<ConsumptionKind>()
            .map_err(AppError::Internal)?;

        Ok(ConsumptionRecord {
            id: row.id,
            withdrawal_id: row.withdrawal_id,
            lot_id: row.lot_id,
            product_id: row.product_id,
            quantity_taken: row.quantity_taken,
            unit_cost_at_consumption: row.unit_cost_at_consumption,
            sale_or_disposal_price: row.sale_or_disposal_price,
            kind,
            reason_note: row.reason_note,
            occurred_at: row.occurred_at,
        })
    }
}

// ============================================================================
// Transaction
// ============================================================================

#[async_trait]
impl StockTx for PgStockTx {
    async fn lock_product(&mut self, product_id: i64) -> AppResult<Option<ProductStock>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1 FOR UPDATE",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn insert_product(&mut self, product: &NewProduct) -> AppResult<ProductStock> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (name, unit_price, total_quantity, total_value)
            VALUES ($1, $2, 0, 0)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(&product.name)
        .bind(product.unit_price)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::validation(
                "name",
                "A product with this name already exists",
                "Ya existe un producto con este nombre",
            ),
            other => other.into(),
        })?;

        Ok(row.into())
    }

    async fn available_lots(&mut self, product_id: i64) -> AppResult<Vec<Lot>> {
        let rows = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            SELECT {}
            FROM lots
            WHERE product_id = $1 AND remaining_quantity > 0
            ORDER BY received_at ASC, id ASC
            FOR UPDATE
            "#,
            LOT_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_lot(&mut self, lot_id: i64) -> AppResult<Option<Lot>> {
        let row = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {} FROM lots WHERE id = $1",
            LOT_COLUMNS
        ))
        .bind(lot_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn insert_lot(&mut self, lot: &NewLot) -> AppResult<Lot> {
        let row = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            INSERT INTO lots (product_id, original_quantity, remaining_quantity, unit_cost, received_at)
            VALUES ($1, $2, $2, $3, $4)
            RETURNING {}
            "#,
            LOT_COLUMNS
        ))
        .bind(lot.product_id)
        .bind(lot.quantity)
        .bind(lot.unit_cost)
        .bind(lot.received_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn decrement_lot(&mut self, lot_id: i64, amount: i64) -> AppResult<i64> {
        let remaining = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE lots
            SET remaining_quantity = remaining_quantity - $2
            WHERE id = $1 AND remaining_quantity >= $2
            RETURNING remaining_quantity
            "#,
        )
        .bind(lot_id)
        .bind(amount)
        .fetch_optional(&mut *self.tx)
        .await?;

        match remaining {
            Some(left) => Ok(left),
            None => {
                let current = sqlx::query_scalar::<_, i64>(
                    "SELECT remaining_quantity FROM lots WHERE id = $1",
                )
                .bind(lot_id)
                .fetch_optional(&mut *self.tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Lot {}", lot_id)))?;

                Err(AppError::InvalidQuantity(format!(
                    "cannot take {} units from lot {} holding {}",
                    amount, lot_id, current
                )))
            }
        }
    }

    async fn set_lot_remaining(&mut self, lot_id: i64, remaining: i64) -> AppResult<Lot> {
        let row = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            UPDATE lots
            SET remaining_quantity = $2
            WHERE id = $1
            RETURNING {}
            "#,
            LOT_COLUMNS
        ))
        .bind(lot_id)
        .bind(remaining)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lot {}", lot_id)))?;

        Ok(row.into())
    }

    async fn insert_consumption(&mut self, record: &NewConsumption) -> AppResult<ConsumptionRecord> {
        let row = sqlx::query_as::<_, ConsumptionRow>(&format!(
            r#"
            INSERT INTO consumption_records (
                withdrawal_id, lot_id, product_id, quantity_taken, unit_cost_at_consumption,
                sale_or_disposal_price, kind, reason_note, occurred_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            CONSUMPTION_COLUMNS
        ))
        .bind(record.withdrawal_id)
        .bind(record.lot_id)
        .bind(record.product_id)
        .bind(record.quantity_taken)
        .bind(record.unit_cost_at_consumption)
        .bind(record.sale_or_disposal_price)
        .bind(record.kind.as_str())
        .bind(&record.reason_note)
        .bind(record.occurred_at)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn write_aggregate(
        &mut self,
        product_id: i64,
        total_quantity: i64,
        unit_price: Decimal,
        total_value: Decimal,
    ) -> AppResult<ProductStock> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET total_quantity = $2, unit_price = $3, total_value = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(total_quantity)
        .bind(unit_price)
        .bind(total_value)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))?;

        Ok(row.into())
    }

    async fn sum_remaining(&mut self, product_id: i64) -> AppResult<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(remaining_quantity), 0)::BIGINT FROM lots WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(total)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
