//! Product registration and read-only product queries

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{
    ActivityAction, ConsumptionKind, ConsumptionRecord, Lot, MovementTotals, NewLot, NewProduct,
    ProductStock,
};
use shared::types::{PaginatedResponse, Pagination};
use shared::validation::{validate_amount, validate_product_name, validate_receipt_quantity};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use super::postgres::{ConsumptionRow, ProductRow, CONSUMPTION_COLUMNS, PRODUCT_COLUMNS};
use super::stock::{write_aggregate, StockService};
use crate::error::{AppError, AppResult};

/// Input for registering a product
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterProductInput {
    #[validate(length(min = 1, max = 255, message = "Product name must be 1-255 characters"))]
    pub name: String,
    pub unit_price: Decimal,
    /// Units on hand at registration; received as the product's first lot
    #[validate(range(min = 0, message = "Opening quantity cannot be negative"))]
    pub opening_quantity: Option<i64>,
    /// Cost of the opening lot, defaults to `unit_price`
    pub opening_unit_cost: Option<Decimal>,
}

/// A freshly registered product and its opening lot, if any
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredProduct {
    pub product: ProductStock,
    pub opening_lot: Option<Lot>,
}

impl StockService {
    /// Register a product, receiving its opening stock in the same transaction
    pub async fn register_product(
        &self,
        actor: &str,
        input: RegisterProductInput,
    ) -> AppResult<RegisteredProduct> {
        input.validate()?;
        validate_product_name(&input.name).map_err(|msg| {
            AppError::validation("name", msg, "El nombre del producto es obligatorio")
        })?;
        validate_amount(input.unit_price).map_err(|msg| {
            AppError::validation("unit_price", msg, "El precio unitario está fuera de rango")
        })?;
        let opening_cost = input.opening_unit_cost.unwrap_or(input.unit_price);
        validate_amount(opening_cost).map_err(|msg| {
            AppError::validation("opening_unit_cost", msg, "El costo unitario está fuera de rango")
        })?;

        let name = input.name.trim().to_string();
        let opening_quantity = input.opening_quantity.unwrap_or(0);
        if opening_quantity > 0 {
            validate_receipt_quantity(opening_quantity).map_err(|msg| {
                AppError::validation(
                    "opening_quantity",
                    msg,
                    "La cantidad inicial está fuera de rango",
                )
            })?;
        }

        let registered = self
            .bounded("register_product", async {
                let mut tx = self.store.begin().await?;
                let product = tx
                    .insert_product(&NewProduct {
                        name: name.clone(),
                        unit_price: input.unit_price,
                    })
                    .await?;

                let (product, opening_lot) = if opening_quantity > 0 {
                    let lot = tx
                        .insert_lot(&NewLot {
                            product_id: product.id,
                            quantity: opening_quantity,
                            unit_cost: opening_cost,
                            received_at: chrono::Utc::now(),
                        })
                        .await?;
                    let product =
                        write_aggregate(tx.as_mut(), &product, opening_quantity, input.unit_price)
                            .await?;
                    (product, Some(lot))
                } else {
                    (product, None)
                };

                tx.commit().await?;
                Ok(RegisteredProduct {
                    product,
                    opening_lot,
                })
            })
            .await?;

        tracing::info!(
            product_id = registered.product.id,
            opening_quantity,
            "Product registered"
        );

        self.activity.record(
            actor,
            ActivityAction::ProductRegistered,
            format!(
                "Product '{}' registered with {} units at {}",
                name, opening_quantity, input.unit_price
            ),
        );

        Ok(registered)
    }
}

/// Read-only product queries
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Row for movement summary query
#[derive(Debug, FromRow)]
struct MovementRow {
    kind: String,
    quantity: i64,
    cost: Decimal,
    revenue: Option<Decimal>,
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All products, by name
    pub async fn list_products(&self) -> AppResult<Vec<ProductStock>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products ORDER BY name, id",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_product(&self, product_id: i64) -> AppResult<ProductStock> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))?;

        Ok(row.into())
    }

    /// Consumption ledger of a product, newest first
    pub async fn consumption_ledger(
        &self,
        product_id: i64,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<ConsumptionRecord>> {
        self.ensure_exists(product_id).await?;

        let rows = sqlx::query_as::<_, ConsumptionRow>(&format!(
            r#"
            SELECT {}
            FROM consumption_records
            WHERE product_id = $1
            ORDER BY occurred_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            CONSUMPTION_COLUMNS
        ))
        .bind(product_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM consumption_records WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        let records = rows
            .into_iter()
            .map(ConsumptionRecord::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(records, pagination, total.max(0) as u64))
    }

    /// Units and cost that left the product per consumption kind.
    ///
    /// Every kind is present, with zeros when it never occurred.
    pub async fn movement_summary(&self, product_id: i64) -> AppResult<Vec<MovementTotals>> {
        self.ensure_exists(product_id).await?;

        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT kind,
                   COALESCE(SUM(quantity_taken), 0)::BIGINT AS quantity,
                   COALESCE(SUM(quantity_taken * unit_cost_at_consumption), 0) AS cost,
                   SUM(quantity_taken * sale_or_disposal_price) AS revenue
            FROM consumption_records
            WHERE product_id = $1
            GROUP BY kind
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(ConsumptionKind::ALL
            .iter()
            .map(|kind| {
                rows.iter()
                    .find(|row| row.kind == kind.as_str())
                    .map(|row| MovementTotals {
                        kind: *kind,
                        quantity: row.quantity,
                        cost: row.cost,
                        revenue: row.revenue,
                    })
                    .unwrap_or(MovementTotals {
                        kind: *kind,
                        quantity: 0,
                        cost: Decimal::ZERO,
                        revenue: None,
                    })
            })
            .collect())
    }

    async fn ensure_exists(&self, product_id: i64) -> AppResult<()> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(product_id)
                .fetch_one(&self.db)
                .await?;

        if !exists {
            return Err(AppError::NotFound(format!("Product {}", product_id)));
        }
        Ok(())
    }
}
