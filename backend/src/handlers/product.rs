//! HTTP handlers for product endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::models::{ConsumptionRecord, MovementTotals, ProductStock};
use shared::types::{PaginatedResponse, Pagination};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::{ProductService, RegisterProductInput, RegisteredProduct};
use crate::AppState;

/// Register a product with optional opening stock
pub async fn register_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RegisterProductInput>,
) -> AppResult<Json<RegisteredProduct>> {
    let registered = state
        .stock
        .register_product(&current_user.0.username, input)
        .await?;
    Ok(Json(registered))
}

/// List all products
pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<ProductStock>>> {
    let service = ProductService::new(state.db);
    let products = service.list_products().await?;
    Ok(Json(products))
}

/// Get a product aggregate
pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<i64>,
) -> AppResult<Json<ProductStock>> {
    let service = ProductService::new(state.db);
    let product = service.get_product(product_id).await?;
    Ok(Json(product))
}

/// Consumption ledger of a product
pub async fn get_consumption_ledger(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<i64>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<ConsumptionRecord>>> {
    let service = ProductService::new(state.db);
    let ledger = service.consumption_ledger(product_id, &pagination).await?;
    Ok(Json(ledger))
}

/// Sold, returned and shrinkage totals of a product
pub async fn get_movement_summary(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<i64>,
) -> AppResult<Json<Vec<MovementTotals>>> {
    let service = ProductService::new(state.db);
    let summary = service.movement_summary(product_id).await?;
    Ok(Json(summary))
}
