//! HTTP handlers for lot and withdrawal endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::models::Lot;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::{
    AdjustLotInput, LotAdjustment, LotReceipt, ReceiveLotInput, ReconciliationReport,
    WithdrawInput, WithdrawalResult,
};
use crate::AppState;

/// Withdraw stock from a product, oldest lots first
pub async fn withdraw(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<WithdrawInput>,
) -> AppResult<Json<WithdrawalResult>> {
    let result = state.stock.withdraw(&current_user.0.username, input).await?;
    Ok(Json(result))
}

/// List lots that still hold stock, in FIFO order
pub async fn list_available_lots(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<i64>,
) -> AppResult<Json<Vec<Lot>>> {
    let lots = state.stock.list_available_lots(product_id).await?;
    Ok(Json(lots))
}

/// Receive a new lot for a product
pub async fn receive_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<i64>,
    Json(input): Json<ReceiveLotInput>,
) -> AppResult<Json<LotReceipt>> {
    let receipt = state
        .stock
        .receive_lot(&current_user.0.username, product_id, input)
        .await?;
    Ok(Json(receipt))
}

/// Correct a lot's remaining quantity (admin only)
pub async fn adjust_lot_quantity(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(lot_id): Path<i64>,
    Json(input): Json<AdjustLotInput>,
) -> AppResult<Json<LotAdjustment>> {
    require_admin(&current_user)?;
    let adjustment = state
        .stock
        .adjust_lot_quantity(&current_user.0.username, lot_id, input)
        .await?;
    Ok(Json(adjustment))
}

/// Compare a product aggregate with its lots
pub async fn check_reconciliation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<i64>,
) -> AppResult<Json<ReconciliationReport>> {
    let report = state
        .stock
        .reconcile(&current_user.0.username, product_id, false)
        .await?;
    Ok(Json(report))
}

/// Query for the repair endpoint
#[derive(Debug, Deserialize)]
pub struct RepairQuery {
    #[serde(default = "default_repair")]
    pub repair: bool,
}

fn default_repair() -> bool {
    true
}

/// Reset a product aggregate from its lots (admin only)
pub async fn repair_reconciliation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<i64>,
    Query(query): Query<RepairQuery>,
) -> AppResult<Json<ReconciliationReport>> {
    require_admin(&current_user)?;
    let report = state
        .stock
        .reconcile(&current_user.0.username, product_id, query.repair)
        .await?;
    Ok(Json(report))
}

fn require_admin(current_user: &CurrentUser) -> AppResult<()> {
    if current_user.0.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Administrative stock corrections require the admin role".to_string(),
        ))
    }
}
