//! Route definitions for the Stockroom inventory backend

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - products and their lots
        .nest("/products", product_routes(state.clone()))
        // Protected routes - lot corrections
        .nest("/lots", lot_routes(state.clone()))
        // Protected routes - withdrawals
        .nest("/withdrawals", withdrawal_routes(state.clone()))
        // Protected routes - activity history
        .nest("/activity", activity_routes(state))
}

/// Product routes (protected)
fn product_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::register_product),
        )
        .route("/:product_id", get(handlers::get_product))
        .route(
            "/:product_id/lots",
            get(handlers::list_available_lots).post(handlers::receive_lot),
        )
        .route(
            "/:product_id/consumptions",
            get(handlers::get_consumption_ledger),
        )
        .route("/:product_id/movements", get(handlers::get_movement_summary))
        .route(
            "/:product_id/reconciliation",
            get(handlers::check_reconciliation).post(handlers::repair_reconciliation),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Lot routes (protected)
fn lot_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/:lot_id/quantity", put(handlers::adjust_lot_quantity))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Withdrawal routes (protected)
fn withdrawal_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::withdraw))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Activity routes (protected)
fn activity_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_activity))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
