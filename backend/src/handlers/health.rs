//! Liveness and database probe

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    /// `commit` or `reject`, as configured
    pub shortfall_policy: crate::config::ShortfallPolicy,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::warn!("Health probe could not reach the database: {}", e);
            "disconnected"
        }
    };

    Json(HealthResponse {
        status: if database == "connected" { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database,
        shortfall_policy: state.stock.shortfall_policy(),
    })
}
