//! HTTP handlers for the activity history

use axum::{
    extract::{Query, State},
    Json,
};
use shared::models::ActivityEntry;
use shared::types::{PaginatedResponse, Pagination};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ActivityService;
use crate::AppState;

/// Activity history, newest first
pub async fn list_activity(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<ActivityEntry>>> {
    let service = ActivityService::new(state.db);
    let history = service.list_history(&pagination).await?;
    Ok(Json(history))
}
