//! Activity history: fire-and-forget audit of stock operations

use shared::models::{ActivityAction, ActivityEntry};
use shared::types::{PaginatedResponse, Pagination};
use sqlx::{FromRow, PgPool};

use crate::error::{AppError, AppResult};

/// Sink for activity entries.
///
/// `record` must return immediately and must never fail the caller; a lost
/// entry is logged, not propagated.
pub trait ActivityLog: Send + Sync {
    fn record(&self, actor: &str, action: ActivityAction, details: String);
}

/// Activity log writing to the `activity_log` table
#[derive(Clone)]
pub struct ActivityService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct ActivityRow {
    id: i64,
    occurred_at: chrono::DateTime<chrono::Utc>,
    actor: String,
    action: String,
    details: String,
}

impl TryFrom<ActivityRow> for ActivityEntry {
    type Error = AppError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let action = ActivityAction::parse(&row.action).ok_or_else(|| {
            AppError::Internal(format!("unknown activity action: {}", row.action))
        })?;

        Ok(ActivityEntry {
            id: row.id,
            occurred_at: row.occurred_at,
            actor: row.actor,
            action,
            details: row.details,
        })
    }
}

impl ActivityService {
    /// Create a new ActivityService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Activity history, newest first
    pub async fn list_history(
        &self,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<ActivityEntry>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, occurred_at, actor, action, details
            FROM activity_log
            ORDER BY occurred_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM activity_log")
            .fetch_one(&self.db)
            .await?;

        let entries = rows
            .into_iter()
            .map(ActivityEntry::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(entries, pagination, total.max(0) as u64))
    }
}

impl ActivityLog for ActivityService {
    fn record(&self, actor: &str, action: ActivityAction, details: String) {
        let db = self.db.clone();
        let actor = actor.to_string();

        tokio::spawn(async move {
            let result = sqlx::query(
                "INSERT INTO activity_log (actor, action, details) VALUES ($1, $2, $3)",
            )
            .bind(&actor)
            .bind(action.as_str())
            .bind(&details)
            .execute(&db)
            .await;

            if let Err(e) = result {
                tracing::warn!(
                    actor = %actor,
                    action = action.as_str(),
                    "Failed to write activity entry: {}",
                    e
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(action: &str) -> ActivityRow {
        ActivityRow {
            id: 1,
            occurred_at: chrono::Utc::now(),
            actor: "maria".to_string(),
            action: action.to_string(),
            details: "Lot 3 received".to_string(),
        }
    }

    #[test]
    fn test_row_action_parsed() {
        let entry = ActivityEntry::try_from(row("lot_received")).unwrap();
        assert_eq!(entry.action, ActivityAction::LotReceived);
    }

    #[test]
    fn test_unknown_row_action_rejected() {
        assert!(matches!(
            ActivityEntry::try_from(row("harvest_logged")),
            Err(AppError::Internal(_))
        ));
    }
}
