//! Activity log repository implementation.
//!
//! Append-only by construction: this repository exposes record and list
//! operations only. Rows leave the table solely through the owning user's
//! (or appointment's) cascade.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use fieldbook_core::{
    defaults, ActivityLog, ActivityLogRepository, Error, RecordActivityRequest, Result,
};

use crate::appointments::record_activity_tx;
use crate::constraint::is_foreign_key_violation;

/// PostgreSQL implementation of ActivityLogRepository.
pub struct PgActivityLogRepository {
    pool: Pool<Postgres>,
}

impl PgActivityLogRepository {
    /// Create a new PgActivityLogRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_row_to_activity_log(row: sqlx::postgres::PgRow) -> ActivityLog {
    ActivityLog {
        id: row.get("id"),
        user_id: row.get("user_id"),
        appointment_id: row.get("appointment_id"),
        action: row.get("action"),
        details: row.get::<Option<JsonValue>, _>("details"),
        ip_address: row.get("ip_address"),
        user_agent: row.get("user_agent"),
        created_at_utc: row.get("created_at_utc"),
    }
}

#[async_trait]
impl ActivityLogRepository for PgActivityLogRepository {
    async fn record(&self, req: RecordActivityRequest) -> Result<Uuid> {
        if req.action.trim().is_empty() {
            return Err(Error::InvalidInput("Action cannot be empty".to_string()));
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let id = record_activity_tx(
            &mut tx,
            req.user_id,
            req.appointment_id,
            &req.action,
            req.details,
            req.ip_address.as_deref(),
            req.user_agent.as_deref(),
        )
        .await
        .map_err(|e| match e {
            Error::Database(inner) if is_foreign_key_violation(&inner) => Error::ForeignKey(
                format!("Activity log references missing user {}", req.user_id),
            ),
            other => other,
        })?;
        tx.commit().await.map_err(Error::Database)?;

        Ok(id)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ActivityLog>> {
        let rows = sqlx::query(
            "SELECT * FROM activity_logs WHERE user_id = $1
             ORDER BY created_at_utc DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit.unwrap_or(defaults::PAGE_LIMIT_ACTIVITY))
        .bind(offset.unwrap_or(defaults::PAGE_OFFSET))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_row_to_activity_log).collect())
    }

    async fn list_for_appointment(&self, appointment_id: Uuid) -> Result<Vec<ActivityLog>> {
        let rows = sqlx::query(
            "SELECT * FROM activity_logs WHERE appointment_id = $1 ORDER BY created_at_utc DESC",
        )
        .bind(appointment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_row_to_activity_log).collect())
    }
}
