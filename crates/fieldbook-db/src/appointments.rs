//! Appointment repository implementation.
//!
//! Multi-row logical operations (create + audit, status change + audit,
//! reschedule) run in a single transaction so partial writes are never
//! observable. Status transitions are driven entirely by the caller; this
//! layer validates invariants and records the audit trail, it does not
//! decide transitions.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use fieldbook_core::{
    defaults, validate_cancellation, validate_check_times, validate_duration, Appointment,
    AppointmentPriority, AppointmentRepository, AppointmentStatus, CreateAppointmentRequest,
    Error, ListAppointmentsRequest, Result, StatusChangeContext, UpdateAppointmentRequest,
};

use crate::constraint::{constraint_name, is_check_violation, is_foreign_key_violation};

/// PostgreSQL implementation of AppointmentRepository.
pub struct PgAppointmentRepository {
    pool: Pool<Postgres>,
}

impl PgAppointmentRepository {
    /// Create a new PgAppointmentRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert an appointment row inside an open transaction and return its ID.
    async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        req: &CreateAppointmentRequest,
        rescheduled_from: Option<Uuid>,
    ) -> Result<Uuid> {
        let duration = req
            .duration_minutes
            .unwrap_or(defaults::APPOINTMENT_DURATION_MINUTES);
        validate_duration(duration).map_err(Error::InvalidInput)?;
        if req.title.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Appointment title cannot be empty".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO appointments (
                id, user_id, organisation_id, title, description,
                scheduled_date, scheduled_time, duration_minutes,
                status, priority, rescheduled_from, created_at_utc, updated_at_utc
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            "#,
        )
        .bind(id)
        .bind(req.user_id)
        .bind(req.organisation_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.scheduled_date)
        .bind(req.scheduled_time)
        .bind(duration)
        .bind(AppointmentStatus::Scheduled.to_string())
        .bind(req.priority.to_string())
        .bind(rescheduled_from)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                return Error::ForeignKey(format!(
                    "Appointment references missing user {} or organisation {}",
                    req.user_id, req.organisation_id
                ));
            }
            if is_check_violation(&e) {
                return Error::InvalidInput(format!(
                    "Appointment violates constraint {}",
                    constraint_name(&e).unwrap_or_default()
                ));
            }
            Error::Database(e)
        })?;

        record_activity_tx(
            tx,
            req.user_id,
            Some(id),
            "created",
            Some(json!({
                "status": AppointmentStatus::Scheduled.to_string(),
                "scheduled_date": req.scheduled_date,
                "scheduled_time": req.scheduled_time.format("%H:%M:%S").to_string(),
            })),
            None,
            None,
        )
        .await?;

        Ok(id)
    }

    /// Fetch an appointment inside an open transaction, locking the row.
    async fn fetch_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Appointment> {
        let row = sqlx::query("SELECT * FROM appointments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::AppointmentNotFound(id))?;

        map_row_to_appointment(row)
    }
}

/// Append an audit row inside an open transaction.
pub(crate) async fn record_activity_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    appointment_id: Option<Uuid>,
    action: &str,
    details: Option<serde_json::Value>,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO activity_logs (id, user_id, appointment_id, action, details, ip_address, user_agent, created_at_utc)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(appointment_id)
    .bind(action)
    .bind(details)
    .bind(ip_address)
    .bind(user_agent)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await
    .map_err(Error::Database)?;

    Ok(id)
}

fn map_row_to_appointment(row: sqlx::postgres::PgRow) -> Result<Appointment> {
    let status_token: String = row.get("status");
    let status = AppointmentStatus::from_str(&status_token).map_err(Error::Serialization)?;
    let priority_token: String = row.get("priority");
    let priority = AppointmentPriority::from_str(&priority_token).map_err(Error::Serialization)?;

    Ok(Appointment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        organisation_id: row.get("organisation_id"),
        title: row.get("title"),
        description: row.get("description"),
        scheduled_date: row.get("scheduled_date"),
        scheduled_time: row.get("scheduled_time"),
        duration_minutes: row.get("duration_minutes"),
        status,
        priority,
        reminder_sent: row.get("reminder_sent"),
        check_in_time: row.get("check_in_time"),
        check_out_time: row.get("check_out_time"),
        cancellation_reason: row.get("cancellation_reason"),
        cancelled_at: row.get("cancelled_at"),
        rescheduled_from: row.get("rescheduled_from"),
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
    })
}

#[async_trait]
impl AppointmentRepository for PgAppointmentRepository {
    async fn insert(&self, req: CreateAppointmentRequest) -> Result<Uuid> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let id = self.insert_tx(&mut tx, &req, None).await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "appointments",
            op = "insert",
            appointment_id = %id,
            user_id = %req.user_id,
            organisation_id = %req.organisation_id,
            "Appointment created"
        );
        Ok(id)
    }

    async fn fetch(&self, id: Uuid) -> Result<Appointment> {
        let row = sqlx::query("SELECT * FROM appointments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::AppointmentNotFound(id))?;

        map_row_to_appointment(row)
    }

    async fn list(&self, req: ListAppointmentsRequest) -> Result<Vec<Appointment>> {
        let mut query = String::from("SELECT * FROM appointments WHERE 1=1 ");
        let mut param_idx = 1;

        if req.user_id.is_some() {
            query.push_str(&format!("AND user_id = ${} ", param_idx));
            param_idx += 1;
        }
        if req.organisation_id.is_some() {
            query.push_str(&format!("AND organisation_id = ${} ", param_idx));
            param_idx += 1;
        }
        if req.status.is_some() {
            query.push_str(&format!("AND status = ${} ", param_idx));
            param_idx += 1;
        }
        if req.date_from.is_some() {
            query.push_str(&format!("AND scheduled_date >= ${} ", param_idx));
            param_idx += 1;
        }
        if req.date_to.is_some() {
            query.push_str(&format!("AND scheduled_date <= ${} ", param_idx));
            param_idx += 1;
        }
        query.push_str(&format!(
            "ORDER BY scheduled_date, scheduled_time LIMIT ${} OFFSET ${}",
            param_idx,
            param_idx + 1
        ));

        let mut q = sqlx::query(&query);
        if let Some(user_id) = req.user_id {
            q = q.bind(user_id);
        }
        if let Some(organisation_id) = req.organisation_id {
            q = q.bind(organisation_id);
        }
        if let Some(status) = req.status {
            q = q.bind(status.to_string());
        }
        if let Some(date_from) = req.date_from {
            q = q.bind(date_from);
        }
        if let Some(date_to) = req.date_to {
            q = q.bind(date_to);
        }
        q = q
            .bind(req.limit.unwrap_or(defaults::PAGE_LIMIT))
            .bind(req.offset.unwrap_or(defaults::PAGE_OFFSET));

        let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;
        rows.into_iter().map(map_row_to_appointment).collect()
    }

    async fn update(&self, id: Uuid, req: UpdateAppointmentRequest) -> Result<()> {
        if let Some(duration) = req.duration_minutes {
            validate_duration(duration).map_err(Error::InvalidInput)?;
        }

        let result = sqlx::query(
            r#"
            UPDATE appointments SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                scheduled_date = COALESCE($4, scheduled_date),
                scheduled_time = COALESCE($5, scheduled_time),
                duration_minutes = COALESCE($6, duration_minutes),
                priority = COALESCE($7, priority),
                reminder_sent = COALESCE($8, reminder_sent),
                updated_at_utc = $9
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.scheduled_date)
        .bind(req.scheduled_time)
        .bind(req.duration_minutes)
        .bind(req.priority.map(|p| p.to_string()))
        .bind(req.reminder_sent)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_check_violation(&e) {
                return Error::InvalidInput(format!(
                    "Appointment violates constraint {}",
                    constraint_name(&e).unwrap_or_default()
                ));
            }
            Error::Database(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(Error::AppointmentNotFound(id));
        }
        Ok(())
    }

    async fn update_status(
        &self,
        id: Uuid,
        new_status: AppointmentStatus,
        ctx: StatusChangeContext,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let current = self.fetch_for_update(&mut tx, id).await?;

        let now = Utc::now();
        let (cancellation_reason, cancelled_at) = if new_status == AppointmentStatus::Cancelled {
            (ctx.cancellation_reason.clone(), Some(now))
        } else {
            // Moving away from cancelled clears the pair.
            (None, None)
        };
        validate_cancellation(new_status, cancellation_reason.as_deref(), cancelled_at)
            .map_err(Error::InvalidInput)?;

        sqlx::query(
            r#"
            UPDATE appointments SET
                status = $2,
                cancellation_reason = $3,
                cancelled_at = $4,
                updated_at_utc = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(new_status.to_string())
        .bind(&cancellation_reason)
        .bind(cancelled_at)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let mut details = json!({
            "before": current.status.to_string(),
            "after": new_status.to_string(),
        });
        if let Some(reason) = &cancellation_reason {
            details["cancellation_reason"] = json!(reason);
        }
        record_activity_tx(
            &mut tx,
            current.user_id,
            Some(id),
            "status_changed",
            Some(details),
            ctx.ip_address.as_deref(),
            ctx.user_agent.as_deref(),
        )
        .await?;

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "appointments",
            op = "update_status",
            appointment_id = %id,
            before = %current.status,
            after = %new_status,
            "Appointment status changed"
        );
        Ok(())
    }

    async fn reschedule(&self, old_id: Uuid, req: CreateAppointmentRequest) -> Result<Uuid> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let old = self.fetch_for_update(&mut tx, old_id).await?;

        let new_id = self.insert_tx(&mut tx, &req, Some(old_id)).await?;

        // The old row leaves whatever status it had (cancelled included), so
        // the cancellation pair is cleared along with the transition.
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE appointments SET
                status = $2,
                cancellation_reason = NULL,
                cancelled_at = NULL,
                updated_at_utc = $3
            WHERE id = $1
            "#,
        )
        .bind(old_id)
        .bind(AppointmentStatus::Rescheduled.to_string())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        record_activity_tx(
            &mut tx,
            old.user_id,
            Some(old_id),
            "status_changed",
            Some(json!({
                "before": old.status.to_string(),
                "after": AppointmentStatus::Rescheduled.to_string(),
                "replaced_by": new_id,
            })),
            None,
            None,
        )
        .await?;

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "appointments",
            op = "reschedule",
            appointment_id = %old_id,
            replaced_by = %new_id,
            "Appointment rescheduled"
        );
        Ok(new_id)
    }

    async fn check_in(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let current = self.fetch_for_update(&mut tx, id).await?;

        // A check-out may already exist (re-checking-in after a correction);
        // the pair must stay ordered either way.
        validate_check_times(Some(at), current.check_out_time).map_err(Error::InvalidInput)?;

        sqlx::query(
            "UPDATE appointments SET check_in_time = $2, updated_at_utc = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn check_out(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let current = self.fetch_for_update(&mut tx, id).await?;

        validate_check_times(current.check_in_time, Some(at)).map_err(Error::InvalidInput)?;

        sqlx::query(
            "UPDATE appointments SET check_out_time = $2, updated_at_utc = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM appointments WHERE id = $1) AS present")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.get("present"))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::AppointmentNotFound(id));
        }
        Ok(())
    }
}
